/*!
This library generates synthetic point patterns in d-dimensional space whose
spatial density follows an arbitrary user-supplied function or discretized
weight grid, as needed to simulate non-homogeneous spatial point processes
when analytic sampling from the target density is infeasible.

Points are generated by rejection sampling a.k.a. [thinning](crate::Thinning):
candidates are drawn uniformly over the sampling region in vectorized blocks
and each one is accepted with probability `density(candidate) / lmax`, where
`lmax` is an upper bound on the density over the region. For a continuous
density the bound is estimated by a local numerical maximum search seeded at
the region midpoint; for a discrete weight grid it is the exact maximum
entry.

Example:
```
use ndarray::arr2;
use point_process::{Bounds, Density, SampleParams, SpatialPointProcess};

// A 2-dimensional ramp density over [0., 1.] x [0., 1.]
let density = Density::continuous(2, |x, _| 1. + x[0] + x[1]).unwrap();
let process = SpatialPointProcess::new(density);
let bounds = Bounds::new(&arr2(&[[0., 1.], [0., 1.]]));

// 100 points, rows in acceptance order, seeded for reproducibility
let points = process
    .sample(&SampleParams::new(100).bounds(&bounds).seed(42))
    .unwrap();
assert_eq!(points.dim(), (100, 2));
```

A discrete density is addressed by integer grid indices and needs no bounds,
the candidate range of each axis being the axis length:
```
use ndarray::arr2;
use point_process::{Density, SampleParams, SpatialPointProcess};

let weights = arr2(&[[0., 1., 2.], [3., 4., 5.]]).into_dyn();
let process = SpatialPointProcess::new(Density::discrete(weights).unwrap());
let points = process.sample(&SampleParams::new(50).seed(42)).unwrap();
assert_eq!(points.dim(), (50, 2));
```
*/
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod bounds;
mod density;
mod errors;
mod process;
mod thinning;

pub use bounds::*;
pub use density::*;
pub use errors::*;
pub use process::*;
pub use thinning::*;

use std::fmt;

use crate::bounds::Bounds;
use crate::density::{Density, DensityKwargs};
use crate::errors::{PointProcessError, Result};
use crate::thinning::{Thinning, DEFAULT_BLOCKSIZE, DEFAULT_MAX_BLOCKS};
use ndarray::Array2;
use ndarray_rand::rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

/// Name of the only sampling algorithm available
pub const THINNING_ALGO: &str = "thinning";

/// Parameters of a [`SpatialPointProcess::sample`] request.
///
/// `n` and, for a continuous density, `bounds` are mandatory; everything
/// else has a default (`"thinning"` algorithm, blocksize 1000, an
/// entropy-seeded random generator).
#[derive(Clone, Debug)]
pub struct SampleParams {
    n: Option<usize>,
    bounds: Option<Bounds>,
    algo: String,
    blocksize: usize,
    max_blocks: usize,
    n_starts: usize,
    seed: Option<u64>,
}

impl Default for SampleParams {
    fn default() -> Self {
        SampleParams {
            n: None,
            bounds: None,
            algo: THINNING_ALGO.to_string(),
            blocksize: DEFAULT_BLOCKSIZE,
            max_blocks: DEFAULT_MAX_BLOCKS,
            n_starts: 1,
            seed: None,
        }
    }
}

impl SampleParams {
    /// Constructor with the number of points to generate
    pub fn new(n: usize) -> Self {
        SampleParams::default().n(n)
    }

    /// Sets the number of points to generate
    pub fn n(mut self, n: usize) -> Self {
        self.n = Some(n);
        self
    }

    /// Sets the sampling region
    pub fn bounds(mut self, bounds: &Bounds) -> Self {
        self.bounds = Some(bounds.clone());
        self
    }

    /// Sets the sampling algorithm name (only `"thinning"` is recognized)
    pub fn algo(mut self, algo: impl Into<String>) -> Self {
        self.algo = algo.into();
        self
    }

    /// Sets the number of candidates tested per block
    pub fn blocksize(mut self, blocksize: usize) -> Self {
        self.blocksize = blocksize;
        self
    }

    /// Sets the block budget after which sampling fails
    pub fn max_blocks(mut self, max_blocks: usize) -> Self {
        self.max_blocks = max_blocks;
        self
    }

    /// Sets the number of start points of the density maximum search
    pub fn n_starts(mut self, n_starts: usize) -> Self {
        self.n_starts = n_starts;
        self
    }

    /// Seeds the random generator for reproducibility
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// A spatial point process with a specified density over a multidimensional
/// space.
///
/// Owns the target [`Density`], validates sampling arguments and delegates
/// the actual point generation to the [`Thinning`] sampler.
///
/// ```
/// use ndarray::arr2;
/// use point_process::{Bounds, Density, SampleParams, SpatialPointProcess};
///
/// let density = Density::continuous(2, |x, _| 1. + x[0] + x[1]).unwrap();
/// let process = SpatialPointProcess::new(density);
/// let bounds = Bounds::new(&arr2(&[[0., 1.], [0., 1.]]));
/// let points = process
///     .sample(&SampleParams::new(100).bounds(&bounds).seed(42))
///     .unwrap();
/// assert_eq!(points.dim(), (100, 2));
/// ```
#[derive(Clone, Debug)]
pub struct SpatialPointProcess {
    density: Density,
}

impl SpatialPointProcess {
    /// Constructor given the target density
    pub fn new(density: Density) -> Self {
        SpatialPointProcess { density }
    }

    /// The target density
    pub fn density(&self) -> &Density {
        &self.density
    }

    /// Replaces the target density
    pub fn set_density(&mut self, density: Density) {
        self.density = density;
    }

    /// Replaces the keyword parameters of a continuous target density.
    ///
    /// Fails with [`PointProcessError::InvalidDensityKwargs`] when a value
    /// is non-finite or when the density is discrete.
    pub fn set_density_kwargs(&mut self, kwargs: DensityKwargs) -> Result<()> {
        self.density.set_kwargs(kwargs)
    }

    /// Generates a realization of the process.
    ///
    /// Validates the request then runs the thinning sampler: `n` must be
    /// supplied, together with `bounds` when the density is continuous
    /// ([`PointProcessError::MissingArguments`] otherwise), and the
    /// algorithm name must be `"thinning"`
    /// ([`PointProcessError::UnsupportedAlgorithm`] otherwise).
    ///
    /// Returns an (n, nx) matrix whose rows are the generated points in
    /// acceptance order; for a discrete density the coordinates are integer
    /// valued grid indices.
    pub fn sample(&self, params: &SampleParams) -> Result<Array2<f64>> {
        let n = params.n.ok_or_else(|| {
            PointProcessError::MissingArguments(
                "the number of points n must be supplied".to_string(),
            )
        })?;
        if self.density.is_continuous() && params.bounds.is_none() {
            return Err(PointProcessError::MissingArguments(
                "n and bounds must be supplied together for a continuous density".to_string(),
            ));
        }
        if params.algo != THINNING_ALGO {
            return Err(PointProcessError::UnsupportedAlgorithm(params.algo.clone()));
        }
        let rng = match params.seed {
            Some(seed) => Xoshiro256Plus::seed_from_u64(seed),
            None => Xoshiro256Plus::from_entropy(),
        };
        Thinning::with_rng(rng)
            .blocksize(params.blocksize)
            .max_blocks(params.max_blocks)
            .n_starts(params.n_starts)
            .sample(&self.density, params.bounds.as_ref(), n)
    }
}

impl fmt::Display for SpatialPointProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.density {
            Density::Continuous(_) => write!(
                f,
                "Spatial point process with specified density function in {}-dimensional space",
                self.density.ndim()
            ),
            Density::Discrete(_) => write!(
                f,
                "Spatial point process with discrete density weights on a rank {} grid",
                self.density.ndim()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr2, array};

    fn unit_bounds() -> Bounds {
        Bounds::new(&arr2(&[[0., 1.]]))
    }

    #[test]
    fn test_sample_matches_seeded_thinning() {
        let density = Density::continuous(1, |x, _| 1. + x[0]).unwrap();
        let process = SpatialPointProcess::new(density.clone());
        let bounds = unit_bounds();
        let from_process = process
            .sample(&SampleParams::new(50).bounds(&bounds).seed(42))
            .unwrap();
        let from_sampler = Thinning::with_rng(Xoshiro256Plus::seed_from_u64(42))
            .sample(&density, Some(&bounds), 50)
            .unwrap();
        assert_eq!(from_sampler, from_process);
    }

    #[test]
    fn test_missing_n_reported() {
        let process =
            SpatialPointProcess::new(Density::continuous(1, |_, _| 1.).unwrap());
        let res = process.sample(&SampleParams::default().bounds(&unit_bounds()));
        assert!(matches!(
            res,
            Err(PointProcessError::MissingArguments(_))
        ));
    }

    #[test]
    fn test_missing_bounds_reported() {
        let process =
            SpatialPointProcess::new(Density::continuous(1, |_, _| 1.).unwrap());
        let res = process.sample(&SampleParams::new(10));
        assert!(matches!(
            res,
            Err(PointProcessError::MissingArguments(_))
        ));
    }

    #[test]
    fn test_discrete_needs_no_bounds() {
        let process =
            SpatialPointProcess::new(Density::discrete(array![1., 2., 3.].into_dyn()).unwrap());
        let points = process.sample(&SampleParams::new(20).seed(42)).unwrap();
        assert_eq!((20, 1), points.dim());
    }

    #[test]
    fn test_unknown_algorithm_reported() {
        let process =
            SpatialPointProcess::new(Density::continuous(1, |_, _| 1.).unwrap());
        let res = process.sample(&SampleParams::new(10).bounds(&unit_bounds()).algo("inversion"));
        assert!(matches!(
            res,
            Err(PointProcessError::UnsupportedAlgorithm(a)) if a == "inversion"
        ));
    }

    #[test]
    fn test_set_density_kwargs() {
        let mut process = SpatialPointProcess::new(
            Density::continuous(1, |x, kw| kw.get("scale").copied().unwrap_or(1.) * (1. + x[0]))
                .unwrap(),
        );
        let mut kwargs = DensityKwargs::new();
        kwargs.insert("scale".to_string(), 2.);
        process.set_density_kwargs(kwargs).unwrap();

        let mut bad = DensityKwargs::new();
        bad.insert("scale".to_string(), f64::INFINITY);
        assert!(matches!(
            process.set_density_kwargs(bad),
            Err(PointProcessError::InvalidDensityKwargs(_))
        ));
    }

    #[test]
    fn test_display() {
        let process =
            SpatialPointProcess::new(Density::continuous(2, |_, _| 1.).unwrap());
        assert_eq!(
            "Spatial point process with specified density function in 2-dimensional space",
            process.to_string()
        );
    }
}

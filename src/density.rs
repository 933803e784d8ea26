use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::bounds::Bounds;
use crate::errors::{PointProcessError, Result};
use log::{debug, warn};
use ndarray::{Array1, ArrayD, ArrayView1, ArrayView2, IxDyn, Zip};
use ndarray_stats::QuantileExt;

/// Keyword-style parameters forwarded to a continuous density function
/// on every evaluation.
pub type DensityKwargs = HashMap<String, f64>;

/// Signature of a continuous density: point coordinates and keyword
/// parameters to a nonnegative scalar.
pub type DensityFn = dyn Fn(&ArrayView1<f64>, &DensityKwargs) -> f64 + Send + Sync;

/// Maximum number of density evaluations per maximum search start.
const LMAX_MAXEVAL: usize = 200;
/// Relative objective tolerance stopping the maximum search.
const LMAX_FTOL_REL: f64 = 1e-4;

/// Continuous density representation: a function over a bounded region.
#[derive(Clone)]
pub struct ContinuousDensity {
    fun: Arc<DensityFn>,
    ndim: usize,
    kwargs: DensityKwargs,
}

impl fmt::Debug for ContinuousDensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContinuousDensity")
            .field("ndim", &self.ndim)
            .field("kwargs", &self.kwargs)
            .finish()
    }
}

impl ContinuousDensity {
    /// Density value at a single point
    pub fn evaluate_single(&self, x: &ArrayView1<f64>) -> f64 {
        (self.fun)(x, &self.kwargs)
    }

    /// Density values at a batch of points given as the rows of a (ns, nx) matrix
    pub fn evaluate(&self, points: &ArrayView2<f64>) -> Array1<f64> {
        let mut values = Array1::zeros(points.nrows());
        Zip::from(&mut values)
            .and(points.rows())
            .for_each(|v, x| *v = self.evaluate_single(&x));
        values
    }

    /// Keyword parameters forwarded to the density function
    pub fn kwargs(&self) -> &DensityKwargs {
        &self.kwargs
    }

    /// Estimates the density maximum over `bounds` by minimizing the negated
    /// density with Cobyla from each given start point.
    ///
    /// The returned value is the density evaluated at the best minimizer
    /// found. Being a local search, it may underestimate the true maximum of
    /// a multimodal density; extra start points mitigate this.
    pub fn max_estimate(&self, bounds: &Bounds, starts: &[Array1<f64>]) -> f64 {
        use cobyla::{minimize, Func, RhoBeg, StopTols};

        let pairs = bounds.as_pairs();
        let cons: Vec<&dyn Func<()>> = vec![];
        // Initial step sized to the narrowest bound interval
        let rhobeg = pairs
            .iter()
            .map(|(lo, up)| up - lo)
            .fold(f64::INFINITY, f64::min)
            / 4.;

        let mut best_x = bounds.midpoint();
        let mut best_neg = f64::INFINITY;
        for x0 in starts {
            let x0 = x0.to_vec();
            let (x_opt, neg) = match minimize(
                |x, _: &mut ()| -self.evaluate_single(&ArrayView1::from(x)),
                &x0,
                &pairs,
                &cons,
                (),
                LMAX_MAXEVAL,
                RhoBeg::All(rhobeg),
                Some(StopTols {
                    ftol_rel: LMAX_FTOL_REL,
                    ..StopTols::default()
                }),
            ) {
                Ok((_, x_opt, fval)) => (x_opt, fval),
                Err((status, x_opt, fval)) => {
                    warn!("Cobyla maximum search ended with status={status:?}");
                    (x_opt, fval)
                }
            };
            let neg = if f64::is_nan(neg) { f64::INFINITY } else { neg };
            if neg < best_neg {
                best_neg = neg;
                best_x = Array1::from(x_opt);
            }
        }
        debug!("Density maximizer estimated at x={best_x}");
        self.evaluate_single(&best_x.view())
    }
}

/// Discrete density representation: a d-dimensional grid of nonnegative
/// weights, one per cell, addressed by integer indices.
#[derive(Clone, Debug)]
pub struct DiscreteDensity {
    weights: ArrayD<f64>,
}

impl DiscreteDensity {
    /// The weight grid
    pub fn weights(&self) -> &ArrayD<f64> {
        &self.weights
    }

    /// Grid axis lengths
    pub fn shape(&self) -> &[usize] {
        self.weights.shape()
    }

    /// Weight of the cell addressed by the (integer valued) coordinates of x
    pub fn evaluate_single(&self, x: &ArrayView1<f64>) -> f64 {
        self.weights[Self::index_of(x)]
    }

    /// Weights of the cells addressed by the rows of a (ns, nx) matrix
    pub fn evaluate(&self, points: &ArrayView2<f64>) -> Array1<f64> {
        points
            .rows()
            .into_iter()
            .map(|x| self.evaluate_single(&x))
            .collect()
    }

    /// The maximum weight entry, the exact upper bound of the grid
    pub fn max_weight(&self) -> Result<f64> {
        self.weights.max().copied().map_err(|_| {
            PointProcessError::InvalidDensity(
                "discrete weights maximum is undefined (NaN entries)".to_string(),
            )
        })
    }

    /// Converts integer valued coordinates to a grid index
    pub(crate) fn index_of(x: &ArrayView1<f64>) -> IxDyn {
        IxDyn(&x.iter().map(|&v| v as usize).collect::<Vec<_>>())
    }
}

/// Target density of a spatial point process.
///
/// Either a continuous function over a bounded region or a discrete grid of
/// cell weights, both exposing evaluation and maximum estimation so the
/// thinning sampler can treat them uniformly.
///
/// ```
/// use ndarray::array;
/// use point_process::Density;
///
/// let ramp = Density::continuous(1, |x, _| x[0]).unwrap();
/// assert!(ramp.is_continuous());
///
/// let grid = Density::discrete(array![1., 3., 2.].into_dyn()).unwrap();
/// assert_eq!(grid.ndim(), 1);
/// ```
#[derive(Clone, Debug)]
pub enum Density {
    /// A continuous density function over a bounded region
    Continuous(ContinuousDensity),
    /// A discrete grid of cell weights
    Discrete(DiscreteDensity),
}

impl Density {
    /// Builds a continuous density from its dimension and function.
    ///
    /// The function must be nonnegative over the sampling region; this is a
    /// caller obligation and is not checked. A density that is negative
    /// somewhere in the region, or zero everywhere, yields nonsensical
    /// acceptance decisions or a [`PointProcessError::DegenerateDensity`]
    /// failure.
    pub fn continuous<F>(ndim: usize, fun: F) -> Result<Self>
    where
        F: Fn(&ArrayView1<f64>, &DensityKwargs) -> f64 + Send + Sync + 'static,
    {
        Self::continuous_with_kwargs(ndim, fun, DensityKwargs::new())
    }

    /// Builds a continuous density with keyword parameters forwarded to
    /// every evaluation.
    pub fn continuous_with_kwargs<F>(ndim: usize, fun: F, kwargs: DensityKwargs) -> Result<Self>
    where
        F: Fn(&ArrayView1<f64>, &DensityKwargs) -> f64 + Send + Sync + 'static,
    {
        if ndim == 0 {
            return Err(PointProcessError::InvalidDensity(
                "a continuous density must take at least one coordinate".to_string(),
            ));
        }
        check_kwargs(&kwargs)?;
        Ok(Density::Continuous(ContinuousDensity {
            fun: Arc::new(fun),
            ndim,
            kwargs,
        }))
    }

    /// Builds a discrete density from a d-dimensional weight grid.
    ///
    /// Weights must be nonnegative; this is a caller obligation and is not
    /// checked beyond requiring at least one cell.
    pub fn discrete(weights: ArrayD<f64>) -> Result<Self> {
        if weights.is_empty() {
            return Err(PointProcessError::InvalidDensity(
                "a discrete density needs at least one weight cell".to_string(),
            ));
        }
        Ok(Density::Discrete(DiscreteDensity { weights }))
    }

    /// Whether the density is represented by a function rather than a grid
    pub fn is_continuous(&self) -> bool {
        matches!(self, Density::Continuous(_))
    }

    /// Number of dimensions of a sample point: the declared function arity
    /// for a continuous density, the grid rank for a discrete one
    pub fn ndim(&self) -> usize {
        match self {
            Density::Continuous(c) => c.ndim,
            Density::Discrete(d) => d.weights.ndim(),
        }
    }

    /// Density value at a single point
    pub fn evaluate_single(&self, x: &ArrayView1<f64>) -> f64 {
        match self {
            Density::Continuous(c) => c.evaluate_single(x),
            Density::Discrete(d) => d.evaluate_single(x),
        }
    }

    /// Density values at a batch of points given as the rows of a (ns, nx) matrix
    pub fn evaluate(&self, points: &ArrayView2<f64>) -> Array1<f64> {
        match self {
            Density::Continuous(c) => c.evaluate(points),
            Density::Discrete(d) => d.evaluate(points),
        }
    }

    /// Estimates the density upper bound `lmax` used to normalize acceptance
    /// ratios.
    ///
    /// Continuous case: numerical maximum search over `bounds` from the
    /// given start points (the region midpoint at least). Discrete case: the
    /// exact maximum weight, `bounds` and `starts` being ignored.
    pub fn max_estimate(&self, bounds: Option<&Bounds>, starts: &[Array1<f64>]) -> Result<f64> {
        match self {
            Density::Continuous(c) => {
                let bounds = bounds.ok_or_else(|| {
                    PointProcessError::MissingArguments(
                        "bounds are required to bound a continuous density".to_string(),
                    )
                })?;
                Ok(c.max_estimate(bounds, starts))
            }
            Density::Discrete(d) => d.max_weight(),
        }
    }

    /// Replaces the keyword parameters of a continuous density.
    ///
    /// Fails with [`PointProcessError::InvalidDensityKwargs`] when a value is
    /// non-finite or when the density is discrete.
    pub fn set_kwargs(&mut self, kwargs: DensityKwargs) -> Result<()> {
        match self {
            Density::Continuous(c) => {
                check_kwargs(&kwargs)?;
                c.kwargs = kwargs;
                Ok(())
            }
            Density::Discrete(_) => Err(PointProcessError::InvalidDensityKwargs(
                "a discrete density takes no keyword arguments".to_string(),
            )),
        }
    }
}

fn check_kwargs(kwargs: &DensityKwargs) -> Result<()> {
    for (key, value) in kwargs {
        if !value.is_finite() {
            return Err(PointProcessError::InvalidDensityKwargs(format!(
                "kwarg {key:?} has non-finite value {value}"
            )));
        }
    }
    Ok(())
}

use crate::bounds::Bounds;
use crate::density::Density;
use crate::errors::{PointProcessError, Result};
use log::{debug, info};
use ndarray::{s, Array, Array1, Array2};
use ndarray_rand::{rand::Rng, rand::SeedableRng, rand_distr::Uniform, RandomExt};
use rand_xoshiro::Xoshiro256Plus;

/// Default number of candidate points tested per block
pub const DEFAULT_BLOCKSIZE: usize = 1000;
/// Default number of candidate blocks consumed before `sample` gives up
pub const DEFAULT_MAX_BLOCKS: usize = 10_000;

/// Rejection ("thinning") sampler.
///
/// Candidates are drawn uniformly over the sampling region in blocks and
/// each one is accepted with probability `density(candidate) / lmax`, where
/// `lmax` is an upper bound on the density estimated once per call. The
/// loop runs until the requested number of points is accepted or the block
/// budget is exhausted.
///
/// ```
/// use ndarray::arr2;
/// use ndarray_rand::rand::SeedableRng;
/// use point_process::{Bounds, Density, Thinning};
/// use rand_xoshiro::Xoshiro256Plus;
///
/// let density = Density::continuous(2, |x, _| 1. + x[0] * x[1]).unwrap();
/// let bounds = Bounds::new(&arr2(&[[0., 1.], [0., 1.]]));
/// let points = Thinning::with_rng(Xoshiro256Plus::seed_from_u64(42))
///     .sample(&density, Some(&bounds), 50)
///     .unwrap();
/// assert_eq!(points.dim(), (50, 2));
/// ```
pub struct Thinning<R: Rng> {
    blocksize: usize,
    max_blocks: usize,
    n_starts: usize,
    rng: R,
}

impl Thinning<Xoshiro256Plus> {
    /// Constructor with an entropy-seeded random generator
    pub fn new() -> Self {
        Self::with_rng(Xoshiro256Plus::from_entropy())
    }
}

impl Default for Thinning<Xoshiro256Plus> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> Thinning<R> {
    /// Constructor with a caller-supplied random generator for reproducibility
    pub fn with_rng(rng: R) -> Self {
        Thinning {
            blocksize: DEFAULT_BLOCKSIZE,
            max_blocks: DEFAULT_MAX_BLOCKS,
            n_starts: 1,
            rng,
        }
    }

    /// Sets the number of candidates tested per block (default 1000)
    pub fn blocksize(mut self, blocksize: usize) -> Self {
        self.blocksize = blocksize;
        self
    }

    /// Sets the block budget after which sampling fails (default 10000)
    pub fn max_blocks(mut self, max_blocks: usize) -> Self {
        self.max_blocks = max_blocks;
        self
    }

    /// Sets the number of start points of the continuous density maximum
    /// search (default 1, the region midpoint; extra starts are drawn
    /// uniformly within the bounds)
    pub fn n_starts(mut self, n_starts: usize) -> Self {
        self.n_starts = n_starts;
        self
    }

    /// Draws `n` points distributed proportionally to `density`.
    ///
    /// A continuous density is sampled within `bounds`, whose dimension must
    /// match the density arity. A discrete density is sampled over its own
    /// grid index ranges, `bounds` being optional and only checked for rank
    /// agreement when supplied; accepted points then hold integer valued
    /// coordinates.
    ///
    /// Returns an (n, nx) matrix whose rows are the accepted points in
    /// acceptance order.
    pub fn sample(
        &mut self,
        density: &Density,
        bounds: Option<&Bounds>,
        n: usize,
    ) -> Result<Array2<f64>> {
        if n == 0 {
            return Err(PointProcessError::MissingArguments(
                "n must be a positive integer".to_string(),
            ));
        }
        if self.blocksize == 0 {
            return Err(PointProcessError::MissingArguments(
                "blocksize must be a positive integer".to_string(),
            ));
        }
        if density.is_continuous() && bounds.is_none() {
            return Err(PointProcessError::MissingArguments(
                "bounds are required for a continuous density".to_string(),
            ));
        }
        let ndim = density.ndim();
        if let Some(b) = bounds {
            if b.ndim() != ndim {
                return Err(PointProcessError::ShapeMismatch {
                    expected: ndim,
                    actual: b.ndim(),
                });
            }
        }

        let starts = self.maximum_search_starts(density, bounds);
        let lmax = density.max_estimate(bounds, &starts)?;
        if !lmax.is_finite() || lmax <= 0. {
            return Err(PointProcessError::DegenerateDensity { lmax });
        }
        info!("Thinning {n} point(s) in {ndim} dimension(s) with lmax={lmax}");

        // Discrete acceptance ratios are a single grid lookup per candidate
        let criteria = match density {
            Density::Discrete(d) => Some(d.weights() / lmax),
            Density::Continuous(_) => None,
        };

        let mut accepted: Vec<f64> = Vec::with_capacity(n * ndim);
        let mut count = 0;
        let mut blocks = 0;
        while count < n && blocks < self.max_blocks {
            let candidates = self.candidate_block(density, bounds);
            let thresholds =
                Array::random_using(self.blocksize, Uniform::new(0., 1.), &mut self.rng);
            let ratios: Array1<f64> = match &criteria {
                Some(grid) => candidates
                    .rows()
                    .into_iter()
                    .map(|x| grid[crate::density::DiscreteDensity::index_of(&x)])
                    .collect(),
                None => density.evaluate(&candidates.view()).mapv(|v| v / lmax),
            };
            let before = count;
            for (i, x) in candidates.rows().into_iter().enumerate() {
                if thresholds[i] < ratios[i] {
                    accepted.extend(x.iter());
                    count += 1;
                }
            }
            blocks += 1;
            debug!(
                "block {blocks}: accepted {}/{} ({count}/{n})",
                count - before,
                self.blocksize
            );
        }
        if count < n {
            return Err(PointProcessError::SamplingBudgetExceeded {
                target: n,
                accepted: count,
                blocks,
                lmax,
            });
        }
        accepted.truncate(n * ndim);
        Ok(Array2::from_shape_vec((n, ndim), accepted).unwrap())
    }

    /// One block of uniform candidates over the sampling support, one row
    /// per candidate
    fn candidate_block(&mut self, density: &Density, bounds: Option<&Bounds>) -> Array2<f64> {
        match density {
            Density::Continuous(_) => {
                let b = bounds.expect("bounds checked before sampling");
                let lower = b.lower();
                let scaler = &b.upper() - &lower;
                let block = Array::random_using(
                    (self.blocksize, b.ndim()),
                    Uniform::new(0., 1.),
                    &mut self.rng,
                );
                block * scaler + lower
            }
            Density::Discrete(d) => {
                let shape = d.shape().to_vec();
                let mut block = Array2::zeros((self.blocksize, shape.len()));
                for (j, &len) in shape.iter().enumerate() {
                    let indices =
                        Array::random_using(self.blocksize, Uniform::new(0, len), &mut self.rng);
                    block
                        .slice_mut(s![.., j])
                        .assign(&indices.mapv(|v| v as f64));
                }
                block
            }
        }
    }

    /// Start points of the continuous density maximum search: the region
    /// midpoint, plus uniformly drawn extra starts when `n_starts > 1`
    fn maximum_search_starts(
        &mut self,
        density: &Density,
        bounds: Option<&Bounds>,
    ) -> Vec<Array1<f64>> {
        match bounds {
            Some(b) if density.is_continuous() => {
                let mut starts = vec![b.midpoint()];
                let lower = b.lower();
                let scaler = &b.upper() - &lower;
                for _ in 1..self.n_starts {
                    let norm =
                        Array::random_using(b.ndim(), Uniform::new(0., 1.), &mut self.rng);
                    starts.push(norm * &scaler + &lower);
                }
                starts
            }
            _ => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr2, array};

    fn uniform_density() -> Density {
        Density::continuous(1, |_, _| 1.).unwrap()
    }

    #[test]
    fn test_exact_count_within_bounds() {
        let density = Density::continuous(2, |x, _| 1. + x[0] + x[1]).unwrap();
        let bounds = Bounds::new(&arr2(&[[5., 10.], [0., 1.]]));
        let points = Thinning::with_rng(Xoshiro256Plus::seed_from_u64(42))
            .sample(&density, Some(&bounds), 500)
            .unwrap();
        assert_eq!((500, 2), points.dim());
        for x in points.rows() {
            assert!(bounds.contains(&x));
        }
    }

    #[test]
    fn test_uniform_density_goodness_of_fit() {
        // Chi-square test over 20 equiprobable bins, alpha = 0.001:
        // reject uniformity when the statistic exceeds 43.82 (df = 19)
        let bounds = Bounds::new(&arr2(&[[0., 1.]]));
        let points = Thinning::with_rng(Xoshiro256Plus::seed_from_u64(7))
            .sample(&uniform_density(), Some(&bounds), 10_000)
            .unwrap();
        let nbins = 20;
        let mut counts = vec![0usize; nbins];
        for x in points.rows() {
            let bin = ((x[0] * nbins as f64) as usize).min(nbins - 1);
            counts[bin] += 1;
        }
        let expected = 10_000. / nbins as f64;
        let chi2: f64 = counts
            .iter()
            .map(|&c| (c as f64 - expected).powi(2) / expected)
            .sum();
        assert!(chi2 < 43.82, "chi2 statistic too large: {chi2}");
    }

    #[test]
    fn test_discrete_zero_cells_never_accepted() {
        let density = Density::discrete(array![1., 0., 0., 0.].into_dyn()).unwrap();
        let points = Thinning::with_rng(Xoshiro256Plus::seed_from_u64(42))
            .blocksize(100)
            .sample(&density, None, 200)
            .unwrap();
        assert_eq!((200, 1), points.dim());
        assert!(points.iter().all(|&v| v == 0.));
    }

    #[test]
    fn test_discrete_two_dim_indices_in_range() {
        let density =
            Density::discrete(arr2(&[[1., 2., 3.], [4., 5., 6.]]).into_dyn()).unwrap();
        let points = Thinning::with_rng(Xoshiro256Plus::seed_from_u64(0))
            .sample(&density, None, 300)
            .unwrap();
        assert_eq!((300, 2), points.dim());
        for x in points.rows() {
            assert!(x[0] == x[0].trunc() && (0.0..2.).contains(&x[0]));
            assert!(x[1] == x[1].trunc() && (0.0..3.).contains(&x[1]));
        }
    }

    #[test]
    fn test_seeded_sampling_is_reproducible() {
        let density = Density::continuous(1, |x, _| (-x[0] * x[0]).exp()).unwrap();
        let bounds = Bounds::new(&arr2(&[[-2., 2.]]));
        let first = Thinning::with_rng(Xoshiro256Plus::seed_from_u64(42))
            .sample(&density, Some(&bounds), 100)
            .unwrap();
        let second = Thinning::with_rng(Xoshiro256Plus::seed_from_u64(42))
            .sample(&density, Some(&bounds), 100)
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_density_is_degenerate() {
        let density = Density::continuous(1, |_, _| 0.).unwrap();
        let bounds = Bounds::new(&arr2(&[[0., 1.]]));
        let res = Thinning::with_rng(Xoshiro256Plus::seed_from_u64(42)).sample(
            &density,
            Some(&bounds),
            10,
        );
        assert!(matches!(
            res,
            Err(PointProcessError::DegenerateDensity { lmax }) if lmax == 0.
        ));
    }

    #[test]
    fn test_zero_grid_is_degenerate() {
        let density = Density::discrete(array![0., 0., 0.].into_dyn()).unwrap();
        let res = Thinning::with_rng(Xoshiro256Plus::seed_from_u64(42)).sample(&density, None, 10);
        assert!(matches!(
            res,
            Err(PointProcessError::DegenerateDensity { lmax }) if lmax == 0.
        ));
    }

    #[test]
    fn test_budget_exceeded_reports_progress() {
        let density = Density::discrete(array![1., 0., 0., 0.].into_dyn()).unwrap();
        let res = Thinning::with_rng(Xoshiro256Plus::seed_from_u64(42))
            .blocksize(10)
            .max_blocks(1)
            .sample(&density, None, 100);
        match res {
            Err(PointProcessError::SamplingBudgetExceeded {
                target,
                accepted,
                blocks,
                lmax,
            }) => {
                assert_eq!(100, target);
                assert!(accepted <= 10);
                assert_eq!(1, blocks);
                assert_eq!(1., lmax);
            }
            other => panic!("expected SamplingBudgetExceeded, got {other:?}"),
        }
    }

    #[test]
    fn test_shape_mismatch_detected_upfront() {
        let density = Density::continuous(2, |x, _| x[0] + x[1]).unwrap();
        let bounds = Bounds::new(&arr2(&[[0., 1.]]));
        let res = Thinning::with_rng(Xoshiro256Plus::seed_from_u64(42)).sample(
            &density,
            Some(&bounds),
            10,
        );
        assert!(matches!(
            res,
            Err(PointProcessError::ShapeMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_discrete_bounds_rank_checked() {
        let density = Density::discrete(array![1., 2.].into_dyn()).unwrap();
        let bounds = Bounds::new(&arr2(&[[0., 1.], [0., 1.]]));
        let res = Thinning::with_rng(Xoshiro256Plus::seed_from_u64(42)).sample(
            &density,
            Some(&bounds),
            10,
        );
        assert!(matches!(
            res,
            Err(PointProcessError::ShapeMismatch {
                expected: 1,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_missing_bounds_for_continuous() {
        let res =
            Thinning::with_rng(Xoshiro256Plus::seed_from_u64(42)).sample(&uniform_density(), None, 10);
        assert!(matches!(
            res,
            Err(PointProcessError::MissingArguments(_))
        ));
    }

    #[test]
    fn test_single_point_single_candidate_block() {
        let bounds = Bounds::new(&arr2(&[[0., 1.]]));
        let points = Thinning::with_rng(Xoshiro256Plus::seed_from_u64(42))
            .blocksize(1)
            .sample(&uniform_density(), Some(&bounds), 1)
            .unwrap();
        assert_eq!((1, 1), points.dim());
        assert!(bounds.contains(&points.row(0)));
    }

    #[test]
    fn test_multi_start_maximum_search() {
        // Sharp off-center peak: extra starts must not break sampling
        let density =
            Density::continuous(1, |x, _| (-(x[0] - 0.9) * (x[0] - 0.9) / 0.002).exp()).unwrap();
        let bounds = Bounds::new(&arr2(&[[0., 1.]]));
        let points = Thinning::with_rng(Xoshiro256Plus::seed_from_u64(42))
            .n_starts(5)
            .sample(&density, Some(&bounds), 50)
            .unwrap();
        assert_eq!((50, 1), points.dim());
        for x in points.rows() {
            assert!(bounds.contains(&x));
        }
    }
}

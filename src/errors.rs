use thiserror::Error;

/// A result type for point process errors
pub type Result<T> = std::result::Result<T, PointProcessError>;

/// An error raised while building or sampling a spatial point process
#[derive(Error, Debug)]
pub enum PointProcessError {
    /// When the supplied density is not usable as a sampling target
    #[error("Invalid density: {0}")]
    InvalidDensity(String),
    /// When density keyword arguments are not usable
    #[error("Invalid density kwargs: {0}")]
    InvalidDensityKwargs(String),
    /// When a required sampling argument is absent or non-positive
    #[error("Missing arguments: {0}")]
    MissingArguments(String),
    /// When an unknown sampling algorithm is requested
    #[error("Unsupported algorithm: {0:?} (only \"thinning\" is available)")]
    UnsupportedAlgorithm(String),
    /// When the bounds dimension disagrees with the density dimension
    #[error("Shape mismatch: density has {expected} dimension(s), bounds have {actual}")]
    ShapeMismatch {
        /// Dimension expected by the density
        expected: usize,
        /// Dimension actually supplied
        actual: usize,
    },
    /// When the density upper bound estimate makes acceptance impossible
    #[error("Degenerate density: estimated upper bound lmax={lmax} is not a positive finite value")]
    DegenerateDensity {
        /// The offending upper bound estimate
        lmax: f64,
    },
    /// When the rejection loop exhausts its block budget before reaching the target count
    #[error(
        "Sampling budget exceeded: {accepted}/{target} points accepted after {blocks} block(s) with lmax={lmax}"
    )]
    SamplingBudgetExceeded {
        /// Requested number of points
        target: usize,
        /// Points accepted before giving up
        accepted: usize,
        /// Candidate blocks consumed
        blocks: usize,
        /// Upper bound used to normalize acceptance ratios
        lmax: f64,
    },
}

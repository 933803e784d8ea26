use ndarray::{Array1, Array2, ArrayBase, ArrayView1, Data, Ix2};

/// Sampling region definition as a (nx, 2) matrix.
///
/// The ith row is the `[lower_bound, upper_bound]` interval of the ith
/// coordinate of a sample point x.
#[derive(Clone, Debug, PartialEq)]
pub struct Bounds {
    limits: Array2<f64>,
}

impl Bounds {
    /// Constructor given a (nx, 2) matrix \[\[lower bound, upper bound\], ...\]
    ///
    /// ```
    /// use point_process::Bounds;
    /// use ndarray::arr2;
    ///
    /// let bounds = Bounds::new(&arr2(&[[0.0, 1.0], [5.0, 10.0]]));
    /// assert_eq!(bounds.ndim(), 2);
    /// ```
    ///
    /// **Panics** if the matrix has no row, if its number of columns is
    /// different from 2, or if a row is not a finite strictly increasing pair.
    pub fn new(limits: &ArrayBase<impl Data<Elem = f64>, Ix2>) -> Self {
        if limits.ncols() != 2 {
            panic!("bounds must have 2 columns (lower, upper)");
        }
        if limits.nrows() == 0 {
            panic!("bounds must contain at least one (lower, upper) pair");
        }
        for (i, pair) in limits.rows().into_iter().enumerate() {
            if !pair[0].is_finite() || !pair[1].is_finite() || pair[0] >= pair[1] {
                panic!(
                    "bounds row {} is not a finite increasing pair: ({}, {})",
                    i, pair[0], pair[1]
                );
            }
        }
        Bounds {
            limits: limits.to_owned(),
        }
    }

    /// Number of dimensions of the region
    pub fn ndim(&self) -> usize {
        self.limits.nrows()
    }

    /// The underlying (nx, 2) limits matrix
    pub fn limits(&self) -> &Array2<f64> {
        &self.limits
    }

    /// Lower bounds, one per dimension
    pub fn lower(&self) -> ArrayView1<f64> {
        self.limits.column(0)
    }

    /// Upper bounds, one per dimension
    pub fn upper(&self) -> ArrayView1<f64> {
        self.limits.column(1)
    }

    /// Center of the region, used to seed the density maximum search
    pub fn midpoint(&self) -> Array1<f64> {
        (&self.lower() + &self.upper()) / 2.
    }

    /// Bounds as (lower, upper) pairs, one per dimension
    pub fn as_pairs(&self) -> Vec<(f64, f64)> {
        self.limits
            .rows()
            .into_iter()
            .map(|pair| (pair[0], pair[1]))
            .collect()
    }

    /// Whether the point x lies within the region (bounds included)
    pub fn contains(&self, x: &ArrayView1<f64>) -> bool {
        x.len() == self.ndim()
            && x.iter()
                .zip(self.limits.rows())
                .all(|(&xi, pair)| pair[0] <= xi && xi <= pair[1])
    }
}

//! Distances between scaled summary statistics.

use ndarray::ArrayView1;

pub trait Distance: Send + Sync {
    /// Nonnegative distance between two statistics of equal length.
    ///
    /// Implementations may panic when the lengths differ.
    fn distance(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64;
}

/// Euclidean distance: pointwise squared differences summed along the statistic axis.
///
/// # Panics
///
/// If `a` and `b` differ in length.
#[derive(Debug, Clone, Copy, Default)]
pub struct Euclidean;

impl Distance for Euclidean {
    fn distance(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        assert_eq!(a.len(), b.len(), "statistics differ in length");
        (&a - &b).mapv(|d| d * d).sum().sqrt()
    }
}

impl<F> Distance for F
where
    F: Fn(ArrayView1<f64>, ArrayView1<f64>) -> f64 + Send + Sync,
{
    fn distance(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        self(a, b)
    }
}

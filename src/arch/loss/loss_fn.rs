use ndarray::{Array2, ArrayView2};

use crate::Result;

/// A terminal operation scoring a batch of predictions against integer class targets.
pub trait LossFn {
    /// Computes the scalar loss of `scores` (`[N, C]`) given one target class per row,
    /// caching what `backward` needs.
    fn forward(&mut self, scores: ArrayView2<f64>, targets: &[usize]) -> Result<f64>;

    /// Returns the gradient of the last computed loss with respect to its scores.
    fn backward(&mut self) -> Result<Array2<f64>>;
}

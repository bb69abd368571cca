use ndarray::{Array2, ArrayView2};

use crate::{arch::ops::Param, Result};

/// An owner of parameters that maps a batch `[N, D_in]` to `[N, D_out]`.
pub trait Layer {
    /// Returns the `(D_in, D_out)` feature dimensions of this layer.
    fn dim(&self) -> (usize, usize);

    /// Computes the output of this layer for the batch `x`, caching what `backward` needs.
    fn forward(&mut self, x: ArrayView2<f64>) -> Result<Array2<f64>>;

    /// Propagates `grad`, the gradient of the loss with respect to the last output, back
    /// through this layer.
    ///
    /// # Returns
    /// The gradient with respect to the input of the last `forward` call, and the gradients
    /// of the parameters, aligned with `parameters()`.
    fn backward(&mut self, grad: ArrayView2<f64>) -> Result<(Array2<f64>, Vec<Param>)>;

    /// The parameters of this layer in declaration order.
    fn parameters(&self) -> &[Param];

    fn parameters_mut(&mut self) -> &mut [Param];
}

use ndarray::{Array2, ArrayD, ArrayView2};

use crate::Result;

/// A trainable array: a weight matrix `[in, out]` or a bias vector `[out]`.
pub type Param = ArrayD<f64>;

/// A differentiable primitive.
///
/// Operations never own parameters. They hold handles (indices) into the parameter list of
/// the layer that owns them and receive that list on every call, so updates made by an
/// optimizer are seen on the next pass without re-wiring anything.
///
/// `forward` caches what `backward` needs; `backward` consumes that cache.
pub trait Operation {
    /// Returns the handles of the parameters this operation reads, in the same order as the
    /// gradients returned by `backward`.
    fn params(&self) -> &[usize];

    /// Evaluates the operation.
    ///
    /// # Arguments
    /// * `params` - The parameter list of the owning layer.
    /// * `x` - The input batch, `[N, D_in]`.
    ///
    /// # Returns
    /// The output batch or an error if the shapes disagree.
    fn forward(&mut self, params: &[Param], x: ArrayView2<f64>) -> Result<Array2<f64>>;

    /// Propagates `grad` back through the operation.
    ///
    /// # Arguments
    /// * `params` - The parameter list of the owning layer.
    /// * `grad` - The gradient of the loss with respect to this operation's output.
    ///
    /// # Returns
    /// The gradient with respect to the input and one gradient per handle in `params()`.
    fn backward(
        &mut self,
        params: &[Param],
        grad: ArrayView2<f64>,
    ) -> Result<(Array2<f64>, Vec<Param>)>;
}

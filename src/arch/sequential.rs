use ndarray::{Array2, ArrayView2};

use super::layers::Layer;
use crate::{MlErr, Result};

/// A sequential model: information flows forward through its layers in order.
///
/// There is no `backward` here. Whoever drives training walks `layers_mut()` in reverse,
/// feeding each layer the gradient produced by the one after it (see `Optimizer::step`).
pub struct Sequential {
    layers: Vec<Box<dyn Layer>>,
}

impl Sequential {
    /// Creates a new `Sequential`.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    ///
    /// # Returns
    /// A new `Sequential` instance, or an error if there are no layers or the output
    /// dimension of a layer differs from the input dimension of the next one.
    pub fn new<I>(layers: I) -> Result<Self>
    where
        I: IntoIterator<Item = Box<dyn Layer>>,
    {
        let layers: Vec<_> = layers.into_iter().collect();

        if layers.is_empty() {
            return Err(MlErr::InvalidLayer("a model needs at least one layer"));
        }

        for pair in layers.windows(2) {
            let (_, out) = pair[0].dim();
            let (inp, _) = pair[1].dim();

            if out != inp {
                return Err(MlErr::SizeMismatch {
                    a: "layer outputs",
                    b: "next layer inputs",
                    got: inp,
                    expected: out,
                });
            }
        }

        Ok(Self { layers })
    }

    /// Makes a forward pass through the network.
    ///
    /// # Arguments
    /// * `x` - The input batch, `[N, D_in]`.
    ///
    /// # Returns
    /// The scores of the last layer, `[N, D_out]`.
    pub fn forward(&mut self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        let (first, rest) = self
            .layers
            .split_first_mut()
            .ok_or(MlErr::InvalidLayer("a model needs at least one layer"))?;

        let mut a = first.forward(x)?;
        for layer in rest {
            a = layer.forward(a.view())?;
        }

        Ok(a)
    }

    /// Returns the `(D_in, D_out)` dimensions of the whole model.
    pub fn dim(&self) -> (usize, usize) {
        let inp = self.layers.first().map_or(0, |l| l.dim().0);
        let out = self.layers.last().map_or(0, |l| l.dim().1);
        (inp, out)
    }

    pub fn layers(&self) -> &[Box<dyn Layer>] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut [Box<dyn Layer>] {
        &mut self.layers
    }
}

use log::trace;
use ndarray::ArrayView2;

use crate::{
    arch::{layers::Layer, ops::Param},
    MlErr, Result,
};

pub trait Optimizer {
    /// Updates `params` in place given their gradient. Both have the same shape.
    fn update_params(&mut self, params: &mut Param, grad: &Param);

    /// Backpropagates `grad` through `layers` and updates every parameter.
    ///
    /// The layers are walked last to first, each one receiving the input gradient of the
    /// layer after it (`grad` for the last one). Every parameter gradient is computed before
    /// any parameter is touched, so a failing step leaves the layers unchanged.
    ///
    /// # Arguments
    /// * `layers` - The layers of the model, in forward order.
    /// * `grad` - The gradient of the loss with respect to the output of the last layer.
    fn step(&mut self, layers: &mut [Box<dyn Layer>], grad: ArrayView2<f64>) -> Result<()> {
        let mut d = grad.to_owned();
        let mut layer_grads = Vec::with_capacity(layers.len());

        for layer in layers.iter_mut().rev() {
            let (dx, grads) = layer.backward(d.view())?;
            check_grads(layer.parameters(), &grads)?;
            layer_grads.push(grads);
            d = dx;
        }

        let mut updated = 0;
        for (layer, grads) in layers.iter_mut().rev().zip(layer_grads) {
            for (param, grad) in layer.parameters_mut().iter_mut().zip(&grads) {
                self.update_params(param, grad);
                updated += 1;
            }
        }

        trace!("updated {updated} parameter arrays");
        Ok(())
    }
}

fn check_grads(params: &[Param], grads: &[Param]) -> Result<()> {
    if params.len() != grads.len() {
        return Err(MlErr::SizeMismatch {
            a: "parameter gradients",
            b: "parameters",
            got: grads.len(),
            expected: params.len(),
        });
    }

    for (param, grad) in params.iter().zip(grads) {
        if param.shape() != grad.shape() {
            return Err(MlErr::SizeMismatch {
                a: "parameter gradient",
                b: "parameter",
                got: grad.len(),
                expected: param.len(),
            });
        }
    }

    Ok(())
}

//! Finite-difference gradient checks.
//!
//! Every helper perturbs one entry at a time by `±d` and takes the centered difference of
//! the summed output, which is the gradient `backward` returns for an all-ones upstream
//! gradient. Cost is two forward passes per entry, keep the shapes small.

use ndarray::{indices, Array2, ArrayView2, Zip};

use super::{
    layers::Layer,
    loss::LossFn,
    ops::{Operation, Param},
    Sequential,
};
use crate::{MlErr, Result};

/// Numerical gradient of `sum(op.forward(params, x))` for every parameter the operation
/// references, in `op.params()` order.
pub fn op_param_grads<O: Operation + ?Sized>(
    op: &mut O,
    params: &mut [Param],
    x: ArrayView2<f64>,
    d: f64,
) -> Result<Vec<Param>> {
    let handles = op.params().to_vec();
    let mut grads = Vec::with_capacity(handles.len());

    for handle in handles {
        let len = params.len();
        let dim = params
            .get(handle)
            .ok_or(MlErr::InvalidParamHandle { handle, len })?
            .raw_dim();
        let mut grad = Param::zeros(dim.clone());

        for index in indices(dim) {
            params[handle][&index] += d;
            let fxd = op.forward(params, x)?.sum();
            params[handle][&index] -= 2. * d;
            let fxmd = op.forward(params, x)?.sum();
            params[handle][&index] += d;

            grad[&index] = (fxd - fxmd) / (2. * d);
        }

        grads.push(grad);
    }

    Ok(grads)
}

/// Numerical gradient of `sum(op.forward(params, x))` with respect to `x`.
pub fn op_input_grad<O: Operation + ?Sized>(
    op: &mut O,
    params: &[Param],
    x: ArrayView2<f64>,
    d: f64,
) -> Result<Array2<f64>> {
    input_grad(x, d, |x| op.forward(params, x))
}

/// Numerical gradient of `sum(layer.forward(x))` for every parameter of the layer, in
/// declaration order.
pub fn layer_param_grads<L: Layer + ?Sized>(
    layer: &mut L,
    x: ArrayView2<f64>,
    d: f64,
) -> Result<Vec<Param>> {
    let mut grads = Vec::with_capacity(layer.parameters().len());

    for p in 0..layer.parameters().len() {
        let dim = layer.parameters()[p].raw_dim();
        let mut grad = Param::zeros(dim.clone());

        for index in indices(dim) {
            layer.parameters_mut()[p][&index] += d;
            let fxd = layer.forward(x)?.sum();
            layer.parameters_mut()[p][&index] -= 2. * d;
            let fxmd = layer.forward(x)?.sum();
            layer.parameters_mut()[p][&index] += d;

            grad[&index] = (fxd - fxmd) / (2. * d);
        }

        grads.push(grad);
    }

    Ok(grads)
}

/// Numerical gradient of `sum(layer.forward(x))` with respect to `x`.
pub fn layer_input_grad<L: Layer + ?Sized>(
    layer: &mut L,
    x: ArrayView2<f64>,
    d: f64,
) -> Result<Array2<f64>> {
    input_grad(x, d, |x| layer.forward(x))
}

/// Numerical gradient of `sum(model.forward(x))` for every parameter of the model.
///
/// Layers are visited last to first, the order in which a backward walk produces their
/// gradients; within a layer, parameters keep their declaration order.
pub fn model_param_grads(model: &mut Sequential, x: ArrayView2<f64>, d: f64) -> Result<Vec<Param>> {
    let mut grads = Vec::new();

    for l in (0..model.layers().len()).rev() {
        for p in 0..model.layers()[l].parameters().len() {
            let dim = model.layers()[l].parameters()[p].raw_dim();
            let mut grad = Param::zeros(dim.clone());

            for index in indices(dim) {
                model.layers_mut()[l].parameters_mut()[p][&index] += d;
                let fxd = model.forward(x)?.sum();
                model.layers_mut()[l].parameters_mut()[p][&index] -= 2. * d;
                let fxmd = model.forward(x)?.sum();
                model.layers_mut()[l].parameters_mut()[p][&index] += d;

                grad[&index] = (fxd - fxmd) / (2. * d);
            }

            grads.push(grad);
        }
    }

    Ok(grads)
}

/// Numerical gradient of a scalar loss with respect to the scores.
pub fn loss_grad<L: LossFn + ?Sized>(
    loss_fn: &mut L,
    scores: ArrayView2<f64>,
    targets: &[usize],
    d: f64,
) -> Result<Array2<f64>> {
    let mut scores = scores.to_owned();
    let mut grad = Array2::zeros(scores.raw_dim());

    for index in indices(scores.raw_dim()) {
        scores[index] += d;
        let fxd = loss_fn.forward(scores.view(), targets)?;
        scores[index] -= 2. * d;
        let fxmd = loss_fn.forward(scores.view(), targets)?;
        scores[index] += d;

        grad[index] = (fxd - fxmd) / (2. * d);
    }

    Ok(grad)
}

/// Returns the largest absolute elementwise difference between two arrays of equal shape.
pub fn max_abs_diff(a: &Param, b: &Param) -> Result<f64> {
    if a.shape() != b.shape() {
        return Err(MlErr::SizeMismatch {
            a: "left array",
            b: "right array",
            got: b.len(),
            expected: a.len(),
        });
    }

    let diff = Zip::from(a)
        .and(b)
        .fold(0f64, |acc, &a, &b| acc.max((a - b).abs()));

    Ok(diff)
}

/// Asserts that two arrays have the same shape and agree elementwise within `tol`.
///
/// # Panics
/// If the shapes differ or any entry differs by `tol` or more.
pub fn assert_close(a: &Param, b: &Param, tol: f64) {
    match max_abs_diff(a, b) {
        Ok(diff) => assert!(
            diff < tol,
            "arrays differ by {diff} (tolerance {tol}):\n{a}\n{b}"
        ),
        Err(e) => panic!("{e}"),
    }
}

fn input_grad<F>(x: ArrayView2<f64>, d: f64, mut f: F) -> Result<Array2<f64>>
where
    F: FnMut(ArrayView2<f64>) -> Result<Array2<f64>>,
{
    let mut x = x.to_owned();
    let mut grad = Array2::zeros(x.raw_dim());

    for index in indices(x.raw_dim()) {
        x[index] += d;
        let fxd = f(x.view())?.sum();
        x[index] -= 2. * d;
        let fxmd = f(x.view())?.sum();
        x[index] += d;

        grad[index] = (fxd - fxmd) / (2. * d);
    }

    Ok(grad)
}

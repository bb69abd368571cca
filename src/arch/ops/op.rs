use ndarray::{Array2, ArrayView2};

use super::{BiasAddition, Operation, Param, Sigmoid, WeightMultiplication};
use crate::Result;

/// The operation primitives a layer can be composed of.
#[derive(Debug, Clone)]
pub enum Op {
    Weight(WeightMultiplication),
    Bias(BiasAddition),
    Sigmoid(Sigmoid),
}

impl Op {
    pub fn weight(handle: usize) -> Self {
        Self::Weight(WeightMultiplication::new(handle))
    }

    pub fn bias(handle: usize) -> Self {
        Self::Bias(BiasAddition::new(handle))
    }

    pub fn sigmoid() -> Self {
        Self::Sigmoid(Sigmoid::new())
    }
}

impl Operation for Op {
    fn params(&self) -> &[usize] {
        match self {
            Self::Weight(op) => op.params(),
            Self::Bias(op) => op.params(),
            Self::Sigmoid(op) => op.params(),
        }
    }

    fn forward(&mut self, params: &[Param], x: ArrayView2<f64>) -> Result<Array2<f64>> {
        match self {
            Self::Weight(op) => op.forward(params, x),
            Self::Bias(op) => op.forward(params, x),
            Self::Sigmoid(op) => op.forward(params, x),
        }
    }

    fn backward(
        &mut self,
        params: &[Param],
        grad: ArrayView2<f64>,
    ) -> Result<(Array2<f64>, Vec<Param>)> {
        match self {
            Self::Weight(op) => op.backward(params, grad),
            Self::Bias(op) => op.backward(params, grad),
            Self::Sigmoid(op) => op.backward(params, grad),
        }
    }
}

use ndarray::{Array1, Array2, ArrayView2, Ix1, Ix2};
use rand::Rng;

use super::Layer;
use crate::{
    arch::{
        init,
        ops::{Op, Operation, Param},
    },
    specs::InitSpec,
    MlErr, Result,
};

/// A layer made of a fixed sequence of operations sharing one set of parameters.
///
/// The layer is the only owner of its parameters. Each operation refers to the ones it reads
/// by index, and the handles of all operations, taken in forward order, must enumerate
/// `0..parameters.len()` exactly once. This keeps the concatenated parameter gradients of a
/// backward pass aligned with `parameters()`.
#[derive(Debug, Clone)]
pub struct Composite {
    dim: (usize, usize),
    parameters: Vec<Param>,
    operations: Vec<Op>,

    // Forward metadata
    input: Option<(usize, usize)>,
}

impl Composite {
    /// Creates a new `Composite`.
    ///
    /// # Arguments
    /// * `dim` - The `(D_in, D_out)` dimensions of the layer.
    /// * `parameters` - The parameters the layer owns.
    /// * `operations` - The operations the input goes through, in order.
    ///
    /// # Returns
    /// A new `Composite` or an error if the operations don't reference every parameter once
    /// and in declaration order.
    pub fn new(dim: (usize, usize), parameters: Vec<Param>, operations: Vec<Op>) -> Result<Self> {
        let len = parameters.len();
        let mut expected = 0;

        for &handle in operations.iter().flat_map(|op| op.params()) {
            if handle >= len {
                return Err(MlErr::InvalidParamHandle { handle, len });
            }

            if handle != expected {
                return Err(MlErr::InvalidLayer(
                    "operations must reference the parameters once and in declaration order",
                ));
            }

            expected += 1;
        }

        if expected != len {
            return Err(MlErr::InvalidLayer(
                "some parameters are not referenced by any operation",
            ));
        }

        let width = Self::output_width(dim.0, &parameters, &operations)?;
        if width != dim.1 {
            return Err(MlErr::SizeMismatch {
                a: "operation outputs",
                b: "layer outputs",
                got: width,
                expected: dim.1,
            });
        }

        Ok(Self {
            dim,
            parameters,
            operations,
            input: None,
        })
    }

    /// Follows a batch of width `inputs` through the operations, checking every parameter
    /// against the width it receives.
    ///
    /// # Returns
    /// The width of the last operation's output.
    fn output_width(inputs: usize, parameters: &[Param], operations: &[Op]) -> Result<usize> {
        let mut width = inputs;

        for op in operations {
            match op {
                Op::Weight(w) => {
                    let w = parameters[w.params()[0]].view().into_dimensionality::<Ix2>()?;
                    if w.nrows() != width {
                        return Err(MlErr::SizeMismatch {
                            a: "weight rows",
                            b: "operation inputs",
                            got: w.nrows(),
                            expected: width,
                        });
                    }

                    width = w.ncols();
                }
                Op::Bias(b) => {
                    let b = parameters[b.params()[0]].view().into_dimensionality::<Ix1>()?;
                    if b.len() != width {
                        return Err(MlErr::SizeMismatch {
                            a: "bias length",
                            b: "operation inputs",
                            got: b.len(),
                            expected: width,
                        });
                    }
                }
                Op::Sigmoid(_) => {}
            }
        }

        Ok(width)
    }

    /// Creates an affine layer `x . W + b` from the given weights and biases.
    pub fn from_params(weights: Array2<f64>, biases: Array1<f64>) -> Result<Self> {
        if weights.ncols() != biases.len() {
            return Err(MlErr::SizeMismatch {
                a: "weight columns",
                b: "bias length",
                got: biases.len(),
                expected: weights.ncols(),
            });
        }

        let dim = weights.dim();
        let parameters = vec![weights.into_dyn(), biases.into_dyn()];
        let operations = vec![Op::weight(0), Op::bias(1)];

        Self::new(dim, parameters, operations)
    }

    /// Creates an affine layer with weights sampled after `init` and zeroed biases.
    pub fn linear<R: Rng + ?Sized>(dim: (usize, usize), init: InitSpec, rng: &mut R) -> Result<Self> {
        let weights = init::weights(init, dim, rng)?;
        Self::from_params(weights, Array1::zeros(dim.1))
    }

    /// Creates an affine layer followed by a sigmoid.
    pub fn linear_sigmoid<R: Rng + ?Sized>(
        dim: (usize, usize),
        init: InitSpec,
        rng: &mut R,
    ) -> Result<Self> {
        Ok(Self::linear(dim, init, rng)?.with_sigmoid())
    }

    /// Creates a parameterless layer applying a sigmoid to `dim` features.
    pub fn sigmoid(dim: usize) -> Self {
        Self {
            dim: (dim, dim),
            parameters: vec![],
            operations: vec![Op::sigmoid()],
            input: None,
        }
    }

    /// Appends a sigmoid to the operations of this layer.
    pub fn with_sigmoid(mut self) -> Self {
        self.operations.push(Op::sigmoid());
        self
    }
}

impl Layer for Composite {
    fn dim(&self) -> (usize, usize) {
        self.dim
    }

    fn forward(&mut self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        self.input = None;

        if x.ncols() != self.dim.0 {
            return Err(MlErr::SizeMismatch {
                a: "input columns",
                b: "layer inputs",
                got: x.ncols(),
                expected: self.dim.0,
            });
        }

        let mut a = x.to_owned();
        for op in self.operations.iter_mut() {
            a = op.forward(&self.parameters, a.view())?;
        }

        self.input = Some(x.dim());
        Ok(a)
    }

    fn backward(&mut self, grad: ArrayView2<f64>) -> Result<(Array2<f64>, Vec<Param>)> {
        let (rows, _) = self
            .input
            .ok_or(MlErr::MissingForward { what: "layer" })?;

        if grad.dim() != (rows, self.dim.1) {
            return Err(MlErr::SizeMismatch {
                a: "gradient",
                b: "layer output",
                got: grad.len(),
                expected: rows * self.dim.1,
            });
        }

        let mut d = grad.to_owned();
        let mut op_grads = Vec::with_capacity(self.operations.len());

        for op in self.operations.iter_mut().rev() {
            let (dx, grads) = op.backward(&self.parameters, d.view())?;
            op_grads.push(grads);
            d = dx;
        }

        self.input = None;
        let param_grads = op_grads.into_iter().rev().flatten().collect();

        Ok((d, param_grads))
    }

    fn parameters(&self) -> &[Param] {
        &self.parameters
    }

    fn parameters_mut(&mut self) -> &mut [Param] {
        &mut self.parameters
    }
}

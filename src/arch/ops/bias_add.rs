use ndarray::{Array2, ArrayView1, ArrayView2, Axis, Ix1};

use super::{lookup, Operation, Param};
use crate::{MlErr, Result};

/// Adds a bias vector `[D]` to every row of an `[N, D]` batch.
#[derive(Debug, Clone)]
pub struct BiasAddition {
    bias: [usize; 1],

    // Forward metadata, only the input shape is needed to differentiate a sum.
    dim: Option<(usize, usize)>,
}

impl BiasAddition {
    /// Creates a new `BiasAddition`.
    ///
    /// # Arguments
    /// * `bias` - The handle of the `[D]` bias vector.
    pub fn new(bias: usize) -> Self {
        Self {
            bias: [bias],
            dim: None,
        }
    }

    fn view_bias<'a>(&self, params: &'a [Param]) -> Result<ArrayView1<'a, f64>> {
        let b = lookup(params, self.bias[0])?;
        Ok(b.view().into_dimensionality::<Ix1>()?)
    }
}

impl Operation for BiasAddition {
    fn params(&self) -> &[usize] {
        &self.bias
    }

    fn forward(&mut self, params: &[Param], x: ArrayView2<f64>) -> Result<Array2<f64>> {
        let b = self.view_bias(params)?;

        if x.ncols() != b.len() {
            return Err(MlErr::SizeMismatch {
                a: "input columns",
                b: "bias length",
                got: x.ncols(),
                expected: b.len(),
            });
        }

        let mut z = x.to_owned();
        z += &b;

        self.dim = Some(x.dim());
        Ok(z)
    }

    fn backward(
        &mut self,
        params: &[Param],
        grad: ArrayView2<f64>,
    ) -> Result<(Array2<f64>, Vec<Param>)> {
        self.view_bias(params)?;
        let dim = self.dim.ok_or(MlErr::MissingForward {
            what: "bias addition",
        })?;

        if grad.dim() != dim {
            return Err(MlErr::SizeMismatch {
                a: "gradient",
                b: "input",
                got: grad.len(),
                expected: dim.0 * dim.1,
            });
        }

        // The bias is broadcast over the batch, so its gradient sums over it.
        let db = grad.sum_axis(Axis(0));
        self.dim = None;

        Ok((grad.to_owned(), vec![db.into_dyn()]))
    }
}

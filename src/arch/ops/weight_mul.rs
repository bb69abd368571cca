use ndarray::{Array2, ArrayView2, Ix2};

use super::{lookup, Operation, Param};
use crate::{MlErr, Result};

/// Multiplies the input by a weight matrix: `x . W`.
#[derive(Debug, Clone)]
pub struct WeightMultiplication {
    weight: [usize; 1],

    // Forward metadata
    x: Option<Array2<f64>>,
}

impl WeightMultiplication {
    /// Creates a new `WeightMultiplication`.
    ///
    /// # Arguments
    /// * `weight` - The handle of the `[D_in, D_out]` weight matrix.
    pub fn new(weight: usize) -> Self {
        Self {
            weight: [weight],
            x: None,
        }
    }

    fn view_weight<'a>(&self, params: &'a [Param]) -> Result<ArrayView2<'a, f64>> {
        let w = lookup(params, self.weight[0])?;
        Ok(w.view().into_dimensionality::<Ix2>()?)
    }
}

impl Operation for WeightMultiplication {
    fn params(&self) -> &[usize] {
        &self.weight
    }

    fn forward(&mut self, params: &[Param], x: ArrayView2<f64>) -> Result<Array2<f64>> {
        let w = self.view_weight(params)?;

        if x.ncols() != w.nrows() {
            return Err(MlErr::SizeMismatch {
                a: "input columns",
                b: "weight rows",
                got: x.ncols(),
                expected: w.nrows(),
            });
        }

        let s = x.dot(&w);
        self.x = Some(x.to_owned());
        Ok(s)
    }

    fn backward(
        &mut self,
        params: &[Param],
        grad: ArrayView2<f64>,
    ) -> Result<(Array2<f64>, Vec<Param>)> {
        let w = self.view_weight(params)?;
        let x = self.x.as_ref().ok_or(MlErr::MissingForward {
            what: "weight multiplication",
        })?;

        if grad.nrows() != x.nrows() {
            return Err(MlErr::SizeMismatch {
                a: "gradient rows",
                b: "input rows",
                got: grad.nrows(),
                expected: x.nrows(),
            });
        }

        if grad.ncols() != w.ncols() {
            return Err(MlErr::SizeMismatch {
                a: "gradient columns",
                b: "weight columns",
                got: grad.ncols(),
                expected: w.ncols(),
            });
        }

        let dx = grad.dot(&w.t());
        let dw = x.t().dot(&grad);
        self.x = None;

        Ok((dx, vec![dw.into_dyn()]))
    }
}

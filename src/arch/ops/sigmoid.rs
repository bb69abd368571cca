use ndarray::{Array2, ArrayView2};

use super::{Operation, Param};
use crate::{MlErr, Result};

/// Elementwise logistic function.
#[derive(Debug, Clone, Default)]
pub struct Sigmoid {
    a: Option<Array2<f64>>,
}

impl Sigmoid {
    pub fn new() -> Self {
        Self::default()
    }

    fn sigmoid(z: f64) -> f64 {
        1. / (1. + (-z).exp())
    }
}

impl Operation for Sigmoid {
    fn params(&self) -> &[usize] {
        &[]
    }

    fn forward(&mut self, _params: &[Param], z: ArrayView2<f64>) -> Result<Array2<f64>> {
        let a = z.mapv(Self::sigmoid);

        // The derivative only needs the output: s' = s * (1 - s).
        self.a = Some(a.clone());
        Ok(a)
    }

    fn backward(
        &mut self,
        _params: &[Param],
        grad: ArrayView2<f64>,
    ) -> Result<(Array2<f64>, Vec<Param>)> {
        let a = self.a.as_ref().ok_or(MlErr::MissingForward { what: "sigmoid" })?;

        if grad.dim() != a.dim() {
            return Err(MlErr::SizeMismatch {
                a: "gradient",
                b: "activation",
                got: grad.len(),
                expected: a.len(),
            });
        }

        let mut d = grad.to_owned();
        d.zip_mut_with(a, |d, &a| *d *= a * (1. - a));
        self.a = None;

        Ok((d, vec![]))
    }
}

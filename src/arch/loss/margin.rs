use ndarray::{Array2, ArrayView2, Zip};

use super::LossFn;
use crate::{MlErr, Result};

/// Multi-class hinge loss.
///
/// For every row `i` and every wrong class `j`, `margin_ij = max(0, x_ij - x_iy + margin)`.
/// The loss is the sum of a row's margins, averaged over the batch. Only strictly positive
/// margins contribute to the gradient.
#[derive(Debug, Clone)]
pub struct MarginLoss {
    margin: f64,

    // Forward metadata
    cache: Option<Cache>,
}

#[derive(Debug, Clone)]
struct Cache {
    margins: Array2<f64>,
    targets: Vec<usize>,
}

impl Default for MarginLoss {
    fn default() -> Self {
        Self::with_margin(1.)
    }
}

impl MarginLoss {
    /// Returns a new `MarginLoss` with a margin of 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new `MarginLoss` with a custom margin.
    pub fn with_margin(margin: f64) -> Self {
        Self {
            margin,
            cache: None,
        }
    }

    pub fn margin(&self) -> f64 {
        self.margin
    }

    fn validate(scores: ArrayView2<f64>, targets: &[usize]) -> Result<()> {
        if scores.nrows() == 0 {
            return Err(MlErr::EmptyBatch);
        }

        if scores.nrows() != targets.len() {
            return Err(MlErr::SizeMismatch {
                a: "score rows",
                b: "targets",
                got: targets.len(),
                expected: scores.nrows(),
            });
        }

        let classes = scores.ncols();
        match targets.iter().position(|&t| t >= classes) {
            Some(row) => Err(MlErr::TargetOutOfRange {
                row,
                target: targets[row],
                classes,
            }),
            None => Ok(()),
        }
    }
}

impl LossFn for MarginLoss {
    fn forward(&mut self, scores: ArrayView2<f64>, targets: &[usize]) -> Result<f64> {
        self.cache = None;
        Self::validate(scores, targets)?;

        let mut margins = Array2::zeros(scores.raw_dim());
        let rows = margins
            .rows_mut()
            .into_iter()
            .zip(scores.rows())
            .zip(targets);

        for ((mut margin, row), &t) in rows {
            let correct = row[t];

            Zip::from(&mut margin)
                .and(&row)
                .for_each(|m, &s| *m = (s - correct + self.margin).max(0.));

            margin[t] = 0.;
        }

        let loss = margins.sum() / scores.nrows() as f64;

        self.cache = Some(Cache {
            margins,
            targets: targets.to_vec(),
        });

        Ok(loss)
    }

    fn backward(&mut self) -> Result<Array2<f64>> {
        let Cache { margins, targets } = self
            .cache
            .take()
            .ok_or(MlErr::MissingForward { what: "margin loss" })?;

        let n = margins.nrows() as f64;
        let mut grad = margins.mapv(|m| if m > 0. { 1. } else { 0. });

        for (mut row, &t) in grad.rows_mut().into_iter().zip(&targets) {
            let active = row.sum();
            row[t] = -active;
        }

        grad /= n;
        Ok(grad)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;
    use ndarray_rand::RandomExt;
    use rand::{rngs::StdRng, SeedableRng};
    use rand_distr::Normal;

    use super::*;
    use crate::arch::gradcheck;

    fn scores() -> Array2<f64> {
        array![[3.2, 5.1, -1.7], [1.3, 4.9, 2.0], [2.2, 2.5, -3.1]]
    }

    #[test]
    fn test_forward() {
        let mut loss_fn = MarginLoss::new();
        let loss = loss_fn.forward(scores().view(), &[0, 1, 2]).unwrap();

        // (2.9 + 0 + 12.9) / 3
        assert!((loss - 5.26667).abs() < 1e-5);
    }

    #[test]
    fn test_backward() {
        let mut loss_fn = MarginLoss::new();
        loss_fn.forward(scores().view(), &[0, 1, 2]).unwrap();
        let grad = loss_fn.backward().unwrap();

        let expected = array![[-1., 1., 0.], [0., 0., 0.], [1., 1., -2.]];
        assert_eq!((grad * 3.).mapv(f64::round), expected);
    }

    #[test]
    fn test_gradient_matches_numerical() {
        let mut rng = StdRng::seed_from_u64(5);
        let dist = Normal::new(0., 2.).unwrap();
        let x = Array2::random_using((6, 4), &dist, &mut rng);
        let targets = [0, 3, 1, 1, 2, 0];
        let mut loss_fn = MarginLoss::new();

        let numerical = gradcheck::loss_grad(&mut loss_fn, x.view(), &targets, 1e-6).unwrap();
        loss_fn.forward(x.view(), &targets).unwrap();
        let analytical = loss_fn.backward().unwrap();

        assert_eq!(analytical.dim(), x.dim());
        gradcheck::assert_close(&numerical.into_dyn(), &analytical.into_dyn(), 1e-6);
    }

    #[test]
    fn test_zero_margin_is_inactive() {
        let mut loss_fn = MarginLoss::new();
        let loss = loss_fn.forward(array![[1.0, 0.0]].view(), &[0]).unwrap();
        let grad = loss_fn.backward().unwrap();

        assert_eq!(loss, 0.);
        assert_eq!(grad, array![[0., 0.]]);
    }

    #[test]
    fn test_custom_margin() {
        let mut loss_fn = MarginLoss::with_margin(0.5);
        let loss = loss_fn.forward(array![[1.0, 0.75]].view(), &[0]).unwrap();
        let grad = loss_fn.backward().unwrap();

        assert_eq!(loss, 0.25);
        assert_eq!(grad, array![[-1., 1.]]);
    }

    #[test]
    fn test_backward_before_forward_fails() {
        let mut loss_fn = MarginLoss::new();
        assert!(matches!(loss_fn.backward(), Err(MlErr::MissingForward { .. })));
    }

    #[test]
    fn test_backward_consumes_cache() {
        let mut loss_fn = MarginLoss::new();
        loss_fn.forward(scores().view(), &[0, 1, 2]).unwrap();
        loss_fn.backward().unwrap();

        assert!(matches!(loss_fn.backward(), Err(MlErr::MissingForward { .. })));
    }

    #[test]
    fn test_rejects_mismatched_targets() {
        let mut loss_fn = MarginLoss::new();
        let err = loss_fn.forward(scores().view(), &[0, 1]);

        assert!(matches!(
            err,
            Err(MlErr::SizeMismatch {
                got: 2,
                expected: 3,
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_out_of_range_targets() {
        let mut loss_fn = MarginLoss::new();
        let err = loss_fn.forward(scores().view(), &[0, 3, 2]);

        assert!(matches!(
            err,
            Err(MlErr::TargetOutOfRange {
                row: 1,
                target: 3,
                classes: 3
            })
        ));
    }

    #[test]
    fn test_rejects_empty_batch() {
        let mut loss_fn = MarginLoss::new();
        let err = loss_fn.forward(Array2::zeros((0, 3)).view(), &[]);

        assert!(matches!(err, Err(MlErr::EmptyBatch)));
    }
}

use std::num::NonZeroUsize;

use log::{debug, info};
use ndarray::{ArrayView1, ArrayView2, CowArray, Ix2};

use super::{generate_rng, ModelBuilder};
use crate::{
    arch::{
        loss::{LossFn, MarginLoss},
        Sequential,
    },
    dataset::BatchSource,
    optimization::{GradientDescent, Optimizer},
    specs::{ModelSpec, TrainConfig},
    MlErr, Result,
};

/// A model `Trainer`. Contains the components needed for training a model, including the
/// model itself.
pub struct Trainer<O, L>
where
    O: Optimizer,
    L: LossFn,
{
    model: Sequential,
    optimizer: O,
    loss_fn: L,

    epochs: NonZeroUsize,
    normalize: bool,
}

impl Trainer<GradientDescent, MarginLoss> {
    /// Builds the model described by `spec` and a gradient descent trainer for it, with a
    /// margin loss and the settings of `config`.
    pub fn from_spec(spec: &ModelSpec, config: &TrainConfig) -> Result<Self> {
        let mut rng = generate_rng(config.seed);
        let model = ModelBuilder::new().build(spec, &mut rng)?;

        Ok(Self::new(
            model,
            GradientDescent::new(config.learning_rate),
            MarginLoss::new(),
            config.epochs,
            config.normalize,
        ))
    }
}

impl<O, L> Trainer<O, L>
where
    O: Optimizer,
    L: LossFn,
{
    /// Returns a new `Trainer`.
    ///
    /// # Arguments
    /// * `model` - The model that will be trained.
    /// * `optimizer` - The update rule for the parameters of the model.
    /// * `loss_fn` - The loss function used to score the model's output against the labels.
    /// * `epochs` - The amount of passes over the data per `train` call.
    /// * `normalize` - Whether to divide every input by 255 before the forward pass.
    pub fn new(
        model: Sequential,
        optimizer: O,
        loss_fn: L,
        epochs: NonZeroUsize,
        normalize: bool,
    ) -> Self {
        Self {
            model,
            optimizer,
            loss_fn,
            epochs,
            normalize,
        }
    }

    /// Performs `epochs` epochs of training, one optimizer step per batch of `source`.
    ///
    /// # Returns
    /// The average batch loss of every epoch, or the first error raised by a step.
    pub fn train<S: BatchSource>(&mut self, source: &S) -> Result<Vec<f64>> {
        let epochs = self.epochs.get();
        let mut losses = Vec::with_capacity(epochs);

        for epoch in 0..epochs {
            let mut total = 0.;
            let mut batches = 0;

            for batch in source.batches() {
                let loss = self.step(batch.x, batch.y)?;
                debug!("epoch {epoch}, batch {batches}: loss {loss:.5}");

                total += loss;
                batches += 1;
            }

            if batches == 0 {
                return Err(MlErr::EmptySource);
            }

            let loss = total / batches as f64;
            info!("epoch {}/{epochs}: loss {loss:.5}", epoch + 1);
            losses.push(loss);
        }

        Ok(losses)
    }

    /// Returns the accuracy of the model over `source`, in percent.
    pub fn evaluate<S: BatchSource>(&mut self, source: &S) -> Result<f64> {
        evaluate(&mut self.model, source, self.normalize)
    }

    pub fn model(&self) -> &Sequential {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut Sequential {
        &mut self.model
    }

    pub fn into_model(self) -> Sequential {
        self.model
    }

    fn step(&mut self, x: ArrayView2<f64>, y: &[usize]) -> Result<f64> {
        let x = prepare(x, self.normalize);

        let scores = self.model.forward(x.view())?;
        let loss = self.loss_fn.forward(scores.view(), y)?;
        let grad = self.loss_fn.backward()?;
        self.optimizer.step(self.model.layers_mut(), grad.view())?;

        Ok(loss)
    }
}

/// Returns the percentage of samples of `source` whose highest score is their label.
///
/// # Arguments
/// * `model` - The model to evaluate.
/// * `source` - The labelled samples.
/// * `normalize` - Whether to divide every input by 255 before the forward pass.
pub fn evaluate<S: BatchSource>(model: &mut Sequential, source: &S, normalize: bool) -> Result<f64> {
    let mut correct = 0;
    let mut total = 0;

    for batch in source.batches() {
        let x = prepare(batch.x, normalize);
        let predictions = predict(model, x.view())?;

        if predictions.len() != batch.y.len() {
            return Err(MlErr::SizeMismatch {
                a: "labels",
                b: "samples",
                got: batch.y.len(),
                expected: predictions.len(),
            });
        }

        correct += predictions.iter().zip(batch.y).filter(|(p, y)| p == y).count();
        total += batch.y.len();
    }

    if total == 0 {
        return Err(MlErr::EmptySource);
    }

    let accuracy = 100. * correct as f64 / total as f64;
    info!("accuracy: {accuracy:.2}% ({correct}/{total})");
    Ok(accuracy)
}

/// Returns the class with the highest score for every row of `x`. Ties go to the lowest
/// class index.
pub fn predict(model: &mut Sequential, x: ArrayView2<f64>) -> Result<Vec<usize>> {
    let scores = model.forward(x)?;
    Ok(scores.rows().into_iter().map(argmax).collect())
}

fn argmax(row: ArrayView1<f64>) -> usize {
    row.iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(best, max), (i, &s)| {
            if s > max {
                (i, s)
            } else {
                (best, max)
            }
        })
        .0
}

fn prepare(x: ArrayView2<'_, f64>, normalize: bool) -> CowArray<'_, f64, Ix2> {
    if normalize {
        x.mapv(|v| v / 255.).into()
    } else {
        x.into()
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{array, Array1, Array2};

    use super::*;
    use crate::{
        arch::layers::{Composite, Layer},
        dataset::InMemoryDataset,
    };

    fn identity_model() -> Sequential {
        let layer = Composite::from_params(Array2::eye(3), Array1::zeros(3)).unwrap();
        Sequential::new([Box::new(layer) as Box<dyn Layer>]).unwrap()
    }

    fn batch_size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_predict_takes_argmax() {
        let mut model = identity_model();
        let x = array![[0.1, 0.9, 0.3], [2., -1., 2.], [-3., -2., -1.]];

        assert_eq!(predict(&mut model, x.view()).unwrap(), vec![1, 0, 2]);
    }

    #[test]
    fn test_evaluate() {
        let mut model = identity_model();
        let data = array![[1., 0., 0.], [0., 1., 0.], [0., 0., 1.], [1., 0., 0.]];
        let ds = InMemoryDataset::new(data, vec![0, 1, 1, 2], batch_size(3)).unwrap();

        assert_eq!(evaluate(&mut model, &ds, false).unwrap(), 50.);
    }

    #[test]
    fn test_evaluate_normalized() {
        let mut model = identity_model();
        let data = array![[255., 0., 0.]];
        let ds = InMemoryDataset::new(data, vec![0], batch_size(1)).unwrap();

        assert_eq!(evaluate(&mut model, &ds, true).unwrap(), 100.);
    }

    #[test]
    fn test_evaluate_empty_source_fails() {
        let mut model = identity_model();
        let ds = InMemoryDataset::new(Array2::zeros((0, 3)), vec![], batch_size(1)).unwrap();

        assert!(matches!(evaluate(&mut model, &ds, false), Err(MlErr::EmptySource)));
    }

    #[test]
    fn test_train_returns_one_loss_per_epoch() {
        let data = array![[1., 0., 0.], [0., 1., 0.], [0., 0., 1.]];
        let ds = InMemoryDataset::new(data, vec![2, 0, 1], batch_size(2)).unwrap();
        let epochs = NonZeroUsize::new(4).unwrap();
        let mut trainer = Trainer::new(
            identity_model(),
            GradientDescent::new(0.5),
            MarginLoss::new(),
            epochs,
            false,
        );

        let losses = trainer.train(&ds).unwrap();

        assert_eq!(losses.len(), 4);
        assert!(losses.last() < losses.first());
    }

    #[test]
    fn test_train_empty_source_fails() {
        let ds = InMemoryDataset::new(Array2::zeros((0, 3)), vec![], batch_size(1)).unwrap();
        let config = TrainConfig::new(NonZeroUsize::new(1).unwrap(), 0.1);
        let mut trainer = Trainer::from_spec(&ModelSpec::linear_classifier(3, 3), &config).unwrap();

        assert!(matches!(trainer.train(&ds), Err(MlErr::EmptySource)));
    }
}

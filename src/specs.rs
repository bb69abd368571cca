use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::Result;

/// The specification for the initial values of a weight matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitSpec {
    Const { value: f64 },
    Uniform { low: f64, high: f64 },
    Normal { mean: f64, std_dev: f64 },
    Xavier,
    Kaiming,
}

/// The specification for a `Layer`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerSpec {
    Linear { dim: (usize, usize), init: InitSpec },
    LinearSigmoid { dim: (usize, usize), init: InitSpec },
    Sigmoid { dim: usize },
}

/// The specification for a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSpec {
    Sequential { layers: Vec<LayerSpec> },
}

impl ModelSpec {
    /// A single linear layer scoring `classes` classes from `features` inputs.
    pub fn linear_classifier(features: usize, classes: usize) -> Self {
        Self::Sequential {
            layers: vec![LayerSpec::Linear {
                dim: (features, classes),
                init: InitSpec::Xavier,
            }],
        }
    }

    /// Two stacked linear layers with no nonlinearity in between.
    pub fn experimental(features: usize, hidden: usize, classes: usize) -> Self {
        Self::Sequential {
            layers: vec![
                LayerSpec::Linear {
                    dim: (features, hidden),
                    init: InitSpec::Xavier,
                },
                LayerSpec::Linear {
                    dim: (hidden, classes),
                    init: InitSpec::Xavier,
                },
            ],
        }
    }

    /// A linear layer, a sigmoid activation and a linear output layer.
    pub fn sigmoid(features: usize, hidden: usize, classes: usize) -> Self {
        Self::Sequential {
            layers: vec![
                LayerSpec::Linear {
                    dim: (features, hidden),
                    init: InitSpec::Xavier,
                },
                LayerSpec::Sigmoid { dim: hidden },
                LayerSpec::Linear {
                    dim: (hidden, classes),
                    init: InitSpec::Xavier,
                },
            ],
        }
    }
}

/// The specification for a training run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub epochs: NonZeroUsize,
    pub learning_rate: f64,
    /// Divide every input by 255 before the forward pass.
    #[serde(default)]
    pub normalize: bool,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl TrainConfig {
    /// Returns a new `TrainConfig` without normalization nor a fixed seed.
    pub fn new(epochs: NonZeroUsize, learning_rate: f64) -> Self {
        Self {
            epochs,
            learning_rate,
            normalize: false,
            seed: None,
        }
    }

    /// Parses a `TrainConfig` from its JSON representation.
    ///
    /// # Returns
    /// The parsed config or `MlErr::Config` if the document is malformed.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MlErr;

    #[test]
    fn test_train_config_from_json() {
        let json = r#"{ "epochs": 100, "learning_rate": 0.001, "normalize": true, "seed": 7 }"#;
        let config = TrainConfig::from_json(json).unwrap();

        assert_eq!(config.epochs.get(), 100);
        assert_eq!(config.learning_rate, 0.001);
        assert!(config.normalize);
        assert_eq!(config.seed, Some(7));
    }

    #[test]
    fn test_train_config_defaults() {
        let config = TrainConfig::from_json(r#"{ "epochs": 3, "learning_rate": 0.5 }"#).unwrap();

        assert_eq!(config, TrainConfig::new(NonZeroUsize::new(3).unwrap(), 0.5));
    }

    #[test]
    fn test_train_config_rejects_zero_epochs() {
        let err = TrainConfig::from_json(r#"{ "epochs": 0, "learning_rate": 0.5 }"#);
        assert!(matches!(err, Err(MlErr::Config(_))));
    }

    #[test]
    fn test_model_spec_from_json() {
        let json = r#"{
            "sequential": {
                "layers": [
                    { "linear": { "dim": [4, 3], "init": { "normal": { "mean": 0.0, "std_dev": 0.01 } } } },
                    { "sigmoid": { "dim": 3 } },
                    { "linear_sigmoid": { "dim": [3, 2], "init": "xavier" } }
                ]
            }
        }"#;
        let spec: ModelSpec = serde_json::from_str(json).unwrap();

        let ModelSpec::Sequential { layers } = spec;
        assert_eq!(
            layers,
            vec![
                LayerSpec::Linear {
                    dim: (4, 3),
                    init: InitSpec::Normal {
                        mean: 0.,
                        std_dev: 0.01
                    }
                },
                LayerSpec::Sigmoid { dim: 3 },
                LayerSpec::LinearSigmoid {
                    dim: (3, 2),
                    init: InitSpec::Xavier
                },
            ]
        );
    }
}

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    arch::{
        layers::{Composite, Layer},
        Sequential,
    },
    specs::{LayerSpec, ModelSpec},
    Result,
};

/// Builds models given a specification.
#[derive(Debug, Default, Clone, Copy)]
pub struct ModelBuilder;

impl ModelBuilder {
    /// Creates a new `ModelBuilder`.
    pub fn new() -> Self {
        Self
    }

    /// Builds a new model following a spec.
    ///
    /// # Arguments
    /// * `spec` - The specification for the model.
    /// * `rng` - The source of randomness for the initial weights.
    pub fn build<R: Rng + ?Sized>(&self, spec: &ModelSpec, rng: &mut R) -> Result<Sequential> {
        match spec {
            ModelSpec::Sequential { layers } => {
                let layers = layers
                    .iter()
                    .map(|&ls| self.resolve_layer(ls, rng))
                    .collect::<Result<Vec<_>>>()?;

                Sequential::new(layers)
            }
        }
    }

    fn resolve_layer<R: Rng + ?Sized>(&self, spec: LayerSpec, rng: &mut R) -> Result<Box<dyn Layer>> {
        let layer = match spec {
            LayerSpec::Linear { dim, init } => Composite::linear(dim, init, rng)?,
            LayerSpec::LinearSigmoid { dim, init } => Composite::linear_sigmoid(dim, init, rng)?,
            LayerSpec::Sigmoid { dim } => Composite::sigmoid(dim),
        };

        Ok(Box::new(layer))
    }
}

/// Returns a generator seeded with `seed`, or from OS entropy if there is none.
pub fn generate_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array2;

    use super::*;
    use crate::specs::InitSpec;

    #[test]
    fn test_build_presets() {
        let mut rng = generate_rng(Some(0));
        let builder = ModelBuilder::new();

        let linear = builder.build(&ModelSpec::linear_classifier(12, 10), &mut rng).unwrap();
        let experimental = builder.build(&ModelSpec::experimental(12, 7, 10), &mut rng).unwrap();
        let sigmoid = builder.build(&ModelSpec::sigmoid(12, 7, 10), &mut rng).unwrap();

        assert_eq!(linear.layers().len(), 1);
        assert_eq!(experimental.layers().len(), 2);
        assert_eq!(sigmoid.layers().len(), 3);
        assert!(sigmoid.layers()[1].parameters().is_empty());

        for mut model in [linear, experimental, sigmoid] {
            assert_eq!(model.dim(), (12, 10));
            let scores = model.forward(Array2::ones((9, 12)).view()).unwrap();
            assert_eq!(scores.dim(), (9, 10));
        }
    }

    #[test]
    fn test_same_seed_same_model() {
        let spec = ModelSpec::experimental(4, 3, 2);
        let builder = ModelBuilder::new();

        let a = builder.build(&spec, &mut generate_rng(Some(9))).unwrap();
        let b = builder.build(&spec, &mut generate_rng(Some(9))).unwrap();

        for (la, lb) in a.layers().iter().zip(b.layers()) {
            assert_eq!(la.parameters(), lb.parameters());
        }
    }

    #[test]
    fn test_build_rejects_unchained_layers() {
        let init = InitSpec::Const { value: 0. };
        let spec = ModelSpec::Sequential {
            layers: vec![
                LayerSpec::Linear { dim: (4, 3), init },
                LayerSpec::Sigmoid { dim: 2 },
            ],
        };

        let err = ModelBuilder::new().build(&spec, &mut generate_rng(Some(0)));
        assert!(err.is_err());
    }
}

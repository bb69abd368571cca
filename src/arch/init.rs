use ndarray::Array2;
use ndarray_rand::RandomExt;
use rand::Rng;
use rand_distr::{Normal, Uniform};

use crate::{specs::InitSpec, MlErr, Result};

/// Samples a `[fan_in, fan_out]` weight matrix following `spec`.
///
/// # Arguments
/// * `spec` - The distribution to sample from.
/// * `dim` - The `(fan_in, fan_out)` shape of the matrix.
/// * `rng` - A random number generator.
///
/// # Returns
/// The sampled weights or `MlErr::Init` if the distribution parameters are invalid.
pub fn weights<R: Rng + ?Sized>(
    spec: InitSpec,
    dim: (usize, usize),
    rng: &mut R,
) -> Result<Array2<f64>> {
    let (fan_in, fan_out) = dim;

    match spec {
        InitSpec::Const { value } => Ok(Array2::from_elem(dim, value)),
        InitSpec::Uniform { low, high } => {
            let uniform = Uniform::new(low, high).map_err(|e| MlErr::Init(e.to_string()))?;
            Ok(Array2::random_using(dim, uniform, rng))
        }
        InitSpec::Normal { mean, std_dev } => normal(dim, mean, std_dev, rng),
        InitSpec::Xavier => normal(dim, 0., (2. / (fan_in + fan_out) as f64).sqrt(), rng),
        InitSpec::Kaiming => normal(dim, 0., (2. / fan_in as f64).sqrt(), rng),
    }
}

fn normal<R: Rng + ?Sized>(
    dim: (usize, usize),
    mean: f64,
    std_dev: f64,
    rng: &mut R,
) -> Result<Array2<f64>> {
    let normal = Normal::new(mean, std_dev).map_err(|e| MlErr::Init(e.to_string()))?;
    Ok(Array2::random_using(dim, normal, rng))
}

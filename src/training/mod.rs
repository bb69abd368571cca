mod builder;
mod trainer;

pub use builder::{generate_rng, ModelBuilder};
pub use trainer::{evaluate, predict, Trainer};

pub mod arch;
pub mod dataset;
pub mod error;
pub mod optimization;
pub mod specs;
pub mod training;

pub use error::{MlErr, Result};

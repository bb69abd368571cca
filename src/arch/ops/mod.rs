mod bias_add;
mod op;
mod operation;
mod sigmoid;
mod weight_mul;

pub use bias_add::BiasAddition;
pub use op::Op;
pub use operation::{Operation, Param};
pub use sigmoid::Sigmoid;
pub use weight_mul::WeightMultiplication;

use crate::{MlErr, Result};

/// Resolves a parameter handle against the owner's parameter list.
fn lookup(params: &[Param], handle: usize) -> Result<&Param> {
    params.get(handle).ok_or(MlErr::InvalidParamHandle {
        handle,
        len: params.len(),
    })
}

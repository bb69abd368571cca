mod loss_fn;
mod margin;

pub use loss_fn::LossFn;
pub use margin::MarginLoss;

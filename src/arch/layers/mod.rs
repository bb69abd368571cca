mod composite;
mod layer;

pub use composite::Composite;
pub use layer::Layer;

pub mod gradcheck;
pub mod init;
pub mod layers;
pub mod loss;
pub mod ops;
mod sequential;

pub use sequential::Sequential;

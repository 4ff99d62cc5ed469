//! lmharness ABI crate: contracts shared by the registry and every model backend.

pub mod args;
pub mod batch;
pub mod device;
pub mod error;
pub mod logits;
pub mod model;
pub mod token;

pub use args::ModelArgs;
pub use batch::BatchSize;
pub use device::Device;
pub use error::{Error, Result};
pub use logits::{argmax, Logits};
pub use model::*;
pub use token::Token;

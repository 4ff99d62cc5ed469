pub mod adapter;
pub mod batch;
pub mod context;
pub mod ffi;
pub mod model;
pub mod params;
pub mod sampling;

pub use adapter::{BloomzCppLm, LlamaCppLm};
pub use model::LlamaModel;
pub use params::LlamaParams;

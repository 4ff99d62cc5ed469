//! lmharness adapters over llama.cpp.

pub mod bloomz;
pub mod llama_cpp;
pub mod native;

pub use bloomz::BloomzCppLm;
pub use llama_cpp::LlamaCppLm;
pub use native::NativeLm;

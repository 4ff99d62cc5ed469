//! Transformer causal-LM backend for lmharness.
//!
//! Loads a Hugging Face style checkpoint (local directory or Hub repo) into
//! candle and exposes it through [`lmharness_abi::LanguageModel`]. The
//! families with a candle model are listed in [`arch::SUPPORTED`].

pub mod arch;
pub mod causal;
pub mod config;
pub mod device;
pub mod weights;

pub use arch::CausalModel;
pub use causal::HfCausalLm;
pub use config::HfConfig;

//! lmharness: one evaluation interface over several language-model backends.
//!
//! Pick a backend by identifier with [`registry::load`], then drive it through
//! [`LanguageModel`]:
//!
//! ```no_run
//! use lmharness_core::{registry, LanguageModel, ModelArgs};
//!
//! let args = ModelArgs::from_arg_string("pretrained=/models/tiny-llama,device=cpu")?;
//! let mut lm = registry::load("hf", &args)?;
//! let ids = lm.encode("The capital of France is")?;
//! let eot = lm.eot_token();
//! let out = lm.generate(&ids, ids.len() + 16, Some(eot))?;
//! println!("{}", lm.decode(&out[ids.len()..])?);
//! # Ok::<(), lmharness_core::Error>(())
//! ```

pub mod dummy;
pub mod registry;

pub use dummy::DummyLm;
pub use lmharness_abi::{BatchSize, Device, Error, LanguageModel, Logits, ModelArgs, Result, Token};
pub use registry::{known_models, load, resolve, Constructor};

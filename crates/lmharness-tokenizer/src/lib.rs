//! Tokenizer and model-file plumbing shared by the lmharness backends.
//!
//! [`ModelSource`] turns a `pretrained` value (local directory or Hub repo id)
//! into files on disk; [`CanonicalTokenizer`] wraps a `tokenizer.json`.

pub mod huggingface;
pub mod source;

pub use huggingface::{CanonicalTokenizer, GPT2_HELLO, GPT2_PROBE};
pub use source::ModelSource;

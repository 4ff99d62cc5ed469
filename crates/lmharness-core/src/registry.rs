//! Static table from model identifiers to adapter constructors.

use std::collections::BTreeMap;

use hf_rs::HfCausalLm;
use llama_rs::{BloomzCppLm, LlamaCppLm};
use lmharness_abi::{Error, LanguageModel, ModelArgs, Result};
use once_cell::sync::Lazy;
use tracing::debug;

use crate::dummy::DummyLm;

/// Builds an adapter from configuration.
pub type Constructor = fn(&ModelArgs) -> Result<Box<dyn LanguageModel>>;

fn hf_causal(args: &ModelArgs) -> Result<Box<dyn LanguageModel>> {
    Ok(Box::new(HfCausalLm::new(args)?))
}

fn llama_cpp(args: &ModelArgs) -> Result<Box<dyn LanguageModel>> {
    Ok(Box::new(LlamaCppLm::new(args)?))
}

fn bloomz_cpp(args: &ModelArgs) -> Result<Box<dyn LanguageModel>> {
    Ok(Box::new(BloomzCppLm::new(args)?))
}

fn dummy(args: &ModelArgs) -> Result<Box<dyn LanguageModel>> {
    Ok(Box::new(DummyLm::new(args)))
}

static MODELS: Lazy<BTreeMap<&'static str, Constructor>> = Lazy::new(|| {
    let table: [(&'static str, Constructor); 6] = [
        ("hf", hf_causal),
        ("hf-causal", hf_causal),
        // kept for configs written before the generic name existed
        ("gpt2", hf_causal),
        (LlamaCppLm::NAME, llama_cpp),
        (BloomzCppLm::NAME, bloomz_cpp),
        (DummyLm::NAME, dummy),
    ];
    BTreeMap::from(table)
});

/// Constructor registered under `name`.
pub fn resolve(name: &str) -> Result<Constructor> {
    MODELS
        .get(name)
        .copied()
        .ok_or_else(|| Error::Lookup(name.to_string()))
}

/// Every registered identifier, sorted.
pub fn known_models() -> Vec<&'static str> {
    MODELS.keys().copied().collect()
}

/// Resolve `name` and construct the adapter.
pub fn load(name: &str, args: &ModelArgs) -> Result<Box<dyn LanguageModel>> {
    let ctor = resolve(name)?;
    debug!(model = name, pretrained = %args.pretrained, "constructing adapter");
    ctor(args)
}

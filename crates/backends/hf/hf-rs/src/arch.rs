//! candle model families the causal adapter can run, keyed by the
//! `model_type` field of `config.json`.

use candle_core::{DType, Device as CandleDevice, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::{llama, mistral, phi, qwen2};
use lmharness_abi::{Error, Result};
use serde::de::DeserializeOwned;

/// `model_type` values with a candle implementation behind them.
pub const SUPPORTED: &[&str] = &["llama", "mistral", "qwen2", "phi"];

pub fn is_supported(model_type: &str) -> bool {
    SUPPORTED.contains(&model_type)
}

fn parse<T: DeserializeOwned>(model_type: &str, raw: &str) -> Result<T> {
    serde_json::from_str(raw)
        .map_err(|e| Error::load(format!("config.json ({model_type}): {e}")))
}

fn load_err(e: candle_core::Error) -> Error {
    Error::load(format!("model: {e}"))
}

/// A loaded checkpoint together with its KV cache.
///
/// llama keeps its cache outside the model, the other families keep it
/// inside; either way [`reset`](Self::reset) starts a fresh sequence.
pub enum CausalModel {
    Llama {
        model: llama::Llama,
        config: llama::Config,
        cache: llama::Cache,
        dtype: DType,
        device: CandleDevice,
    },
    Mistral(mistral::Model),
    Qwen2(qwen2::ModelForCausalLM),
    Phi(phi::Model),
}

impl CausalModel {
    pub fn load(
        model_type: &str,
        raw_config: &str,
        vb: VarBuilder,
        dtype: DType,
        device: &CandleDevice,
    ) -> Result<Self> {
        match model_type {
            "llama" => {
                let config: llama::LlamaConfig = parse(model_type, raw_config)?;
                let config = config.into_config(false);
                let model = llama::Llama::load(vb, &config).map_err(load_err)?;
                let cache = llama::Cache::new(true, dtype, &config, device).map_err(load_err)?;
                Ok(Self::Llama {
                    model,
                    config,
                    cache,
                    dtype,
                    device: device.clone(),
                })
            }
            "mistral" => {
                let config: mistral::Config = parse(model_type, raw_config)?;
                Ok(Self::Mistral(mistral::Model::new(&config, vb).map_err(load_err)?))
            }
            "qwen2" => {
                let config: qwen2::Config = parse(model_type, raw_config)?;
                Ok(Self::Qwen2(
                    qwen2::ModelForCausalLM::new(&config, vb).map_err(load_err)?,
                ))
            }
            "phi" => {
                let config: phi::Config = parse(model_type, raw_config)?;
                Ok(Self::Phi(phi::Model::new(&config, vb).map_err(load_err)?))
            }
            other => Err(Error::load(format!(
                "unsupported model_type `{other}` (supported: {})",
                SUPPORTED.join(", ")
            ))),
        }
    }

    pub fn family(&self) -> &'static str {
        match self {
            Self::Llama { .. } => "llama",
            Self::Mistral(_) => "mistral",
            Self::Qwen2(_) => "qwen2",
            Self::Phi(_) => "phi",
        }
    }

    /// Forget every cached position.
    pub fn reset(&mut self) -> candle_core::Result<()> {
        match self {
            Self::Llama {
                config,
                cache,
                dtype,
                device,
                ..
            } => *cache = llama::Cache::new(true, *dtype, config, device)?,
            Self::Mistral(m) => m.clear_kv_cache(),
            Self::Qwen2(m) => m.clear_kv_cache(),
            Self::Phi(m) => m.clear_kv_cache(),
        }
        Ok(())
    }

    /// Feed `input` of shape `(rows, len)` starting at position `pos` and
    /// return the `(rows, vocab)` f32 scores of its last position.
    ///
    /// phi tracks its own offset, so `pos` must follow on from the cache.
    pub fn step(&mut self, input: &Tensor, pos: usize) -> candle_core::Result<Tensor> {
        let logits = match self {
            Self::Llama { model, cache, .. } => model.forward(input, pos, cache)?,
            Self::Mistral(m) => m.forward(input, pos)?,
            Self::Qwen2(m) => m.forward(input, pos)?,
            Self::Phi(m) => m.forward(input)?,
        };
        // mistral and qwen2 keep a length-1 sequence axis
        let logits = if logits.rank() == 3 {
            logits.squeeze(1)?
        } else {
            logits
        };
        logits.to_dtype(DType::F32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_families() {
        for family in ["llama", "mistral", "qwen2", "phi"] {
            assert!(is_supported(family), "{family}");
        }
        for family in ["gpt2", "bert", "falcon", ""] {
            assert!(!is_supported(family), "{family}");
        }
    }

    #[test]
    fn unknown_family_is_a_load_error() {
        let vb = VarBuilder::zeros(DType::F32, &CandleDevice::Cpu);
        let err = CausalModel::load("gpt2", "{}", vb, DType::F32, &CandleDevice::Cpu);
        assert!(matches!(err, Err(Error::Load(msg)) if msg.contains("gpt2")));
    }

    #[test]
    fn family_config_errors_name_the_family() {
        let vb = VarBuilder::zeros(DType::F32, &CandleDevice::Cpu);
        let raw = r#"{"hidden_size":8}"#;
        let err = CausalModel::load("qwen2", raw, vb, DType::F32, &CandleDevice::Cpu);
        assert!(matches!(err, Err(Error::Load(msg)) if msg.contains("qwen2")));
    }
}

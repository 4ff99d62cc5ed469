//! Construction-time configuration shared by every adapter.

use serde::{Deserialize, Serialize};

use crate::batch::BatchSize;
use crate::error::{Error, Result};

/// Recognized model options. Field names match the `key=value` keys accepted
/// by [`ModelArgs::from_arg_string`] and the JSON form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelArgs {
    /// Requested compute device (`cpu`, `cuda`, `cuda:N`, `metal:N`).
    /// Resolved against the detected hardware at construction.
    pub device: String,
    /// Local directory / file, or a Hugging Face Hub repo id.
    pub pretrained: String,
    pub revision: String,
    /// Memory-saving load hint.
    pub low_cpu_mem_usage: Option<bool>,
    /// Directory inside the model repo holding the weights.
    pub subfolder: Option<String>,
    /// Tokenizer source overriding the one shipped with the model.
    pub tokenizer: Option<String>,
    pub batch_size: BatchSize,
    pub load_in_8bit: bool,
    pub trust_remote_code: bool,
    /// Weight precision (`float32`, `float16`, `bfloat16`).
    pub dtype: Option<String>,
}

impl Default for ModelArgs {
    fn default() -> Self {
        Self {
            device: "cuda".to_string(),
            pretrained: "gpt2".to_string(),
            revision: "main".to_string(),
            low_cpu_mem_usage: None,
            subfolder: None,
            tokenizer: None,
            batch_size: BatchSize::default(),
            load_in_8bit: false,
            trust_remote_code: false,
            dtype: None,
        }
    }
}

impl ModelArgs {
    /// Parse the comma-separated `key=value` form used on evaluation command
    /// lines, e.g. `pretrained=gpt2,batch_size=auto,device=cuda:0`.
    ///
    /// Keys not listed on the struct are rejected. Whitespace around keys and
    /// values is ignored; an empty string yields the defaults.
    pub fn from_arg_string(s: &str) -> Result<Self> {
        let mut args = ModelArgs::default();
        for pair in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| Error::config(format!("expected key=value, got {pair:?}")))?;
            args.set(key.trim(), value.trim())?;
        }
        Ok(args)
    }

    /// Assign one option by name.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "device" => self.device = value.to_string(),
            "pretrained" => self.pretrained = value.to_string(),
            "revision" => self.revision = value.to_string(),
            "low_cpu_mem_usage" => self.low_cpu_mem_usage = Some(parse_bool(key, value)?),
            "subfolder" => self.subfolder = non_empty(value),
            "tokenizer" => self.tokenizer = non_empty(value),
            "batch_size" => self.batch_size = value.parse()?,
            "load_in_8bit" => self.load_in_8bit = parse_bool(key, value)?,
            "trust_remote_code" => self.trust_remote_code = parse_bool(key, value)?,
            "dtype" => self.dtype = non_empty(value),
            other => return Err(Error::config(format!("unknown model option {other:?}"))),
        }
        Ok(())
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(Error::config(format!("{key} expects a boolean, got {value:?}"))),
    }
}

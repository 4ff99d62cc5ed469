//! The parts of a Hugging Face `config.json` the adapter reads itself.
//! Architecture hyper-parameters are parsed by candle's own config types.

use lmharness_abi::{Error, Result, Token};
use serde::Deserialize;

use crate::arch;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum EosTokens {
    Single(u32),
    Multiple(Vec<u32>),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HfConfig {
    #[serde(default)]
    pub model_type: Option<String>,
    #[serde(default)]
    pub n_ctx: Option<usize>,
    #[serde(default)]
    pub max_position_embeddings: Option<usize>,
    #[serde(default)]
    pub n_positions: Option<usize>,
    #[serde(default)]
    pub eos_token_id: Option<EosTokens>,
    #[serde(default)]
    pub vocab_size: Option<usize>,
}

impl HfConfig {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| Error::load(format!("config.json: {e}")))
    }

    pub fn model_type(&self) -> &str {
        self.model_type.as_deref().unwrap_or("unknown")
    }

    /// Context window: `n_ctx`, then `max_position_embeddings`, then `n_positions`.
    pub fn max_length(&self) -> Option<usize> {
        self.n_ctx
            .or(self.max_position_embeddings)
            .or(self.n_positions)
    }

    /// First end-of-sequence id declared by the config.
    pub fn eos(&self) -> Option<Token> {
        match self.eos_token_id.as_ref()? {
            EosTokens::Single(id) => Some(Token::from_u32(*id)),
            EosTokens::Multiple(ids) => ids.first().copied().map(Token::from_u32),
        }
    }

    pub fn is_supported(&self) -> bool {
        arch::is_supported(self.model_type())
    }

    pub fn ensure_supported(&self) -> Result<()> {
        if self.is_supported() {
            Ok(())
        } else {
            Err(Error::load(format!(
                "unsupported model_type `{}` (supported: {})",
                self.model_type(),
                arch::SUPPORTED.join(", ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_length_fallback_order() {
        let c = HfConfig::from_json(r#"{"n_ctx":1024,"max_position_embeddings":4096}"#).unwrap();
        assert_eq!(c.max_length(), Some(1024));

        let c = HfConfig::from_json(r#"{"max_position_embeddings":4096,"n_positions":2048}"#)
            .unwrap();
        assert_eq!(c.max_length(), Some(4096));

        let c = HfConfig::from_json(r#"{"n_positions":2048}"#).unwrap();
        assert_eq!(c.max_length(), Some(2048));

        assert_eq!(HfConfig::from_json("{}").unwrap().max_length(), None);
    }

    #[test]
    fn eos_accepts_single_or_list() {
        let c = HfConfig::from_json(r#"{"eos_token_id":2}"#).unwrap();
        assert_eq!(c.eos(), Some(Token(2)));

        let c = HfConfig::from_json(r#"{"eos_token_id":[128001,128009]}"#).unwrap();
        assert_eq!(c.eos(), Some(Token(128001)));

        let c = HfConfig::from_json(r#"{"eos_token_id":null}"#).unwrap();
        assert_eq!(c.eos(), None);
    }

    #[test]
    fn only_families_with_a_candle_model_are_supported() {
        for family in ["llama", "mistral", "qwen2", "phi"] {
            let raw = format!(r#"{{"model_type":"{family}"}}"#);
            assert!(HfConfig::from_json(&raw).unwrap().ensure_supported().is_ok());
        }

        let gpt2 = HfConfig::from_json(r#"{"model_type":"gpt2","n_positions":1024}"#).unwrap();
        assert!(matches!(gpt2.ensure_supported(), Err(Error::Load(_))));
        assert!(matches!(
            HfConfig::default().ensure_supported(),
            Err(Error::Load(_))
        ));
    }

    #[test]
    fn malformed_json_is_a_load_error() {
        assert!(matches!(HfConfig::from_json("{"), Err(Error::Load(_))));
    }
}

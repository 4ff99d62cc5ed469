use lmharness_abi::{BatchSize, Device, LanguageModel, Logits, ModelArgs, Result, Token};
use tracing::warn;

use super::native::NativeLm;

/// BLOOMZ-family GGUF model. Tokenizes with its own vocabulary only.
pub struct BloomzCppLm {
    native: NativeLm,
}

impl BloomzCppLm {
    pub const NAME: &'static str = "bloomz-cpp";

    pub fn new(args: &ModelArgs) -> Result<Self> {
        if let Some(name) = &args.tokenizer {
            warn!(tokenizer = %name, "{} ignores tokenizer overrides", Self::NAME);
        }
        Ok(Self {
            native: NativeLm::load(args, Self::NAME)?,
        })
    }
}

impl LanguageModel for BloomzCppLm {
    fn eot_token(&self) -> Token {
        self.native.eot_token()
    }

    fn max_length(&self) -> usize {
        self.native.max_length()
    }

    fn batch_size(&self) -> BatchSize {
        self.native.batch_size()
    }

    fn device(&self) -> Device {
        Device::Cpu
    }

    fn encode(&self, text: &str) -> Result<Vec<Token>> {
        self.native.encode(text)
    }

    fn decode(&self, tokens: &[Token]) -> Result<String> {
        self.native.decode(tokens)
    }

    fn forward(&mut self, batch: &[Vec<Token>]) -> Result<Logits> {
        self.native.forward(batch)
    }

    fn generate(
        &mut self,
        context: &[Token],
        max_length: usize,
        stop: Option<Token>,
    ) -> Result<Vec<Token>> {
        self.native.generate(context, max_length, stop)
    }
}

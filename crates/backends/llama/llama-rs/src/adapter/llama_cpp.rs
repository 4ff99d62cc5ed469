use lmharness_abi::{BatchSize, Device, LanguageModel, Logits, ModelArgs, Result, Token};
use lmharness_tokenizer::CanonicalTokenizer;
use tracing::info;

use super::native::NativeLm;

/// llama.cpp model with an optional external tokenizer.
///
/// With `tokenizer` set, `encode` uses that tokenizer so token ids line up
/// with the canonical checkpoint. `decode` always goes through the GGUF
/// vocabulary, so the two directions are not guaranteed to be inverses.
pub struct LlamaCppLm {
    native: NativeLm,
    tokenizer: Option<CanonicalTokenizer>,
}

impl LlamaCppLm {
    pub const NAME: &'static str = "llama-cpp";

    pub fn new(args: &ModelArgs) -> Result<Self> {
        let native = NativeLm::load(args, Self::NAME)?;
        let tokenizer = args
            .tokenizer
            .as_deref()
            .map(|name| CanonicalTokenizer::from_override(name, &args.revision))
            .transpose()?;
        if let Some(tok) = &tokenizer {
            info!(tokenizer = tok.origin(), "encoding with external tokenizer");
        }
        Ok(Self { native, tokenizer })
    }
}

impl LanguageModel for LlamaCppLm {
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
        match &self.tokenizer {
            Some(tok) => tok.encode(text),
            None => self.native.encode(text),
        }
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

//! Hugging Face `tokenizers` wrapper

use std::path::{Path, PathBuf};

use lmharness_abi::{Error, Result, Token};
use tokenizers::Tokenizer as HfTokenizer;
use tracing::debug;

use crate::source::ModelSource;

/// Text whose GPT-2 encoding pins down the byte-level BPE behaviour.
pub const GPT2_PROBE: &str = "hello\n\nhello";
/// Expected GPT-2 ids for [`GPT2_PROBE`].
pub const GPT2_HELLO: [i32; 4] = [31373, 198, 198, 31373];

const TOKENIZER_FILE: &str = "tokenizer.json";

/// A `tokenizer.json` tokenizer. Never adds special tokens on encode.
pub struct CanonicalTokenizer {
    inner: HfTokenizer,
    origin: String,
}

impl CanonicalTokenizer {
    pub fn new(inner: HfTokenizer, origin: impl Into<String>) -> Self {
        let origin = origin.into();
        debug!(
            origin = %origin,
            vocab = inner.get_vocab_size(true),
            "loaded tokenizer"
        );
        Self { inner, origin }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let inner = HfTokenizer::from_file(path)
            .map_err(|e| Error::load(format!("tokenizer {}: {e}", path.display())))?;
        Ok(Self::new(inner, path.display().to_string()))
    }

    /// The `tokenizer.json` shipped with a model source.
    pub fn from_source(source: &ModelSource) -> Result<Self> {
        Self::from_file(&source.get(TOKENIZER_FILE)?)
    }

    /// Tokenizer named by a user override: a `tokenizer.json` file, a
    /// directory containing one, or a Hub repo id fetched at `revision`.
    pub fn from_override(name: &str, revision: &str) -> Result<Self> {
        let path = PathBuf::from(name);
        if path.is_file() {
            return Self::from_file(&path);
        }
        Self::from_source(&ModelSource::open(name, revision, None)?)
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn encode(&self, text: &str) -> Result<Vec<Token>> {
        let encoding = self
            .inner
            .encode(text, false)
            .map_err(|e| Error::inference(format!("encode: {e}")))?;
        Ok(lmharness_abi::token::from_u32_ids(encoding.get_ids()))
    }

    pub fn decode(&self, tokens: &[Token]) -> Result<String> {
        let ids = lmharness_abi::token::to_u32_ids(tokens);
        self.inner
            .decode(&ids, false)
            .map_err(|e| Error::inference(format!("decode: {e}")))
    }

    pub fn token_to_id(&self, token: &str) -> Option<Token> {
        self.inner.token_to_id(token).map(Token::from_u32)
    }

    /// Vocabulary size including added tokens.
    pub fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(true)
    }

    /// True when the vocabulary looks like GPT-2's byte-level BPE.
    pub fn looks_like_gpt2(&self) -> bool {
        self.token_to_id("hello") == Some(Token(GPT2_HELLO[0]))
    }

    /// Fails with a load error unless [`GPT2_PROBE`] encodes to [`GPT2_HELLO`].
    pub fn verify_gpt2(&self) -> Result<()> {
        let got = self.encode(GPT2_PROBE)?;
        let want: Vec<Token> = GPT2_HELLO.iter().copied().map(Token).collect();
        if got == want {
            Ok(())
        } else {
            Err(Error::load(format!(
                "tokenizer {} is not canonical GPT-2: {GPT2_PROBE:?} encoded to {:?}",
                self.origin,
                got.iter().map(|t| t.0).collect::<Vec<_>>()
            )))
        }
    }
}

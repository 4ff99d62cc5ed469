use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::path::Path;
use std::ptr::NonNull;

use llama_sys::{
    llama_detokenize, llama_model, llama_model_desc, llama_model_free, llama_model_get_vocab,
    llama_model_load_from_file, llama_model_n_ctx_train, llama_token, llama_tokenize, llama_vocab,
    llama_vocab_eos, llama_vocab_n_tokens,
};
use lmharness_abi::{Error, Result, Token};
use tracing::debug;

use crate::ffi;

/// Safe wrapper around `llama_model*`.
pub struct LlamaModel {
    model: NonNull<llama_model>,
}

impl LlamaModel {
    /// Load a GGUF file for CPU evaluation.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::load(format!("{} is not a model file", path.display())));
        }
        let c_path = path
            .to_str()
            .and_then(|s| CString::new(s).ok())
            .ok_or_else(|| Error::load(format!("unusable model path {}", path.display())))?;

        ffi::init_backend();
        debug!(path = %path.display(), "llama_model_load_from_file");
        let ptr =
            unsafe { llama_model_load_from_file(c_path.as_ptr(), ffi::default_model_params()) };
        NonNull::new(ptr)
            .map(|model| Self { model })
            .ok_or_else(|| Error::load(format!("llama.cpp could not load {}", path.display())))
    }

    #[inline]
    pub fn as_ptr(&self) -> *mut llama_model {
        self.model.as_ptr()
    }

    fn vocab(&self) -> *const llama_vocab {
        unsafe { llama_model_get_vocab(self.as_ptr()) }
    }

    pub fn n_vocab(&self) -> usize {
        unsafe { llama_vocab_n_tokens(self.vocab()) }.max(0) as usize
    }

    pub fn token_eos(&self) -> Token {
        Token(unsafe { llama_vocab_eos(self.vocab()) })
    }

    /// Context length the model was trained with.
    pub fn n_ctx_train(&self) -> usize {
        unsafe { llama_model_n_ctx_train(self.as_ptr()) }.max(0) as usize
    }

    /// Tokenize with the model's own vocabulary. Special-token text is not
    /// parsed; `add_special` controls BOS/EOS insertion.
    pub fn tokenize(&self, text: &str, add_special: bool) -> Result<Vec<Token>> {
        let c_text = CString::new(text)
            .map_err(|_| Error::inference("text contains an interior NUL byte"))?;
        let len = c_text.as_bytes().len() as i32;
        let vocab = self.vocab();

        // A short buffer reports the required size as a negative count.
        let mut buf: Vec<llama_token> = vec![0; text.len() + 2];
        let mut n = unsafe {
            llama_tokenize(
                vocab,
                c_text.as_ptr(),
                len,
                buf.as_mut_ptr(),
                buf.len() as i32,
                add_special,
                false,
            )
        };
        if n < 0 {
            buf.resize((-n) as usize, 0);
            n = unsafe {
                llama_tokenize(
                    vocab,
                    c_text.as_ptr(),
                    len,
                    buf.as_mut_ptr(),
                    buf.len() as i32,
                    add_special,
                    false,
                )
            };
            if n < 0 {
                return Err(Error::inference(format!("llama_tokenize failed: {n}")));
            }
        }
        buf.truncate(n as usize);
        Ok(buf.into_iter().map(Token).collect())
    }

    /// Detokenize a whole sequence. Special tokens are rendered as text and
    /// never dropped; invalid UTF-8 is replaced.
    pub fn detokenize(&self, tokens: &[Token]) -> Result<String> {
        if tokens.is_empty() {
            return Ok(String::new());
        }
        let ids: Vec<llama_token> = tokens.iter().map(|t| t.0).collect();
        let vocab = self.vocab();

        let mut buf: Vec<u8> = vec![0; ids.len() * 8 + 16];
        let mut n = unsafe {
            llama_detokenize(
                vocab,
                ids.as_ptr(),
                ids.len() as i32,
                buf.as_mut_ptr() as *mut c_char,
                buf.len() as i32,
                false,
                true,
            )
        };
        if n < 0 {
            buf.resize((-n) as usize, 0);
            n = unsafe {
                llama_detokenize(
                    vocab,
                    ids.as_ptr(),
                    ids.len() as i32,
                    buf.as_mut_ptr() as *mut c_char,
                    buf.len() as i32,
                    false,
                    true,
                )
            };
            if n < 0 {
                return Err(Error::inference(format!("llama_detokenize failed: {n}")));
            }
        }
        buf.truncate(n as usize);
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Short description from the GGUF header, e.g. `llama 7B Q4_0`.
    pub fn description(&self) -> Option<String> {
        let mut buf = vec![0 as c_char; 256];
        let wrote = unsafe { llama_model_desc(self.as_ptr(), buf.as_mut_ptr(), buf.len()) };
        if wrote <= 0 {
            return None;
        }
        let s = unsafe { CStr::from_ptr(buf.as_ptr()) }
            .to_string_lossy()
            .into_owned();
        Some(s)
    }
}

impl Drop for LlamaModel {
    fn drop(&mut self) {
        unsafe { llama_model_free(self.model.as_ptr()) };
    }
}

// SAFETY: a loaded model is immutable; all mutable state lives in contexts.
unsafe impl Send for LlamaModel {}
unsafe impl Sync for LlamaModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = LlamaModel::load(&dir.path().join("absent.gguf"));
        assert!(matches!(err, Err(Error::Load(_))));
    }

    #[test]
    fn directory_is_not_a_model() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(LlamaModel::load(dir.path()), Err(Error::Load(_))));
    }
}

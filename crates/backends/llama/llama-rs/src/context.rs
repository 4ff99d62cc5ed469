// Evaluation session over a shared model. All mutation lives here; the
// `LlamaModel` itself is immutable once loaded.

use std::ptr::NonNull;
use std::slice;
use std::sync::Arc;

use llama_sys::{
    llama_context, llama_decode, llama_free, llama_get_logits_ith, llama_get_memory,
    llama_init_from_model, llama_memory_clear, llama_n_ctx,
};
use lmharness_abi::{Error, Result};
use tracing::debug;

use crate::batch::LlamaBatch;
use crate::model::LlamaModel;
use crate::params::LlamaParams;

pub struct LlamaContext {
    model: Arc<LlamaModel>,
    ctx: NonNull<llama_context>,
    params: LlamaParams,
}

impl LlamaContext {
    pub fn new(model: Arc<LlamaModel>, params: LlamaParams) -> Result<Self> {
        let ptr = unsafe { llama_init_from_model(model.as_ptr(), params.to_ffi()) };
        let ctx = NonNull::new(ptr).ok_or_else(|| {
            Error::load(format!("llama.cpp could not create a context ({params:?})"))
        })?;
        debug!(?params, "created llama context");
        Ok(Self { model, ctx, params })
    }

    #[inline]
    pub fn as_ptr(&self) -> *mut llama_context {
        self.ctx.as_ptr()
    }

    pub fn model(&self) -> &LlamaModel {
        &self.model
    }

    pub fn params(&self) -> &LlamaParams {
        &self.params
    }

    /// Live context window.
    pub fn n_ctx(&self) -> usize {
        unsafe { llama_n_ctx(self.as_ptr()) as usize }
    }

    /// Drop every cached position so the next decode starts at position 0.
    pub fn clear_kv_cache(&mut self) {
        unsafe {
            let mem = llama_get_memory(self.as_ptr());
            llama_memory_clear(mem, true);
        }
    }

    pub fn decode(&mut self, batch: &LlamaBatch) -> Result<()> {
        let rc = unsafe { llama_decode(self.as_ptr(), batch.raw) };
        if rc != 0 {
            Err(Error::inference(format!("llama_decode failed with code {rc}")))
        } else {
            Ok(())
        }
    }

    /// Scores for the `i`-th token of the last decoded batch. That token must
    /// have been pushed with `logits = true`.
    pub fn logits_ith(&self, i: usize) -> Result<&[f32]> {
        let ptr = unsafe { llama_get_logits_ith(self.as_ptr(), i as i32) };
        if ptr.is_null() {
            return Err(Error::inference(format!("no logits for batch index {i}")));
        }
        Ok(unsafe { slice::from_raw_parts(ptr, self.model.n_vocab()) })
    }
}

impl Drop for LlamaContext {
    fn drop(&mut self) {
        unsafe { llama_free(self.ctx.as_ptr()) };
    }
}

// SAFETY: the context is only ever used through `&mut self` by its single owner.
unsafe impl Send for LlamaContext {}

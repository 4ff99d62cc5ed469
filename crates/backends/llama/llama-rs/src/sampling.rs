//! Greedy token selection through llama.cpp's sampler API.

use std::ptr::NonNull;

use llama_sys::{
    llama_sampler, llama_sampler_free, llama_sampler_init_greedy, llama_sampler_sample,
};
use lmharness_abi::{Error, Result, Token};

use crate::context::LlamaContext;

pub struct GreedySampler {
    smpl: NonNull<llama_sampler>,
}

impl GreedySampler {
    pub fn new() -> Result<Self> {
        let ptr = unsafe { llama_sampler_init_greedy() };
        NonNull::new(ptr)
            .map(|smpl| Self { smpl })
            .ok_or_else(|| Error::load("llama_sampler_init_greedy returned null"))
    }

    /// Highest-scoring token for the last logits row of `ctx`.
    pub fn sample(&mut self, ctx: &LlamaContext) -> Result<Token> {
        let id = unsafe { llama_sampler_sample(self.smpl.as_ptr(), ctx.as_ptr(), -1) };
        if id < 0 {
            return Err(Error::inference(format!("sampler returned invalid token id {id}")));
        }
        Ok(Token(id))
    }
}

impl Drop for GreedySampler {
    fn drop(&mut self) {
        unsafe { llama_sampler_free(self.smpl.as_ptr()) };
    }
}

// SAFETY: owned exclusively by one adapter and used through `&mut self`.
unsafe impl Send for GreedySampler {}

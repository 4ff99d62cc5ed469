// Thin RAII wrapper over `llama_batch` for a single sequence (seq id 0).

use llama_sys::{llama_batch, llama_batch_free, llama_batch_init};
use lmharness_abi::{Error, Result, Token};

pub struct LlamaBatch {
    pub(crate) raw: llama_batch,
    capacity: usize,
}

impl LlamaBatch {
    /// Token batch with room for `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        let raw = unsafe { llama_batch_init(capacity as i32, 0, 1) };
        Self { raw, capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.raw.n_tokens.max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.raw.n_tokens = 0;
    }

    /// Append `token` at position `pos`; `logits` asks for its scores.
    pub fn push(&mut self, token: Token, pos: usize, logits: bool) -> Result<()> {
        let i = self.len();
        if i >= self.capacity {
            return Err(Error::inference(format!(
                "llama batch is full ({} tokens)",
                self.capacity
            )));
        }
        // SAFETY: llama_batch_init allocated `capacity` slots for every
        // array, and one seq id per slot (n_seq_max = 1).
        unsafe {
            *self.raw.token.add(i) = token.0;
            *self.raw.pos.add(i) = pos as i32;
            *self.raw.n_seq_id.add(i) = 1;
            *(*self.raw.seq_id.add(i)) = 0;
            *self.raw.logits.add(i) = logits as i8;
        }
        self.raw.n_tokens += 1;
        Ok(())
    }

    /// Replace the contents with `tokens` starting at `start_pos`. Scores are
    /// requested for every token when `all_logits` is set, otherwise only for
    /// the final token and only if `last_logits` is set.
    pub fn fill(
        &mut self,
        tokens: &[Token],
        start_pos: usize,
        all_logits: bool,
        last_logits: bool,
    ) -> Result<()> {
        self.clear();
        let last = tokens.len().saturating_sub(1);
        for (i, &t) in tokens.iter().enumerate() {
            self.push(t, start_pos + i, all_logits || (last_logits && i == last))?;
        }
        Ok(())
    }
}

impl Drop for LlamaBatch {
    fn drop(&mut self) {
        unsafe { llama_batch_free(self.raw) };
    }
}

// SAFETY: the batch owns its buffers and is only touched through `&mut self`.
unsafe impl Send for LlamaBatch {}

// Context parameters for evaluation sessions, read from the environment.

use llama_sys::{llama_context_default_params, llama_context_params};
use lmharness_hwprof::{threads_from, THREADS_ENV};
use tracing::warn;

pub const N_CTX_ENV: &str = "LMHARNESS_N_CTX";
pub const N_BATCH_ENV: &str = "LMHARNESS_N_BATCH";

pub const DEFAULT_N_CTX: u32 = 2048;
pub const DEFAULT_N_BATCH: u32 = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LlamaParams {
    pub n_ctx: u32,
    /// Tokens submitted per `llama_decode` call.
    pub n_batch: u32,
    pub n_threads: i32,
}

impl Default for LlamaParams {
    fn default() -> Self {
        Self {
            n_ctx: DEFAULT_N_CTX,
            n_batch: DEFAULT_N_BATCH,
            n_threads: threads_from(None, num_cpus::get()) as i32,
        }
    }
}

impl LlamaParams {
    /// `LMHARNESS_N_CTX`, `LMHARNESS_N_BATCH` and `OMP_NUM_THREADS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let n_ctx = positive(N_CTX_ENV, lookup(N_CTX_ENV), DEFAULT_N_CTX);
        let n_batch = positive(N_BATCH_ENV, lookup(N_BATCH_ENV), DEFAULT_N_BATCH).min(n_ctx);
        let n_threads = threads_from(lookup(THREADS_ENV).as_deref(), num_cpus::get());
        Self {
            n_ctx,
            n_batch,
            n_threads: n_threads as i32,
        }
    }

    /// Start from upstream defaults so new header fields keep their defaults.
    pub fn to_ffi(&self) -> llama_context_params {
        let mut p = unsafe { llama_context_default_params() };
        p.n_ctx = self.n_ctx;
        p.n_batch = self.n_batch;
        // every position may request logits, so a micro-batch must hold a full batch
        p.n_ubatch = self.n_batch;
        p.n_seq_max = 1;
        p.n_threads = self.n_threads;
        p.n_threads_batch = self.n_threads;
        p.embeddings = false;
        p
    }
}

fn positive(key: &str, value: Option<String>, default: u32) -> u32 {
    let Some(raw) = value else {
        return default;
    };
    match raw.trim().parse::<u32>() {
        Ok(n) if n > 0 => n,
        _ => {
            warn!(value = %raw, "ignoring invalid {key}, using {default}");
            default
        }
    }
}

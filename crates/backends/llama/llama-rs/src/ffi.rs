// Process-wide llama.cpp setup. Everything else goes through the safe
// wrappers in `model`, `context`, `batch` and `sampling`.

use std::sync::OnceLock;

use llama_sys::{llama_backend_init, llama_model_default_params, llama_model_params};
use tracing::debug;

static BACKEND: OnceLock<()> = OnceLock::new();

/// Initialise the llama.cpp backend. Idempotent.
pub fn init_backend() {
    BACKEND.get_or_init(|| {
        debug!("llama_backend_init");
        unsafe { llama_backend_init() };
    });
}

/// Model params for CPU evaluation: weights memory-mapped, nothing offloaded.
pub fn default_model_params() -> llama_model_params {
    let mut p = unsafe { llama_model_default_params() };
    p.use_mmap = true;
    p.n_gpu_layers = 0;
    p
}

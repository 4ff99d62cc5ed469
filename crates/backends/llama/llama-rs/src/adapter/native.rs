use std::path::Path;
use std::sync::Arc;

use lmharness_abi::{
    generation_budget, uniform_row_len, BatchSize, Device, Error, Logits, ModelArgs, Result,
    Token,
};
use tracing::{debug, info};

use crate::batch::LlamaBatch;
use crate::context::LlamaContext;
use crate::model::LlamaModel;
use crate::params::LlamaParams;
use crate::sampling::GreedySampler;

/// Loaded GGUF model with one evaluation context. Shared by the llama-cpp
/// and bloomz-cpp adapters, which differ only in tokenization.
pub struct NativeLm {
    ctx: LlamaContext,
    batch: LlamaBatch,
    sampler: GreedySampler,
    batch_size: BatchSize,
}

impl NativeLm {
    pub fn load(args: &ModelArgs, kind: &str) -> Result<Self> {
        Self::load_with(args, kind, LlamaParams::from_env())
    }

    pub fn load_with(args: &ModelArgs, kind: &str, params: LlamaParams) -> Result<Self> {
        if args.device.parse::<Device>().is_ok_and(Device::is_accelerator) {
            debug!(requested = %args.device, "{kind} evaluates on cpu");
        }
        let model = Arc::new(LlamaModel::load(Path::new(&args.pretrained))?);
        let ctx = LlamaContext::new(Arc::clone(&model), params)?;
        let batch = LlamaBatch::new(params.n_batch as usize);
        let sampler = GreedySampler::new()?;

        info!(
            backend = kind,
            model = %args.pretrained,
            desc = model.description().as_deref().unwrap_or("?"),
            n_ctx = ctx.n_ctx(),
            n_ctx_train = model.n_ctx_train(),
            n_batch = params.n_batch,
            n_threads = params.n_threads,
            "loaded gguf model"
        );

        Ok(Self {
            ctx,
            batch,
            sampler,
            batch_size: args.batch_size,
        })
    }

    pub fn model(&self) -> &LlamaModel {
        self.ctx.model()
    }

    pub fn eot_token(&self) -> Token {
        self.model().token_eos()
    }

    pub fn max_length(&self) -> usize {
        self.ctx.n_ctx()
    }

    pub fn batch_size(&self) -> BatchSize {
        self.batch_size
    }

    pub fn encode(&self, text: &str) -> Result<Vec<Token>> {
        self.model().tokenize(text, false)
    }

    pub fn decode(&self, tokens: &[Token]) -> Result<String> {
        self.model().detokenize(tokens)
    }

    /// Decode `tokens` from `start_pos` in `n_batch` chunks. `on_chunk` sees
    /// each chunk after it is evaluated.
    fn eval(
        &mut self,
        tokens: &[Token],
        start_pos: usize,
        all_logits: bool,
        mut on_chunk: impl FnMut(&LlamaContext, usize) -> Result<()>,
    ) -> Result<()> {
        let chunk_len = self.batch.capacity();
        let n_chunks = tokens.len().div_ceil(chunk_len);
        for (i, chunk) in tokens.chunks(chunk_len).enumerate() {
            let is_last = i + 1 == n_chunks;
            self.batch.fill(chunk, start_pos + i * chunk_len, all_logits, is_last)?;
            self.ctx.decode(&self.batch)?;
            on_chunk(&self.ctx, chunk.len())?;
        }
        Ok(())
    }

    pub fn forward(&mut self, batch: &[Vec<Token>]) -> Result<Logits> {
        let len = uniform_row_len(batch)?;
        if len > self.max_length() {
            return Err(Error::config(format!(
                "sequence of {len} tokens exceeds n_ctx {}",
                self.max_length()
            )));
        }
        let vocab = self.model().n_vocab();
        debug!(rows = batch.len(), len, vocab, "forward");

        let mut rows = Vec::with_capacity(batch.len());
        for row in batch {
            self.ctx.clear_kv_cache();
            let mut data = Vec::with_capacity(len * vocab);
            self.eval(row, 0, true, |ctx, n| {
                for i in 0..n {
                    data.extend_from_slice(ctx.logits_ith(i)?);
                }
                Ok(())
            })?;
            rows.push(data);
        }
        Logits::from_rows(rows, len, vocab)
    }

    pub fn generate(
        &mut self,
        context: &[Token],
        max_length: usize,
        stop: Option<Token>,
    ) -> Result<Vec<Token>> {
        if context.is_empty() {
            return Err(Error::config("generate needs a non-empty context"));
        }
        let mut out = context.to_vec();
        let budget = generation_budget(context.len(), max_length.min(self.max_length()));
        if budget == 0 {
            return Ok(out);
        }
        let stop = stop.unwrap_or_else(|| self.eot_token());
        debug!(context = context.len(), budget, stop = stop.0, "generate");

        self.ctx.clear_kv_cache();
        self.eval(context, 0, false, |_, _| Ok(()))?;

        for n in 0..budget {
            let next = self.sampler.sample(&self.ctx)?;
            out.push(next);
            if next == stop || n + 1 == budget {
                break;
            }
            let pos = out.len() - 1;
            self.eval(&[next], pos, true, |_, _| Ok(()))?;
        }
        Ok(out)
    }
}

use std::fs;

use candle_core::{Device as CandleDevice, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::generation::{LogitsProcessor, Sampling};
use lmharness_abi::{
    generation_budget, uniform_row_len, BatchSize, Device, Error, LanguageModel, Logits,
    ModelArgs, Result, Token,
};
use lmharness_tokenizer::{CanonicalTokenizer, ModelSource};
use tracing::{debug, info, warn};

use crate::arch::CausalModel;
use crate::config::HfConfig;
use crate::device::{parse_dtype, to_candle};
use crate::weights::safetensors_files;

/// Tokens tried, in order, when `config.json` declares no end-of-sequence id.
const EOT_CANDIDATES: &[&str] = &["<|endoftext|>", "</s>", "<eos>", "<|end_of_text|>"];

fn inference(e: candle_core::Error) -> Error {
    Error::inference(e.to_string())
}

/// Causal transformer checkpoint (safetensors + `config.json` +
/// `tokenizer.json`) run through candle.
pub struct HfCausalLm {
    model: CausalModel,
    tokenizer: CanonicalTokenizer,
    device: Device,
    candle_device: CandleDevice,
    batch_size: BatchSize,
    max_length: usize,
    eot: Token,
}

impl HfCausalLm {
    pub fn new(args: &ModelArgs) -> Result<Self> {
        let (device, candle_device) = to_candle(lmharness_hwprof::resolve_device(&args.device));
        let dtype = parse_dtype(args.dtype.as_deref())?;
        if args.load_in_8bit {
            warn!(?dtype, "load_in_8bit is not supported, loading unquantized weights");
        }
        if args.trust_remote_code {
            warn!("trust_remote_code has no effect, no repository code is executed");
        }

        let source = ModelSource::open(&args.pretrained, &args.revision, args.subfolder.as_deref())?;
        let config_path = source.get("config.json")?;
        let raw = fs::read_to_string(&config_path)
            .map_err(|e| Error::load(format!("{}: {e}", config_path.display())))?;
        let meta = HfConfig::from_json(&raw)?;

        let tokenizer = match args.tokenizer.as_deref() {
            Some(name) => CanonicalTokenizer::from_override(name, &args.revision)?,
            None => CanonicalTokenizer::from_source(&source)?,
        };
        if meta.model_type() == "gpt2" || tokenizer.looks_like_gpt2() {
            tokenizer.verify_gpt2()?;
        }

        meta.ensure_supported()?;
        let max_length = meta.max_length().ok_or_else(|| {
            Error::load("config.json has none of n_ctx, max_position_embeddings, n_positions")
        })?;
        let eot = meta
            .eos()
            .or_else(|| EOT_CANDIDATES.iter().find_map(|t| tokenizer.token_to_id(t)))
            .ok_or_else(|| Error::load("cannot determine the end-of-text token"))?;

        let weights = safetensors_files(&source)?;
        // SAFETY: the safetensors files are memory-mapped read-only and must
        // not be modified while the model is alive.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&weights, dtype, &candle_device) }
            .map_err(|e| Error::load(format!("weights: {e}")))?;
        let model = CausalModel::load(meta.model_type(), &raw, vb, dtype, &candle_device)?;

        info!(
            source = %source,
            family = model.family(),
            %device,
            ?dtype,
            max_length,
            eot = eot.0,
            batch_size = %args.batch_size,
            "loaded causal LM"
        );

        Ok(Self {
            model,
            tokenizer,
            device,
            candle_device,
            batch_size: args.batch_size,
            max_length,
            eot,
        })
    }

    /// Feed one token per row at `pos`. Returns `(rows, vocab)` scores.
    fn step(&mut self, ids: &[u32], pos: usize) -> Result<Tensor> {
        let input = Tensor::new(ids, &self.candle_device)
            .and_then(|t| t.unsqueeze(1))
            .map_err(inference)?;
        self.model.step(&input, pos).map_err(inference)
    }
}

impl LanguageModel for HfCausalLm {
    fn eot_token(&self) -> Token {
        self.eot
    }

    fn max_length(&self) -> usize {
        self.max_length
    }

    fn batch_size(&self) -> BatchSize {
        self.batch_size
    }

    fn device(&self) -> Device {
        self.device
    }

    fn encode(&self, text: &str) -> Result<Vec<Token>> {
        self.tokenizer.encode(text)
    }

    fn decode(&self, tokens: &[Token]) -> Result<String> {
        self.tokenizer.decode(tokens)
    }

    fn forward(&mut self, batch: &[Vec<Token>]) -> Result<Logits> {
        let len = uniform_row_len(batch)?;
        if len > self.max_length {
            return Err(Error::config(format!(
                "sequence of {len} tokens exceeds max_length {}",
                self.max_length
            )));
        }
        debug!(rows = batch.len(), len, "forward");

        // candle's causal models only project the last position, so walk
        // the sequence through the KV cache to score every position.
        self.model.reset().map_err(inference)?;
        let mut steps = Vec::with_capacity(len);
        let mut column = vec![0u32; batch.len()];
        for pos in 0..len {
            for (slot, row) in column.iter_mut().zip(batch) {
                *slot = row[pos].as_u32();
            }
            steps.push(self.step(&column, pos)?);
        }

        let logits = Tensor::stack(&steps, 1).map_err(inference)?;
        let (b, s, v) = logits.dims3().map_err(inference)?;
        let data = logits
            .flatten_all()
            .and_then(|t| t.to_vec1::<f32>())
            .map_err(inference)?;
        Logits::new(b, s, v, data)
    }

    fn generate(
        &mut self,
        context: &[Token],
        max_length: usize,
        stop: Option<Token>,
    ) -> Result<Vec<Token>> {
        if context.is_empty() {
            return Err(Error::config("generate needs a non-empty context"));
        }
        let mut out = context.to_vec();
        let budget = generation_budget(context.len(), max_length.min(self.max_length));
        if budget == 0 {
            return Ok(out);
        }
        let stop = stop.unwrap_or(self.eot);
        debug!(context = context.len(), budget, stop = stop.0, "generate");

        let mut sampler = LogitsProcessor::from_sampling(0, Sampling::ArgMax);
        self.model.reset().map_err(inference)?;

        let ids = lmharness_abi::token::to_u32_ids(context);
        let prompt = Tensor::new(ids.as_slice(), &self.candle_device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(inference)?;
        let mut scores = self.model.step(&prompt, 0).map_err(inference)?;

        for _ in 0..budget {
            let next = scores
                .squeeze(0)
                .and_then(|s| sampler.sample(&s))
                .map(Token::from_u32)
                .map_err(inference)?;
            out.push(next);
            if next == stop || out.len() == context.len() + budget {
                break;
            }
            scores = self.step(&[next.as_u32()], out.len() - 1)?;
        }
        Ok(out)
    }
}

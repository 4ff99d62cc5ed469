//! In-process backend with a byte tokenizer and fixed scores, for exercising
//! the adapter contract without model weights.

use lmharness_abi::{
    argmax, generation_budget, uniform_row_len, BatchSize, Device, Error, LanguageModel, Logits,
    ModelArgs, Result, Token,
};

/// Byte ids 0..=255 plus the end-of-text id.
pub const VOCAB_SIZE: usize = 257;
pub const EOT: Token = Token(256);

const MAX_LENGTH: usize = 2048;

/// Scores always favour the byte after the current one (`z` → `{`, 255 → 0).
pub struct DummyLm {
    device: Device,
    batch_size: BatchSize,
}

impl DummyLm {
    pub const NAME: &'static str = "dummy";

    pub fn new(args: &ModelArgs) -> Self {
        Self {
            device: lmharness_hwprof::resolve_device(&args.device),
            batch_size: args.batch_size,
        }
    }

    fn scores(token: Token) -> Result<Vec<f32>> {
        let next = match token.0 {
            b @ 0..=255 => (b + 1) % 256,
            256 => 0,
            other => {
                return Err(Error::inference(format!(
                    "token {other} is outside the {VOCAB_SIZE}-token vocabulary"
                )))
            }
        };
        let mut row = vec![0.0; VOCAB_SIZE];
        row[next as usize] = 1.0;
        Ok(row)
    }
}

impl LanguageModel for DummyLm {
    fn eot_token(&self) -> Token {
        EOT
    }

    fn max_length(&self) -> usize {
        MAX_LENGTH
    }

    fn batch_size(&self) -> BatchSize {
        self.batch_size
    }

    fn device(&self) -> Device {
        self.device
    }

    fn encode(&self, text: &str) -> Result<Vec<Token>> {
        Ok(text.bytes().map(|b| Token(b as i32)).collect())
    }

    fn decode(&self, tokens: &[Token]) -> Result<String> {
        let bytes: Vec<u8> = tokens
            .iter()
            .filter_map(|t| u8::try_from(t.0).ok())
            .collect();
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn forward(&mut self, batch: &[Vec<Token>]) -> Result<Logits> {
        let len = uniform_row_len(batch)?;
        let mut data = Vec::with_capacity(batch.len() * len * VOCAB_SIZE);
        for &t in batch.iter().flatten() {
            data.extend(Self::scores(t)?);
        }
        Logits::new(batch.len(), len, VOCAB_SIZE, data)
    }

    fn generate(
        &mut self,
        context: &[Token],
        max_length: usize,
        stop: Option<Token>,
    ) -> Result<Vec<Token>> {
        let Some(&last) = context.last() else {
            return Err(Error::config("generate needs a non-empty context"));
        };
        let budget = generation_budget(context.len(), max_length.min(MAX_LENGTH));
        let stop = stop.unwrap_or(EOT);
        let mut out = context.to_vec();
        let mut cur = last;
        for _ in 0..budget {
            let next = argmax(&Self::scores(cur)?).map_or(EOT, |i| Token(i as i32));
            out.push(next);
            if next == stop {
                break;
            }
            cur = next;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lm() -> DummyLm {
        DummyLm::new(&ModelArgs {
            device: "cpu".into(),
            ..ModelArgs::default()
        })
    }

    #[test]
    fn scores_point_at_the_next_byte() {
        let mut lm = lm();
        let logits = lm.forward(&[vec![Token(97), Token(255)]]).unwrap();
        assert_eq!(logits.argmax(0, 0), Token(98));
        assert_eq!(logits.argmax(0, 1), Token(0));
    }

    #[test]
    fn out_of_vocab_tokens_are_rejected() {
        let mut lm = lm();
        assert!(matches!(
            lm.forward(&[vec![Token(300)]]),
            Err(Error::Inference(_))
        ));
    }

    #[test]
    fn decode_skips_end_of_text() {
        let lm = lm();
        let mut ids = lm.encode("hi").unwrap();
        ids.push(EOT);
        assert_eq!(lm.decode(&ids).unwrap(), "hi");
    }
}

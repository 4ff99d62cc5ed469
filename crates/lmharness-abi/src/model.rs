use crate::batch::BatchSize;
use crate::device::Device;
use crate::error::{Error, Result};
use crate::logits::Logits;
use crate::token::Token;

/// Generation cap every backend reports unless it has a reason not to.
pub const DEFAULT_MAX_GEN_TOKS: usize = 256;

/// Backend-agnostic interface every model adapter implements.
///
/// One instance = one loaded model + its tokenizer. Calls are blocking and run
/// to completion; `&mut self` methods may mutate runtime state (KV caches).
pub trait LanguageModel {
    /// Token the backend treats as end of text.
    fn eot_token(&self) -> Token;

    /// Maximum context length in tokens.
    fn max_length(&self) -> usize;

    /// Maximum number of tokens a caller should ask `generate` for.
    fn max_gen_toks(&self) -> usize {
        DEFAULT_MAX_GEN_TOKS
    }

    fn batch_size(&self) -> BatchSize;

    fn device(&self) -> Device;

    /// Tokenize without adding BOS/EOS or other special tokens.
    fn encode(&self, text: &str) -> Result<Vec<Token>>;

    fn decode(&self, tokens: &[Token]) -> Result<String>;

    /// Raw scores for every position of every row. All rows must share one
    /// length; the result has dims `(batch.len(), len, vocab)`.
    fn forward(&mut self, batch: &[Vec<Token>]) -> Result<Logits>;

    /// Greedy continuation of `context`. Returns the context followed by the
    /// generated tokens, at most `max_length` tokens in total (never fewer
    /// than the context itself). Generation ends right after `stop` is
    /// emitted, or after [`eot_token`](Self::eot_token) when `stop` is `None`.
    fn generate(
        &mut self,
        context: &[Token],
        max_length: usize,
        stop: Option<Token>,
    ) -> Result<Vec<Token>>;
}

/// Validate a forward batch: non-empty, non-empty rows, one shared length.
pub fn uniform_row_len(batch: &[Vec<Token>]) -> Result<usize> {
    let first = batch
        .first()
        .ok_or_else(|| Error::config("forward called with an empty batch"))?;
    let len = first.len();
    if len == 0 {
        return Err(Error::config("forward called with an empty sequence"));
    }
    if let Some((i, row)) = batch.iter().enumerate().find(|(_, r)| r.len() != len) {
        return Err(Error::config(format!(
            "forward rows must share one length: row 0 has {len} tokens, row {i} has {}",
            row.len()
        )));
    }
    Ok(len)
}

/// Number of new tokens `generate` may emit for a given context.
#[inline]
pub fn generation_budget(context_len: usize, max_length: usize) -> usize {
    max_length.saturating_sub(context_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_rows_pass() {
        let batch = vec![vec![Token(1), Token(2)], vec![Token(3), Token(4)]];
        assert_eq!(uniform_row_len(&batch).unwrap(), 2);
    }

    #[test]
    fn ragged_or_empty_batches_fail() {
        assert!(uniform_row_len(&[]).is_err());
        assert!(uniform_row_len(&[vec![]]).is_err());
        let ragged = vec![vec![Token(1)], vec![Token(1), Token(2)]];
        assert!(matches!(uniform_row_len(&ragged), Err(Error::Config(_))));
    }

    #[test]
    fn budget_never_underflows() {
        assert_eq!(generation_budget(3, 10), 7);
        assert_eq!(generation_budget(10, 3), 0);
    }
}

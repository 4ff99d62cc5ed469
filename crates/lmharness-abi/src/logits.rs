use crate::error::{Error, Result};
use crate::token::Token;

/// Raw (unnormalized) next-token scores for a batch, laid out row-major as
/// `[batch, seq_len, vocab]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Logits {
    batch: usize,
    seq_len: usize,
    vocab: usize,
    data: Vec<f32>,
}

impl Logits {
    pub fn new(batch: usize, seq_len: usize, vocab: usize, data: Vec<f32>) -> Result<Self> {
        let expected = batch * seq_len * vocab;
        if data.len() != expected {
            return Err(Error::inference(format!(
                "logits buffer has {} values, expected {batch}x{seq_len}x{vocab} = {expected}",
                data.len()
            )));
        }
        Ok(Self {
            batch,
            seq_len,
            vocab,
            data,
        })
    }

    /// Assemble from per-row buffers, each `seq_len * vocab` long.
    pub fn from_rows(rows: Vec<Vec<f32>>, seq_len: usize, vocab: usize) -> Result<Self> {
        let batch = rows.len();
        let mut data = Vec::with_capacity(batch * seq_len * vocab);
        for row in rows {
            data.extend(row);
        }
        Self::new(batch, seq_len, vocab, data)
    }

    /// `(batch, seq_len, vocab)`
    #[inline]
    pub fn dims(&self) -> (usize, usize, usize) {
        (self.batch, self.seq_len, self.vocab)
    }

    pub fn vocab_size(&self) -> usize {
        self.vocab
    }

    /// Scores over the vocabulary for one position.
    ///
    /// Panics when `b` or `pos` is out of range.
    pub fn row(&self, b: usize, pos: usize) -> &[f32] {
        assert!(b < self.batch && pos < self.seq_len, "logits index out of range");
        let start = (b * self.seq_len + pos) * self.vocab;
        &self.data[start..start + self.vocab]
    }

    /// Highest-scoring token at one position.
    pub fn argmax(&self, b: usize, pos: usize) -> Token {
        let idx = argmax(self.row(b, pos)).unwrap_or(0);
        Token(idx as i32)
    }
}

/// Index of the largest score. Ties resolve to the lowest index; NaNs never win.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &s) in scores.iter().enumerate() {
        if s.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if s <= b => {}
            _ => best = Some((i, s)),
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_is_checked() {
        assert!(Logits::new(1, 2, 3, vec![0.0; 6]).is_ok());
        assert!(matches!(
            Logits::new(1, 2, 3, vec![0.0; 5]),
            Err(Error::Inference(_))
        ));
    }

    #[test]
    fn rows_are_addressed_row_major() {
        let data: Vec<f32> = (0..12).map(|v| v as f32).collect();
        let l = Logits::new(2, 2, 3, data).unwrap();
        assert_eq!(l.dims(), (2, 2, 3));
        assert_eq!(l.row(0, 1), &[3.0, 4.0, 5.0]);
        assert_eq!(l.row(1, 0), &[6.0, 7.0, 8.0]);
        assert_eq!(l.argmax(1, 1), Token(2));
    }

    #[test]
    fn argmax_prefers_first_of_ties_and_skips_nan() {
        assert_eq!(argmax(&[1.0, 3.0, 3.0]), Some(1));
        assert_eq!(argmax(&[f32::NAN, -1.0]), Some(1));
        assert_eq!(argmax(&[]), None);
    }
}

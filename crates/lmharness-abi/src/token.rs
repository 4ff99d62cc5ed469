/// Wrapper for a model token (ID). Using a newtype avoids accidental
/// mixing with unrelated `i32`s and keeps conversions explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct Token(pub i32);

// i32 matches llama.cpp's `llama_token`. The Hugging Face tokenizer speaks u32;
// convert at the glue layer with `as_u32` / `from_u32`.

impl Token {
    #[inline]
    pub fn as_u32(self) -> u32 {
        self.0 as u32
    }

    #[inline]
    pub fn from_u32(id: u32) -> Self {
        Token(id as i32)
    }
}

impl From<i32> for Token {
    #[inline]
    fn from(value: i32) -> Self {
        Token(value)
    }
}

impl From<Token> for i32 {
    #[inline]
    fn from(token: Token) -> i32 {
        token.0
    }
}

/// Convert a slice of tokens into the u32 ids tokenizers and tensors expect.
pub fn to_u32_ids(tokens: &[Token]) -> Vec<u32> {
    tokens.iter().map(|t| t.as_u32()).collect()
}

/// Inverse of [`to_u32_ids`].
pub fn from_u32_ids(ids: &[u32]) -> Vec<Token> {
    ids.iter().copied().map(Token::from_u32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u32_conversion_keeps_ids() {
        let toks = vec![Token(0), Token(31373), Token(198)];
        let ids = to_u32_ids(&toks);
        assert_eq!(ids, vec![0, 31373, 198]);
        assert_eq!(from_u32_ids(&ids), toks);
    }
}

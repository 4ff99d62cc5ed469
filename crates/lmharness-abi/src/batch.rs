use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Batch size requested at construction.
///
/// `Auto` is kept unparsed: the caller decides the batch size at run time
/// (typically by probing how many rows fit). Adapters never interpret it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchSize {
    Fixed(NonZeroUsize),
    Auto,
}

impl BatchSize {
    pub const AUTO: &'static str = "auto";

    /// Fixed batch size from a plain count. Zero is rejected.
    pub fn from_count(n: usize) -> Result<Self, Error> {
        NonZeroUsize::new(n)
            .map(BatchSize::Fixed)
            .ok_or_else(|| Error::config("batch_size must be a positive integer, got 0"))
    }

    /// The fixed size, or `None` when the caller must pick one.
    pub fn fixed(self) -> Option<usize> {
        match self {
            BatchSize::Fixed(n) => Some(n.get()),
            BatchSize::Auto => None,
        }
    }

    pub fn is_auto(self) -> bool {
        matches!(self, BatchSize::Auto)
    }
}

impl Default for BatchSize {
    fn default() -> Self {
        BatchSize::Fixed(NonZeroUsize::MIN)
    }
}

impl fmt::Display for BatchSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchSize::Fixed(n) => write!(f, "{n}"),
            BatchSize::Auto => f.write_str(Self::AUTO),
        }
    }
}

impl FromStr for BatchSize {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == Self::AUTO {
            return Ok(BatchSize::Auto);
        }
        let n = s.parse::<usize>().map_err(|_| {
            Error::config(format!(
                "batch_size must be a positive integer or \"auto\", got {s:?}"
            ))
        })?;
        Self::from_count(n)
    }
}

impl Serialize for BatchSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            BatchSize::Fixed(n) => serializer.serialize_u64(n.get() as u64),
            BatchSize::Auto => serializer.serialize_str(Self::AUTO),
        }
    }
}

impl<'de> Deserialize<'de> for BatchSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Count(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Count(n) => BatchSize::from_count(n as usize).map_err(de::Error::custom),
            Raw::Text(s) => s.parse().map_err(de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_is_preserved() {
        let b: BatchSize = "auto".parse().unwrap();
        assert!(b.is_auto());
        assert_eq!(b.fixed(), None);
        assert_eq!(b.to_string(), "auto");
    }

    #[test]
    fn integers_are_coerced() {
        assert_eq!("8".parse::<BatchSize>().unwrap().fixed(), Some(8));
        assert_eq!(" 16 ".parse::<BatchSize>().unwrap().fixed(), Some(16));
    }

    #[test]
    fn malformed_values_are_config_errors() {
        for bad in ["", "0", "-1", "two", "AUTO", "1.5"] {
            match bad.parse::<BatchSize>() {
                Err(Error::Config(_)) => {}
                other => panic!("{bad:?} should fail with Config, got {other:?}"),
            }
        }
    }

    #[test]
    fn serde_accepts_numbers_and_strings() {
        let n: BatchSize = serde_json::from_str("4").unwrap();
        assert_eq!(n.fixed(), Some(4));
        let s: BatchSize = serde_json::from_str("\"12\"").unwrap();
        assert_eq!(s.fixed(), Some(12));
        let a: BatchSize = serde_json::from_str("\"auto\"").unwrap();
        assert!(a.is_auto());
        assert!(serde_json::from_str::<BatchSize>("0").is_err());

        assert_eq!(serde_json::to_string(&BatchSize::Auto).unwrap(), "\"auto\"");
        assert_eq!(serde_json::to_string(&n).unwrap(), "4");
    }
}

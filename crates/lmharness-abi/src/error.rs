use thiserror::Error;

/// Every failure an adapter or the registry can surface.
///
/// Construction problems are `Lookup`, `Load` or `Config`; `Inference` covers
/// call-time failures reported by the underlying runtime.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown model identifier `{0}`")]
    Lookup(String),

    #[error("failed to load model: {0}")]
    Load(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("inference failed: {0}")]
    Inference(String),
}

impl Error {
    pub fn load(msg: impl Into<String>) -> Self {
        Error::Load(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    pub fn inference(msg: impl Into<String>) -> Self {
        Error::Inference(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

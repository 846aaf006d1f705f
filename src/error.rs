//! Error types for llm-consensus

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsensusError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Unknown model {model} for provider {provider}")]
    UnknownModel { provider: String, model: String },

    /// Model missing from the local inference registry
    #[error("Unknown model: {0}")]
    UnknownLocalModel(String),

    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("No API key configured for {0}")]
    MissingApiKey(String),

    #[error("Invalid selector '{0}', expected provider:model")]
    InvalidSelector(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlWrite(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, ConsensusError>;

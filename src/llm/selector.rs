//! Query targets

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::ProviderFamily;
use crate::error::ConsensusError;

/// One (provider, model) pair to query
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelSelector {
    pub provider: String,
    pub model: String,
}

impl ModelSelector {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }

    /// Result map key, `provider-model`
    pub fn key(&self) -> String {
        format!("{}-{}", self.provider, self.model)
    }
}

impl fmt::Display for ModelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.model)
    }
}

impl FromStr for ModelSelector {
    type Err = ConsensusError;

    /// Parses `provider:model`. Only the first colon separates, so local
    /// tags such as `ollama:llama3.1:latest` keep their own colon.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((provider, model)) if !provider.is_empty() && !model.is_empty() => {
                Ok(Self::new(provider.trim(), model.trim()))
            }
            _ => Err(ConsensusError::InvalidSelector(s.to_string())),
        }
    }
}

/// A selector checked against the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Served by the local inference server
    Local { model: String },
    /// Served by a hosted API
    Hosted {
        provider: String,
        family: ProviderFamily,
        model: String,
    },
}

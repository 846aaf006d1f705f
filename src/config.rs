//! Configuration management for llm-consensus

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{ConsensusError, Result};
use crate::llm::{ModelSelector, Target};

/// Provider tag that routes a selector to the local inference server
pub const LOCAL_PROVIDER: &str = "ollama";

/// `max_tokens` sent to completion-style providers when a model has no context length
pub const DEFAULT_COMPLETION_TOKENS: u32 = 2048;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Local inference server
    pub local: LocalConfig,

    /// Hosted provider registry, keyed by provider name
    pub providers: HashMap<String, ProviderConfig>,

    /// Fan-out settings
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalConfig {
    /// Server URL, without the `/api/generate` suffix
    pub base_url: String,

    /// Model used by single-shot queries that name no model
    pub default_model: String,

    /// Registered local models
    pub models: HashMap<String, LocalModelConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalModelConfig {
    /// Tag the server knows the model by (e.g. `qwen2.5-coder:7b`)
    pub model: String,

    pub temperature: f32,

    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API base URL, e.g. `https://api.mistral.ai/v1`
    pub base_url: String,

    /// API key (can be env var reference like $MISTRAL_API_KEY)
    pub api_key: String,

    /// Request shape; inferred from the provider name when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<ProviderFamily>,

    /// Models served by this provider
    pub models: HashMap<String, ModelParams>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_length: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// Request shape spoken by a hosted provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderFamily {
    /// `POST /chat/completions` with a single user message
    Chat,
    /// `POST /completions` with a raw prompt
    Completion,
}

impl ProviderFamily {
    /// Family of a well-known provider name
    pub fn infer(provider: &str) -> Option<Self> {
        match provider {
            "mistral" => Some(Self::Chat),
            "deepseek" | "xai" => Some(Self::Completion),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Query all selectors concurrently instead of one after another
    #[serde(default)]
    pub parallel: bool,

    /// Per-request timeout; the HTTP client default applies when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Selectors queried when the caller names none
    pub default_selectors: Vec<ModelSelector>,
}

impl Default for Config {
    fn default() -> Self {
        let mut local_models = HashMap::new();
        local_models.insert(
            "qwen2.5-coder-7b".to_string(),
            LocalModelConfig {
                model: "qwen2.5-coder:7b".to_string(),
                temperature: 0.7,
                max_tokens: 2048,
            },
        );
        local_models.insert(
            "llama3.1".to_string(),
            LocalModelConfig {
                model: "llama3.1:latest".to_string(),
                temperature: 0.7,
                max_tokens: 2048,
            },
        );

        let mut providers = HashMap::new();

        let mut mistral_models = HashMap::new();
        mistral_models.insert(
            "mistral-large".to_string(),
            ModelParams {
                context_length: Some(32768),
                ..Default::default()
            },
        );
        providers.insert(
            "mistral".to_string(),
            ProviderConfig {
                base_url: "https://api.mistral.ai/v1".to_string(),
                api_key: "$MISTRAL_API_KEY".to_string(),
                family: Some(ProviderFamily::Chat),
                models: mistral_models,
            },
        );

        let mut deepseek_models = HashMap::new();
        deepseek_models.insert("deepseek-coder".to_string(), ModelParams::default());
        providers.insert(
            "deepseek".to_string(),
            ProviderConfig {
                base_url: "https://api.deepseek.com/v1".to_string(),
                api_key: "$DEEPSEEK_API_KEY".to_string(),
                family: Some(ProviderFamily::Completion),
                models: deepseek_models,
            },
        );

        let mut xai_models = HashMap::new();
        xai_models.insert(
            "grok-beta".to_string(),
            ModelParams {
                context_length: Some(4096),
                ..Default::default()
            },
        );
        providers.insert(
            "xai".to_string(),
            ProviderConfig {
                base_url: "https://api.x.ai/v1".to_string(),
                api_key: "$XAI_API_KEY".to_string(),
                family: Some(ProviderFamily::Completion),
                models: xai_models,
            },
        );

        Self {
            local: LocalConfig {
                base_url: "http://localhost:11434".to_string(),
                default_model: "llama3.1".to_string(),
                models: local_models,
            },
            providers,
            analysis: AnalysisConfig {
                parallel: false,
                timeout_secs: None,
                default_selectors: vec![
                    ModelSelector::new(LOCAL_PROVIDER, "qwen2.5-coder-7b"),
                    ModelSelector::new("mistral", "mistral-large"),
                    ModelSelector::new("deepseek", "deepseek-coder"),
                ],
            },
        }
    }
}

impl Config {
    /// Load config from file or create default
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = match path {
            Some(p) => PathBuf::from(p),
            None => Self::default_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_toml_str(&content)
        } else {
            let config = Config::default();
            config.validate()?;
            config.save(&config_path)?;
            tracing::info!("Wrote default config to {}", config_path.display());
            Ok(config)
        }
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("llm-consensus")
            .join("config.toml")
    }

    /// Check the registry for inconsistencies that would otherwise surface per request
    pub fn validate(&self) -> Result<()> {
        if self.local.base_url.trim().is_empty() {
            return Err(ConsensusError::Config(
                "local.base_url must not be empty".to_string(),
            ));
        }
        if !self.local.models.contains_key(&self.local.default_model) {
            return Err(ConsensusError::Config(format!(
                "local.default_model '{}' is not a registered local model",
                self.local.default_model
            )));
        }

        for (name, provider) in &self.providers {
            if name == LOCAL_PROVIDER {
                return Err(ConsensusError::Config(format!(
                    "provider name '{}' is reserved for local inference",
                    LOCAL_PROVIDER
                )));
            }
            if provider.base_url.trim().is_empty() {
                return Err(ConsensusError::Config(format!(
                    "providers.{}.base_url must not be empty",
                    name
                )));
            }
            if provider.models.is_empty() {
                return Err(ConsensusError::Config(format!(
                    "provider '{}' has no models",
                    name
                )));
            }
            self.family(name)?;
        }

        for selector in &self.analysis.default_selectors {
            self.resolve(selector)?;
        }

        Ok(())
    }

    /// Request family of a registered hosted provider
    pub fn family(&self, provider: &str) -> Result<ProviderFamily> {
        let config = self
            .providers
            .get(provider)
            .ok_or_else(|| ConsensusError::UnknownProvider(provider.to_string()))?;

        config
            .family
            .or_else(|| ProviderFamily::infer(provider))
            .ok_or_else(|| ConsensusError::UnsupportedProvider(provider.to_string()))
    }

    /// Map a selector onto the backend that serves it
    pub fn resolve(&self, selector: &ModelSelector) -> Result<Target> {
        if selector.provider == LOCAL_PROVIDER {
            return if self.local.models.contains_key(&selector.model) {
                Ok(Target::Local {
                    model: selector.model.clone(),
                })
            } else {
                Err(ConsensusError::UnknownLocalModel(selector.model.clone()))
            };
        }

        let provider = self
            .providers
            .get(&selector.provider)
            .ok_or_else(|| ConsensusError::UnknownProvider(selector.provider.clone()))?;

        if !provider.models.contains_key(&selector.model) {
            return Err(ConsensusError::UnknownModel {
                provider: selector.provider.clone(),
                model: selector.model.clone(),
            });
        }

        Ok(Target::Hosted {
            provider: selector.provider.clone(),
            family: self.family(&selector.provider)?,
            model: selector.model.clone(),
        })
    }

    /// Every registered model as a selector, sorted by key
    pub fn selectors(&self) -> Vec<ModelSelector> {
        let mut selectors: Vec<ModelSelector> = self
            .local
            .models
            .keys()
            .map(|model| ModelSelector::new(LOCAL_PROVIDER, model))
            .chain(self.providers.iter().flat_map(|(name, provider)| {
                provider
                    .models
                    .keys()
                    .map(move |model| ModelSelector::new(name, model))
            }))
            .collect();
        selectors.sort_by_key(|s| s.key());
        selectors
    }

    /// Resolve API key from config (handles env var references)
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        self.providers.get(provider).and_then(|p| {
            if let Some(var) = p.api_key.strip_prefix('$') {
                std::env::var(var).ok()
            } else if p.api_key.is_empty() {
                None
            } else {
                Some(p.api_key.clone())
            }
        })
    }
}

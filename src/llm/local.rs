//! Local inference server client (Ollama `/api/generate`)

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::config::{LocalConfig, LocalModelConfig};
use crate::error::{ConsensusError, Result};

pub struct LocalClient {
    client: Client,
    base_url: String,
    default_model: String,
    models: HashMap<String, LocalModelConfig>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

impl LocalClient {
    pub fn new(client: Client, config: &LocalConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            default_model: config.default_model.clone(),
            models: config.models.clone(),
        }
    }

    /// Query a registered local model with its configured generation parameters
    pub async fn query(&self, model_name: &str, prompt: &str) -> Result<Value> {
        let model = self
            .models
            .get(model_name)
            .ok_or_else(|| ConsensusError::UnknownLocalModel(model_name.to_string()))?;

        self.generate(&GenerateRequest {
            model: &model.model,
            prompt,
            temperature: Some(model.temperature),
            max_tokens: Some(model.max_tokens),
            stream: false,
        })
        .await
    }

    /// Query the default model, leaving generation parameters to the server
    pub async fn query_default(&self, prompt: &str) -> Result<Value> {
        let model = self
            .models
            .get(&self.default_model)
            .ok_or_else(|| ConsensusError::UnknownLocalModel(self.default_model.clone()))?;

        self.generate(&GenerateRequest {
            model: &model.model,
            prompt,
            temperature: None,
            max_tokens: None,
            stream: false,
        })
        .await
    }

    async fn generate(&self, request: &GenerateRequest<'_>) -> Result<Value> {
        let url = format!("{}/api/generate", self.base_url);
        tracing::debug!(model = request.model, %url, "local generate");

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response)
    }
}

//! Hosted provider client

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use crate::config::{Config, ProviderFamily, DEFAULT_COMPLETION_TOKENS};
use crate::error::{ConsensusError, Result};

/// Client for every hosted provider in the registry
pub struct HostedClient {
    client: Client,
    config: Config,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
}

impl HostedClient {
    pub fn new(client: Client, config: Config) -> Self {
        Self { client, config }
    }

    /// Send `prompt` to `model` on `provider`, shaped for the provider's family
    pub async fn query(&self, provider: &str, model: &str, prompt: &str) -> Result<Value> {
        let family = self.config.family(provider)?;
        self.query_as(provider, family, model, prompt).await
    }

    /// Like [`HostedClient::query`], with the family already resolved
    pub async fn query_as(
        &self,
        provider: &str,
        family: ProviderFamily,
        model: &str,
        prompt: &str,
    ) -> Result<Value> {
        let provider_config = self
            .config
            .providers
            .get(provider)
            .ok_or_else(|| ConsensusError::UnknownProvider(provider.to_string()))?;

        let params = provider_config
            .models
            .get(model)
            .ok_or_else(|| ConsensusError::UnknownModel {
                provider: provider.to_string(),
                model: model.to_string(),
            })?;

        let api_key = self
            .config
            .resolve_api_key(provider)
            .ok_or_else(|| ConsensusError::MissingApiKey(provider.to_string()))?;

        let base_url = provider_config.base_url.trim_end_matches('/');
        let request = match family {
            ProviderFamily::Chat => {
                let body = ChatRequest {
                    model,
                    messages: vec![ChatMessage {
                        role: "user",
                        content: prompt,
                    }],
                };
                self.client
                    .post(format!("{}/chat/completions", base_url))
                    .json(&body)
            }
            ProviderFamily::Completion => {
                let body = CompletionRequest {
                    model,
                    prompt,
                    max_tokens: params.context_length.unwrap_or(DEFAULT_COMPLETION_TOKENS),
                };
                self.client
                    .post(format!("{}/completions", base_url))
                    .json(&body)
            }
        };

        tracing::debug!(provider, model, ?family, "hosted request");

        let response = request
            .header("Authorization", format!("Bearer {}", api_key))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response)
    }
}

//! LLM backends, dispatch and consensus aggregation

mod aggregator;
mod consensus;
mod hosted;
mod local;
mod selector;

pub use aggregator::*;
pub use consensus::*;
pub use hosted::*;
pub use local::*;
pub use selector::*;

use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::config::Config;
use crate::error::Result;

/// Anything that can answer a prompt for a selector
#[async_trait::async_trait]
pub trait ModelBackend: Send + Sync {
    async fn query(&self, selector: &ModelSelector, prompt: &str) -> Result<Value>;
}

/// Routes selectors to the local or hosted client
pub struct Dispatcher {
    config: Config,
    local: LocalClient,
    hosted: HostedClient,
}

impl Dispatcher {
    pub fn new(config: Config) -> Result<Self> {
        let client = http_client(config.analysis.timeout_secs)?;
        Ok(Self {
            local: LocalClient::new(client.clone(), &config.local),
            hosted: HostedClient::new(client, config.clone()),
            config,
        })
    }

    pub fn local(&self) -> &LocalClient {
        &self.local
    }

    pub fn hosted(&self) -> &HostedClient {
        &self.hosted
    }
}

#[async_trait::async_trait]
impl ModelBackend for Dispatcher {
    async fn query(&self, selector: &ModelSelector, prompt: &str) -> Result<Value> {
        match self.config.resolve(selector)? {
            Target::Local { model } => self.local.query(&model, prompt).await,
            Target::Hosted {
                provider,
                family,
                model,
            } => self.hosted.query_as(&provider, family, &model, prompt).await,
        }
    }
}

fn http_client(timeout_secs: Option<u64>) -> Result<Client> {
    let mut builder = Client::builder();
    if let Some(secs) = timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    Ok(builder.build()?)
}

//! Fan a prompt out to several selectors and reduce the answers

use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::llm::{AnalysisReport, Dispatcher, ModelBackend, ModelSelector, Outcome, ResultMap};

pub struct Aggregator {
    backend: Arc<dyn ModelBackend>,
    default_selectors: Vec<ModelSelector>,
    parallel: bool,
}

impl Aggregator {
    /// Build an aggregator over the HTTP clients described by `config`
    pub fn new(config: Config) -> Result<Self> {
        let default_selectors = config.analysis.default_selectors.clone();
        let parallel = config.analysis.parallel;
        let backend = Dispatcher::new(config)?;

        Ok(Self {
            backend: Arc::new(backend),
            default_selectors,
            parallel,
        })
    }

    pub fn with_backend(
        backend: Arc<dyn ModelBackend>,
        default_selectors: Vec<ModelSelector>,
    ) -> Self {
        Self {
            backend,
            default_selectors,
            parallel: false,
        }
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn default_selectors(&self) -> &[ModelSelector] {
        &self.default_selectors
    }

    /// Query every selector (the configured defaults when `selectors` is `None`).
    ///
    /// Per-selector failures land in the result map as error records; the
    /// batch itself never fails. Duplicate keys keep the later selector's result.
    pub async fn analyze(
        &self,
        prompt: &str,
        selectors: Option<&[ModelSelector]>,
    ) -> AnalysisReport {
        let selectors = selectors.unwrap_or(self.default_selectors.as_slice());

        let outcomes = if self.parallel {
            self.run_parallel(prompt, selectors).await
        } else {
            let mut outcomes = Vec::with_capacity(selectors.len());
            for selector in selectors {
                outcomes.push(run_one(self.backend.as_ref(), selector, prompt).await);
            }
            outcomes
        };

        let mut results = ResultMap::new();
        for (selector, outcome) in selectors.iter().zip(outcomes) {
            results.insert(selector.key(), outcome);
        }

        let report = AnalysisReport::new(results);
        tracing::info!(
            selectors = selectors.len(),
            errors = report.error_count(),
            consensus = %report.consensus,
            "analysis complete"
        );
        report
    }

    async fn run_parallel(&self, prompt: &str, selectors: &[ModelSelector]) -> Vec<Outcome> {
        let handles: Vec<_> = selectors
            .iter()
            .cloned()
            .map(|selector| {
                let backend = Arc::clone(&self.backend);
                let prompt = prompt.to_string();
                tokio::spawn(async move { run_one(backend.as_ref(), &selector, &prompt).await })
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            outcomes.push(handle.await.unwrap_or_else(|e| Outcome::failed(e)));
        }
        outcomes
    }
}

async fn run_one(backend: &dyn ModelBackend, selector: &ModelSelector, prompt: &str) -> Outcome {
    match backend.query(selector, prompt).await {
        Ok(body) => Outcome::Response(body),
        Err(e) => {
            tracing::warn!("{} failed: {}", selector.key(), e);
            Outcome::failed(e)
        }
    }
}

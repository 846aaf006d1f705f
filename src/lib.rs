//! llm-consensus - ask several LLMs the same question and see if they agree
//!
//! A prompt is fanned out to a list of `provider:model` selectors, served
//! either by a local Ollama server or by hosted chat/completion APIs. Each
//! answer (or failure) is collected into a result map, and the successful
//! answers are compared verbatim for a simple agreement verdict.

pub mod config;
pub mod error;
pub mod llm;

pub use config::Config;
pub use error::{ConsensusError, Result};
pub use llm::{AnalysisReport, Aggregator, ConsensusVerdict, ModelSelector, Outcome};

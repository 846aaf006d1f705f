//! Result map and equality consensus

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// What one selector produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Outcome {
    /// The call failed; serialized as `{"error": "..."}`
    Failed { error: String },
    /// Raw provider response body
    Response(Value),
}

impl Outcome {
    pub fn failed(error: impl fmt::Display) -> Self {
        Self::Failed {
            error: error.to_string(),
        }
    }

    /// True for failures, and for bodies that mention `error`: an object
    /// with that key, a string containing it, or an array holding it
    pub fn is_error(&self) -> bool {
        match self {
            Self::Failed { .. } => true,
            Self::Response(Value::Object(map)) => map.contains_key("error"),
            Self::Response(Value::String(text)) => text.contains("error"),
            Self::Response(Value::Array(items)) => {
                items.iter().any(|item| item.as_str() == Some("error"))
            }
            Self::Response(_) => false,
        }
    }

    /// Best-effort generated text for display
    pub fn preview(&self) -> Option<&str> {
        let Self::Response(body) = self else {
            return None;
        };

        body.get("response")
            .or_else(|| body.pointer("/choices/0/message/content"))
            .or_else(|| body.pointer("/choices/0/text"))
            .and_then(Value::as_str)
    }
}

/// Outcomes keyed by `provider-model`
pub type ResultMap = BTreeMap<String, Outcome>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsensusVerdict {
    Agreement,
    Disagreement,
}

impl fmt::Display for ConsensusVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Agreement => write!(f, "Agreement"),
            Self::Disagreement => write!(f, "Disagreement"),
        }
    }
}

/// Agreement iff the non-error results stringify to exactly one distinct value.
/// Bodies keep their wire key order, so reordered fields disagree.
/// No successful results at all is a disagreement.
pub fn check_consensus(results: &ResultMap) -> ConsensusVerdict {
    let distinct: HashSet<String> = results
        .values()
        .filter(|outcome| !outcome.is_error())
        .filter_map(|outcome| match outcome {
            Outcome::Response(body) => Some(body.to_string()),
            Outcome::Failed { .. } => None,
        })
        .collect();

    if distinct.len() == 1 {
        ConsensusVerdict::Agreement
    } else {
        ConsensusVerdict::Disagreement
    }
}

/// Output of one fan-out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub results: ResultMap,
    pub consensus: ConsensusVerdict,
}

impl AnalysisReport {
    pub fn new(results: ResultMap) -> Self {
        let consensus = check_consensus(&results);
        Self { results, consensus }
    }

    pub fn error_count(&self) -> usize {
        self.results.values().filter(|o| o.is_error()).count()
    }
}

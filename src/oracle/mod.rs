//! The generation oracle: an external text generator that proposes artifact
//! candidates from a structured context.

mod openai;

pub use openai::OpenAiOracle;

use async_trait::async_trait;
use serde_json::Value;

/// Result of one generation attempt. The synthesizer folds `Rejected` and
/// `Unavailable` into the same fallback path; they differ only in how the
/// job log reports them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleOutcome {
    Generated(String),
    Rejected(String),
    Unavailable(String),
}

impl OracleOutcome {
    /// The rejection or unavailability reason, if any.
    pub fn reason(&self) -> Option<&str> {
        match self {
            OracleOutcome::Generated(_) => None,
            OracleOutcome::Rejected(reason) | OracleOutcome::Unavailable(reason) => Some(reason),
        }
    }
}

/// Interface to the generation oracle. One call per artifact kind; the
/// context payload is untrusted repository-derived data and must be treated
/// as such by implementations.
#[async_trait]
pub trait GenerationOracle: Send + Sync {
    async fn generate(&self, instruction: &str, context: &Value) -> OracleOutcome;
}

use std::time::Duration;

use thiserror::Error;

use crate::analysis::agent::AgentStage;
use crate::analysis::models::Strategy;
use crate::llm_client::LlmError;

/// Failures the pipeline cannot absorb into a degraded result.
///
/// Malformed agent output is deliberately absent: it becomes a fallback
/// `AnalysisResult`, never an error.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("inference backend unavailable during {stage}: {source}")]
    InferenceUnavailable {
        stage: AgentStage,
        #[source]
        source: LlmError,
    },

    #[error("analysis cancelled before {stage} completed")]
    Cancelled { stage: AgentStage },

    #[error("{stage} timed out after {after:?}")]
    TimedOut { stage: AgentStage, after: Duration },

    #[error("{} strategy is not configured", .0.as_str())]
    StrategyUnavailable(Strategy),
}

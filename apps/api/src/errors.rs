use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::analysis::error::AnalysisError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Analysis(e) => analysis_error_parts(e),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

fn analysis_error_parts(error: &AnalysisError) -> (StatusCode, &'static str, String) {
    match error {
        AnalysisError::InferenceUnavailable { .. } => {
            tracing::error!("Inference backend error: {error}");
            (
                StatusCode::BAD_GATEWAY,
                "INFERENCE_UNAVAILABLE",
                "The AI inference service is unavailable".to_string(),
            )
        }
        AnalysisError::StrategyUnavailable(_) => {
            tracing::error!("Configuration error: {error}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "STRATEGY_UNAVAILABLE",
                error.to_string(),
            )
        }
        AnalysisError::TimedOut { .. } => {
            tracing::warn!("Analysis timed out: {error}");
            (
                StatusCode::GATEWAY_TIMEOUT,
                "ANALYSIS_TIMEOUT",
                error.to_string(),
            )
        }
        AnalysisError::Cancelled { .. } => (
            StatusCode::GATEWAY_TIMEOUT,
            "ANALYSIS_CANCELLED",
            error.to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::agent::AgentStage;
    use crate::analysis::models::Strategy;
    use crate::llm_client::LlmError;
    use std::time::Duration;

    #[test]
    fn test_not_found_maps_to_404() {
        let response = AppError::NotFound("Analysis x".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_unreachable_backend_maps_to_502() {
        let error = AppError::from(AnalysisError::InferenceUnavailable {
            stage: AgentStage::Compare,
            source: LlmError::EmptyContent,
        });
        assert_eq!(error.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_missing_strategy_maps_to_503() {
        let error = AppError::from(AnalysisError::StrategyUnavailable(Strategy::Agentic));
        assert_eq!(
            error.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_timeout_and_cancel_have_distinct_codes() {
        let (_, timeout_code, _) = analysis_error_parts(&AnalysisError::TimedOut {
            stage: AgentStage::Score,
            after: Duration::from_secs(5),
        });
        let (status, cancel_code, _) = analysis_error_parts(&AnalysisError::Cancelled {
            stage: AgentStage::Score,
        });
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_ne!(timeout_code, cancel_code);
    }
}

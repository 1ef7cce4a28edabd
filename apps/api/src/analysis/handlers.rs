//! Axum route handlers for the Analysis API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::analysis::models::{AnalysisResult, Strategy};
use crate::analysis::store::{self, AnalysisRecordRow};
use crate::errors::AppError;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AnalyzeTextRequest {
    pub candidate_text: String,
    pub job_description: String,
    /// Overrides the configured default strategy for this call.
    #[serde(default)]
    pub strategy: Option<Strategy>,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeProfilesRequest {
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    #[serde(default)]
    pub strategy: Option<Strategy>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeProfilesResponse {
    /// `None` when the result could not be saved; see `features.db_save_error`.
    pub analysis_id: Option<Uuid>,
    pub result: AnalysisResult,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/analysis
///
/// Runs the pipeline over two raw texts. Empty texts are valid input and simply
/// score zero.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeTextRequest>,
) -> Result<Json<AnalysisResult>, AppError> {
    let orchestrator = &state.orchestrator;
    let result = match request.strategy {
        None => {
            orchestrator
                .run_analysis(&request.candidate_text, &request.job_description)
                .await?
        }
        Some(strategy) => {
            orchestrator
                .run(
                    &request.candidate_text,
                    &request.job_description,
                    Some(strategy),
                    orchestrator.default_options(),
                )
                .await?
        }
    };

    Ok(Json(result))
}

/// POST /api/v1/analysis/profiles
///
/// Loads a stored candidate profile and job description, runs the pipeline and
/// records the result. A failed save never fails the request.
pub async fn handle_analyze_profiles(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeProfilesRequest>,
) -> Result<(StatusCode, Json<AnalyzeProfilesResponse>), AppError> {
    let candidate_text = require_found(
        store::fetch_candidate_profile(&state.db, request.candidate_id).await?,
        "Candidate",
        request.candidate_id,
    )?;
    let job_description = require_found(
        store::fetch_job_description(&state.db, request.job_id).await?,
        "Job",
        request.job_id,
    )?;

    let strategy = request
        .strategy
        .unwrap_or(state.orchestrator.default_strategy());

    let mut result = state
        .orchestrator
        .run(
            &candidate_text,
            &job_description,
            Some(strategy),
            state.orchestrator.default_options(),
        )
        .await?;

    let saved = store::insert_analysis(
        &state.db,
        request.candidate_id,
        request.job_id,
        strategy,
        &result,
    )
    .await
    .map(|record| record.id);
    let analysis_id = absorb_save_outcome(&mut result, saved);

    Ok((
        StatusCode::CREATED,
        Json(AnalyzeProfilesResponse {
            analysis_id,
            result,
        }),
    ))
}

fn require_found<T>(row: Option<T>, kind: &str, id: Uuid) -> Result<T, AppError> {
    row.ok_or_else(|| AppError::NotFound(format!("{kind} {id} not found")))
}

/// A failed save is reported inside the result as `features.db_save_error`
/// instead of failing the request.
fn absorb_save_outcome(
    result: &mut AnalysisResult,
    saved: Result<Uuid, sqlx::Error>,
) -> Option<Uuid> {
    match saved {
        Ok(id) => Some(id),
        Err(e) => {
            warn!(error = %e, "Failed to save analysis result");
            result
                .features
                .insert("db_save_error".to_string(), Value::String(e.to_string()));
            None
        }
    }
}

/// GET /api/v1/analysis/:id
///
/// Returns a previously recorded analysis.
pub async fn handle_get_analysis(
    State(state): State<AppState>,
    Path(analysis_id): Path<Uuid>,
) -> Result<Json<AnalysisRecordRow>, AppError> {
    let record = store::get_analysis(&state.db, analysis_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Analysis {analysis_id} not found")))?;

    Ok(Json(record))
}

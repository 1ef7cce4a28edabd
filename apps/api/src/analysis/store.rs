//! Persistence collaborator: candidate/job texts in, analysis records out.
//! The pipeline itself never touches the database; handlers call these.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::analysis::models::{AnalysisResult, Strategy};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AnalysisRecordRow {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    pub strategy: String,
    pub result: Value,
    pub created_at: DateTime<Utc>,
}

/// Plain-text profile of a candidate (already extracted upstream from their CV).
pub async fn fetch_candidate_profile(
    pool: &PgPool,
    candidate_id: Uuid,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT raw_profile FROM candidates WHERE id = $1")
        .bind(candidate_id)
        .fetch_optional(pool)
        .await
}

pub async fn fetch_job_description(
    pool: &PgPool,
    job_id: Uuid,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT description FROM jobs WHERE id = $1")
        .bind(job_id)
        .fetch_optional(pool)
        .await
}

pub async fn insert_analysis(
    pool: &PgPool,
    candidate_id: Uuid,
    job_id: Uuid,
    strategy: Strategy,
    result: &AnalysisResult,
) -> Result<AnalysisRecordRow, sqlx::Error> {
    sqlx::query_as::<_, AnalysisRecordRow>(
        r#"
        INSERT INTO analysis_results (id, candidate_id, job_id, strategy, result, created_at)
        VALUES ($1, $2, $3, $4, $5, NOW())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(candidate_id)
    .bind(job_id)
    .bind(strategy.as_str())
    .bind(Json(result))
    .fetch_one(pool)
    .await
}

pub async fn get_analysis(
    pool: &PgPool,
    analysis_id: Uuid,
) -> Result<Option<AnalysisRecordRow>, sqlx::Error> {
    sqlx::query_as::<_, AnalysisRecordRow>("SELECT * FROM analysis_results WHERE id = $1")
        .bind(analysis_id)
        .fetch_optional(pool)
        .await
}

//! Affinity scoring — turns similarity features (or an agent's verdict) into a
//! 0–100 score with a justification.

use serde::Deserialize;

use crate::analysis::models::{ScoreOutcome, SimilarityFeatures};
use crate::llm_client::parse_json_reply;

const STRONG_THRESHOLD: u8 = 80;
const MEDIUM_THRESHOLD: u8 = 50;

/// Absorbs binary float error so a rounded index like 0.29 scores 29, not 28.
const FLOOR_EPSILON: f64 = 1e-9;

/// Score is `floor(jaccard * 100)`. Tiers are inclusive on the lower bound.
pub fn score(features: &SimilarityFeatures) -> ScoreOutcome {
    let affinity_score = (features.jaccard_index * 100.0 + FLOOR_EPSILON)
        .floor()
        .clamp(0.0, 100.0) as u8;
    let match_reason = match_reason(affinity_score, features.overlap_count);
    ScoreOutcome {
        affinity_score,
        match_reason,
    }
}

fn match_reason(score: u8, overlap: usize) -> String {
    if score >= STRONG_THRESHOLD {
        format!("Strong match! They share {overlap} key skills.")
    } else if score >= MEDIUM_THRESHOLD {
        format!("Medium affinity. They have {overlap} skills in common, but others are missing.")
    } else {
        format!("Low affinity. They only share {overlap} skills.")
    }
}

/// Outcome of reading the agent's final JSON verdict.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentScore {
    Parsed(ScoreOutcome),
    ParseFailure { raw: String, reason: String },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AgentVerdict {
    affinity_score: i64,
    match_reason: String,
}

/// Parses `{"affinity_score": <0..=100>, "match_reason": "..."}`, optionally
/// wrapped in markdown fences. Any deviation is a `ParseFailure`.
pub fn parse_agent_score(raw: &str) -> AgentScore {
    let failure = |reason: String| AgentScore::ParseFailure {
        raw: raw.to_string(),
        reason,
    };

    let verdict: AgentVerdict = match parse_json_reply(raw) {
        Ok(v) => v,
        Err(e) => return failure(e.to_string()),
    };

    match u8::try_from(verdict.affinity_score) {
        Ok(score) if score <= 100 => AgentScore::Parsed(ScoreOutcome {
            affinity_score: score,
            match_reason: verdict.match_reason,
        }),
        _ => failure(format!(
            "affinity_score {} is outside 0..=100",
            verdict.affinity_score
        )),
    }
}

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::watch;

/// Which pipeline produced (or should produce) an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Deterministic,
    Agentic,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Deterministic => "deterministic",
            Strategy::Agentic => "agentic",
        }
    }
}

/// A set of lowercase skill tokens. Iterates in sorted order so every
/// serialization of the same set is byte-identical.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkillSet(BTreeSet<String>);

impl SkillSet {
    /// Builds a set from raw tokens: trimmed, lowercased, blanks dropped.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            tokens
                .into_iter()
                .map(|t| t.as_ref().trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn intersection<'a>(&'a self, other: &'a SkillSet) -> impl Iterator<Item = &'a String> {
        self.0.intersection(&other.0)
    }

    pub fn union<'a>(&'a self, other: &'a SkillSet) -> impl Iterator<Item = &'a String> {
        self.0.union(&other.0)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

/// Overlap statistics between a candidate skill set and a job skill set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityFeatures {
    /// |C ∩ J| / |C ∪ J|, rounded to 2 decimals; 0.0 when either side is empty.
    pub jaccard_index: f64,
    pub overlap_count: usize,
    pub total_union: usize,
    pub common_skills: Vec<String>,
}

impl SimilarityFeatures {
    pub fn empty() -> Self {
        Self {
            jaccard_index: 0.0,
            overlap_count: 0,
            total_union: 0,
            common_skills: vec![],
        }
    }
}

/// A 0–100 score with its justification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreOutcome {
    pub affinity_score: u8,
    pub match_reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedData {
    pub candidate_skills: Vec<String>,
    pub job_skills: Vec<String>,
}

/// The pipeline's externally visible product. Same shape for every strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub affinity_score: u8,
    pub match_reason: String,
    /// Diagnostic details; contents depend on the strategy that ran.
    pub features: Map<String, Value>,
    pub extracted_data: ExtractedData,
}

/// Caller-side cancellation handle. Flip the paired sender to `true` to cancel.
#[derive(Debug, Clone)]
pub struct CancelSignal(watch::Receiver<bool>);

impl CancelSignal {
    pub fn new() -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        (tx, Self(rx))
    }

    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once cancellation is requested. Never resolves if the sender is
    /// dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.0.clone();
        loop {
            let cancelled = *rx.borrow_and_update();
            if cancelled {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Per-run controls honored at every external call boundary.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub stage_timeout: Option<Duration>,
    pub cancel: Option<CancelSignal>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skill_set_normalizes_tokens() {
        let set = SkillSet::from_tokens(["  Python", "DOCKER", "python", ""]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.to_vec(), vec!["docker", "python"]);
    }

    #[test]
    fn test_skill_set_serializes_sorted() {
        let set = SkillSet::from_tokens(["sql", "docker", "java"]);
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["docker","java","sql"]"#);
    }

    #[test]
    fn test_strategy_serde_snake_case() {
        assert_eq!(
            serde_json::to_string(&Strategy::Agentic).unwrap(),
            r#""agentic""#
        );
        let s: Strategy = serde_json::from_str(r#""deterministic""#).unwrap();
        assert_eq!(s, Strategy::Deterministic);
        assert_eq!(Strategy::Agentic.as_str(), "agentic");
    }

    #[test]
    fn test_analysis_result_json_shape() {
        let result = AnalysisResult {
            affinity_score: 42,
            match_reason: "reason".to_string(),
            features: Map::new(),
            extracted_data: ExtractedData {
                candidate_skills: vec!["python".to_string()],
                job_skills: vec![],
            },
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["affinity_score"], 42);
        assert_eq!(value["match_reason"], "reason");
        assert!(value["features"].as_object().unwrap().is_empty());
        assert_eq!(value["extracted_data"]["candidate_skills"][0], "python");
        assert!(value["extracted_data"]["job_skills"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_signal_resolves_after_send() {
        let (tx, signal) = CancelSignal::new();
        assert!(!signal.is_cancelled());
        tx.send(true).unwrap();
        signal.cancelled().await;
        assert!(signal.is_cancelled());
    }
}

//! Analysis orchestration — one interface, two strategies.
//!
//! `AnalysisStrategy` is implemented by the deterministic keyword pipeline and by
//! the agent crew. `Orchestrator` owns both, picks one from configuration (or an
//! explicit request) and always hands back the same `AnalysisResult` shape.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::analysis::agent::{AgentCrew, CrewOutput};
use crate::analysis::error::AnalysisError;
use crate::analysis::extractor::{AgentExtraction, SkillExtractor};
use crate::analysis::models::{AnalysisResult, ExtractedData, RunOptions, Strategy};
use crate::analysis::scorer::{parse_agent_score, score, AgentScore};
use crate::analysis::similarity::compare;

/// Produces an `AnalysisResult` from a candidate text and a job description.
#[async_trait]
pub trait AnalysisStrategy: Send + Sync {
    fn kind(&self) -> Strategy;

    async fn analyze(
        &self,
        candidate_text: &str,
        job_description: &str,
        options: &RunOptions,
    ) -> Result<AnalysisResult, AnalysisError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Deterministic strategy
// ────────────────────────────────────────────────────────────────────────────

/// Keyword extraction → Jaccard similarity → tiered score. Never fails, never
/// suspends, same input always gives the same output.
pub struct DeterministicAnalyzer {
    extractor: Arc<SkillExtractor>,
}

impl DeterministicAnalyzer {
    pub fn new(extractor: Arc<SkillExtractor>) -> Self {
        Self { extractor }
    }

    pub fn run(&self, candidate_text: &str, job_description: &str) -> AnalysisResult {
        let candidate_skills = self.extractor.extract(candidate_text);
        let job_skills = self.extractor.extract(job_description);

        debug!(
            candidate_skills = candidate_skills.len(),
            job_skills = job_skills.len(),
            "Extracted skills"
        );

        let features = compare(&candidate_skills, &job_skills);
        let outcome = score(&features);

        let mut feature_map = Map::new();
        feature_map.insert(
            "strategy".to_string(),
            json!(Strategy::Deterministic.as_str()),
        );
        feature_map.insert("jaccard_index".to_string(), json!(features.jaccard_index));
        feature_map.insert("overlap_count".to_string(), json!(features.overlap_count));
        feature_map.insert("total_union".to_string(), json!(features.total_union));
        feature_map.insert("common_skills".to_string(), json!(features.common_skills));

        AnalysisResult {
            affinity_score: outcome.affinity_score,
            match_reason: outcome.match_reason,
            features: feature_map,
            extracted_data: ExtractedData {
                candidate_skills: candidate_skills.to_vec(),
                job_skills: job_skills.to_vec(),
            },
        }
    }
}

#[async_trait]
impl AnalysisStrategy for DeterministicAnalyzer {
    fn kind(&self) -> Strategy {
        Strategy::Deterministic
    }

    async fn analyze(
        &self,
        candidate_text: &str,
        job_description: &str,
        _options: &RunOptions,
    ) -> Result<AnalysisResult, AnalysisError> {
        Ok(self.run(candidate_text, job_description))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Agentic strategy
// ────────────────────────────────────────────────────────────────────────────

/// Delegates every stage to the agent crew. Output varies between runs.
pub struct AgenticAnalyzer {
    crew: AgentCrew,
}

impl AgenticAnalyzer {
    pub fn new(crew: AgentCrew) -> Self {
        Self { crew }
    }
}

#[async_trait]
impl AnalysisStrategy for AgenticAnalyzer {
    fn kind(&self) -> Strategy {
        Strategy::Agentic
    }

    async fn analyze(
        &self,
        candidate_text: &str,
        job_description: &str,
        options: &RunOptions,
    ) -> Result<AnalysisResult, AnalysisError> {
        let output = self
            .crew
            .kickoff(candidate_text, job_description, options)
            .await?;
        Ok(normalize_crew_output(&output))
    }
}

/// Maps raw crew output onto `AnalysisResult`, falling back when the final
/// verdict breaks the JSON contract.
fn normalize_crew_output(output: &CrewOutput) -> AnalysisResult {
    let candidate = AgentExtraction::parse(&output.candidate_extraction);
    let job = AgentExtraction::parse(&output.job_extraction);
    let extracted_data = ExtractedData {
        candidate_skills: candidate.skills.to_vec(),
        job_skills: job.skills.to_vec(),
    };

    match parse_agent_score(&output.final_output) {
        AgentScore::Parsed(outcome) => {
            let mut features = Map::new();
            features.insert("strategy".to_string(), json!(Strategy::Agentic.as_str()));
            features.insert("candidate_summary".to_string(), Value::String(candidate.summary));
            features.insert("job_summary".to_string(), Value::String(job.summary));
            features.insert(
                "comparison".to_string(),
                Value::String(output.comparison.clone()),
            );

            AnalysisResult {
                affinity_score: outcome.affinity_score,
                match_reason: outcome.match_reason,
                features,
                extracted_data,
            }
        }
        AgentScore::ParseFailure { raw, reason } => {
            warn!(%reason, "Agent verdict is not valid JSON; returning fallback result");
            fallback_result(&raw, extracted_data)
        }
    }
}

/// Degraded result for unusable agent output: zero score, the raw output
/// embedded in the reason, no features.
pub fn fallback_result(raw: &str, extracted_data: ExtractedData) -> AnalysisResult {
    AnalysisResult {
        affinity_score: 0,
        match_reason: format!("Error processing AI response: {raw}"),
        features: Map::new(),
        extracted_data,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Orchestrator
// ────────────────────────────────────────────────────────────────────────────

/// Entry point for callers. Built once at startup and shared via `AppState`.
pub struct Orchestrator {
    deterministic: Arc<dyn AnalysisStrategy>,
    agentic: Option<Arc<dyn AnalysisStrategy>>,
    default_strategy: Strategy,
    default_options: RunOptions,
}

impl Orchestrator {
    /// Fails when the default strategy has no backing implementation.
    pub fn new(
        deterministic: Arc<dyn AnalysisStrategy>,
        agentic: Option<Arc<dyn AnalysisStrategy>>,
        default_strategy: Strategy,
        default_options: RunOptions,
    ) -> Result<Self, AnalysisError> {
        if default_strategy == Strategy::Agentic && agentic.is_none() {
            return Err(AnalysisError::StrategyUnavailable(Strategy::Agentic));
        }
        Ok(Self {
            deterministic,
            agentic,
            default_strategy,
            default_options,
        })
    }

    pub fn default_strategy(&self) -> Strategy {
        self.default_strategy
    }

    /// Options applied when the caller supplies none.
    pub fn default_options(&self) -> &RunOptions {
        &self.default_options
    }

    fn select(
        &self,
        requested: Option<Strategy>,
    ) -> Result<&Arc<dyn AnalysisStrategy>, AnalysisError> {
        match requested.unwrap_or(self.default_strategy) {
            Strategy::Deterministic => Ok(&self.deterministic),
            Strategy::Agentic => self
                .agentic
                .as_ref()
                .ok_or(AnalysisError::StrategyUnavailable(Strategy::Agentic)),
        }
    }

    pub async fn run(
        &self,
        candidate_text: &str,
        job_description: &str,
        strategy: Option<Strategy>,
        options: &RunOptions,
    ) -> Result<AnalysisResult, AnalysisError> {
        let selected = self.select(strategy)?;
        let kind = selected.kind();

        info!(
            strategy = kind.as_str(),
            candidate_len = candidate_text.len(),
            job_len = job_description.len(),
            "Running analysis"
        );

        let result = selected
            .analyze(candidate_text, job_description, options)
            .await?;

        info!(
            strategy = kind.as_str(),
            affinity_score = result.affinity_score,
            candidate_skills = result.extracted_data.candidate_skills.len(),
            job_skills = result.extracted_data.job_skills.len(),
            "Analysis completed"
        );

        Ok(result)
    }

    /// Runs with the configured default strategy and options.
    pub async fn run_analysis(
        &self,
        candidate_text: &str,
        job_description: &str,
    ) -> Result<AnalysisResult, AnalysisError> {
        self.run(candidate_text, job_description, None, &self.default_options)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::agent::tests::ScriptedBackend;
    use crate::analysis::models::CancelSignal;
    use crate::config::DEFAULT_SKILL_VOCABULARY;
    use crate::llm_client::LlmError;

    fn deterministic() -> Arc<dyn AnalysisStrategy> {
        let extractor = SkillExtractor::new(DEFAULT_SKILL_VOCABULARY.iter()).unwrap();
        Arc::new(DeterministicAnalyzer::new(Arc::new(extractor)))
    }

    fn agentic(backend: Arc<ScriptedBackend>) -> Arc<dyn AnalysisStrategy> {
        Arc::new(AgenticAnalyzer::new(AgentCrew::new(backend)))
    }

    fn orchestrator_with(backend: Arc<ScriptedBackend>, default: Strategy) -> Orchestrator {
        Orchestrator::new(deterministic(), Some(agentic(backend)), default, RunOptions::default())
            .unwrap()
    }

    fn deterministic_only() -> Orchestrator {
        Orchestrator::new(
            deterministic(),
            None,
            Strategy::Deterministic,
            RunOptions::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_scenario_full_overlap_is_strong_match() {
        let result = deterministic_only()
            .run_analysis("Experto en Python y Docker", "Buscamos Python y Docker")
            .await
            .unwrap();

        assert_eq!(result.extracted_data.candidate_skills, vec!["docker", "python"]);
        assert_eq!(result.extracted_data.job_skills, vec!["docker", "python"]);
        assert_eq!(result.features["jaccard_index"], json!(1.0));
        assert_eq!(result.features["overlap_count"], json!(2));
        assert_eq!(result.affinity_score, 100);
        assert!(result.match_reason.starts_with("Strong match!"));
        assert!(result.match_reason.contains('2'));
    }

    #[tokio::test]
    async fn test_scenario_no_candidate_skills_is_low_affinity() {
        let result = deterministic_only()
            .run_analysis("Me encanta la cocina y el ciclismo", "Se requiere Java y Kubernetes")
            .await
            .unwrap();

        assert!(result.extracted_data.candidate_skills.is_empty());
        assert_eq!(result.extracted_data.job_skills, vec!["java", "kubernetes"]);
        assert_eq!(result.features["jaccard_index"], json!(0.0));
        assert_eq!(result.features["overlap_count"], json!(0));
        assert_eq!(result.affinity_score, 0);
        assert!(result.match_reason.starts_with("Low affinity."));
        assert!(result.match_reason.contains('0'));
    }

    #[tokio::test]
    async fn test_deterministic_run_is_byte_identical() {
        let orchestrator = deterministic_only();
        let candidate = "Python, SQL, Git and Linux on Azure";
        let job = "We need Python, Docker, Kubernetes and Git";

        let first = orchestrator.run_analysis(candidate, job).await.unwrap();
        let second = orchestrator.run_analysis(candidate, job).await.unwrap();

        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn test_javascript_does_not_yield_java() {
        let result = deterministic_only()
            .run_analysis("javascript", "java")
            .await
            .unwrap();
        assert!(result.extracted_data.candidate_skills.is_empty());
        assert_eq!(result.affinity_score, 0);
    }

    #[tokio::test]
    async fn test_scenario_fenced_agent_verdict_is_parsed() {
        let backend = Arc::new(ScriptedBackend::ok(&[
            r#"{"skills": ["Python", "Docker"], "summary": "Backend engineer"}"#,
            r#"{"skills": ["python"], "summary": "Python role"}"#,
            "Match: python. Gap: none.",
            "```json\n{\"affinity_score\": 75, \"match_reason\": \"Good overlap\"}\n```",
        ]));
        let orchestrator = orchestrator_with(backend.clone(), Strategy::Agentic);

        let result = orchestrator.run_analysis("cv", "jd").await.unwrap();

        assert_eq!(result.affinity_score, 75);
        assert_eq!(result.match_reason, "Good overlap");
        assert_eq!(result.features["strategy"], json!("agentic"));
        assert_eq!(result.features["candidate_summary"], json!("Backend engineer"));
        assert_eq!(result.extracted_data.candidate_skills, vec!["docker", "python"]);
        assert_eq!(result.extracted_data.job_skills, vec!["python"]);
        assert_eq!(backend.call_count(), 4);
    }

    #[tokio::test]
    async fn test_scenario_unparseable_agent_verdict_falls_back() {
        let raw = "I'm not sure, please provide more context.";
        let backend = Arc::new(ScriptedBackend::ok(&["c", "j", "cmp", raw]));
        let orchestrator = orchestrator_with(backend, Strategy::Agentic);

        let result = orchestrator.run_analysis("cv", "jd").await.unwrap();

        assert_eq!(result.affinity_score, 0);
        assert!(result.match_reason.contains(raw));
        assert!(result.features.is_empty());
    }

    #[tokio::test]
    async fn test_out_of_range_agent_score_falls_back() {
        let raw = r#"{"affinity_score": 150, "match_reason": "Perfect"}"#;
        let backend = Arc::new(ScriptedBackend::ok(&["c", "j", "cmp", raw]));

        let result = orchestrator_with(backend, Strategy::Agentic)
            .run_analysis("cv", "jd")
            .await
            .unwrap();

        assert_eq!(result.affinity_score, 0);
        assert!(result.features.is_empty());
    }

    #[tokio::test]
    async fn test_agentic_result_has_same_shape_as_deterministic() {
        let backend = Arc::new(ScriptedBackend::ok(&[
            "c",
            "j",
            "cmp",
            r#"{"affinity_score": 10, "match_reason": "weak"}"#,
        ]));
        let orchestrator = orchestrator_with(backend, Strategy::Deterministic);

        let det = orchestrator
            .run("Python", "Python", None, &RunOptions::default())
            .await
            .unwrap();
        let agent = orchestrator
            .run("Python", "Python", Some(Strategy::Agentic), &RunOptions::default())
            .await
            .unwrap();

        let keys = |r: &AnalysisResult| {
            let value = serde_json::to_value(r).unwrap();
            let mut keys: Vec<String> = value.as_object().unwrap().keys().cloned().collect();
            keys.sort();
            keys
        };
        assert_eq!(keys(&det), keys(&agent));
        assert_eq!(det.features["strategy"], json!("deterministic"));
        assert_eq!(agent.features["strategy"], json!("agentic"));
    }

    // The agentic path is intentionally NOT checked for idempotence: the backend
    // may answer differently on every run. This test only pins that two runs are
    // each well-formed, whatever they contain.
    #[tokio::test]
    async fn test_agentic_runs_are_not_required_to_match() {
        let backend = Arc::new(ScriptedBackend::ok(&[
            "c",
            "j",
            "cmp",
            r#"{"affinity_score": 70, "match_reason": "first"}"#,
            "c",
            "j",
            "cmp",
            r#"{"affinity_score": 65, "match_reason": "second"}"#,
        ]));
        let orchestrator = orchestrator_with(backend, Strategy::Agentic);

        let first = orchestrator.run_analysis("cv", "jd").await.unwrap();
        let second = orchestrator.run_analysis("cv", "jd").await.unwrap();

        assert!(first.affinity_score <= 100);
        assert!(second.affinity_score <= 100);
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_an_error_not_a_fallback() {
        let backend = Arc::new(ScriptedBackend::new(vec![Err(LlmError::RateLimited {
            retries: 3,
        })]));
        let err = orchestrator_with(backend, Strategy::Agentic)
            .run_analysis("cv", "jd")
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InferenceUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_cancellation_is_distinct_from_fallback() {
        let backend = Arc::new(ScriptedBackend::ok(&["c", "j", "cmp", "not json"]));
        let orchestrator = orchestrator_with(backend, Strategy::Agentic);
        let (tx, cancel) = CancelSignal::new();
        tx.send(true).unwrap();
        let options = RunOptions {
            stage_timeout: None,
            cancel: Some(cancel),
        };

        let err = orchestrator
            .run("cv", "jd", None, &options)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Cancelled { .. }));
    }

    #[tokio::test]
    async fn test_deterministic_ignores_cancel_signal() {
        let (tx, cancel) = CancelSignal::new();
        tx.send(true).unwrap();
        let options = RunOptions {
            stage_timeout: None,
            cancel: Some(cancel),
        };
        let result = deterministic_only()
            .run("Python", "Python", None, &options)
            .await
            .unwrap();
        assert_eq!(result.affinity_score, 100);
    }

    #[tokio::test]
    async fn test_agentic_request_without_backend_is_unavailable() {
        let err = deterministic_only()
            .run("cv", "jd", Some(Strategy::Agentic), &RunOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::StrategyUnavailable(Strategy::Agentic)
        ));
    }

    #[test]
    fn test_agentic_default_without_backend_fails_construction() {
        let result = Orchestrator::new(
            deterministic(),
            None,
            Strategy::Agentic,
            RunOptions::default(),
        );
        assert!(matches!(
            result,
            Err(AnalysisError::StrategyUnavailable(Strategy::Agentic))
        ));
    }

    #[test]
    fn test_fallback_result_embeds_raw_output() {
        let result = fallback_result("garbage", ExtractedData::default());
        assert_eq!(result.affinity_score, 0);
        assert_eq!(result.match_reason, "Error processing AI response: garbage");
        assert!(result.features.is_empty());
    }
}

//! Agent crew — runs the four agentic stages against the inference backend.
//!
//! Stages are causally ordered: extract-candidate → extract-job → compare → score.
//! Each stage's prompt embeds the previous outputs, so a stage only starts once
//! the one before it has fully returned. Cancellation and per-stage timeouts are
//! checked at every backend call.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::analysis::error::AnalysisError;
use crate::analysis::models::RunOptions;
use crate::analysis::prompts::{
    CANDIDATE_TEXT_TYPE, COMPARISON_PROMPT_TEMPLATE, EXTRACTION_PROMPT_TEMPLATE,
    EXTRACTOR_SYSTEM, JOB_TEXT_TYPE, PROCESSOR_SYSTEM, SCORER_SYSTEM, SCORING_PROMPT_TEMPLATE,
};
use crate::llm_client::prompts::{IGNORE_IRRELEVANT_INSTRUCTION, JSON_ONLY_SYSTEM};
use crate::llm_client::{InferenceBackend, LlmError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStage {
    ExtractCandidate,
    ExtractJob,
    Compare,
    Score,
}

impl fmt::Display for AgentStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AgentStage::ExtractCandidate => "extract-candidate",
            AgentStage::ExtractJob => "extract-job",
            AgentStage::Compare => "compare",
            AgentStage::Score => "score",
        };
        f.write_str(name)
    }
}

/// Raw text produced by each stage of one crew run.
#[derive(Debug, Clone, PartialEq)]
pub struct CrewOutput {
    pub candidate_extraction: String,
    pub job_extraction: String,
    pub comparison: String,
    /// Expected to hold the JSON verdict; not validated here.
    pub final_output: String,
}

pub struct AgentCrew {
    backend: Arc<dyn InferenceBackend>,
}

impl AgentCrew {
    pub fn new(backend: Arc<dyn InferenceBackend>) -> Self {
        Self { backend }
    }

    pub async fn kickoff(
        &self,
        candidate_text: &str,
        job_description: &str,
        options: &RunOptions,
    ) -> Result<CrewOutput, AnalysisError> {
        let candidate_extraction = self
            .run_stage(
                AgentStage::ExtractCandidate,
                EXTRACTOR_SYSTEM,
                &extraction_prompt(CANDIDATE_TEXT_TYPE, candidate_text),
                options,
            )
            .await?;

        let job_extraction = self
            .run_stage(
                AgentStage::ExtractJob,
                EXTRACTOR_SYSTEM,
                &extraction_prompt(JOB_TEXT_TYPE, job_description),
                options,
            )
            .await?;

        let comparison_prompt = render_template(
            COMPARISON_PROMPT_TEMPLATE,
            &[
                ("candidate_analysis", &candidate_extraction),
                ("job_analysis", &job_extraction),
            ],
        );
        let comparison = self
            .run_stage(
                AgentStage::Compare,
                PROCESSOR_SYSTEM,
                &comparison_prompt,
                options,
            )
            .await?;

        let scoring_prompt = render_template(
            SCORING_PROMPT_TEMPLATE,
            &[("comparison", &comparison), ("json_only", JSON_ONLY_SYSTEM)],
        );
        let final_output = self
            .run_stage(AgentStage::Score, SCORER_SYSTEM, &scoring_prompt, options)
            .await?;

        Ok(CrewOutput {
            candidate_extraction,
            job_extraction,
            comparison,
            final_output,
        })
    }

    async fn run_stage(
        &self,
        stage: AgentStage,
        system: &str,
        prompt: &str,
        options: &RunOptions,
    ) -> Result<String, AnalysisError> {
        if options.cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
            return Err(AnalysisError::Cancelled { stage });
        }

        let started = Instant::now();
        let call = with_deadline(self.backend.invoke(system, prompt), options.stage_timeout);

        let outcome = match &options.cancel {
            Some(cancel) => tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(AnalysisError::Cancelled { stage }),
                outcome = call => outcome,
            },
            None => call.await,
        };

        let text = match outcome {
            Deadline::Elapsed(after) => return Err(AnalysisError::TimedOut { stage, after }),
            Deadline::Done(Ok(text)) => text,
            // An empty answer is unusable output, not an outage.
            Deadline::Done(Err(LlmError::EmptyContent)) => {
                warn!(%stage, "Agent stage returned empty content");
                String::new()
            }
            Deadline::Done(Err(source)) => {
                return Err(AnalysisError::InferenceUnavailable { stage, source })
            }
        };

        info!(
            %stage,
            elapsed_ms = started.elapsed().as_millis() as u64,
            output_len = text.len(),
            "Agent stage completed"
        );
        debug!(%stage, output = %text, "Agent stage output");

        Ok(text)
    }
}

fn extraction_prompt(text_type: &str, text: &str) -> String {
    render_template(
        EXTRACTION_PROMPT_TEMPLATE,
        &[
            ("text_type", text_type),
            ("text", text),
            ("ignore_instruction", IGNORE_IRRELEVANT_INSTRUCTION),
        ],
    )
}

/// Substitutes `{key}` placeholders in one pass over the template. Inserted
/// values are never rescanned, so braces in user or model text stay verbatim.
fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after_brace = &rest[start + 1..];
        let hit = vars.iter().find_map(|(key, value)| {
            after_brace
                .strip_prefix(*key)
                .and_then(|tail| tail.strip_prefix('}'))
                .map(|tail| (*value, tail))
        });
        match hit {
            Some((value, tail)) => {
                out.push_str(value);
                rest = tail;
            }
            None => {
                out.push('{');
                rest = after_brace;
            }
        }
    }
    out.push_str(rest);
    out
}

enum Deadline<T> {
    Done(T),
    Elapsed(Duration),
}

async fn with_deadline<F: Future>(call: F, limit: Option<Duration>) -> Deadline<F::Output> {
    match limit {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(output) => Deadline::Done(output),
            Err(_) => Deadline::Elapsed(limit),
        },
        None => Deadline::Done(call.await),
    }
}

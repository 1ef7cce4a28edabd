use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::analysis::models::Strategy;

const DEFAULT_MODEL_NAME: &str = "llama-3.1-8b-instant";
const DEFAULT_LLM_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const DEFAULT_STAGE_TIMEOUT_SECS: u64 = 60;

/// Skills recognized by the deterministic extractor when `SKILL_VOCABULARY` is unset.
pub const DEFAULT_SKILL_VOCABULARY: &[&str] = &[
    "python",
    "fastapi",
    "azure",
    "mongodb",
    "sql",
    "java",
    "docker",
    "kubernetes",
    "react",
    "scrum",
    "git",
    "linux",
];

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rust_log: String,
    pub default_strategy: Strategy,
    /// Inference backend settings. `None` when no API key is configured.
    pub llm: Option<LlmConfig>,
    pub skill_vocabulary: Vec<String>,
    pub stage_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub model_name: String,
    pub api_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let default_strategy = match optional_env("ANALYSIS_STRATEGY") {
            Some(raw) => parse_strategy(&raw)?,
            None => Strategy::Deterministic,
        };

        let llm = optional_env("GROQ_API_KEY").map(|api_key| LlmConfig {
            api_key,
            model_name: optional_env("MODEL_NAME")
                .unwrap_or_else(|| DEFAULT_MODEL_NAME.to_string()),
            api_url: optional_env("LLM_API_URL")
                .unwrap_or_else(|| DEFAULT_LLM_API_URL.to_string()),
        });

        if default_strategy == Strategy::Agentic && llm.is_none() {
            bail!("ANALYSIS_STRATEGY=agentic requires GROQ_API_KEY to be set");
        }

        let skill_vocabulary = match optional_env("SKILL_VOCABULARY") {
            Some(raw) => parse_vocabulary(&raw),
            None => DEFAULT_SKILL_VOCABULARY
                .iter()
                .map(|s| s.to_string())
                .collect(),
        };

        let stage_timeout_secs = match optional_env("AGENT_STAGE_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .context("AGENT_STAGE_TIMEOUT_SECS must be a whole number of seconds")?,
            None => DEFAULT_STAGE_TIMEOUT_SECS,
        };

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            default_strategy,
            llm,
            skill_vocabulary,
            stage_timeout: Duration::from_secs(stage_timeout_secs),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Reads an env var, treating blank values as unset.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_strategy(raw: &str) -> Result<Strategy> {
    match raw.to_ascii_lowercase().as_str() {
        "deterministic" => Ok(Strategy::Deterministic),
        "agentic" => Ok(Strategy::Agentic),
        other => bail!("ANALYSIS_STRATEGY must be 'deterministic' or 'agentic', got '{other}'"),
    }
}

/// Splits a comma-separated vocabulary into trimmed, lowercased, unique entries.
/// Order of first appearance is kept.
pub fn parse_vocabulary(raw: &str) -> Vec<String> {
    let mut vocabulary: Vec<String> = Vec::new();
    for entry in raw.split(',') {
        let skill = entry.trim().to_lowercase();
        if !skill.is_empty() && !vocabulary.contains(&skill) {
            vocabulary.push(skill);
        }
    }
    vocabulary
}

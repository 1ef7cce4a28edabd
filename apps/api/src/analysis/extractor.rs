//! Skill extraction — maps free text to the recognized skills it mentions.

use regex::Regex;
use serde::Deserialize;

use crate::analysis::models::SkillSet;
use crate::llm_client::parse_json_reply;

/// One compiled whole-word pattern per vocabulary entry.
struct SkillPattern {
    skill: String,
    pattern: Regex,
}

/// Rule-based extractor over a fixed vocabulary.
///
/// A skill is found when it appears as a whole word in the lowercased text,
/// so "java" never matches inside "javascript". Built once at startup and shared
/// read-only across requests.
pub struct SkillExtractor {
    patterns: Vec<SkillPattern>,
}

impl SkillExtractor {
    pub fn new<I, S>(vocabulary: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut patterns: Vec<SkillPattern> = Vec::new();
        for entry in vocabulary {
            let skill = entry.as_ref().trim().to_lowercase();
            if skill.is_empty() || patterns.iter().any(|p| p.skill == skill) {
                continue;
            }
            let pattern = Regex::new(&format!(r"\b{}\b", regex::escape(&skill)))?;
            patterns.push(SkillPattern { skill, pattern });
        }
        Ok(Self { patterns })
    }

    pub fn vocabulary(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|p| p.skill.as_str())
    }

    pub fn extract(&self, text: &str) -> SkillSet {
        let text_lower = text.to_lowercase();
        SkillSet::from_tokens(
            self.patterns
                .iter()
                .filter(|p| p.pattern.is_match(&text_lower))
                .map(|p| p.skill.as_str()),
        )
    }
}

/// Best-effort structured view of an agent extraction stage.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentExtraction {
    pub skills: SkillSet,
    pub summary: String,
}

#[derive(Debug, Deserialize)]
struct RawAgentExtraction {
    #[serde(default)]
    skills: Vec<String>,
    #[serde(default)]
    summary: String,
}

impl AgentExtraction {
    /// Parses `{"skills": [...], "summary": "..."}`; anything else keeps the raw
    /// text as the summary with no skills. Extraction output is advisory, so a
    /// malformed response here is never an error.
    pub fn parse(raw: &str) -> Self {
        match parse_json_reply::<RawAgentExtraction>(raw) {
            Ok(parsed) => Self {
                skills: SkillSet::from_tokens(parsed.skills),
                summary: parsed.summary,
            },
            Err(_) => Self {
                skills: SkillSet::default(),
                summary: raw.trim().to_string(),
            },
        }
    }
}

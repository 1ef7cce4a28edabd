// Prompt constants for the agentic analysis pipeline.
// Reuses cross-cutting fragments from llm_client::prompts.

/// System prompt for both extraction stages.
pub const EXTRACTOR_SYSTEM: &str = "You are a Technical Profile Extractor: an expert \
    technical recruiter with an eagle eye. You read messy CVs and job descriptions and \
    extract clean, structured lists of technologies and skills.";

/// System prompt for the comparison stage.
pub const PROCESSOR_SYSTEM: &str = "You are an HR Data Analyst: cold and methodical. \
    Your only mission is to take the candidate's skills and the job's skills, cross them \
    and report which ones match and which ones are missing.";

/// System prompt for the final scoring stage.
pub const SCORER_SYSTEM: &str = "You are the Job Affinity Judge, the final step of the \
    hiring process. Based on the technical analysis you decide whether the candidate \
    fits. You always give a numeric score and an honest, direct justification.";

/// Extraction task. Replace `{text_type}` and `{text}` before sending.
pub const EXTRACTION_PROMPT_TEMPLATE: &str = r#"Analyze the following text of type '{text_type}':

'''
{text}
'''

Extract the list of technical skills and a short professional summary (2 lines).
{ignore_instruction}

Return a JSON object:
{
  "skills": ["Python", "Docker"],
  "summary": "Two-line professional summary"
}"#;

/// Comparison task. Replace `{candidate_analysis}` and `{job_analysis}`.
pub const COMPARISON_PROMPT_TEMPLATE: &str = r#"Compare the skills extracted from the Candidate against the Job offer.

Candidate data: {candidate_analysis}
Job data: {job_analysis}

Identify:
1. Skills that match (Match).
2. Skills required by the job that the candidate does NOT have (Gap).

Answer with the list of matches and the list of gaps."#;

/// Scoring task. Replace `{comparison}` and `{json_only}`.
pub const SCORING_PROMPT_TEMPLATE: &str = r#"Based on this comparison:
{comparison}

Assign an Affinity Score (0 to 100).
- 100: has everything and more.
- 50: has half.
- 0: has nothing.

{json_only}
Use this EXACT format with exactly these two keys:
{
  "affinity_score": 75,
  "match_reason": "Short explanation of why..."
}"#;

pub const CANDIDATE_TEXT_TYPE: &str = "Candidate";
pub const JOB_TEXT_TYPE: &str = "Job Offer";

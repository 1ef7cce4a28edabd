// Shared prompt fragments. Each pipeline that calls the backend keeps its own
// prompts.rs alongside it and appends these where needed.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Appended to every agent task so stages ignore personal data noise.
pub const IGNORE_IRRELEVANT_INSTRUCTION: &str = "\
    Ignore irrelevant information such as addresses, phone numbers or hobbies.";

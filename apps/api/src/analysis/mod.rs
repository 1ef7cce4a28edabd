// Candidate/job affinity analysis.
// Deterministic path: extractor → similarity → scorer.
// Agentic path: agent crew stages, JSON verdict parsing and fallback.
// All backend calls go through llm_client::InferenceBackend.

pub mod agent;
pub mod error;
pub mod extractor;
pub mod handlers;
pub mod models;
pub mod orchestrator;
pub mod prompts;
pub mod scorer;
pub mod similarity;
pub mod store;

// Viva scoring: an LLM scorer with a deterministic fallback, assembled into
// an `Evaluation` whose totals are always derived locally.
// All LLM calls go through llm_client.

pub mod evaluator;
pub mod handlers;
pub mod prompts;
pub mod scorer;

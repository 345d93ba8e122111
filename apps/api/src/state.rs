use crate::config::Config;
use crate::evaluation::evaluator::Evaluator;
use crate::results::sink::ResultSink;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// LLM scorer when `ANTHROPIC_API_KEY` is set, heuristic otherwise.
    pub evaluator: Evaluator,
    pub sink: ResultSink,
}

//! Webhook Controller: receives call-platform events and, for terminal ones,
//! runs extraction → parsing → evaluation → persistence exactly once per call.
//!
//! The platform only ever sees 200 (processed, skipped or degraded), 401 (bad
//! signature) or 500 (unexpected failure, which it retries).

pub mod controller;
pub mod handlers;
pub mod metadata;
pub mod retry;
pub mod signature;

//! Turning a raw call-completion payload into scored-ready Q&A pairs.
//!
//! Flow: locate (raw JSON → typed records) → extract (records → normalized
//! transcript) → parse (transcript → Q&A pairs). All three steps are pure.

pub mod extractor;
pub mod locator;
pub mod parser;

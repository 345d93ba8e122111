// Result persistence: one durable record per call id in the primary store,
// mirrored best-effort to a secondary store.

pub mod handlers;
#[cfg(test)]
pub mod memory;
pub mod mirror;
pub mod sink;
pub mod store;

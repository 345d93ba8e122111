//! In-memory store and mirror for tests, with failure injection.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::models::result::ResultRecord;
use crate::results::mirror::ResultMirror;
use crate::results::sink::SinkError;
use crate::results::store::ResultStore;

#[derive(Default)]
pub struct MemoryResultStore {
    records: Mutex<Vec<ResultRecord>>,
    hidden: Mutex<HashSet<String>>,
    pub schema_ready: AtomicBool,
    pub schema_checks: AtomicUsize,
    pub append_calls: AtomicUsize,
    failures_left: AtomicUsize,
    drift_next: AtomicBool,
}

impl MemoryResultStore {
    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// Makes the next `n` appends fail with a store error.
    pub fn fail_next_appends(&self, n: usize) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    /// Makes the next append fail as if a column had been dropped.
    pub fn drift_next_append(&self) {
        self.drift_next.store(true, Ordering::SeqCst);
    }

    /// `exists` reports `call_id` as absent even once stored, as a concurrent
    /// delivery would see it.
    pub fn hide_from_exists(&self, call_id: &str) {
        self.hidden.lock().unwrap().insert(call_id.to_string());
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn ensure_schema(&self) -> Result<(), SinkError> {
        self.schema_checks.fetch_add(1, Ordering::SeqCst);
        self.schema_ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn exists(&self, call_id: &str) -> Result<bool, SinkError> {
        if self.hidden.lock().unwrap().contains(call_id) {
            return Ok(false);
        }
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .any(|r| r.call_id == call_id))
    }

    async fn append(&self, record: &ResultRecord) -> Result<bool, SinkError> {
        self.append_calls.fetch_add(1, Ordering::SeqCst);
        if self.drift_next.swap(false, Ordering::SeqCst) {
            return Err(SinkError::SchemaDrift(
                "column \"evaluation\" does not exist".to_string(),
            ));
        }
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(SinkError::Store("simulated append failure".to_string()));
        }

        let mut records = self.records.lock().unwrap();
        if records.iter().any(|r| r.call_id == record.call_id) {
            return Ok(false);
        }
        records.push(record.clone());
        Ok(true)
    }

    async fn find(&self, call_id: &str) -> Result<Option<ResultRecord>, SinkError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.call_id == call_id)
            .cloned())
    }
}

#[derive(Default)]
pub struct MemoryMirror {
    upserts: Mutex<Vec<String>>,
    fail: bool,
}

impl MemoryMirror {
    pub fn failing() -> Self {
        Self {
            upserts: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn call_ids(&self) -> Vec<String> {
        self.upserts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResultMirror for MemoryMirror {
    async fn upsert(&self, record: &ResultRecord) -> Result<(), SinkError> {
        if self.fail {
            return Err(SinkError::Store("simulated mirror failure".to_string()));
        }
        self.upserts.lock().unwrap().push(record.call_id.clone());
        Ok(())
    }
}

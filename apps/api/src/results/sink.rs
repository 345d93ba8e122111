//! Result Sink: idempotent, self-healing persistence of one record per call.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::result::ResultRecord;
use crate::results::mirror::ResultMirror;
use crate::results::store::ResultStore;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("no result store is configured")]
    NotConfigured,

    #[error("{0}")]
    Store(String),

    /// The target table or one of its columns is missing.
    #[error("result schema is out of date: {0}")]
    SchemaDrift(String),
}

impl SinkError {
    /// Only store errors can succeed on another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SinkError::Store(_) | SinkError::SchemaDrift(_))
    }
}

/// Postgres `undefined_table` and `undefined_column`.
const SCHEMA_DRIFT_CODES: &[&str] = &["42P01", "42703"];

impl From<sqlx::Error> for SinkError {
    fn from(e: sqlx::Error) -> Self {
        let drift = match &e {
            sqlx::Error::Database(db) => db
                .code()
                .is_some_and(|code| SCHEMA_DRIFT_CODES.contains(&code.as_ref())),
            _ => false,
        };
        if drift {
            SinkError::SchemaDrift(e.to_string())
        } else {
            SinkError::Store(e.to_string())
        }
    }
}

impl From<SinkError> for AppError {
    fn from(e: SinkError) -> Self {
        match e {
            SinkError::NotConfigured => AppError::NotConfigured("result store".to_string()),
            SinkError::Store(msg) | SinkError::SchemaDrift(msg) => AppError::Storage(msg),
        }
    }
}

/// Outcome of a successful save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// A new record was written.
    Synced,
    /// A record for this call already existed; nothing was written.
    AlreadySynced,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Synced => "synced",
            SyncStatus::AlreadySynced => "already_synced",
        }
    }

    /// The soft-success note reported alongside a duplicate.
    pub fn note(&self) -> Option<&'static str> {
        match self {
            SyncStatus::Synced => None,
            SyncStatus::AlreadySynced => Some("already exists"),
        }
    }
}

#[derive(Clone, Default)]
pub struct ResultSink {
    store: Option<Arc<dyn ResultStore>>,
    mirror: Option<Arc<dyn ResultMirror>>,
    /// Set once the schema has been repaired; cleared when a write reports
    /// a missing table or column.
    schema_verified: Arc<AtomicBool>,
}

impl ResultSink {
    pub fn new(store: Option<Arc<dyn ResultStore>>, mirror: Option<Arc<dyn ResultMirror>>) -> Self {
        Self {
            store,
            mirror,
            schema_verified: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.store.is_some()
    }

    pub fn has_mirror(&self) -> bool {
        self.mirror.is_some()
    }

    /// Saves `record` unless a record with its `call_id` already exists.
    ///
    /// The schema is verified (and repaired) before the first write, and again
    /// after any write that found it out of date. A new write is mirrored to
    /// the secondary store; mirror failures are logged only.
    pub async fn save(&self, record: &ResultRecord) -> Result<SyncStatus, SinkError> {
        let store = self.store.as_ref().ok_or(SinkError::NotConfigured)?;
        let call_id = record.call_id.as_str();

        if !self.schema_verified.load(Ordering::Acquire) {
            store.ensure_schema().await?;
            self.schema_verified.store(true, Ordering::Release);
        }

        if store.exists(call_id).await.map_err(|e| self.on_store_error(e))? {
            info!(call_id, "Result already stored, skipping");
            return Ok(SyncStatus::AlreadySynced);
        }

        let mut record = record.clone();
        record.truncate_transcript();

        if !store.append(&record).await.map_err(|e| self.on_store_error(e))? {
            info!(call_id, "Result stored concurrently by another delivery");
            return Ok(SyncStatus::AlreadySynced);
        }
        info!(call_id, "Result stored");

        if let Some(mirror) = &self.mirror {
            if let Err(e) = mirror.upsert(&record).await {
                warn!(call_id, "Mirroring result failed: {e}");
            }
        }

        Ok(SyncStatus::Synced)
    }

    fn on_store_error(&self, e: SinkError) -> SinkError {
        if matches!(e, SinkError::SchemaDrift(_)) {
            warn!("Result schema changed underneath us, repairing on next attempt: {e}");
            self.schema_verified.store(false, Ordering::Release);
        }
        e
    }

    pub async fn find(&self, call_id: &str) -> Result<Option<ResultRecord>, SinkError> {
        let store = self.store.as_ref().ok_or(SinkError::NotConfigured)?;
        store.find(call_id).await
    }
}

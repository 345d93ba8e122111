//! Primary result store. Postgres by default.
//!
//! The unique index on `call_id` is the source of truth for "has this call
//! been processed": `append` is `INSERT … ON CONFLICT DO NOTHING`, so two
//! instances racing on the same call cannot both write a row.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use crate::models::result::ResultRecord;
use crate::results::sink::SinkError;

pub const RESULTS_TABLE: &str = "viva_results";

/// Advisory lock key held while the schema is repaired, so instances booting
/// together do not race on `CREATE TABLE`.
const SCHEMA_LOCK_KEY: i64 = 0x7669_7661_5f72_6573;

/// Data columns in their fixed order, with the type each is (re)created with.
pub const RESULT_COLUMNS: &[(&str, &str)] = &[
    ("\"timestamp\"", "TEXT NOT NULL DEFAULT ''"),
    ("student_name", "TEXT NOT NULL DEFAULT ''"),
    ("student_email", "TEXT NOT NULL DEFAULT ''"),
    ("subject", "TEXT NOT NULL DEFAULT ''"),
    ("topics", "TEXT NOT NULL DEFAULT ''"),
    ("questions_answered", "INTEGER NOT NULL DEFAULT 0"),
    ("score", "TEXT NOT NULL DEFAULT ''"),
    ("overall_feedback", "TEXT NOT NULL DEFAULT ''"),
    ("transcript", "TEXT NOT NULL DEFAULT ''"),
    ("recording_url", "TEXT NOT NULL DEFAULT ''"),
    ("evaluation", "TEXT NOT NULL DEFAULT ''"),
];

#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Creates the target structure if needed and repairs missing columns.
    async fn ensure_schema(&self) -> Result<(), SinkError>;

    async fn exists(&self, call_id: &str) -> Result<bool, SinkError>;

    /// Appends the record. Returns `false` when a record with the same
    /// `call_id` already exists; nothing is written in that case.
    async fn append(&self, record: &ResultRecord) -> Result<bool, SinkError>;

    async fn find(&self, call_id: &str) -> Result<Option<ResultRecord>, SinkError>;
}

pub struct PgResultStore {
    pool: PgPool,
}

impl PgResultStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub fn schema_statements() -> Vec<String> {
    let mut statements = vec![format!(
        "CREATE TABLE IF NOT EXISTS {RESULTS_TABLE} (\
            id UUID PRIMARY KEY, \
            call_id TEXT NOT NULL, \
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW())"
    )];
    statements.extend(
        RESULT_COLUMNS
            .iter()
            .map(|(name, ty)| format!("ALTER TABLE {RESULTS_TABLE} ADD COLUMN IF NOT EXISTS {name} {ty}")),
    );
    statements.push(format!(
        "CREATE UNIQUE INDEX IF NOT EXISTS {RESULTS_TABLE}_call_id_key ON {RESULTS_TABLE} (call_id)"
    ));
    statements
}

#[async_trait]
impl ResultStore for PgResultStore {
    async fn ensure_schema(&self) -> Result<(), SinkError> {
        // DDL is transactional in Postgres: a crash mid-way leaves the table
        // as it was, and the next save runs the whole repair again.
        let mut tx = self.pool.begin().await?;
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(SCHEMA_LOCK_KEY)
            .execute(&mut *tx)
            .await?;
        for statement in schema_statements() {
            sqlx::query(&statement).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        debug!("Result schema verified");
        Ok(())
    }

    async fn exists(&self, call_id: &str) -> Result<bool, SinkError> {
        let found: bool = sqlx::query_scalar(&format!(
            "SELECT EXISTS(SELECT 1 FROM {RESULTS_TABLE} WHERE call_id = $1)"
        ))
        .bind(call_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(found)
    }

    async fn append(&self, record: &ResultRecord) -> Result<bool, SinkError> {
        let result = sqlx::query(&format!(
            r#"
            INSERT INTO {RESULTS_TABLE}
                (id, call_id, "timestamp", student_name, student_email, subject, topics,
                 questions_answered, score, overall_feedback, transcript, recording_url, evaluation)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (call_id) DO NOTHING
            "#
        ))
        .bind(record.id)
        .bind(&record.call_id)
        .bind(&record.timestamp)
        .bind(&record.student_name)
        .bind(&record.student_email)
        .bind(&record.subject)
        .bind(&record.topics)
        .bind(record.questions_answered)
        .bind(&record.score)
        .bind(&record.overall_feedback)
        .bind(&record.transcript)
        .bind(&record.recording_url)
        .bind(&record.evaluation)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn find(&self, call_id: &str) -> Result<Option<ResultRecord>, SinkError> {
        Ok(sqlx::query_as::<_, ResultRecord>(&format!(
            r#"
            SELECT id, call_id, "timestamp", student_name, student_email, subject, topics,
                   questions_answered, score, overall_feedback, transcript, recording_url, evaluation
            FROM {RESULTS_TABLE}
            WHERE call_id = $1
            "#
        ))
        .bind(call_id)
        .fetch_optional(&self.pool)
        .await?)
    }
}

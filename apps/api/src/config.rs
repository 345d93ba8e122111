use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
///
/// Every external collaborator is optional: without `DATABASE_URL` results are
/// not persisted, without S3 settings nothing is mirrored, without
/// `ANTHROPIC_API_KEY` transcripts are scored by the heuristic, and without
/// `WEBHOOK_SECRET` signatures are not checked.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub s3: Option<S3Config>,
    pub anthropic_api_key: Option<String>,
    pub webhook_secret: Option<String>,
    pub max_marks_per_question: u32,
    pub persist_max_attempts: u32,
    pub persist_retry_delay: Duration,
    pub port: u16,
    pub rust_log: String,
}

#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub endpoint: Option<String>,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let max_marks_per_question = parse_env("MAX_MARKS_PER_QUESTION", 3)?;
        if max_marks_per_question == 0 {
            anyhow::bail!("MAX_MARKS_PER_QUESTION must be at least 1");
        }

        Ok(Config {
            database_url: optional_env("DATABASE_URL"),
            s3: S3Config::from_env(),
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            webhook_secret: optional_env("WEBHOOK_SECRET"),
            max_marks_per_question,
            persist_max_attempts: parse_env("PERSIST_MAX_ATTEMPTS", 2)?.max(1),
            persist_retry_delay: Duration::from_millis(parse_env("PERSIST_RETRY_DELAY_MS", 1000)?),
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

impl S3Config {
    /// Mirroring is enabled only when a bucket and credentials are all set.
    fn from_env() -> Option<Self> {
        Some(S3Config {
            bucket: optional_env("S3_BUCKET")?,
            endpoint: optional_env("S3_ENDPOINT"),
            region: optional_env("S3_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            access_key_id: optional_env("AWS_ACCESS_KEY_ID")?,
            secret_access_key: optional_env("AWS_SECRET_ACCESS_KEY")?,
        })
    }
}

/// Reads a variable, treating unset and blank the same.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
impl Config {
    /// Everything unconfigured, zero retry delay.
    pub fn for_tests() -> Self {
        Config {
            database_url: None,
            s3: None,
            anthropic_api_key: None,
            webhook_secret: None,
            max_marks_per_question: 3,
            persist_max_attempts: 2,
            persist_retry_delay: Duration::ZERO,
            port: 0,
            rust_log: "debug".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_default_when_unset() {
        let value: u32 = parse_env("VIVA_TEST_SURELY_UNSET_VAR", 7).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_parse_env_rejects_garbage() {
        std::env::set_var("VIVA_TEST_BAD_NUMBER", "three");
        let result: Result<u32> = parse_env("VIVA_TEST_BAD_NUMBER", 3);
        assert!(result.is_err());
        std::env::remove_var("VIVA_TEST_BAD_NUMBER");
    }

    #[test]
    fn test_blank_env_is_unset() {
        std::env::set_var("VIVA_TEST_BLANK", "   ");
        assert!(optional_env("VIVA_TEST_BLANK").is_none());
        std::env::remove_var("VIVA_TEST_BLANK");
    }
}

//! Secondary, best-effort copy of each stored result.

use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::config::S3Config;
use crate::models::result::ResultRecord;
use crate::results::sink::SinkError;

#[async_trait]
pub trait ResultMirror: Send + Sync {
    /// Writes `record` under its `call_id`, replacing any earlier copy.
    async fn upsert(&self, record: &ResultRecord) -> Result<(), SinkError>;
}

/// Stores each result as `results/{call_id}.json` in an S3 (or MinIO) bucket.
pub struct S3Mirror {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Mirror {
    pub async fn from_config(config: &S3Config) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "viva-static",
        );

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials);
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        Self {
            client: aws_sdk_s3::Client::new(&sdk_config),
            bucket: config.bucket.clone(),
        }
    }
}

/// `results/{call_id}.json`. An id that needs characters replaced to be
/// path-safe also gets a short digest of the raw id, so distinct ids never
/// share a key.
pub fn object_key(call_id: &str) -> String {
    let safe: String = call_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if safe == call_id {
        return format!("results/{safe}.json");
    }
    let digest = hex::encode(Sha256::digest(call_id.as_bytes()));
    format!("results/{safe}-{}.json", &digest[..12])
}

#[async_trait]
impl ResultMirror for S3Mirror {
    async fn upsert(&self, record: &ResultRecord) -> Result<(), SinkError> {
        let key = object_key(&record.call_id);
        let body = serde_json::to_vec_pretty(record)
            .map_err(|e| SinkError::Store(format!("Failed to serialize result: {e}")))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(body))
            .content_type("application/json")
            .send()
            .await
            .map_err(|e| SinkError::Store(format!("S3 upload failed: {e}")))?;

        info!("Mirrored result to s3://{}/{}", self.bucket, key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_is_path_safe() {
        assert_eq!(object_key("abc-123"), "results/abc-123.json");
        assert_eq!(object_key("unknown-1700000000000"), "results/unknown-1700000000000.json");
        assert_eq!(
            object_key("../etc/passwd"),
            "results/.._etc_passwd-7fef78f53440.json"
        );
    }

    #[test]
    fn test_replaced_characters_do_not_collide() {
        assert_eq!(object_key("a_b"), "results/a_b.json");
        assert_eq!(object_key("a/b"), "results/a_b-c14cddc033f6.json");
        assert_ne!(object_key("a/b"), object_key("a b"));
    }
}

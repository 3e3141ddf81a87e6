// Publisher: stores the rendered document and records the job.
// Both steps must succeed; either failure fails the whole job.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";
pub const STATUS_PENDING: &str = "pending";

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("upload failed: {0}")]
    Upload(String),

    #[error("queue record insert failed: {0}")]
    Record(String),
}

/// One row in `redaction_queue`. `result` stays NULL until a worker fills it in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueRecord {
    pub id: Uuid,
    pub file_name: String,
    pub file_url: String,
    pub status: String,
    pub result: Option<serde_json::Value>,
}

impl QueueRecord {
    pub fn pending(file_name: impl Into<String>, file_url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_name: file_name.into(),
            file_url: file_url.into(),
            status: STATUS_PENDING.to_string(),
            result: None,
        }
    }
}

/// Storage and queue collaborator.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Stores `bytes` under `object_name` and returns its public URL.
    async fn upload(
        &self,
        object_name: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<String, PublishError>;

    async fn enqueue(&self, record: &QueueRecord) -> Result<(), PublishError>;
}

/// S3-compatible object storage plus the Postgres queue table.
pub struct S3Publisher {
    s3: aws_sdk_s3::Client,
    bucket: String,
    public_base_url: String,
    db: PgPool,
}

impl S3Publisher {
    pub fn new(
        s3: aws_sdk_s3::Client,
        bucket: impl Into<String>,
        public_base_url: impl Into<String>,
        db: PgPool,
    ) -> Self {
        Self {
            s3,
            bucket: bucket.into(),
            public_base_url: public_base_url.into(),
            db,
        }
    }
}

/// `{base}/{bucket}/{key}`, tolerating a trailing slash on the base URL.
pub fn public_url(base: &str, bucket: &str, key: &str) -> String {
    format!("{}/{}/{}", base.trim_end_matches('/'), bucket, key)
}

#[async_trait]
impl Publisher for S3Publisher {
    async fn upload(
        &self,
        object_name: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<String, PublishError> {
        let size = bytes.len();
        self.s3
            .put_object()
            .bucket(&self.bucket)
            .key(object_name)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| PublishError::Upload(e.to_string()))?;

        info!("Uploaded s3://{}/{} ({size} bytes)", self.bucket, object_name);
        Ok(public_url(&self.public_base_url, &self.bucket, object_name))
    }

    async fn enqueue(&self, record: &QueueRecord) -> Result<(), PublishError> {
        sqlx::query(
            r#"
            INSERT INTO redaction_queue (id, file_name, file_url, status, result)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(record.id)
        .bind(&record.file_name)
        .bind(&record.file_url)
        .bind(&record.status)
        .bind(&record.result)
        .execute(&self.db)
        .await
        .map_err(|e| PublishError::Record(e.to_string()))?;

        info!("Queued redaction job {} for {}", record.id, record.file_name);
        Ok(())
    }
}

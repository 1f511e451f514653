use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{params, Connection};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{PipelineError, Result};

use super::Database;

/// One persisted extraction. `text_json` is the JSON string encoding of the
/// extracted text, exactly as handed to the sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    pub id: String,
    pub text_json: String,
    /// Hex SHA-256 of the encoded response image.
    pub image_sha256: String,
    /// `"upload"` or `"url"`.
    pub source: String,
    pub created_at: DateTime<Utc>,
}

impl ExtractionRecord {
    pub fn new(text_json: String, encoded_image: &[u8], source: &str) -> Self {
        Self {
            id: nanoid::nanoid!(),
            text_json,
            image_sha256: format!("{:x}", Sha256::digest(encoded_image)),
            source: source.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Destination for completed extractions.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn persist(&self, record: &ExtractionRecord) -> Result<()>;

    /// Liveness check for health reporting.
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

pub struct LibSqlSink {
    db: Database,
}

impl LibSqlSink {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn conn(&self) -> Connection {
        self.db.connect()
    }

    /// Most recent records first.
    pub async fn latest(&self, limit: u32) -> Result<Vec<ExtractionRecord>> {
        let mut rows = self
            .conn()
            .query(
                "SELECT id, text_json, image_sha256, source, created_at FROM extractions \
                 ORDER BY created_at DESC, rowid DESC LIMIT ?1",
                params![i64::from(limit)],
            )
            .await?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(Self::row_to_record(&row)?);
        }
        Ok(records)
    }

    fn row_to_record(row: &libsql::Row) -> Result<ExtractionRecord> {
        let created_at: String = row.get(4)?;
        Ok(ExtractionRecord {
            id: row.get(0)?,
            text_json: row.get(1)?,
            image_sha256: row.get(2)?,
            source: row.get(3)?,
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .map_err(|e| PipelineError::Persistence(format!("Invalid created_at: {e}")))?
                .with_timezone(&Utc),
        })
    }
}

#[async_trait]
impl ResultSink for LibSqlSink {
    async fn persist(&self, record: &ExtractionRecord) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO extractions (id, text_json, image_sha256, source, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.id.clone(),
                    record.text_json.clone(),
                    record.image_sha256.clone(),
                    record.source.clone(),
                    record.created_at.to_rfc3339(),
                ],
            )
            .await?;

        tracing::debug!(id = %record.id, source = %record.source, "Extraction persisted");
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        self.conn().query("SELECT 1", ()).await?;
        Ok(())
    }
}

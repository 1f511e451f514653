use libsql::{Builder, Connection};
use std::sync::Arc;

use crate::config::DatabaseConfig;
use crate::error::Result;

use super::schema;

/// Handle to the extraction store.
///
/// A single connection is opened up front and shared; for `:memory:` every
/// fresh connection would otherwise see its own empty database.
#[derive(Clone)]
pub struct Database {
    // Owns the handle the shared connection was opened from.
    _db: Arc<libsql::Database>,
    conn: Connection,
    remote: bool,
}

impl Database {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let remote = config.url.starts_with("libsql://") || config.url.starts_with("https://");
        let db = if remote {
            Builder::new_remote(
                config.url.clone(),
                config.auth_token.clone().unwrap_or_default(),
            )
            .build()
            .await?
        } else if config.url == ":memory:" {
            Builder::new_local(":memory:").build().await?
        } else {
            let path = config.url.strip_prefix("file:").unwrap_or(&config.url);
            Builder::new_local(path).build().await?
        };

        let conn = db.connect()?;
        let database = Self {
            _db: Arc::new(db),
            conn,
            remote,
        };
        database.configure().await;
        schema::init_schema(&database.conn).await?;

        tracing::info!(url = %redact(&config.url), "Extraction store ready");
        Ok(database)
    }

    pub fn connect(&self) -> Connection {
        self.conn.clone()
    }

    async fn configure(&self) {
        if self.remote {
            return;
        }
        if let Err(error) = self.conn.execute_batch("PRAGMA busy_timeout = 5000").await {
            tracing::warn!(error = %error, "Failed to set SQLite busy_timeout");
        }
        if let Err(error) = self.conn.execute_batch("PRAGMA journal_mode = WAL").await {
            tracing::warn!(error = %error, "Failed to set SQLite journal_mode");
        }
    }
}

/// Strip any query string (where tokens sometimes ride along) before logging.
fn redact(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

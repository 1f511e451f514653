use libsql::Connection;

use crate::error::Result;

pub async fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- One row per successful extraction
        CREATE TABLE IF NOT EXISTS extractions (
            id TEXT PRIMARY KEY,
            text_json TEXT NOT NULL,
            image_sha256 TEXT NOT NULL,
            source TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_extractions_created_at ON extractions(created_at);
        CREATE INDEX IF NOT EXISTS idx_extractions_image_sha256 ON extractions(image_sha256);
        "#,
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use libsql::Builder;

    #[tokio::test]
    async fn test_extractions_table_columns() {
        let db = Builder::new_local(":memory:").build().await.unwrap();
        let conn = db.connect().unwrap();

        init_schema(&conn).await.unwrap();

        let mut rows = conn
            .query("SELECT name FROM pragma_table_info('extractions')", ())
            .await
            .unwrap();

        let mut columns = Vec::new();
        while let Some(row) = rows.next().await.unwrap() {
            columns.push(row.get::<String>(0).unwrap());
        }

        assert_eq!(
            columns,
            vec!["id", "text_json", "image_sha256", "source", "created_at"]
        );
    }

    #[tokio::test]
    async fn test_init_schema_is_idempotent() {
        let db = Builder::new_local(":memory:").build().await.unwrap();
        let conn = db.connect().unwrap();

        init_schema(&conn).await.unwrap();
        init_schema(&conn).await.unwrap();
    }
}

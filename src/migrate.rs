use anyhow::Result;
use sqlx::SqlitePool;

/// Creates the syllabus material schema. Idempotent — runs at startup and
/// from `learnova init`.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS syllabus_materials (
            id TEXT PRIMARY KEY,
            filename TEXT NOT NULL UNIQUE,
            education_level TEXT NOT NULL,
            subject TEXT NOT NULL,
            upload_date TEXT NOT NULL,
            content TEXT NOT NULL,
            dedup_hash TEXT NOT NULL,
            embedding BLOB
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_syllabus_upload_date ON syllabus_materials(upload_date)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

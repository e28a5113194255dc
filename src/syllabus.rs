//! Persistent syllabus material store.
//!
//! Each ingested syllabus document is one row: extracted text, the metadata
//! captured at ingestion time, and (when embeddings are enabled) an embedding
//! vector for retrieval. Re-uploading a filename replaces its row — overwrite
//! semantics, same as the file store.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::models::{SyllabusMaterial, SyllabusMetadata};

/// A stored material surfaced to prompt assembly, with its relevance score.
#[derive(Debug, Clone)]
pub struct RankedMaterial {
    pub filename: String,
    pub content: String,
    pub score: f32,
}

#[derive(Clone)]
pub struct SyllabusStore {
    pool: SqlitePool,
}

impl SyllabusStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Upserts a material keyed by filename.
    pub async fn add(
        &self,
        filename: &str,
        text: &str,
        metadata: &SyllabusMetadata,
        embedding: Option<&[f32]>,
    ) -> Result<()> {
        let dedup_hash = format!("{:x}", Sha256::digest(text.as_bytes()));
        let blob = embedding.map(vec_to_blob);

        sqlx::query(
            r#"
            INSERT INTO syllabus_materials
                (id, filename, education_level, subject, upload_date, content, dedup_hash, embedding)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(filename) DO UPDATE SET
                education_level = excluded.education_level,
                subject = excluded.subject,
                upload_date = excluded.upload_date,
                content = excluded.content,
                dedup_hash = excluded.dedup_hash,
                embedding = excluded.embedding
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(filename)
        .bind(&metadata.education_level)
        .bind(&metadata.subject)
        .bind(metadata.upload_date.to_rfc3339())
        .bind(text)
        .bind(dedup_hash)
        .bind(blob)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Lists all stored materials, oldest first. Deterministic ordering keeps
    /// repeated listings identical when nothing was ingested in between.
    pub async fn list(&self) -> Result<Vec<SyllabusMaterial>> {
        let rows = sqlx::query(
            "SELECT filename, education_level, subject, upload_date, length(content) AS chars
             FROM syllabus_materials ORDER BY upload_date, filename",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut materials = Vec::with_capacity(rows.len());
        for row in rows {
            let upload_date: String = row.get("upload_date");
            materials.push(SyllabusMaterial {
                filename: row.get("filename"),
                education_level: row.get("education_level"),
                subject: row.get("subject"),
                upload_date: DateTime::parse_from_rfc3339(&upload_date)?.with_timezone(&Utc),
                chars: row.get::<i64, _>("chars") as usize,
            });
        }
        Ok(materials)
    }

    /// Ranks stored materials against a query embedding and returns the top
    /// `k` by cosine similarity. Materials without embeddings are skipped.
    ///
    /// Scoring is in-process over all rows; syllabus collections are small
    /// enough that a vector index would be overkill.
    pub async fn most_relevant(&self, query: &[f32], k: usize) -> Result<Vec<RankedMaterial>> {
        let rows = sqlx::query(
            "SELECT filename, content, embedding FROM syllabus_materials WHERE embedding IS NOT NULL",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut ranked: Vec<RankedMaterial> = rows
            .into_iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                RankedMaterial {
                    filename: row.get("filename"),
                    content: row.get("content"),
                    score: cosine_similarity(query, &blob_to_vec(&blob)),
                }
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(k);
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate;

    async fn test_store() -> SyllabusStore {
        // Single connection: each pooled connection would otherwise get its
        // own private in-memory database.
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        migrate::run_migrations(&pool).await.unwrap();
        SyllabusStore::new(pool)
    }

    fn meta(level: &str, subject: &str) -> SyllabusMetadata {
        SyllabusMetadata::now(level.to_string(), subject.to_string())
    }

    #[tokio::test]
    async fn add_and_list() {
        let store = test_store().await;
        store
            .add("bio.txt", "cells divide", &meta("high_school", "biology"), None)
            .await
            .unwrap();

        let materials = store.list().await.unwrap();
        assert_eq!(materials.len(), 1);
        assert_eq!(materials[0].filename, "bio.txt");
        assert_eq!(materials[0].subject, "biology");
        assert_eq!(materials[0].chars, "cells divide".len());
    }

    #[tokio::test]
    async fn reupload_replaces_row() {
        let store = test_store().await;
        store
            .add("bio.txt", "v1", &meta("high_school", "biology"), None)
            .await
            .unwrap();
        store
            .add("bio.txt", "v2 longer text", &meta("college", "biology"), None)
            .await
            .unwrap();

        let materials = store.list().await.unwrap();
        assert_eq!(materials.len(), 1);
        assert_eq!(materials[0].education_level, "college");
        assert_eq!(materials[0].chars, "v2 longer text".len());
    }

    #[tokio::test]
    async fn list_is_idempotent() {
        let store = test_store().await;
        store
            .add("a.txt", "alpha", &meta("high_school", "general"), None)
            .await
            .unwrap();
        store
            .add("b.txt", "beta", &meta("high_school", "general"), None)
            .await
            .unwrap();

        let first = store.list().await.unwrap();
        let second = store.list().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn most_relevant_ranks_by_cosine() {
        let store = test_store().await;
        store
            .add(
                "x.txt",
                "x axis",
                &meta("high_school", "math"),
                Some([1.0, 0.0].as_slice()),
            )
            .await
            .unwrap();
        store
            .add(
                "y.txt",
                "y axis",
                &meta("high_school", "math"),
                Some([0.0, 1.0].as_slice()),
            )
            .await
            .unwrap();
        store
            .add("none.txt", "no vector", &meta("high_school", "math"), None)
            .await
            .unwrap();

        let ranked = store.most_relevant(&[1.0, 0.1], 2).await.unwrap();
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].filename, "x.txt");
        assert!(ranked[0].score > ranked[1].score);
    }
}

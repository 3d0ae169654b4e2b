use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

/// Row of the `documents` table. The full record lives in `payload_json`;
/// the other columns exist for filtering and listing.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DocumentRow {
    pub id: i64,
    pub doc_key: String,
    pub filename: String,
    pub format: String,
    pub size: i64,
    pub category: String,
    pub content_hash: String,
    pub document_type: Option<String>,
    pub issuing_agency: Option<String>,
    pub issue_date: Option<String>,
    pub payload_json: String,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct NewDocument {
    pub doc_key: String,
    pub filename: String,
    pub format: String,
    pub size: i64,
    pub category: String,
    pub content_hash: String,
    pub document_type: Option<String>,
    pub issuing_agency: Option<String>,
    pub issue_date: Option<String>,
    pub payload_json: String,
    /// Normalized text matched by `search`.
    pub search_text: String,
}

const COLUMNS: &str = "id, doc_key, filename, format, size, category, content_hash, \
     document_type, issuing_agency, issue_date, payload_json, created_at";

pub struct DocumentRepository {
    pool: SqlitePool,
}

impl DocumentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts a new row and returns its id. Rows are never updated in place.
    pub async fn insert(&self, doc: NewDocument) -> anyhow::Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO documents
                (doc_key, filename, format, size, category, content_hash,
                 document_type, issuing_agency, issue_date, payload_json, search_text)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&doc.doc_key)
        .bind(&doc.filename)
        .bind(&doc.format)
        .bind(doc.size)
        .bind(&doc.category)
        .bind(&doc.content_hash)
        .bind(&doc.document_type)
        .bind(&doc.issuing_agency)
        .bind(&doc.issue_date)
        .bind(&doc.payload_json)
        .bind(&doc.search_text)
        .execute(&self.pool)
        .await?;
        let id = result.last_insert_rowid();
        debug!(id, doc_key = %doc.doc_key, category = %doc.category, "document row inserted");
        Ok(id)
    }

    pub async fn get(&self, id: i64) -> anyhow::Result<Option<DocumentRow>> {
        let sql = format!("SELECT {} FROM documents WHERE id = ?1", COLUMNS);
        let row = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Lists rows, optionally restricted to one category, oldest first.
    pub async fn list(&self, category: Option<&str>) -> anyhow::Result<Vec<DocumentRow>> {
        let rows = match category {
            Some(c) => {
                let sql = format!(
                    "SELECT {} FROM documents WHERE category = ?1 ORDER BY id",
                    COLUMNS
                );
                sqlx::query_as::<_, DocumentRow>(&sql)
                    .bind(c)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!("SELECT {} FROM documents ORDER BY id", COLUMNS);
                sqlx::query_as::<_, DocumentRow>(&sql)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(rows)
    }

    pub async fn find_by_hash(&self, content_hash: &str) -> anyhow::Result<Vec<DocumentRow>> {
        let sql = format!(
            "SELECT {} FROM documents WHERE content_hash = ?1 ORDER BY id",
            COLUMNS
        );
        let rows = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(content_hash)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Rows whose filename or search text contains `needle`, optionally
    /// restricted to one category, oldest first. `%` and `_` in the needle
    /// match literally.
    pub async fn search(
        &self,
        needle: &str,
        category: Option<&str>,
    ) -> anyhow::Result<Vec<DocumentRow>> {
        let pattern = format!("%{}%", escape_like(needle));
        let sql = format!(
            "SELECT {} FROM documents \
             WHERE (filename LIKE ?1 ESCAPE '\\' OR search_text LIKE ?1 ESCAPE '\\') \
             AND (?2 IS NULL OR category = ?2) \
             ORDER BY id",
            COLUMNS
        );
        let rows = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(pattern)
            .bind(category)
            .fetch_all(&self.pool)
            .await?;
        debug!(needle, ?category, hits = rows.len(), "document search");
        Ok(rows)
    }

    /// Returns true if a row was removed.
    pub async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Number of rows per category.
    pub async fn counts(&self) -> anyhow::Result<Vec<(String, i64)>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT category, COUNT(*) FROM documents GROUP BY category ORDER BY category",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

fn escape_like(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

//! Persistence of stored documents and the read-only snapshot queried by Q&A.

use crate::lexicon::CategoryLabel;
use crate::models::StoredDocument;
use crate::normalizer::normalize;
use anyhow::Context;
use storage::documents::{DocumentRepository, DocumentRow, NewDocument};
use tracing::{info, warn};

/// Snapshot of the stored documents at query time.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    documents: Vec<StoredDocument>,
}

impl Corpus {
    pub fn new(documents: Vec<StoredDocument>) -> Self {
        Self { documents }
    }

    /// Reads every stored document. Rows whose payload no longer decodes are
    /// skipped with a warning.
    pub async fn load(repo: &DocumentRepository) -> anyhow::Result<Self> {
        Ok(Self::new(list(repo, None).await?))
    }

    pub fn documents(&self) -> &[StoredDocument] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

fn to_row(doc: &StoredDocument) -> anyhow::Result<NewDocument> {
    let meta = &doc.analysis.metadata;
    Ok(NewDocument {
        doc_key: doc.document.id.to_string(),
        filename: doc.document.filename.clone(),
        format: doc.document.format.to_string(),
        size: i64::try_from(doc.document.size).context("document too large")?,
        category: doc.category().folder().to_string(),
        content_hash: doc.document.content_hash.clone(),
        document_type: meta.document_type.clone(),
        issuing_agency: meta.issuing_agency.clone(),
        issue_date: meta.issue_date.clone(),
        payload_json: serde_json::to_string(doc)?,
        search_text: doc.document.normalized.text(),
    })
}

fn from_row(row: DocumentRow) -> anyhow::Result<StoredDocument> {
    let mut doc: StoredDocument = serde_json::from_str(&row.payload_json)
        .with_context(|| format!("decoding stored document {}", row.id))?;
    doc.row_id = Some(row.id);
    Ok(doc)
}

/// Persists under the primary category and returns the row id.
pub async fn save(repo: &DocumentRepository, doc: &StoredDocument) -> anyhow::Result<i64> {
    let id = repo.insert(to_row(doc)?).await?;
    info!(
        id,
        filename = %doc.document.filename,
        category = %doc.category(),
        "document stored"
    );
    Ok(id)
}

pub async fn get(repo: &DocumentRepository, id: i64) -> anyhow::Result<Option<StoredDocument>> {
    repo.get(id).await?.map(from_row).transpose()
}

pub async fn list(
    repo: &DocumentRepository,
    category: Option<CategoryLabel>,
) -> anyhow::Result<Vec<StoredDocument>> {
    let rows = repo.list(category.map(|c| c.folder())).await?;
    Ok(decode_rows(rows))
}

fn decode_rows(rows: Vec<DocumentRow>) -> Vec<StoredDocument> {
    let mut docs = Vec::with_capacity(rows.len());
    for row in rows {
        let id = row.id;
        match from_row(row) {
            Ok(doc) => docs.push(doc),
            Err(e) => warn!(id, error = %e, "skipping unreadable stored document"),
        }
    }
    docs
}

/// Stored documents whose filename or text contains `keyword`. The keyword
/// is normalized like document text, so case and punctuation do not matter.
/// A keyword with no word characters matches nothing.
pub async fn search(
    repo: &DocumentRepository,
    keyword: &str,
    category: Option<CategoryLabel>,
) -> anyhow::Result<Vec<StoredDocument>> {
    let needle = normalize(keyword).text();
    if needle.is_empty() {
        return Ok(Vec::new());
    }
    let rows = repo.search(&needle, category.map(|c| c.folder())).await?;
    Ok(decode_rows(rows))
}

pub async fn delete(repo: &DocumentRepository, id: i64) -> anyhow::Result<bool> {
    let removed = repo.delete(id).await?;
    if removed {
        info!(id, "document deleted");
    }
    Ok(removed)
}

/// Row ids of stored documents with identical extracted text.
pub async fn find_duplicates(repo: &DocumentRepository, content_hash: &str) -> anyhow::Result<Vec<i64>> {
    Ok(repo
        .find_by_hash(content_hash)
        .await?
        .into_iter()
        .map(|r| r.id)
        .collect())
}

/// Stored document count per category, in category order; empty categories
/// are reported as 0.
pub async fn category_counts(repo: &DocumentRepository) -> anyhow::Result<Vec<(CategoryLabel, i64)>> {
    let counts = repo.counts().await?;
    Ok(CategoryLabel::ALL
        .into_iter()
        .map(|c| {
            let n = counts
                .iter()
                .find(|(folder, _)| folder == c.folder())
                .map(|(_, n)| *n)
                .unwrap_or(0);
            (c, n)
        })
        .collect())
}

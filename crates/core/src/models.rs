use crate::analyzer::AnalysisReport;
use crate::classifier::ClassificationResult;
use crate::lexicon::CategoryLabel;
use crate::normalizer::{normalize, NormalizedText};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Pdf,
    Docx,
    Txt,
}

impl SourceFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceFormat::Pdf => "pdf",
            SourceFormat::Docx => "docx",
            SourceFormat::Txt => "txt",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(SourceFormat::Pdf),
            "docx" => Some(SourceFormat::Docx),
            "txt" => Some(SourceFormat::Txt),
            _ => None,
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s).ok_or_else(|| format!("unsupported format: {}", s))
    }
}

/// Filename plus ingestion timestamp at nanosecond precision, e.g.
/// `report.pdf@20240610T080000.123456789`. Not a storage key: the same file
/// ingested twice gets two rows with their own row ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(filename: &str, ingested_at: DateTime<Utc>) -> Self {
        Self(format!("{}@{}", filename, ingested_at.format("%Y%m%dT%H%M%S%.9f")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extracted document. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub filename: String,
    pub format: SourceFormat,
    pub ingested_at: DateTime<Utc>,
    pub raw_text: String,
    pub normalized: NormalizedText,
    /// Size of the extracted text in bytes.
    pub size: usize,
    /// blake3 hex digest of `raw_text`.
    pub content_hash: String,
}

impl Document {
    pub fn new(
        filename: impl Into<String>,
        format: SourceFormat,
        raw_text: impl Into<String>,
        ingested_at: DateTime<Utc>,
    ) -> Self {
        let filename = filename.into();
        let raw_text = raw_text.into();
        Self {
            id: DocumentId::new(&filename, ingested_at),
            normalized: normalize(&raw_text),
            size: raw_text.len(),
            content_hash: blake3::hash(raw_text.as_bytes()).to_hex().to_string(),
            filename,
            format,
            ingested_at,
            raw_text,
        }
    }
}

/// A classified and analyzed document as persisted under its primary category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    /// Storage row id, assigned on save.
    #[serde(default)]
    pub row_id: Option<i64>,
    pub document: Document,
    pub classification: ClassificationResult,
    pub analysis: AnalysisReport,
}

impl StoredDocument {
    pub fn category(&self) -> CategoryLabel {
        self.classification.primary
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "category")]
pub enum QueryScope {
    All,
    Category(CategoryLabel),
}

impl QueryScope {
    pub fn includes(self, category: CategoryLabel) -> bool {
        match self {
            QueryScope::All => true,
            QueryScope::Category(c) => c == category,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaQuery {
    pub question: String,
    pub scope: QueryScope,
    pub use_external_synthesis: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub document_id: DocumentId,
    pub filename: String,
    pub category: CategoryLabel,
    pub excerpt: String,
    pub relevance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerMethod {
    NoEvidence,
    Local,
    External,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaResult {
    pub answer: String,
    pub citations: Vec<Citation>,
    pub method: AnswerMethod,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn document_id_combines_filename_and_timestamp() {
        let at = Utc.with_ymd_and_hms(2024, 6, 10, 8, 0, 0).unwrap();
        let doc = Document::new("a.txt", SourceFormat::Txt, "Nội dung", at);
        assert_eq!(doc.id.as_str(), "a.txt@20240610T080000.000000000");
        assert_eq!(doc.normalized.text(), "nội dung");
        assert_eq!(doc.size, "Nội dung".len());
        assert_eq!(doc.content_hash.len(), 64);
    }

    #[test]
    fn scope_filtering() {
        assert!(QueryScope::All.includes(CategoryLabel::Other));
        assert!(QueryScope::Category(CategoryLabel::Metro).includes(CategoryLabel::Metro));
        assert!(!QueryScope::Category(CategoryLabel::Metro).includes(CategoryLabel::Apartment));
    }

    #[test]
    fn formats_parse_from_extension() {
        assert_eq!("PDF".parse::<SourceFormat>(), Ok(SourceFormat::Pdf));
        assert!("xlsx".parse::<SourceFormat>().is_err());
    }
}

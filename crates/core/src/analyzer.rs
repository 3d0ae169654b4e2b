//! Derives an [`AnalysisReport`] from a document and its classification.
//!
//! Pure: the same (document, classification) pair always yields the same
//! report.

use crate::classifier::ClassificationResult;
use crate::config::AnalyzerConfig;
use crate::entities::EntityExtractor;
use crate::error::ConfigError;
use crate::lexicon::Lexicon;
use crate::metadata::{prefix_chars, DocumentMetadata, MetadataExtractor};
use crate::models::Document;
use crate::normalizer::{is_stopword, normalize, split_sentences, tokenize, NormalizedText};
use crate::rules::{self, RuleContext};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

const SUMMARY_SENTENCES: usize = 5;
const SUMMARY_PARAGRAPHS: usize = 2;
// Shorter lines are headings or list items.
const PARAGRAPH_MIN_CHARS: usize = 50;
/// Phrases at or above this weight mark a sentence as summary-worthy.
const SUMMARY_WEIGHT: u32 = 2;

const CONFIDENTIAL_MARKERS: &[&str] = &[
    "mật",
    "bí mật",
    "bảo mật",
    "tối mật",
    "không công bố",
    "confidential",
    "secret",
];
const INTERNAL_MARKERS: &[&str] = &["nội bộ", "dự thảo", "tài chính", "internal"];
const PUBLIC_MARKERS: &[&str] = &["công khai", "công bố", "thông báo", "phổ biến"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sensitivity {
    Public,
    Internal,
    Confidential,
}

impl Sensitivity {
    pub const ALL: [Sensitivity; 3] = [
        Sensitivity::Public,
        Sensitivity::Internal,
        Sensitivity::Confidential,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            Sensitivity::Public => "Công khai",
            Sensitivity::Internal => "Nội bộ",
            Sensitivity::Confidential => "Nhạy cảm",
        }
    }
}

impl fmt::Display for Sensitivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub summary: String,
    /// Ranked by frequency, then first occurrence.
    pub keywords: Vec<String>,
    /// Keywords that are lexicon phrases of any category.
    pub tags: Vec<String>,
    pub projects: Vec<String>,
    pub locations: Vec<String>,
    /// Confidence of the project/location extraction, in `[0, 1]`.
    pub extraction_confidence: f32,
    pub sensitivity: Sensitivity,
    pub suggested_actions: Vec<String>,
    #[serde(default)]
    pub metadata: DocumentMetadata,
    #[serde(default)]
    pub legal_references: Vec<String>,
}

pub struct Analyzer {
    lexicon: Arc<Lexicon>,
    cfg: AnalyzerConfig,
    entities: EntityExtractor,
    metadata: MetadataExtractor,
    confidential: Vec<Vec<String>>,
    internal: Vec<Vec<String>>,
    public: Vec<Vec<String>>,
}

impl Analyzer {
    pub fn new(lexicon: Arc<Lexicon>, cfg: AnalyzerConfig) -> Result<Self, ConfigError> {
        rules::validate(rules::RULES)?;
        Ok(Self {
            entities: EntityExtractor::new(cfg.max_entities)?,
            metadata: MetadataExtractor::new()?,
            confidential: marker_phrases(CONFIDENTIAL_MARKERS),
            internal: marker_phrases(INTERNAL_MARKERS),
            public: marker_phrases(PUBLIC_MARKERS),
            lexicon,
            cfg,
        })
    }

    pub fn analyze(&self, doc: &Document, classification: &ClassificationResult) -> AnalysisReport {
        let keywords = self.keywords(&doc.normalized);
        let tags = keywords
            .iter()
            .filter(|k| self.lexicon.is_vocabulary(k))
            .cloned()
            .collect();
        let entities = self.entities.extract(&doc.raw_text, &doc.normalized);
        let sensitivity = self.sensitivity(&doc.normalized, &doc.filename);
        let suggested_actions = rules::suggest(
            rules::RULES,
            &RuleContext {
                category: classification.primary,
                sensitivity,
                level: classification.level,
            },
        );

        AnalysisReport {
            summary: self.summary(&doc.raw_text, classification),
            keywords,
            tags,
            projects: entities.projects,
            locations: entities.locations,
            extraction_confidence: entities.confidence,
            sensitivity,
            suggested_actions,
            metadata: self.metadata.extract(&doc.raw_text, &doc.filename),
            legal_references: self.metadata.legal_references(&doc.raw_text),
        }
    }

    /// Category line followed by the leading sentences that carry strong
    /// phrases of the primary category. Without such sentences the first
    /// substantial paragraphs are used, then the first sentences.
    fn summary(&self, raw: &str, classification: &ClassificationResult) -> String {
        let sentences = split_sentences(raw);
        if sentences.is_empty() {
            return String::new();
        }
        let prefix = format!(
            "Tài liệu thuộc nhóm: {}. ",
            classification.primary.display_name()
        );

        let strong: Vec<&[String]> = self
            .lexicon
            .phrases(classification.primary)
            .iter()
            .filter(|p| p.weight >= SUMMARY_WEIGHT)
            .map(|p| p.tokens.as_slice())
            .collect();
        let prioritized: Vec<&str> = sentences
            .iter()
            .copied()
            .filter(|s| {
                let n = normalize(s);
                strong.iter().any(|p| n.contains_phrase(p))
            })
            .collect();
        let paragraphs: Vec<&str> = raw
            .lines()
            .map(str::trim)
            .filter(|p| p.chars().count() > PARAGRAPH_MIN_CHARS)
            .take(SUMMARY_PARAGRAPHS)
            .collect();
        let picked = if !prioritized.is_empty() {
            &prioritized
        } else if !paragraphs.is_empty() {
            &paragraphs
        } else {
            &sentences
        };

        let budget = self
            .cfg
            .summary_chars
            .saturating_sub(prefix.chars().count());
        let mut body = String::new();
        for part in picked.iter().take(SUMMARY_SENTENCES) {
            let extra = part.chars().count() + usize::from(!body.is_empty());
            if body.chars().count() + extra > budget {
                break;
            }
            if !body.is_empty() {
                body.push(' ');
            }
            body.push_str(part);
        }
        if body.is_empty() {
            // The first part alone exceeds the budget.
            body = format!("{}...", prefix_chars(picked[0], budget.saturating_sub(3)));
        }
        prefix + &body
    }

    /// Multi-word lexicon phrases count as one keyword; their syllables are
    /// not counted again as single tokens.
    fn keywords(&self, text: &NormalizedText) -> Vec<String> {
        let tokens = text.tokens();
        // term -> (count, first position)
        let mut stats: HashMap<String, (usize, usize)> = HashMap::new();
        let mut covered = vec![false; tokens.len()];
        for (_, phrases) in self.lexicon.iter() {
            for phrase in phrases.iter().filter(|p| p.tokens.len() > 1) {
                let width = phrase.tokens.len();
                if width > tokens.len() {
                    continue;
                }
                for (pos, window) in tokens.windows(width).enumerate() {
                    if window != phrase.tokens.as_slice() {
                        continue;
                    }
                    covered[pos..pos + width].iter_mut().for_each(|c| *c = true);
                    let entry = stats.entry(phrase.text.to_string()).or_insert((0, pos));
                    entry.0 += 1;
                }
            }
        }
        for (pos, token) in tokens.iter().enumerate() {
            if covered[pos]
                || token.chars().count() < 2
                || token.chars().all(|c| c.is_numeric())
                || is_stopword(token)
            {
                continue;
            }
            let entry = stats.entry(token.clone()).or_insert((0, pos));
            entry.0 += 1;
        }

        let mut ranked: Vec<(String, (usize, usize))> = stats.into_iter().collect();
        ranked.sort_by(|(ta, (ca, pa)), (tb, (cb, pb))| {
            cb.cmp(ca).then(pa.cmp(pb)).then(ta.cmp(tb))
        });
        ranked
            .into_iter()
            .take(self.cfg.max_keywords)
            .map(|(term, _)| term)
            .collect()
    }

    fn sensitivity(&self, text: &NormalizedText, filename: &str) -> Sensitivity {
        let name = normalize(filename);
        let found = |markers: &[Vec<String>], check_name: bool| {
            markers
                .iter()
                .any(|m| text.contains_phrase(m) || (check_name && name.contains_phrase(m)))
        };
        if found(&self.confidential, true) {
            Sensitivity::Confidential
        } else if found(&self.internal, true) {
            Sensitivity::Internal
        } else if found(&self.public, false) {
            Sensitivity::Public
        } else {
            Sensitivity::Internal
        }
    }
}

fn marker_phrases(list: &[&str]) -> Vec<Vec<String>> {
    list.iter().map(|m| tokenize(m)).collect()
}

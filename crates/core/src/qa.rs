//! Keyword retrieval over the stored corpus with pluggable answer synthesis.

use crate::config::QaConfig;
use crate::corpus::Corpus;
use crate::metadata::prefix_chars;
use crate::models::{AnswerMethod, Citation, QaQuery, QaResult, StoredDocument};
use crate::normalizer::{is_stopword, normalize, split_sentences, tokenize, NormalizedText};
use crate::synthesis::{
    AnswerSynthesizer, Excerpt, LocalSynthesizer, SynthesisRequest, NO_EVIDENCE_ANSWER,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct QaEngine {
    cfg: QaConfig,
    external: Option<Arc<dyn AnswerSynthesizer>>,
}

impl QaEngine {
    pub fn new(cfg: QaConfig) -> Self {
        Self {
            cfg,
            external: None,
        }
    }

    pub fn with_external(mut self, synthesizer: Arc<dyn AnswerSynthesizer>) -> Self {
        self.external = Some(synthesizer);
        self
    }

    pub fn has_external(&self) -> bool {
        self.external.is_some()
    }

    /// Retrieves the best-matching documents in scope and answers from them.
    /// Never fails: no evidence yields the placeholder answer and external
    /// synthesis errors fall back to local quoting.
    ///
    /// When no question term occurs in scope, a "where"/"which project"
    /// question falls back to documents with extracted location or project
    /// mentions.
    pub async fn answer(&self, query: &QaQuery, corpus: &Corpus) -> QaResult {
        let candidates: Vec<&StoredDocument> = corpus
            .documents()
            .iter()
            .filter(|d| query.scope.includes(d.category()))
            .collect();
        if candidates.is_empty() {
            info!("no documents in scope");
            return no_evidence();
        }

        let terms = question_terms(&query.question);
        let idf = inverse_document_frequency(&terms, &candidates);
        let mut evidence = Evidence::Terms;
        let mut ranked: Vec<(f64, &StoredDocument)> = candidates
            .iter()
            .map(|d| (relevance(&d.document.normalized, &terms, &idf), *d))
            .filter(|(score, _)| *score > self.cfg.min_relevance)
            .collect();
        if ranked.is_empty() {
            let intent = entity_intent(&normalize(&query.question));
            if intent.any() {
                debug!(?intent, "no term matches; ranking by entity mentions");
                evidence = Evidence::Entities(intent);
                ranked = candidates
                    .iter()
                    .map(|d| (wanted_entities(d, intent).len() as f64, *d))
                    .filter(|(score, _)| *score > self.cfg.min_relevance)
                    .collect();
            }
        }
        // Stable sort keeps corpus order between equal scores.
        ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
        ranked.truncate(self.cfg.top_k);
        if ranked.is_empty() {
            info!(candidates = candidates.len(), terms = terms.len(), "no evidence for question");
            return no_evidence();
        }

        let citations: Vec<Citation> = ranked
            .iter()
            .map(|(score, d)| {
                let raw = &d.document.raw_text;
                let excerpt = match evidence {
                    Evidence::Terms => best_excerpt(raw, &terms, &idf, self.cfg.excerpt_chars),
                    Evidence::Entities(intent) => {
                        entity_excerpt(raw, &wanted_entities(d, intent), self.cfg.excerpt_chars)
                    }
                };
                Citation {
                    document_id: d.document.id.clone(),
                    filename: d.document.filename.clone(),
                    category: d.category(),
                    excerpt,
                    relevance: *score,
                }
            })
            .collect();
        let request = SynthesisRequest {
            question: query.question.clone(),
            excerpts: citations
                .iter()
                .map(|c| Excerpt {
                    source: c.filename.clone(),
                    text: c.excerpt.clone(),
                })
                .collect(),
        };

        let (answer, method) = match (&self.external, query.use_external_synthesis) {
            (Some(external), true) => match external.synthesize(&request).await {
                Ok(answer) => (answer, AnswerMethod::External),
                Err(e) => {
                    warn!(error = %e, "external synthesis failed; answering from excerpts");
                    (LocalSynthesizer::compose(&request), AnswerMethod::Local)
                }
            },
            (None, true) => {
                warn!("external synthesis requested but not configured; answering from excerpts");
                (LocalSynthesizer::compose(&request), AnswerMethod::Local)
            }
            (_, false) => (LocalSynthesizer::compose(&request), AnswerMethod::Local),
        };
        info!(citations = citations.len(), ?method, "question answered");
        QaResult {
            answer,
            citations,
            method,
        }
    }
}

fn no_evidence() -> QaResult {
    QaResult {
        answer: NO_EVIDENCE_ANSWER.to_string(),
        citations: Vec::new(),
        method: AnswerMethod::NoEvidence,
    }
}

/// Question phrasings asking where something is.
const LOCATION_CUES: &[&str] = &[
    "ở đâu",
    "tại đâu",
    "nơi nào",
    "chỗ nào",
    "địa điểm",
    "vị trí",
    "khu vực nào",
    "where",
];

/// Question phrasings asking which project.
const PROJECT_CUES: &[&str] = &[
    "dự án nào",
    "tên dự án",
    "công trình nào",
    "tuyến nào",
    "which project",
];

#[derive(Debug, Clone, Copy)]
enum Evidence {
    Terms,
    Entities(EntityIntent),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct EntityIntent {
    locations: bool,
    projects: bool,
}

impl EntityIntent {
    fn any(self) -> bool {
        self.locations || self.projects
    }
}

fn entity_intent(question: &NormalizedText) -> EntityIntent {
    EntityIntent {
        locations: asks(question, LOCATION_CUES),
        projects: asks(question, PROJECT_CUES),
    }
}

fn asks(question: &NormalizedText, cues: &[&str]) -> bool {
    cues.iter().any(|c| question.contains_phrase(&tokenize(c)))
}

fn wanted_entities(doc: &StoredDocument, intent: EntityIntent) -> Vec<&str> {
    let report = &doc.analysis;
    let mut wanted = Vec::new();
    if intent.locations {
        wanted.extend(report.locations.iter().map(String::as_str));
    }
    if intent.projects {
        wanted.extend(report.projects.iter().map(String::as_str));
    }
    wanted
}

/// First sentence mentioning one of `entities`, case-insensitively.
fn entity_excerpt(raw: &str, entities: &[&str], max_chars: usize) -> String {
    let wanted: Vec<String> = entities.iter().map(|e| e.to_lowercase()).collect();
    let excerpt = split_sentences(raw)
        .into_iter()
        .find(|s| {
            let lowered = s.to_lowercase();
            wanted.iter().any(|e| lowered.contains(e.as_str()))
        })
        .unwrap_or_else(|| raw.trim());
    clip(excerpt, max_chars)
}

fn clip(excerpt: &str, max_chars: usize) -> String {
    if excerpt.chars().count() > max_chars {
        format!("{}...", prefix_chars(excerpt, max_chars))
    } else {
        excerpt.to_string()
    }
}

/// Distinct non-stopword question tokens.
fn question_terms(question: &str) -> BTreeSet<String> {
    normalize(question)
        .tokens()
        .iter()
        .filter(|t| !is_stopword(t))
        .cloned()
        .collect()
}

/// `ln(1 + N / df)`; terms no candidate contains get no entry.
fn inverse_document_frequency(
    terms: &BTreeSet<String>,
    docs: &[&StoredDocument],
) -> HashMap<String, f64> {
    let n = docs.len() as f64;
    terms
        .iter()
        .filter_map(|term| {
            let df = docs
                .iter()
                .filter(|d| d.document.normalized.tokens().contains(term))
                .count();
            (df > 0).then(|| (term.clone(), (1.0 + n / df as f64).ln()))
        })
        .collect()
}

fn relevance(text: &NormalizedText, terms: &BTreeSet<String>, idf: &HashMap<String, f64>) -> f64 {
    let mut tf: HashMap<&str, usize> = HashMap::new();
    for token in text.tokens() {
        if terms.contains(token) {
            *tf.entry(token.as_str()).or_default() += 1;
        }
    }
    tf.iter()
        .map(|(term, count)| *count as f64 * idf.get(*term).copied().unwrap_or(0.0))
        .sum()
}

/// The sentence covering the most question weight (distinct terms, idf
/// weighted); earliest wins ties.
fn best_excerpt(
    raw: &str,
    terms: &BTreeSet<String>,
    idf: &HashMap<String, f64>,
    max_chars: usize,
) -> String {
    let mut best: Option<(f64, &str)> = None;
    for sentence in split_sentences(raw) {
        let tokens: BTreeSet<String> = normalize(sentence).tokens().iter().cloned().collect();
        let weight: f64 = terms
            .intersection(&tokens)
            .map(|t| idf.get(t).copied().unwrap_or(0.0))
            .sum();
        if weight > best.map(|(w, _)| w).unwrap_or(0.0) {
            best = Some((weight, sentence));
        }
    }
    let excerpt = best.map(|(_, s)| s).unwrap_or_else(|| raw.trim());
    clip(excerpt, max_chars)
}

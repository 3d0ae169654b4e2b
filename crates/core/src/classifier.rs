//! Weighted keyword classifier over the category lexicon.

use crate::config::ClassifierConfig;
use crate::lexicon::{CategoryLabel, Lexicon};
use crate::normalizer::{normalize, NormalizedText};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct ClassificationInput<'a> {
    pub text: &'a NormalizedText,
    /// Source filename, used as a scoring hint.
    pub filename: Option<&'a str>,
}

impl<'a> ClassificationInput<'a> {
    pub fn text(text: &'a NormalizedText) -> Self {
        Self {
            text,
            filename: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub primary: CategoryLabel,
    pub secondary: Option<CategoryLabel>,
    /// In `[0, 1]`.
    pub confidence: f32,
    pub level: ConfidenceLevel,
    /// Raw phrase occurrences in the text, per category.
    pub match_counts: BTreeMap<CategoryLabel, u32>,
    /// Weighted scores, including filename bonuses.
    pub scores: BTreeMap<CategoryLabel, u32>,
    /// Primary category phrases that matched, in lexicon order.
    pub matched_phrases: Vec<String>,
}

impl ClassificationResult {
    fn unmatched(match_counts: BTreeMap<CategoryLabel, u32>, scores: BTreeMap<CategoryLabel, u32>) -> Self {
        Self {
            primary: CategoryLabel::Other,
            secondary: None,
            confidence: 0.0,
            level: ConfidenceLevel::Low,
            match_counts,
            scores,
            matched_phrases: Vec::new(),
        }
    }

    pub fn score(&self, category: CategoryLabel) -> u32 {
        self.scores.get(&category).copied().unwrap_or(0)
    }
}

/// Scores the text against every category. Never fails: empty or unmatched
/// input yields `Other` with confidence 0.
pub fn classify(
    input: ClassificationInput<'_>,
    lexicon: &Lexicon,
    cfg: &ClassifierConfig,
) -> ClassificationResult {
    let filename_tokens = input.filename.map(normalize);

    let mut match_counts = BTreeMap::new();
    let mut scores = BTreeMap::new();
    let mut matched: BTreeMap<CategoryLabel, Vec<String>> = BTreeMap::new();

    for (category, phrases) in lexicon.iter() {
        let mut count = 0u32;
        let mut score = 0u32;
        let hits = matched.entry(category).or_default();
        for phrase in phrases {
            let n = input.text.count_phrase(&phrase.tokens) as u32;
            let in_filename = filename_tokens
                .as_ref()
                .map(|f| f.contains_phrase(&phrase.tokens))
                .unwrap_or(false);
            count += n;
            score += phrase.weight * n;
            if in_filename {
                score += cfg.filename_bonus;
            }
            if n > 0 || in_filename {
                hits.push(phrase.text.to_string());
            }
        }
        match_counts.insert(category, count);
        scores.insert(category, score);
    }

    let Some((primary, primary_score)) = best(&scores, None) else {
        debug!(tokens = input.text.len(), "no lexicon matches; defaulting to Other");
        return ClassificationResult::unmatched(match_counts, scores);
    };

    let secondary = best(&scores, Some(primary)).and_then(|(category, score)| {
        let threshold = cfg.secondary_ratio * primary_score as f32;
        (score as f32 >= threshold).then_some(category)
    });

    let total: u32 = scores.values().sum();
    let others = (total - primary_score) as f32;
    let confidence =
        (primary_score as f32 / (primary_score as f32 + others + cfg.epsilon)).clamp(0.0, 1.0);
    let level = confidence_level(confidence, primary_score, cfg);

    debug!(?primary, ?secondary, confidence, primary_score, "classified");
    ClassificationResult {
        primary,
        secondary,
        confidence,
        level,
        matched_phrases: matched.remove(&primary).unwrap_or_default(),
        match_counts,
        scores,
    }
}

/// Highest positive score, ties broken by category priority.
fn best(
    scores: &BTreeMap<CategoryLabel, u32>,
    exclude: Option<CategoryLabel>,
) -> Option<(CategoryLabel, u32)> {
    let mut winner: Option<(CategoryLabel, u32)> = None;
    for category in CategoryLabel::ALL {
        if Some(category) == exclude {
            continue;
        }
        let score = scores.get(&category).copied().unwrap_or(0);
        if score > 0 && winner.map(|(_, s)| score > s).unwrap_or(true) {
            winner = Some((category, score));
        }
    }
    winner
}

/// High needs both a dominant share and at least a few weighted hits.
fn confidence_level(confidence: f32, primary_score: u32, cfg: &ClassifierConfig) -> ConfidenceLevel {
    if confidence >= cfg.high_confidence && primary_score >= 5 {
        ConfidenceLevel::High
    } else if confidence >= cfg.medium_confidence && primary_score >= 2 {
        ConfidenceLevel::Medium
    } else {
        ConfidenceLevel::Low
    }
}

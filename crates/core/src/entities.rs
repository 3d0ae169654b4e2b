//! Project and location mentions.
//!
//! Best effort: a small gazetteer of well-known names plus marker patterns
//! ("dự án X", "tại Y", "Quận Z"). Misses and false positives are expected;
//! nothing downstream relies on completeness.

use crate::error::ConfigError;
use crate::normalizer::{tokenize, NormalizedText};
use regex::Regex;
use serde::{Deserialize, Serialize};

const KNOWN_LOCATIONS: &[&str] = &[
    "Hà Nội",
    "TP.HCM",
    "TP Hồ Chí Minh",
    "Thành phố Hồ Chí Minh",
    "Bình Dương",
    "Đồng Nai",
    "Long An",
    "Cần Thơ",
    "Đà Nẵng",
    "Hải Phòng",
];

const KNOWN_PROJECTS: &[&str] = &[
    "Tuyến 1",
    "Tuyến 2",
    "Tuyến 3",
    "Metro Line",
    "Suối Cây Sao",
    "Đường Thống Nhất",
    "TOD4",
];

const GAZETTEER_CONFIDENCE: f32 = 0.9;
const MARKER_CONFIDENCE: f32 = 0.6;

// A capitalized word or a number, e.g. "Bến", "Thành", "1".
const NAME_WORD: &str = r"(?:\p{Lu}[\p{L}\p{M}.]*|\d+)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Project,
    Location,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    pub kind: EntityKind,
    pub confidence: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntities {
    pub projects: Vec<String>,
    pub locations: Vec<String>,
    /// Mean confidence of the kept entities; 0 when none were found.
    pub confidence: f32,
}

struct GazetteerEntry {
    name: &'static str,
    tokens: Vec<String>,
    kind: EntityKind,
}

pub struct EntityExtractor {
    gazetteer: Vec<GazetteerEntry>,
    markers: Vec<(Regex, EntityKind)>,
    max_entities: usize,
}

impl EntityExtractor {
    pub fn new(max_entities: usize) -> Result<Self, ConfigError> {
        let gazetteer = KNOWN_PROJECTS
            .iter()
            .map(|n| (*n, EntityKind::Project))
            .chain(KNOWN_LOCATIONS.iter().map(|n| (*n, EntityKind::Location)))
            .map(|(name, kind)| GazetteerEntry {
                name,
                tokens: tokenize(name),
                kind,
            })
            .collect();

        let markers = vec![
            (
                Regex::new(&format!(
                    r"(?i:dự\s+án|tuyến|metro\s+line)\s+({w}(?:\s+{w}){{0,4}})",
                    w = NAME_WORD
                ))?,
                EntityKind::Project,
            ),
            (
                Regex::new(
                    r"\b((?:Quận|Huyện|Phường|Xã|Thị\s+xã|Tỉnh|Thành\s+phố)\s+(?:\d+|\p{Lu}[\p{L}\p{M}]*(?:\s+\p{Lu}[\p{L}\p{M}]*){0,3}))",
                )?,
                EntityKind::Location,
            ),
            (
                Regex::new(&format!(
                    r"(?:\btại|\bở)\s+(\p{{Lu}}[\p{{L}}\p{{M}}.]*(?:\s+{w}){{0,4}})",
                    w = NAME_WORD
                ))?,
                EntityKind::Location,
            ),
        ];

        Ok(Self {
            gazetteer,
            markers,
            max_entities,
        })
    }

    pub fn extract(&self, raw: &str, normalized: &NormalizedText) -> ExtractedEntities {
        let mut found: Vec<Entity> = Vec::new();
        let mut push = |text: &str, kind: EntityKind, confidence: f32| {
            let text = text.trim().trim_end_matches(['.', ',', ';', ':']).trim();
            if text.is_empty() {
                return;
            }
            let key = text.to_lowercase();
            if found.iter().any(|e| e.text.to_lowercase() == key) {
                return;
            }
            found.push(Entity {
                text: text.to_string(),
                kind,
                confidence,
            });
        };

        for entry in &self.gazetteer {
            if normalized.contains_phrase(&entry.tokens) {
                push(entry.name, entry.kind, GAZETTEER_CONFIDENCE);
            }
        }
        for (re, kind) in &self.markers {
            for caps in re.captures_iter(raw) {
                if let Some(m) = caps.get(1) {
                    push(m.as_str(), *kind, MARKER_CONFIDENCE);
                }
            }
        }

        found.truncate(self.max_entities);
        let confidence = if found.is_empty() {
            0.0
        } else {
            found.iter().map(|e| e.confidence).sum::<f32>() / found.len() as f32
        };

        let mut out = ExtractedEntities {
            confidence,
            ..Default::default()
        };
        for entity in found {
            match entity.kind {
                EntityKind::Project => out.projects.push(entity.text),
                EntityKind::Location => out.locations.push(entity.text),
            }
        }
        out
    }
}

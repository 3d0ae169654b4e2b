//! Header metadata of Vietnamese administrative documents: document type,
//! issuing agency, issue date and cited legal instruments.
//!
//! Best-effort pattern matching over the first part of the raw text; values
//! are hints for listing and filtering, never authoritative.

use crate::error::ConfigError;
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

const DOCUMENT_TYPES: &[&str] = &[
    "Nghị định",
    "Nghị quyết",
    "Thông tư",
    "Luật",
    "Quyết định",
    "Chỉ thị",
    "Thông báo",
    "Công văn",
    "Quy chế",
    "Quy định",
];

// Case-sensitive: lowercase "bộ hồ sơ" or "ban hành" must not match.
const AGENCY_PATTERNS: &[&str] = &[
    r"\b(?:Chính\s+phủ|CHÍNH\s+PHỦ)\b",
    r"\b(?:Quốc\s+hội|QUỐC\s+HỘI)\b",
    r"\b(?:Bộ|BỘ)\s+\p{Lu}[^,\n]*",
    r"\b(?:Ủy\s+ban|ỦY\s+BAN|Uỷ\s+ban)\s+\p{Lu}[^,\n]*",
    r"\b(?:Sở|SỞ)\s+\p{Lu}[^,\n]*",
    r"\bUBND\s+[^,\n]+",
    r"\bHĐND\s+[^,\n]+",
    r"\b(?:Ban|BAN)\s+\p{Lu}[^,\n]*",
    r"\b(?:Thủ\s+tướng|THỦ\s+TƯỚNG)\b",
    r"\b(?:Chủ\s+tịch|CHỦ\s+TỊCH)\b",
];

/// (pattern, abbreviation) for cited instruments.
const REFERENCE_PATTERNS: &[(&str, &str)] = &[
    (r"(?i)nghị\s*định\s*số\s*(\d+[^\s,;:()]*)", "NĐ"),
    (r"(?i)quyết\s*định\s*số\s*(\d+[^\s,;:()]*)", "QĐ"),
    (r"(?i)thông\s*tư\s*số\s*(\d+[^\s,;:()]*)", "TT"),
];

const TYPE_PREVIEW_CHARS: usize = 1000;
const DATE_PREVIEW_CHARS: usize = 1500;
const MAX_REFERENCES_PER_KIND: usize = 2;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub document_type: Option<String>,
    pub issuing_agency: Option<String>,
    /// `DD/MM/YYYY`.
    pub issue_date: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum DateOrder {
    DayMonthYear,
    YearMonthDay,
}

pub struct MetadataExtractor {
    type_patterns: Vec<(&'static str, Regex)>,
    agency_patterns: Vec<Regex>,
    agency_of: Regex,
    dates: Vec<(Regex, DateOrder)>,
    references: Vec<(Regex, &'static str)>,
}

impl MetadataExtractor {
    pub fn new() -> Result<Self, ConfigError> {
        let type_patterns = DOCUMENT_TYPES
            .iter()
            .map(|t| {
                let words = t.split_whitespace().collect::<Vec<_>>().join(r"\s+");
                Ok((*t, Regex::new(&format!(r"(?i)\b{}\s+\S+", words))?))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        let agency_patterns = AGENCY_PATTERNS
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        // Keyword-anchored dates come first; the plain forms are fallbacks.
        let dates = vec![
            (
                Regex::new(r"(?i)(?:ban\s+hành|ngày)\s+(\d{1,2})[/-](\d{1,2})[/-](\d{4})")?,
                DateOrder::DayMonthYear,
            ),
            (
                Regex::new(
                    r"(?i)(?:ban\s+hành|ngày)\s+(\d{1,2})\s+tháng\s+(\d{1,2})\s+năm\s+(\d{4})",
                )?,
                DateOrder::DayMonthYear,
            ),
            (
                Regex::new(r"\b(\d{1,2})[/-](\d{1,2})[/-](\d{4})\b")?,
                DateOrder::DayMonthYear,
            ),
            (
                Regex::new(r"\b(\d{4})[/-](\d{1,2})[/-](\d{1,2})\b")?,
                DateOrder::YearMonthDay,
            ),
            (
                Regex::new(r"(?i)\b(\d{1,2})\s+tháng\s+(\d{1,2})\s+năm\s+(\d{4})")?,
                DateOrder::DayMonthYear,
            ),
        ];
        let references = REFERENCE_PATTERNS
            .iter()
            .map(|(p, abbr)| Ok((Regex::new(p)?, *abbr)))
            .collect::<Result<Vec<_>, ConfigError>>()?;
        Ok(Self {
            type_patterns,
            agency_patterns,
            agency_of: Regex::new(r"(?:CỦA|của)\s+(\p{Lu}[^,\n.]+)")?,
            dates,
            references,
        })
    }

    pub fn extract(&self, raw: &str, filename: &str) -> DocumentMetadata {
        DocumentMetadata {
            document_type: self.document_type(raw, filename),
            issuing_agency: self.issuing_agency(raw),
            issue_date: self.issue_date(raw),
        }
    }

    fn document_type(&self, raw: &str, filename: &str) -> Option<String> {
        let preview = prefix_chars(raw, TYPE_PREVIEW_CHARS);
        // Earliest mention wins; the header precedes any cited instrument.
        let earliest = self
            .type_patterns
            .iter()
            .filter_map(|(name, re)| re.find(preview).map(|m| (m.start(), *name)))
            .min_by_key(|(start, _)| *start);
        if let Some((_, name)) = earliest {
            return Some(name.to_string());
        }
        let filename = filename.to_lowercase();
        DOCUMENT_TYPES
            .iter()
            .find(|t| filename.contains(&t.to_lowercase()))
            .map(|t| t.to_string())
    }

    fn issuing_agency(&self, raw: &str) -> Option<String> {
        let preview = prefix_chars(raw, TYPE_PREVIEW_CHARS);
        for re in &self.agency_patterns {
            if let Some(m) = re.find(preview) {
                if let Some(agency) = clean_agency(m.as_str()) {
                    return Some(agency);
                }
            }
        }
        self.agency_of
            .captures(preview)
            .and_then(|c| c.get(1))
            .and_then(|m| clean_agency(m.as_str()))
    }

    fn issue_date(&self, raw: &str) -> Option<String> {
        let preview = prefix_chars(raw, DATE_PREVIEW_CHARS);
        for (re, order) in &self.dates {
            for caps in re.captures_iter(preview) {
                let part = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
                let (Some(a), Some(b), Some(c)) = (part(1), part(2), part(3)) else {
                    continue;
                };
                let (day, month, year) = match order {
                    DateOrder::DayMonthYear => (a, b, c),
                    DateOrder::YearMonthDay => (c, b, a),
                };
                if let Some(date) = NaiveDate::from_ymd_opt(year as i32, month, day) {
                    return Some(date.format("%d/%m/%Y").to_string());
                }
            }
        }
        None
    }

    /// Cited decrees, decisions and circulars, e.g. `NĐ 15/2021/NĐ-CP`.
    pub fn legal_references(&self, raw: &str) -> Vec<String> {
        let mut refs: Vec<String> = Vec::new();
        for (re, abbr) in &self.references {
            let mut taken = 0;
            for caps in re.captures_iter(raw) {
                if taken == MAX_REFERENCES_PER_KIND {
                    break;
                }
                let Some(number) = caps.get(1) else { continue };
                let number = number.as_str().trim_end_matches(['.', ',']);
                let reference = format!("{} {}", abbr, number);
                if !refs.contains(&reference) {
                    refs.push(reference);
                    taken += 1;
                }
            }
        }
        refs
    }
}

fn clean_agency(found: &str) -> Option<String> {
    let trimmed = found.trim().trim_end_matches(['.', ',', ';', ':']);
    let cleaned = trimmed
        .split_whitespace()
        .filter(|w| *w != "CỦA" && *w != "của")
        .collect::<Vec<_>>()
        .join(" ");
    let len = cleaned.chars().count();
    (len > 3 && len <= 200).then_some(cleaned)
}

/// Longest prefix of at most `n` characters.
pub(crate) fn prefix_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> MetadataExtractor {
        MetadataExtractor::new().unwrap()
    }

    const DECREE: &str = "CHÍNH PHỦ\nCỘNG HÒA XÃ HỘI CHỦ NGHĨA VIỆT NAM\n\
        Hà Nội, ngày 5 tháng 3 năm 2021\n\
        NGHỊ ĐỊNH số 15/2021/NĐ-CP quy định chi tiết một số nội dung về quản lý dự án.\n\
        Căn cứ Nghị định số 59/2015/NĐ-CP và Thông tư số 06/2021/TT-BXD.";

    #[test]
    fn reads_decree_header() {
        let meta = extractor().extract(DECREE, "nd15.pdf");
        assert_eq!(meta.document_type.as_deref(), Some("Nghị định"));
        assert_eq!(meta.issuing_agency.as_deref(), Some("CHÍNH PHỦ"));
        assert_eq!(meta.issue_date.as_deref(), Some("05/03/2021"));
    }

    #[test]
    fn collects_legal_references() {
        let refs = extractor().legal_references(DECREE);
        assert_eq!(
            refs,
            vec!["NĐ 15/2021/NĐ-CP", "NĐ 59/2015/NĐ-CP", "TT 06/2021/TT-BXD"]
        );
    }

    #[test]
    fn falls_back_to_filename_for_type() {
        let meta = extractor().extract("nội dung không có tiêu đề", "Quyết định phê duyệt.docx");
        assert_eq!(meta.document_type.as_deref(), Some("Quyết định"));
        assert_eq!(meta.issue_date, None);
    }

    #[test]
    fn parses_iso_and_slash_dates_and_skips_invalid() {
        let ex = extractor();
        assert_eq!(ex.issue_date("Hạn chót 2023-11-02").as_deref(), Some("02/11/2023"));
        assert_eq!(ex.issue_date("ban hành 7/8/2022").as_deref(), Some("07/08/2022"));
        assert_eq!(ex.issue_date("mã 45/13/2022, lập 1/2/2020").as_deref(), Some("01/02/2020"));
        assert_eq!(ex.issue_date("không có ngày"), None);
    }

    #[test]
    fn empty_text_yields_empty_metadata() {
        assert_eq!(extractor().extract("", ""), DocumentMetadata::default());
        assert!(extractor().legal_references("").is_empty());
    }

    #[test]
    fn prefix_respects_char_boundaries() {
        assert_eq!(prefix_chars("đường", 2), "đư");
        assert_eq!(prefix_chars("ab", 10), "ab");
    }
}

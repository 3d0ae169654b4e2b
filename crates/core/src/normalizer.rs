//! Text normalization: lowercase tokens, punctuation stripped except
//! intra-word hyphens, whitespace collapsed. Diacritics are kept as-is.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tracing::warn;
use unicode_segmentation::UnicodeSegmentation;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedText {
    tokens: Vec<String>,
}

impl NormalizedText {
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Tokens joined by single spaces.
    pub fn text(&self) -> String {
        self.tokens.join(" ")
    }

    /// Number of (possibly overlapping) occurrences of `phrase` as a
    /// contiguous token sequence.
    pub fn count_phrase(&self, phrase: &[String]) -> usize {
        if phrase.is_empty() || phrase.len() > self.tokens.len() {
            return 0;
        }
        self.tokens
            .windows(phrase.len())
            .filter(|w| *w == phrase)
            .count()
    }

    /// Token index of the first occurrence of `phrase`.
    pub fn first_position(&self, phrase: &[String]) -> Option<usize> {
        if phrase.is_empty() || phrase.len() > self.tokens.len() {
            return None;
        }
        self.tokens.windows(phrase.len()).position(|w| w == phrase)
    }

    pub fn contains_phrase(&self, phrase: &[String]) -> bool {
        self.first_position(phrase).is_some()
    }
}

pub fn normalize(raw: &str) -> NormalizedText {
    NormalizedText {
        tokens: tokenize(raw),
    }
}

/// Decodes reader output, substituting undecodable bytes.
pub fn decode_lossy(bytes: &[u8]) -> Cow<'_, str> {
    let text = String::from_utf8_lossy(bytes);
    if let Cow::Owned(_) = text {
        warn!(bytes = bytes.len(), "input was not valid UTF-8; invalid sequences replaced");
    }
    text
}

pub fn tokenize(raw: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if is_word_char(c) {
            current.extend(c.to_lowercase());
        } else if is_hyphen(c)
            && !current.is_empty()
            && chars.peek().copied().map(is_word_char).unwrap_or(false)
        {
            current.push('-');
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Splits raw text into trimmed, non-empty sentences. Line breaks also end a
/// sentence since extracted PDF/DOCX text often lacks final punctuation.
pub fn split_sentences(raw: &str) -> Vec<&str> {
    raw.split(['\n', '\r'])
        .flat_map(|line| line.split_sentence_bounds())
        .map(str::trim)
        .filter(|s| s.chars().any(is_word_char))
        .collect()
}

/// Function words ignored when ranking keywords and matching questions.
const STOPWORDS: &[&str] = &[
    "và", "của", "các", "có", "được", "cho", "là", "với", "trong", "theo", "đã", "để",
    "những", "một", "không", "về", "tại", "từ", "khi", "đến", "này", "đó", "ở", "đâu",
    "gì", "nào", "sao", "thế", "bao", "nhiêu", "ai", "như", "thì", "mà", "nhưng", "hay",
    "hoặc", "nếu", "vì", "do", "bởi", "trên", "dưới", "sau", "trước", "đang", "sẽ", "cũng",
    "rất", "nhiều", "số", "năm", "ngày", "tháng", "nằm", "bị", "vào", "ra", "lên", "còn",
    "the", "a", "an", "and", "or", "of", "to", "in", "on", "for", "is", "are", "was",
    "what", "where", "which", "who", "how", "with", "by", "at", "from", "this", "that",
];

pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(&token)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || is_combining_mark(c)
}

fn is_combining_mark(c: char) -> bool {
    matches!(c, '\u{0300}'..='\u{036F}' | '\u{1DC0}'..='\u{1DFF}')
}

fn is_hyphen(c: char) -> bool {
    matches!(c, '-' | '\u{2010}' | '\u{2011}')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(s: &str) -> Vec<String> {
        tokenize(s)
    }

    #[test]
    fn empty_input_gives_empty_stream() {
        assert!(normalize("").is_empty());
        assert!(normalize("  \n\t ... !!").is_empty());
    }

    #[test]
    fn lowercases_and_keeps_diacritics() {
        assert_eq!(toks("Đường Sắt ĐÔ THỊ"), vec!["đường", "sắt", "đô", "thị"]);
    }

    #[test]
    fn strips_punctuation_but_keeps_intra_word_hyphens() {
        assert_eq!(
            toks("Báo cáo Pre-FS, (transit-oriented) - giai đoạn 2!"),
            vec!["báo", "cáo", "pre-fs", "transit-oriented", "giai", "đoạn", "2"]
        );
        assert_eq!(toks("-abc- x-"), vec!["abc", "x"]);
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(normalize("  tuyến \n\n metro\tsố   1 ").text(), "tuyến metro số 1");
    }

    #[test]
    fn replacement_characters_split_tokens() {
        let decoded = decode_lossy(b"ga\xffng\xe1\xba\xa7m");
        assert_eq!(toks(&decoded), vec!["ga", "ngầm"]);
    }

    #[test]
    fn phrase_counting_respects_token_boundaries() {
        let text = normalize("metro metropolitan tuyến metro; Tuyến Metro");
        let phrase = tokenize("tuyến metro");
        assert_eq!(text.count_phrase(&phrase), 2);
        assert_eq!(text.count_phrase(&tokenize("metro")), 3);
        assert_eq!(text.first_position(&phrase), Some(2));
        assert_eq!(text.count_phrase(&[]), 0);
    }

    #[test]
    fn question_words_are_stopwords() {
        assert!(is_stopword("ở"));
        assert!(is_stopword("đâu"));
        assert!(!is_stopword("quận"));
        assert!(!is_stopword("metro"));
    }

    #[test]
    fn sentences_split_on_punctuation_and_lines() {
        let s = split_sentences("Câu một. Câu hai!\nDòng ba\n\n  ---  \n");
        assert_eq!(s, vec!["Câu một.", "Câu hai!", "Dòng ba"]);
    }
}

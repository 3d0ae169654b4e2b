//! Category labels and the static weighted phrase table used for scoring.

use crate::error::ConfigError;
use crate::normalizer::{normalize, tokenize};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Closed set of document categories. Declaration order is the tie-break
/// priority (Metro first, Other last).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CategoryLabel {
    Metro,
    TenderTod,
    Apartment,
    SocialHousing,
    Other,
}

impl CategoryLabel {
    pub const ALL: [CategoryLabel; 5] = [
        CategoryLabel::Metro,
        CategoryLabel::TenderTod,
        CategoryLabel::Apartment,
        CategoryLabel::SocialHousing,
        CategoryLabel::Other,
    ];

    /// Storage bucket key.
    pub fn folder(self) -> &'static str {
        match self {
            CategoryLabel::Metro => "Metro_DuongSatDoThi",
            CategoryLabel::TenderTod => "DauThau_KhuGiaoDuc_TOD",
            CategoryLabel::Apartment => "ChungCu",
            CategoryLabel::SocialHousing => "NhaO_XaHoi",
            CategoryLabel::Other => "Khac",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            CategoryLabel::Metro => "Metro/Đường sắt đô thị",
            CategoryLabel::TenderTod => "Đấu thầu/Khu giáo dục/TOD",
            CategoryLabel::Apartment => "Chung cư",
            CategoryLabel::SocialHousing => "Nhà ở xã hội",
            CategoryLabel::Other => "Khác",
        }
    }

    pub fn from_folder(folder: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.folder() == folder)
    }
}

impl fmt::Display for CategoryLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.folder())
    }
}

impl FromStr for CategoryLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(c) = Self::from_folder(s) {
            return Ok(c);
        }
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "metro" => Ok(CategoryLabel::Metro),
            "tender" | "tender-tod" | "tod" | "dau-thau" => Ok(CategoryLabel::TenderTod),
            "apartment" | "chung-cu" => Ok(CategoryLabel::Apartment),
            "social-housing" | "noxh" | "nha-o-xa-hoi" => Ok(CategoryLabel::SocialHousing),
            "other" | "khac" => Ok(CategoryLabel::Other),
            other => Err(format!("unknown category: {}", other)),
        }
    }
}

pub type PhraseTable = &'static [(&'static str, u8)];

/// 1 = general keyword, 2 = strong indicator, 3 = definitive indicator.
const METRO: PhraseTable = &[
    ("đường sắt đô thị", 3),
    ("tuyến metro", 3),
    ("ga ngầm", 3),
    ("ga trên cao", 3),
    ("mrt", 3),
    ("urban rail", 3),
    ("metro", 2),
    ("tuyến đường sắt", 2),
    ("nhà ga", 2),
    ("depot", 2),
    ("đường ray", 2),
    ("đoàn tàu", 2),
    ("tàu điện", 2),
    ("mass transit", 2),
    ("rams", 2),
    ("feed", 1),
    ("pre-fs", 1),
    ("khảo sát", 1),
    ("hạ tầng giao thông", 1),
];

const TENDER_TOD: PhraseTable = &[
    ("đấu thầu", 3),
    ("hồ sơ mời thầu", 3),
    ("hồ sơ dự thầu", 3),
    ("tod", 3),
    ("tod4", 3),
    ("transit-oriented", 3),
    ("mời thầu", 2),
    ("nhà thầu", 2),
    ("đề xuất kỹ thuật", 2),
    ("đề xuất tài chính", 2),
    ("đàm phán cạnh tranh", 2),
    ("khu giáo dục", 2),
    ("suối cây sao", 2),
    ("thuyết minh dự án", 2),
    ("ppp", 2),
    ("đường thống nhất", 1),
    ("bot", 1),
    ("quy hoạch", 1),
    ("đầu tư", 1),
    ("dự án", 1),
];

const APARTMENT: PhraseTable = &[
    ("chung cư", 3),
    ("apartment", 3),
    ("condominium", 3),
    ("căn hộ", 2),
    ("nhà ở cao tầng", 2),
    ("sổ hồng", 2),
    ("ban quản trị", 2),
    ("bất động sản", 1),
    ("mua nhà", 1),
    ("bán nhà", 1),
    ("phí quản lý", 1),
];

const SOCIAL_HOUSING: PhraseTable = &[
    ("nhà ở xã hội", 3),
    ("noxh", 3),
    ("nhà ở công nhân", 3),
    ("social housing", 3),
    ("người thu nhập thấp", 2),
    ("chính sách nhà ở", 2),
    ("ưu đãi nhà ở", 2),
    ("an sinh xã hội", 2),
    ("dự án an sinh", 2),
    ("người nghèo", 1),
];

const OTHER: PhraseTable = &[];

const BUILTIN: &[(CategoryLabel, PhraseTable)] = &[
    (CategoryLabel::Metro, METRO),
    (CategoryLabel::TenderTod, TENDER_TOD),
    (CategoryLabel::Apartment, APARTMENT),
    (CategoryLabel::SocialHousing, SOCIAL_HOUSING),
    (CategoryLabel::Other, OTHER),
];

#[derive(Debug, Clone)]
pub struct Phrase {
    pub text: &'static str,
    pub tokens: Vec<String>,
    pub weight: u32,
}

/// Validated, read-only phrase table. Built once and shared.
#[derive(Debug, Clone)]
pub struct Lexicon {
    entries: BTreeMap<CategoryLabel, Vec<Phrase>>,
    vocabulary: HashSet<&'static str>,
}

impl Lexicon {
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_tables(BUILTIN)
    }

    pub fn from_tables(tables: &[(CategoryLabel, PhraseTable)]) -> Result<Self, ConfigError> {
        let mut entries = BTreeMap::new();
        let mut vocabulary = HashSet::new();

        for (category, table) in tables {
            let err = |reason: String| ConfigError::Lexicon {
                category: category.folder().to_string(),
                reason,
            };
            if entries.contains_key(category) {
                return Err(err("category listed twice".into()));
            }
            if table.is_empty() && *category != CategoryLabel::Other {
                return Err(err("no phrases".into()));
            }
            let mut seen = HashSet::new();
            let mut phrases = Vec::with_capacity(table.len());
            for (text, weight) in table.iter() {
                if !(1..=3).contains(weight) {
                    return Err(err(format!("phrase {:?} has weight {}", text, weight)));
                }
                let tokens = tokenize(text);
                if tokens.is_empty() {
                    return Err(err(format!("phrase {:?} is empty after normalization", text)));
                }
                if normalize(text).text() != *text {
                    return Err(err(format!("phrase {:?} is not in normalized form", text)));
                }
                if !seen.insert(*text) {
                    return Err(err(format!("duplicate phrase {:?}", text)));
                }
                vocabulary.insert(*text);
                phrases.push(Phrase {
                    text: *text,
                    tokens,
                    weight: u32::from(*weight),
                });
            }
            entries.insert(*category, phrases);
        }

        for category in CategoryLabel::ALL {
            if !entries.contains_key(&category) {
                return Err(ConfigError::Lexicon {
                    category: category.folder().to_string(),
                    reason: "missing from table".into(),
                });
            }
        }

        Ok(Self {
            entries,
            vocabulary,
        })
    }

    pub fn phrases(&self, category: CategoryLabel) -> &[Phrase] {
        self.entries
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CategoryLabel, &[Phrase])> {
        self.entries.iter().map(|(c, p)| (*c, p.as_slice()))
    }

    /// True if `term` (normalized form) is a phrase of any category.
    pub fn is_vocabulary(&self, term: &str) -> bool {
        self.vocabulary.contains(term)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_tables_validate() {
        let lex = Lexicon::builtin().unwrap();
        assert!(lex.phrases(CategoryLabel::Other).is_empty());
        assert!(lex.is_vocabulary("tuyến metro"));
        assert!(lex.is_vocabulary("chung cư"));
        assert!(!lex.is_vocabulary("quận"));
        assert_eq!(lex.iter().count(), 5);
    }

    const TOD: PhraseTable = &[("tod", 1)];
    const CAN_HO: PhraseTable = &[("căn hộ", 1)];
    const NOXH: PhraseTable = &[("noxh", 1)];
    const EMPTY: PhraseTable = &[];

    fn tables(metro: PhraseTable) -> Vec<(CategoryLabel, PhraseTable)> {
        vec![
            (CategoryLabel::Metro, metro),
            (CategoryLabel::TenderTod, TOD),
            (CategoryLabel::Apartment, CAN_HO),
            (CategoryLabel::SocialHousing, NOXH),
            (CategoryLabel::Other, EMPTY),
        ]
    }

    #[test]
    fn accepts_minimal_tables() {
        const METRO_OK: PhraseTable = &[("metro", 2)];
        assert!(Lexicon::from_tables(&tables(METRO_OK)).is_ok());
    }

    #[test]
    fn rejects_bad_weight() {
        const HEAVY: PhraseTable = &[("metro", 4)];
        const ZERO: PhraseTable = &[("metro", 0)];
        assert!(matches!(
            Lexicon::from_tables(&tables(HEAVY)),
            Err(ConfigError::Lexicon { .. })
        ));
        assert!(Lexicon::from_tables(&tables(ZERO)).is_err());
    }

    #[test]
    fn rejects_unnormalized_or_duplicate_phrase() {
        const UPPER: PhraseTable = &[("Metro", 2)];
        const PUNCT: PhraseTable = &[("metro!", 2)];
        const DUP: PhraseTable = &[("metro", 2), ("metro", 1)];
        const BLANK: PhraseTable = &[("...", 1)];
        assert!(Lexicon::from_tables(&tables(UPPER)).is_err());
        assert!(Lexicon::from_tables(&tables(PUNCT)).is_err());
        assert!(Lexicon::from_tables(&tables(DUP)).is_err());
        assert!(Lexicon::from_tables(&tables(BLANK)).is_err());
    }

    #[test]
    fn rejects_missing_or_empty_category() {
        assert!(Lexicon::from_tables(&tables(EMPTY)).is_err());
        assert!(Lexicon::from_tables(&tables(TOD)[..4]).is_err());
    }

    #[test]
    fn labels_parse_from_folder_and_alias() {
        assert_eq!("ChungCu".parse::<CategoryLabel>(), Ok(CategoryLabel::Apartment));
        assert_eq!("social_housing".parse::<CategoryLabel>(), Ok(CategoryLabel::SocialHousing));
        assert_eq!("tender".parse::<CategoryLabel>(), Ok(CategoryLabel::TenderTod));
        assert!("bogus".parse::<CategoryLabel>().is_err());
        for c in CategoryLabel::ALL {
            assert_eq!(CategoryLabel::from_folder(c.folder()), Some(c));
        }
    }

    #[test]
    fn priority_follows_declaration_order() {
        assert!(CategoryLabel::Metro < CategoryLabel::TenderTod);
        assert!(CategoryLabel::SocialHousing < CategoryLabel::Other);
    }
}

//! Suggested-action rule table, keyed by primary category, sensitivity and
//! confidence bucket.

use crate::analyzer::Sensitivity;
use crate::classifier::ConfidenceLevel;
use crate::error::ConfigError;
use crate::lexicon::CategoryLabel;

pub const MAX_ACTIONS: usize = 3;

#[derive(Debug, Clone, Copy)]
pub enum Condition {
    Category(CategoryLabel),
    Sensitivity(Sensitivity),
    Confidence(ConfidenceLevel),
    And { all: &'static [Condition] },
    Any,
}

#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    /// Lower runs first.
    pub priority: i32,
    pub condition: Condition,
    pub action: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct RuleContext {
    pub category: CategoryLabel,
    pub sensitivity: Sensitivity,
    pub level: ConfidenceLevel,
}

use CategoryLabel as C;
use Condition::{And, Any, Category, Confidence};
use ConfidenceLevel as L;

pub const RULES: &[Rule] = &[
    Rule {
        name: "confidential-handling",
        priority: 10,
        condition: Condition::Sensitivity(Sensitivity::Confidential),
        action: "Hạn chế quyền truy cập, chỉ chia sẻ cho người có thẩm quyền",
    },
    Rule {
        name: "low-confidence-review",
        priority: 20,
        condition: Confidence(L::Low),
        action: "Kiểm tra lại phân loại thủ công",
    },
    Rule {
        name: "route-metro",
        priority: 30,
        condition: Category(C::Metro),
        action: "Chuyển cho phòng kỹ thuật Metro",
    },
    Rule {
        name: "route-tender",
        priority: 30,
        condition: Category(C::TenderTod),
        action: "Chuyển cho phòng đấu thầu",
    },
    Rule {
        name: "route-apartment",
        priority: 30,
        condition: Category(C::Apartment),
        action: "Chuyển cho phòng kinh doanh",
    },
    Rule {
        name: "route-social-housing",
        priority: 30,
        condition: Category(C::SocialHousing),
        action: "Chuyển cho phòng an sinh xã hội",
    },
    Rule {
        name: "metro-feed-check",
        priority: 40,
        condition: And {
            all: &[Category(C::Metro), Confidence(L::High)],
        },
        action: "Xem xét yêu cầu FS/Pre-FS/FEED",
    },
    Rule {
        name: "tender-progress",
        priority: 40,
        condition: And {
            all: &[Category(C::TenderTod), Confidence(L::High)],
        },
        action: "Xem xét tiến độ đấu thầu",
    },
    Rule {
        name: "apartment-legal",
        priority: 40,
        condition: And {
            all: &[Category(C::Apartment), Confidence(L::High)],
        },
        action: "Kiểm tra pháp lý dự án",
    },
    Rule {
        name: "social-housing-policy",
        priority: 40,
        condition: And {
            all: &[Category(C::SocialHousing), Confidence(L::High)],
        },
        action: "Kiểm tra chính sách ưu đãi",
    },
    Rule {
        name: "public-sharing",
        priority: 50,
        condition: Condition::Sensitivity(Sensitivity::Public),
        action: "Có thể chia sẻ rộng rãi",
    },
    Rule {
        name: "medium-confidence-check",
        priority: 60,
        condition: Confidence(L::Medium),
        action: "Xác nhận lại nhóm phân loại với người phụ trách",
    },
    Rule {
        name: "archive",
        priority: 100,
        condition: Any,
        action: "Lưu trữ theo nhóm phân loại",
    },
];

pub fn matches(condition: &Condition, ctx: &RuleContext) -> bool {
    match condition {
        Condition::Category(c) => ctx.category == *c,
        Condition::Sensitivity(s) => ctx.sensitivity == *s,
        Condition::Confidence(l) => ctx.level == *l,
        Condition::And { all } => all.iter().all(|c| matches(c, ctx)),
        Condition::Any => true,
    }
}

/// Matching rules ordered by priority; ties keep table order.
pub fn evaluate<'a>(rules: &'a [Rule], ctx: &RuleContext) -> Vec<&'a Rule> {
    let mut matched: Vec<&Rule> = rules.iter().filter(|r| matches(&r.condition, ctx)).collect();
    matched.sort_by_key(|r| r.priority);
    matched
}

/// One to three distinct actions for the context.
pub fn suggest(rules: &[Rule], ctx: &RuleContext) -> Vec<String> {
    let mut actions: Vec<String> = Vec::new();
    for rule in evaluate(rules, ctx) {
        if actions.len() == MAX_ACTIONS {
            break;
        }
        if !actions.iter().any(|a| a == rule.action) {
            actions.push(rule.action.to_string());
        }
    }
    actions
}

/// Checks that every (category, sensitivity, level) combination yields at
/// least one action and that no action is blank.
pub fn validate(rules: &[Rule]) -> Result<(), ConfigError> {
    for (index, rule) in rules.iter().enumerate() {
        if rule.action.trim().is_empty() {
            return Err(ConfigError::ActionRule {
                index,
                reason: format!("{} has an empty action", rule.name),
            });
        }
    }
    for category in CategoryLabel::ALL {
        for sensitivity in Sensitivity::ALL {
            for level in [L::Low, L::Medium, L::High] {
                let ctx = RuleContext {
                    category,
                    sensitivity,
                    level,
                };
                if suggest(rules, &ctx).is_empty() {
                    return Err(ConfigError::ActionRule {
                        index: rules.len(),
                        reason: format!("no action for {:?}", ctx),
                    });
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(category: CategoryLabel, sensitivity: Sensitivity, level: ConfidenceLevel) -> RuleContext {
        RuleContext {
            category,
            sensitivity,
            level,
        }
    }

    #[test]
    fn builtin_table_covers_every_combination() {
        validate(RULES).unwrap();
        for category in CategoryLabel::ALL {
            for sensitivity in Sensitivity::ALL {
                for level in [L::Low, L::Medium, L::High] {
                    let n = suggest(RULES, &ctx(category, sensitivity, level)).len();
                    assert!((1..=MAX_ACTIONS).contains(&n));
                }
            }
        }
    }

    #[test]
    fn confident_metro_routes_to_engineering() {
        let actions = suggest(RULES, &ctx(C::Metro, Sensitivity::Internal, L::High));
        assert_eq!(
            actions,
            vec![
                "Chuyển cho phòng kỹ thuật Metro",
                "Xem xét yêu cầu FS/Pre-FS/FEED",
                "Lưu trữ theo nhóm phân loại",
            ]
        );
    }

    #[test]
    fn confidential_comes_first() {
        let actions = suggest(RULES, &ctx(C::Other, Sensitivity::Confidential, L::Low));
        assert_eq!(actions[0], "Hạn chế quyền truy cập, chỉ chia sẻ cho người có thẩm quyền");
        assert_eq!(actions[1], "Kiểm tra lại phân loại thủ công");
    }

    #[test]
    fn rejects_table_without_fallback() {
        const ONLY_METRO: &[Rule] = &[Rule {
            name: "metro",
            priority: 1,
            condition: Category(C::Metro),
            action: "x",
        }];
        assert!(matches!(validate(ONLY_METRO), Err(ConfigError::ActionRule { .. })));
    }

    #[test]
    fn rejects_blank_action() {
        const BLANK: &[Rule] = &[Rule {
            name: "blank",
            priority: 1,
            condition: Any,
            action: "  ",
        }];
        assert!(matches!(
            validate(BLANK),
            Err(ConfigError::ActionRule { index: 0, .. })
        ));
    }
}

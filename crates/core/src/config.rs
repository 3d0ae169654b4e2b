use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Room for the category line plus some document text.
pub const MIN_SUMMARY_CHARS: usize = 100;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    #[serde(default)]
    pub qa: QaConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "data/docsort.db".to_string(),
        }
    }
}

/// Scoring constants for the classifier. Tunable, not a compatibility contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Runner-up must reach this fraction of the primary score to be reported.
    pub secondary_ratio: f32,
    pub epsilon: f32,
    /// Added to a category's score for each of its phrases found in the filename.
    pub filename_bonus: u32,
    pub high_confidence: f32,
    pub medium_confidence: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            secondary_ratio: 0.30,
            epsilon: 1e-6,
            filename_bonus: 2,
            high_confidence: 0.6,
            medium_confidence: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub summary_chars: usize,
    pub max_keywords: usize,
    pub max_entities: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            summary_chars: 400,
            max_keywords: 15,
            max_entities: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QaConfig {
    pub top_k: usize,
    /// Documents must score strictly above this to count as evidence.
    pub min_relevance: f64,
    pub excerpt_chars: usize,
    /// Upper bound on excerpt text forwarded to the external service.
    pub external_context_chars: usize,
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            min_relevance: 0.0,
            excerpt_chars: 500,
            external_context_chars: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// `none` or `openai`.
    pub provider: String,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "none".to_string(),
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com".to_string(),
            timeout_secs: 30,
            temperature: 0.3,
            max_tokens: 1000,
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.classifier;
        if !(0.0..=1.0).contains(&c.secondary_ratio) {
            return Err(ConfigError::Setting {
                key: "classifier.secondary_ratio",
                reason: format!("{} is outside [0, 1]", c.secondary_ratio),
            });
        }
        if c.epsilon <= 0.0 {
            return Err(ConfigError::Setting {
                key: "classifier.epsilon",
                reason: "must be positive".into(),
            });
        }
        if !(0.0..=1.0).contains(&c.high_confidence)
            || !(0.0..=1.0).contains(&c.medium_confidence)
            || c.medium_confidence > c.high_confidence
        {
            return Err(ConfigError::Setting {
                key: "classifier.high_confidence",
                reason: format!(
                    "expected 0 <= medium ({}) <= high ({}) <= 1",
                    c.medium_confidence, c.high_confidence
                ),
            });
        }
        if self.analyzer.summary_chars < MIN_SUMMARY_CHARS {
            return Err(ConfigError::Setting {
                key: "analyzer.summary_chars",
                reason: format!("must be at least {}", MIN_SUMMARY_CHARS),
            });
        }
        if self.qa.top_k == 0 {
            return Err(ConfigError::Setting {
                key: "qa.top_k",
                reason: "must be positive".into(),
            });
        }
        if self.llm.timeout_secs == 0 {
            return Err(ConfigError::Setting {
                key: "llm.timeout_secs",
                reason: "an explicit non-zero timeout is required".into(),
            });
        }
        match self.llm.provider.as_str() {
            "none" | "openai" => Ok(()),
            other => Err(ConfigError::Setting {
                key: "llm.provider",
                reason: format!("unknown provider {}", other),
            }),
        }
    }
}

/// Loads the config file (or `config/default` if present), then `DOCSORT__*`
/// environment overrides.
pub fn load(path: Option<&str>) -> anyhow::Result<AppConfig> {
    let mut settings = config::Config::builder();
    if let Some(p) = path {
        settings = settings.add_source(config::File::with_name(p));
    } else {
        settings = settings.add_source(config::File::with_name("config/default").required(false));
    }
    settings = settings.add_source(
        config::Environment::with_prefix("DOCSORT")
            .prefix_separator("__")
            .separator("__"),
    );
    let cfg: AppConfig = settings.build()?.try_deserialize()?;
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        AppConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[qa]\ntop_k = 5\n\n[llm]\nprovider = \"openai\"").unwrap();
        let cfg = load(Some(&file.path().to_string_lossy())).unwrap();
        assert_eq!(cfg.qa.top_k, 5);
        assert_eq!(cfg.qa.excerpt_chars, 500);
        assert_eq!(cfg.llm.provider, "openai");
        assert_eq!(cfg.llm.timeout_secs, 30);
        assert_eq!(cfg.database.path, "data/docsort.db");
    }

    #[test]
    fn rejects_unknown_provider() {
        let mut cfg = AppConfig::default();
        cfg.llm.provider = "gpt4all".into();
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Setting { key: "llm.provider", .. })
        ));
    }

    #[test]
    fn summary_budget_must_fit_the_category_line() {
        let mut cfg = AppConfig::default();
        cfg.analyzer.summary_chars = 40;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Setting { key: "analyzer.summary_chars", .. })
        ));
    }

    #[test]
    fn rejects_zero_timeout() {
        let mut cfg = AppConfig::default();
        cfg.llm.timeout_secs = 0;
        assert!(cfg.validate().is_err());
    }
}

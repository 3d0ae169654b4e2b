use providers::ProviderError;
use std::time::Duration;
use thiserror::Error;

/// Malformed static tables or tunables. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("lexicon entry for {category}: {reason}")]
    Lexicon { category: String, reason: String },
    #[error("action rule #{index}: {reason}")]
    ActionRule { index: usize, reason: String },
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("invalid setting {key}: {reason}")]
    Setting { key: &'static str, reason: String },
}

/// External synthesis failures. The Q&A engine absorbs these and falls back
/// to local synthesis.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("synthesis timed out after {0:?}")]
    Timeout(Duration),
    #[error("synthesis returned an empty answer")]
    EmptyAnswer,
}

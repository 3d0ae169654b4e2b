//! Provider abstractions for language-model services.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

pub mod noop;
pub mod openai;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("not implemented")]
    NotImplemented,
    #[error("request failed: {0}")]
    RequestFailed(String),
    #[error("service returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("missing credentials for provider {0}")]
    MissingCredentials(String),
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: String,
    pub model: Option<String>,
}

#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(&self, request: &CompletionRequest)
        -> Result<CompletionResponse, ProviderError>;
}

#[derive(Default, Clone)]
pub struct ProviderRegistry {
    llms: HashMap<String, Arc<dyn LlmProvider>>,
    pub preferred_llm: Option<String>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_llm(mut self, name: &str, provider: Arc<dyn LlmProvider>) -> Self {
        self.llms.insert(name.to_string(), provider);
        self
    }

    pub fn set_preferred_llm(mut self, name: &str) -> Self {
        self.preferred_llm = Some(name.to_string());
        self
    }

    pub fn llm(&self, name: Option<&str>) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        let key = name
            .map(str::to_string)
            .or_else(|| self.preferred_llm.clone())
            .ok_or_else(|| ProviderError::UnknownProvider("no llm provider configured".into()))?;
        self.llms
            .get(&key)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownProvider(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noop::NoopProvider;

    #[test]
    fn registry_resolves_preferred_provider() {
        let reg = ProviderRegistry::new()
            .with_llm("noop", Arc::new(NoopProvider))
            .set_preferred_llm("noop");
        assert!(reg.llm(None).is_ok());
    }

    #[test]
    fn registry_reports_unknown_provider() {
        let reg = ProviderRegistry::new().with_llm("noop", Arc::new(NoopProvider));
        assert!(matches!(
            reg.llm(Some("openai")),
            Err(ProviderError::UnknownProvider(name)) if name == "openai"
        ));
        assert!(matches!(
            reg.llm(None),
            Err(ProviderError::UnknownProvider(_))
        ));
    }

    #[test]
    fn chat_messages_serialize_lowercase_roles() {
        let json = serde_json::to_value(ChatMessage::system("x")).unwrap();
        assert_eq!(json["role"], "system");
    }
}

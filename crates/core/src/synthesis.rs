//! Answer synthesis strategies for the Q&A engine.

use crate::error::SynthesisError;
use crate::metadata::prefix_chars;
use providers::{ChatMessage, CompletionRequest, LlmProvider};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const NO_EVIDENCE_ANSWER: &str = "Tài liệu hiện có chưa cung cấp thông tin này.";

const SYSTEM_PROMPT: &str = "Bạn là trợ lý AI chuyên về tài liệu pháp lý, kỹ thuật, đầu tư của Việt Nam. \
Hãy trả lời câu hỏi dựa trên nội dung tài liệu được cung cấp. \
Nếu thông tin không có trong tài liệu, hãy nêu rõ 'Tài liệu hiện có chưa cung cấp thông tin này'. \
Trả lời bằng tiếng Việt, ngắn gọn, chính xác.";

#[derive(Debug, Clone)]
pub struct Excerpt {
    /// Source filename, used for attribution.
    pub source: String,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub question: String,
    /// Ordered by relevance, most relevant first. Never empty.
    pub excerpts: Vec<Excerpt>,
}

#[async_trait::async_trait]
pub trait AnswerSynthesizer: Send + Sync {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<String, SynthesisError>;
}

/// Verbatim excerpts with attribution; no paraphrase.
pub struct LocalSynthesizer;

impl LocalSynthesizer {
    pub fn compose(request: &SynthesisRequest) -> String {
        request
            .excerpts
            .iter()
            .map(|e| format!("[{}] {}", e.source, e.text))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[async_trait::async_trait]
impl AnswerSynthesizer for LocalSynthesizer {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<String, SynthesisError> {
        Ok(Self::compose(request))
    }
}

/// Sends the question and excerpts to a chat-completion provider.
pub struct ExternalSynthesizer {
    provider: Arc<dyn LlmProvider>,
    timeout: Duration,
    temperature: f32,
    max_tokens: u32,
    context_chars: usize,
}

impl ExternalSynthesizer {
    pub fn new(provider: Arc<dyn LlmProvider>, timeout: Duration) -> Self {
        Self {
            provider,
            timeout,
            temperature: 0.3,
            max_tokens: 1000,
            context_chars: 10_000,
        }
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_context_chars(mut self, context_chars: usize) -> Self {
        self.context_chars = context_chars;
        self
    }

    /// Excerpt context, cut once `context_chars` is reached.
    fn context(&self, request: &SynthesisRequest) -> String {
        let mut remaining = self.context_chars;
        let mut parts = Vec::new();
        for excerpt in &request.excerpts {
            if remaining == 0 {
                break;
            }
            let text = prefix_chars(&excerpt.text, remaining);
            remaining -= text.chars().count();
            parts.push(format!("=== {} ===\n{}", excerpt.source, text));
        }
        parts.join("\n\n")
    }

    fn completion_request(&self, request: &SynthesisRequest) -> CompletionRequest {
        let user = format!(
            "Dựa trên các tài liệu sau, hãy trả lời câu hỏi:\n\nTÀI LIỆU:\n{}\n\nCÂU HỎI: {}\n\nHãy trả lời dựa trên nội dung tài liệu trên.",
            self.context(request),
            request.question
        );
        CompletionRequest {
            messages: vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user)],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

#[async_trait::async_trait]
impl AnswerSynthesizer for ExternalSynthesizer {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<String, SynthesisError> {
        let completion = self.completion_request(request);
        let response = tokio::time::timeout(self.timeout, self.provider.complete(&completion))
            .await
            .map_err(|_| SynthesisError::Timeout(self.timeout))??;
        debug!(model = ?response.model, chars = response.content.len(), "external answer received");
        let answer = response.content.trim();
        if answer.is_empty() {
            return Err(SynthesisError::EmptyAnswer);
        }
        Ok(answer.to_string())
    }
}

use crate::{CompletionRequest, CompletionResponse, LlmProvider, ProviderError};

/// Provider used when no language-model service is configured.
#[derive(Debug, Default)]
pub struct NoopProvider;

#[async_trait::async_trait]
impl LlmProvider for NoopProvider {
    async fn complete(
        &self,
        _request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        Err(ProviderError::NotImplemented)
    }
}

use crate::domain::error::DomainError;

/// Reasoning service (LLM) contract. Any non-JSON or schema-invalid response
/// is a recoverable per-symbol failure for the caller.
#[async_trait::async_trait]
pub trait ReasoningService: Send + Sync {
    /// Provider name used for override selection (`openai`, `anthropic`, ...).
    fn name(&self) -> &str;

    fn default_model(&self) -> &str;

    async fn complete(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
        model: &str,
    ) -> Result<String, DomainError>;
}

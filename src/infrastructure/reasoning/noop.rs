use crate::domain::error::DomainError;
use crate::domain::ports::reasoning::ReasoningService;

/// No reasoning backend configured. Every call fails, so every symbol is
/// skipped while the rest of the run completes.
pub struct NoopReasoner;

#[async_trait::async_trait]
impl ReasoningService for NoopReasoner {
    fn name(&self) -> &str {
        "noop"
    }

    fn default_model(&self) -> &str {
        "none"
    }

    async fn complete(
        &self,
        _system: &str,
        _user: &str,
        _max_tokens: u32,
        _model: &str,
    ) -> Result<String, DomainError> {
        Err(DomainError::Reasoning("no reasoning provider configured".into()))
    }
}

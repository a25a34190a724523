use ragchat_llm::LlmError;
use ragchat_memory::MemoryError;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Memory(#[from] MemoryError),
}

impl AgentError {
    /// The provider error behind this failure, including one raised while embedding
    /// the query for retrieval.
    #[must_use]
    pub fn llm_error(&self) -> Option<&LlmError> {
        match self {
            Self::Llm(e) | Self::Memory(MemoryError::Llm(e)) => Some(e),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self.llm_error(), Some(LlmError::RateLimited))
    }

    /// True when the model provider or the network to it failed.
    #[must_use]
    pub fn is_upstream(&self) -> bool {
        self.llm_error().is_some_and(LlmError::is_upstream)
    }

    /// True when the requested session is owned by a different user.
    #[must_use]
    pub fn is_session_conflict(&self) -> bool {
        matches!(self, Self::Memory(MemoryError::SessionOwnership { .. }))
    }
}

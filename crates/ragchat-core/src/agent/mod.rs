mod context;
pub mod error;

use std::sync::Arc;

use ragchat_llm::LlmProvider;
use ragchat_memory::{KnowledgeBase, RetrievedChunk, SessionKey, SqliteStore};

use crate::config::AgentConfig;
use context::{assemble_messages, build_system_prompt};
pub use error::AgentError;

/// Answer produced for one query.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    pub content: String,
    /// Chunks the answer was grounded on, best match first.
    pub sources: Vec<RetrievedChunk>,
}

impl AgentResponse {
    /// `source#chunk_index` references, deduplicated, in rank order.
    #[must_use]
    pub fn source_refs(&self) -> Vec<String> {
        let mut refs: Vec<String> = Vec::with_capacity(self.sources.len());
        for chunk in &self.sources {
            let r = chunk.reference();
            if !refs.contains(&r) {
                refs.push(r);
            }
        }
        refs
    }
}

/// Retrieval-augmented chat agent shared by all requests.
///
/// Each call to [`Agent::run`] is independent: history is read from and written to
/// the session store, so the agent itself holds no per-conversation state.
pub struct Agent<P: LlmProvider> {
    provider: P,
    knowledge: Arc<KnowledgeBase>,
    store: SqliteStore,
    instructions: String,
    history_limit: u32,
    num_documents: u64,
}

impl<P: LlmProvider> std::fmt::Debug for Agent<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("provider", &self.provider.name())
            .field("knowledge", &self.knowledge)
            .field("history_limit", &self.history_limit)
            .field("num_documents", &self.num_documents)
            .finish_non_exhaustive()
    }
}

impl<P: LlmProvider> Agent<P> {
    #[must_use]
    pub fn new(provider: P, knowledge: Arc<KnowledgeBase>, store: SqliteStore) -> Self {
        let defaults = AgentConfig::default();
        Self {
            provider,
            knowledge,
            store,
            instructions: defaults.instructions,
            history_limit: defaults.history_limit,
            num_documents: defaults.num_documents,
        }
    }

    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    #[must_use]
    pub fn with_history_limit(mut self, limit: u32) -> Self {
        self.history_limit = limit;
        self
    }

    #[must_use]
    pub fn with_num_documents(mut self, limit: u64) -> Self {
        self.num_documents = limit;
        self
    }

    #[must_use]
    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    /// Answer `query` within the given session and persist the exchange.
    ///
    /// Nothing is written when retrieval or the model call fails.
    ///
    /// # Errors
    ///
    /// Returns an error if session storage, retrieval or the model call fails, or if the
    /// model returns an empty answer.
    pub async fn run(&self, query: &str, session: &SessionKey) -> Result<AgentResponse, AgentError> {
        self.store.ensure_session(session).await?;

        // Whole user/assistant turns only, so the replay never opens on an assistant message.
        let window = self.history_limit - self.history_limit % 2;
        let history = self
            .store
            .load_history(&session.session_id, window)
            .await?;
        let sources = self.knowledge.search(query, self.num_documents).await?;
        tracing::debug!(
            session = %session,
            history = history.len(),
            retrieved = sources.len(),
            "context assembled"
        );

        let system_prompt = build_system_prompt(&self.instructions, &sources);
        let messages = assemble_messages(system_prompt, history, query);

        let content = self.provider.chat(&messages).await?;
        if content.trim().is_empty() {
            return Err(AgentError::Llm(ragchat_llm::LlmError::EmptyResponse {
                provider: self.provider.name().to_owned(),
            }));
        }

        self.store.save_turn(session, query, &content).await?;
        tracing::info!(session = %session, chars = content.len(), "turn completed");

        Ok(AgentResponse { content, sources })
    }
}

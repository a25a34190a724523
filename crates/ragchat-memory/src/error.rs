#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("database error: {0}")]
    Sqlite(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("vector store error: {0}")]
    VectorStore(#[from] crate::vector_store::VectorStoreError),

    #[error("document error: {0}")]
    Document(#[from] crate::document::DocumentError),

    #[error("LLM error: {0}")]
    Llm(#[from] ragchat_llm::LlmError),

    #[error("session {session_id} belongs to another user")]
    SessionOwnership { session_id: String },
}

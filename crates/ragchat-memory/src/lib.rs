//! SQLite-backed session persistence and a vector-indexed knowledge base.

pub mod document;
pub mod error;
pub mod knowledge;
pub mod local_store;
pub mod qdrant_ops;
pub mod sqlite;
pub mod types;
pub mod vector_store;

pub use error::MemoryError;
pub use knowledge::{KnowledgeBase, LoadReport, RetrievedChunk};
pub use local_store::LocalVectorStore;
pub use qdrant_ops::QdrantOps;
pub use sqlite::SqliteStore;
pub use types::{SessionKey, StoredMessage};
pub use vector_store::{ScoredVectorPoint, VectorPoint, VectorStore, VectorStoreError};

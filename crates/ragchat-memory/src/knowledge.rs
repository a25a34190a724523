//! The knowledge base the agent retrieves from: one source file indexed into one collection.

use std::path::PathBuf;
use std::sync::Arc;

use crate::document::pipeline::EmbedFn;
use crate::document::{IngestionPipeline, SplitterConfig, TextSplitter, loader_for};
use crate::error::MemoryError;
use crate::vector_store::{ScoredVectorPoint, VectorStore};

pub use crate::document::LoadReport;

/// A chunk returned by similarity search.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub content: String,
    pub source: String,
    pub chunk_index: u64,
    pub page: Option<u32>,
    pub score: f32,
}

impl RetrievedChunk {
    /// Stable reference of the form `source#chunk_index`.
    #[must_use]
    pub fn reference(&self) -> String {
        format!("{}#{}", self.source, self.chunk_index)
    }

    fn from_point(point: ScoredVectorPoint) -> Option<Self> {
        let payload = &point.payload;
        let content = payload.get("content")?.as_str()?.to_owned();
        Some(Self {
            content,
            source: payload
                .get("source")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_owned(),
            chunk_index: payload
                .get("chunk_index")
                .and_then(serde_json::Value::as_u64)
                .unwrap_or_default(),
            page: payload
                .get("page")
                .and_then(serde_json::Value::as_u64)
                .and_then(|p| u32::try_from(p).ok()),
            score: point.score,
        })
    }
}

pub struct KnowledgeBase {
    store: Arc<dyn VectorStore>,
    collection: String,
    vector_size: u64,
    path: PathBuf,
    pipeline: IngestionPipeline,
    embed_fn: EmbedFn,
}

impl std::fmt::Debug for KnowledgeBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeBase")
            .field("collection", &self.collection)
            .field("vector_size", &self.vector_size)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl KnowledgeBase {
    pub fn new(
        store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
        vector_size: u64,
        path: impl Into<PathBuf>,
        splitter: SplitterConfig,
        embed_fn: EmbedFn,
    ) -> Self {
        let collection = collection.into();
        let pipeline = IngestionPipeline::new(
            TextSplitter::new(splitter),
            Arc::clone(&store),
            collection.clone(),
            Arc::clone(&embed_fn),
        );
        Self {
            store,
            collection,
            vector_size,
            path: path.into(),
            pipeline,
            embed_fn,
        }
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Index the source file. With `recreate`, the collection is dropped first;
    /// otherwise chunks already present are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if embedding or
    /// vector storage fails.
    pub async fn load(&self, recreate: bool) -> Result<LoadReport, MemoryError> {
        if recreate && self.store.collection_exists(&self.collection).await? {
            tracing::info!(collection = %self.collection, "dropping collection before reindex");
            self.store.delete_collection(&self.collection).await?;
        }
        self.store
            .ensure_collection(&self.collection, self.vector_size)
            .await?;

        let loader = loader_for(&self.path)?;
        let documents = loader.load(&self.path).await?;
        let report = self.pipeline.ingest(&documents).await?;

        tracing::info!(
            path = %self.path.display(),
            collection = %self.collection,
            total = report.total,
            inserted = report.inserted,
            skipped = report.skipped,
            "knowledge base loaded"
        );
        Ok(report)
    }

    /// Return up to `limit` chunks most similar to `query`, best first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query cannot be embedded or the search fails.
    pub async fn search(&self, query: &str, limit: u64) -> Result<Vec<RetrievedChunk>, MemoryError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let vector = (self.embed_fn)(query).await?;
        let hits = self.store.search(&self.collection, vector, limit).await?;
        Ok(hits.into_iter().filter_map(RetrievedChunk::from_point).collect())
    }
}

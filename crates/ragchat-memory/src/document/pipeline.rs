use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use ragchat_llm::provider::EmbedFuture;
use serde_json::json;
use uuid::Uuid;

use super::{Chunk, Document, DocumentError, TextSplitter};
use crate::vector_store::{VectorPoint, VectorStore};

/// Payload field holding the blake3 digest of a chunk.
pub const CONTENT_HASH_FIELD: &str = "content_hash";

const UPSERT_BATCH: usize = 64;

/// Shared embedding closure, usually built from `AnyProvider::embed_fn`.
pub type EmbedFn = Arc<dyn Fn(&str) -> EmbedFuture + Send + Sync>;

/// Outcome of indexing a set of documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Chunks produced by the splitter.
    pub total: usize,
    /// Chunks embedded and written this run.
    pub inserted: usize,
    /// Chunks already present in the collection.
    pub skipped: usize,
}

pub struct IngestionPipeline {
    splitter: TextSplitter,
    store: Arc<dyn VectorStore>,
    collection: String,
    embed_fn: EmbedFn,
}

fn point_id(hash: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, hash.as_bytes()).to_string()
}

fn chunk_point(chunk: &Chunk, hash: String, vector: Vec<f32>) -> VectorPoint {
    let mut payload = HashMap::from([
        ("source".to_owned(), json!(chunk.metadata.source)),
        ("content_type".to_owned(), json!(chunk.metadata.content_type)),
        ("chunk_index".to_owned(), json!(chunk.chunk_index)),
        ("content".to_owned(), json!(chunk.content)),
    ]);
    if let Some(page) = chunk.metadata.page {
        payload.insert("page".to_owned(), json!(page));
    }
    let id = point_id(&hash);
    payload.insert(CONTENT_HASH_FIELD.to_owned(), json!(hash));
    VectorPoint {
        id,
        vector,
        payload,
    }
}

impl IngestionPipeline {
    pub fn new(
        splitter: TextSplitter,
        store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
        embed_fn: EmbedFn,
    ) -> Self {
        Self {
            splitter,
            store,
            collection: collection.into(),
            embed_fn,
        }
    }

    /// Split, embed and store `documents`, skipping chunks whose content hash is
    /// already indexed. The collection must exist.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding or vector storage fails.
    pub async fn ingest(&self, documents: &[Document]) -> Result<LoadReport, DocumentError> {
        let chunks = self.splitter.split_all(documents);
        let mut report = LoadReport {
            total: chunks.len(),
            ..LoadReport::default()
        };
        if chunks.is_empty() {
            return Ok(report);
        }

        let mut known: HashSet<String> = self
            .store
            .scroll_all(&self.collection, CONTENT_HASH_FIELD)
            .await?
            .into_keys()
            .collect();

        let mut batch = Vec::with_capacity(UPSERT_BATCH);
        for chunk in &chunks {
            let hash = chunk.content_hash();
            if !known.insert(hash.clone()) {
                report.skipped += 1;
                continue;
            }
            let vector = (self.embed_fn)(&chunk.content).await?;
            batch.push(chunk_point(chunk, hash, vector));

            if batch.len() == UPSERT_BATCH {
                report.inserted += batch.len();
                self.store
                    .upsert(&self.collection, std::mem::take(&mut batch))
                    .await?;
            }
        }
        if !batch.is_empty() {
            report.inserted += batch.len();
            self.store.upsert(&self.collection, batch).await?;
        }

        tracing::debug!(
            collection = %self.collection,
            total = report.total,
            inserted = report.inserted,
            skipped = report.skipped,
            "ingested documents"
        );
        Ok(report)
    }
}

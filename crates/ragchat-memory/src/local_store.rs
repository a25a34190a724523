//! Vector store persisted as one JSON document per collection under a directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::vector_store::{
    BoxFuture, ScoredVectorPoint, ScrollResult, VectorPoint, VectorStore, VectorStoreError,
    cosine_similarity,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredPoint {
    vector: Vec<f32>,
    payload: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LocalCollection {
    vector_size: u64,
    points: HashMap<String, StoredPoint>,
}

pub struct LocalVectorStore {
    dir: PathBuf,
    collections: RwLock<HashMap<String, LocalCollection>>,
}

impl std::fmt::Debug for LocalVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalVectorStore")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

fn validate_name(collection: &str) -> Result<(), VectorStoreError> {
    let valid = !collection.is_empty()
        && collection
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(VectorStoreError::Collection(format!(
            "invalid collection name: {collection:?}"
        )))
    }
}

impl LocalVectorStore {
    /// Open the store rooted at `dir`, creating the directory if needed and loading
    /// every `*.json` collection file found there.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or a collection file is unreadable.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, VectorStoreError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;

        let mut collections = HashMap::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let bytes = tokio::fs::read(&path).await?;
            let collection: LocalCollection = serde_json::from_slice(&bytes).map_err(|e| {
                VectorStoreError::Serialization(format!("{}: {e}", path.display()))
            })?;
            tracing::debug!(
                collection = name,
                points = collection.points.len(),
                "loaded local collection"
            );
            collections.insert(name.to_owned(), collection);
        }

        Ok(Self {
            dir,
            collections: RwLock::new(collections),
        })
    }

    fn file_path(&self, collection: &str) -> PathBuf {
        self.dir.join(format!("{collection}.json"))
    }

    /// Write the collection to a temporary sibling and rename it into place.
    async fn persist(
        &self,
        name: &str,
        collection: &LocalCollection,
    ) -> Result<(), VectorStoreError> {
        let bytes = serde_json::to_vec(collection)
            .map_err(|e| VectorStoreError::Serialization(e.to_string()))?;
        let target = self.file_path(name);
        let tmp = self.dir.join(format!(".{name}.json.tmp"));
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &target).await?;
        Ok(())
    }
}

impl VectorStore for LocalVectorStore {
    fn ensure_collection(
        &self,
        collection: &str,
        vector_size: u64,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            validate_name(&collection)?;
            let mut cols = self.collections.write().await;
            if let Some(existing) = cols.get(&collection) {
                if existing.vector_size != vector_size {
                    return Err(VectorStoreError::Collection(format!(
                        "collection {collection} has vector size {}, expected {vector_size}",
                        existing.vector_size
                    )));
                }
                return Ok(());
            }
            let fresh = LocalCollection {
                vector_size,
                points: HashMap::new(),
            };
            self.persist(&collection, &fresh).await?;
            cols.insert(collection, fresh);
            Ok(())
        })
    }

    fn collection_exists(&self, collection: &str) -> BoxFuture<'_, Result<bool, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move { Ok(self.collections.read().await.contains_key(&collection)) })
    }

    fn delete_collection(&self, collection: &str) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            validate_name(&collection)?;
            let mut cols = self.collections.write().await;
            if cols.remove(&collection).is_some() {
                match tokio::fs::remove_file(self.file_path(&collection)).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }
            Ok(())
        })
    }

    fn upsert(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let mut cols = self.collections.write().await;
            let col = cols.get_mut(&collection).ok_or_else(|| {
                VectorStoreError::Upsert(format!("collection {collection} not found"))
            })?;
            for p in &points {
                if p.vector.len() as u64 != col.vector_size {
                    return Err(VectorStoreError::Upsert(format!(
                        "point {} has {} dimensions, collection expects {}",
                        p.id,
                        p.vector.len(),
                        col.vector_size
                    )));
                }
            }
            let mut updated = col.clone();
            for p in points {
                updated.points.insert(
                    p.id,
                    StoredPoint {
                        vector: p.vector,
                        payload: p.payload,
                    },
                );
            }
            self.persist(&collection, &updated).await?;
            *col = updated;
            Ok(())
        })
    }

    fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
    ) -> BoxFuture<'_, Result<Vec<ScoredVectorPoint>, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let cols = self.collections.read().await;
            let col = cols.get(&collection).ok_or_else(|| {
                VectorStoreError::Search(format!("collection {collection} not found"))
            })?;

            let mut scored: Vec<ScoredVectorPoint> = col
                .points
                .iter()
                .map(|(id, sp)| ScoredVectorPoint {
                    id: id.clone(),
                    score: cosine_similarity(&vector, &sp.vector),
                    payload: sp.payload.clone(),
                })
                .collect();

            scored.sort_by(|a, b| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.id.cmp(&b.id))
            });
            scored.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
            Ok(scored)
        })
    }

    fn scroll_all(
        &self,
        collection: &str,
        key_field: &str,
    ) -> BoxFuture<'_, Result<ScrollResult, VectorStoreError>> {
        let collection = collection.to_owned();
        let key_field = key_field.to_owned();
        Box::pin(async move {
            let cols = self.collections.read().await;
            let col = cols.get(&collection).ok_or_else(|| {
                VectorStoreError::Scroll(format!("collection {collection} not found"))
            })?;

            let mut result = HashMap::new();
            for sp in col.points.values() {
                let Some(key_val) = sp.payload.get(&key_field).and_then(|v| v.as_str()) else {
                    continue;
                };
                let fields = sp
                    .payload
                    .iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_owned())))
                    .collect();
                result.insert(key_val.to_owned(), fields);
            }
            Ok(result)
        })
    }
}

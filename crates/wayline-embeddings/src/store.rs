//! Embedding store traits and in-memory reference implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::EmbeddingError;

/// A deterministic embedding: vector plus the hash of its source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeterministicEmbedding {
    /// Embedding id.
    pub id: String,

    /// Digest of the source the vector was derived from.
    pub source_hash: String,

    /// The vector.
    pub vector: Vec<f32>,

    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// A semantic embedding: vector plus relationship edges for graph queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticEmbedding {
    /// Embedding id.
    pub id: String,

    /// The vector.
    pub vector: Vec<f32>,

    /// Related embedding ids.
    pub related_ids: Vec<String>,
}

/// Write/read seam against an analytical store.
#[async_trait]
pub trait DeterministicEmbeddingStore: Send + Sync {
    /// Store an embedding.
    async fn put(
        &self,
        id: &str,
        source_hash: &str,
        vector: Vec<f32>,
        created_at: DateTime<Utc>,
    ) -> Result<(), EmbeddingError>;

    /// Fetch an embedding by id.
    async fn get(&self, id: &str) -> Result<Option<DeterministicEmbedding>, EmbeddingError>;
}

/// Write/read seam against a graph-capable store.
#[async_trait]
pub trait SemanticEmbeddingStore: Send + Sync {
    /// Store an embedding with its relationship edges.
    async fn put(
        &self,
        id: &str,
        vector: Vec<f32>,
        related_ids: Vec<String>,
    ) -> Result<(), EmbeddingError>;

    /// Fetch an embedding by id.
    async fn get(&self, id: &str) -> Result<Option<SemanticEmbedding>, EmbeddingError>;

    /// Ids related to an embedding.
    async fn related(&self, id: &str) -> Result<Vec<String>, EmbeddingError>;
}

/// In-memory deterministic store for tests and demos.
pub struct MemoryDeterministicStore {
    embeddings: RwLock<HashMap<String, DeterministicEmbedding>>,
}

impl MemoryDeterministicStore {
    /// Create a new memory store.
    pub fn new() -> Self {
        Self {
            embeddings: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryDeterministicStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeterministicEmbeddingStore for MemoryDeterministicStore {
    async fn put(
        &self,
        id: &str,
        source_hash: &str,
        vector: Vec<f32>,
        created_at: DateTime<Utc>,
    ) -> Result<(), EmbeddingError> {
        let mut store = self.embeddings.write().await;
        store.insert(
            id.to_string(),
            DeterministicEmbedding {
                id: id.to_string(),
                source_hash: source_hash.to_string(),
                vector,
                created_at,
            },
        );
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<DeterministicEmbedding>, EmbeddingError> {
        let store = self.embeddings.read().await;
        Ok(store.get(id).cloned())
    }
}

/// In-memory semantic store for tests and demos.
pub struct MemorySemanticStore {
    embeddings: RwLock<HashMap<String, SemanticEmbedding>>,
}

impl MemorySemanticStore {
    /// Create a new memory store.
    pub fn new() -> Self {
        Self {
            embeddings: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemorySemanticStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SemanticEmbeddingStore for MemorySemanticStore {
    async fn put(
        &self,
        id: &str,
        vector: Vec<f32>,
        related_ids: Vec<String>,
    ) -> Result<(), EmbeddingError> {
        let mut store = self.embeddings.write().await;
        store.insert(
            id.to_string(),
            SemanticEmbedding {
                id: id.to_string(),
                vector,
                related_ids,
            },
        );
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<SemanticEmbedding>, EmbeddingError> {
        let store = self.embeddings.read().await;
        Ok(store.get(id).cloned())
    }

    async fn related(&self, id: &str) -> Result<Vec<String>, EmbeddingError> {
        let store = self.embeddings.read().await;
        store
            .get(id)
            .map(|e| e.related_ids.clone())
            .ok_or_else(|| EmbeddingError::NotFound(id.to_string()))
    }
}

//! Append-only in-memory vector index with exact squared-L2 search.

#[cfg(feature = "local-embeddings")]
pub mod local;

#[cfg(feature = "local-embeddings")]
pub use local::LocalEmbedder;

use brief_core::{BriefError, DocumentMetadata, IndexedDocument, ScoredDocument, TextEmbedder};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Default number of documents returned by a search
pub const DEFAULT_K: usize = 3;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("embedding dimension mismatch: index holds {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("embedder returned an empty vector")]
    EmptyEmbedding,

    #[error(transparent)]
    Embedding(#[from] BriefError),
}

impl From<IndexError> for BriefError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::Embedding(e) => e,
            other => BriefError::Index(other.to_string()),
        }
    }
}

struct IndexEntry {
    document: IndexedDocument,
    embedding: Vec<f32>,
}

/// Session-wide document index.
///
/// Entries are never updated or removed; indexing the same text twice yields
/// two entries. The embedding dimension is fixed by the first insert.
pub struct VectorIndex {
    embedder: Arc<dyn TextEmbedder>,
    entries: RwLock<Vec<IndexEntry>>,
}

impl VectorIndex {
    pub fn new(embedder: Arc<dyn TextEmbedder>) -> Self {
        Self {
            embedder,
            entries: RwLock::new(Vec::new()),
        }
    }

    pub fn embedder_name(&self) -> &str {
        self.embedder.model_name()
    }

    /// Embed `text` and append it. Returns the new entry count.
    pub async fn add(&self, text: impl Into<String>, metadata: DocumentMetadata) -> Result<usize, IndexError> {
        let text = text.into();
        let embedding = self.embed(&text).await?;

        // Embed outside the lock; only the append is serialized
        let mut entries = self.entries.write().await;
        if let Some(first) = entries.first() {
            if first.embedding.len() != embedding.len() {
                return Err(IndexError::DimensionMismatch {
                    expected: first.embedding.len(),
                    got: embedding.len(),
                });
            }
        }

        tracing::debug!(
            source = metadata.source.as_str(),
            symbol = %metadata.symbol,
            "Indexed document ({} chars)",
            text.len()
        );
        entries.push(IndexEntry {
            document: IndexedDocument { text, metadata },
            embedding,
        });
        Ok(entries.len())
    }

    /// The `k` nearest documents to `query`, closest first. Ties keep insertion order.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredDocument>, IndexError> {
        if k == 0 || self.is_empty().await {
            return Ok(Vec::new());
        }

        let query_embedding = self.embed(query).await?;
        let entries = self.entries.read().await;

        let expected = entries.first().map(|e| e.embedding.len()).unwrap_or(0);
        if expected != query_embedding.len() {
            return Err(IndexError::DimensionMismatch {
                expected,
                got: query_embedding.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, squared_l2(&entry.embedding, &query_embedding)))
            .collect();
        // sort_by is stable, so equal distances stay in insertion order
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(i, distance)| ScoredDocument {
                document: entries[i].document.clone(),
                distance,
            })
            .collect())
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Embedding dimension, once the first document is in
    pub async fn dimension(&self) -> Option<usize> {
        self.entries.read().await.first().map(|e| e.embedding.len())
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, IndexError> {
        let embedding = self.embedder.embed(text).await?;
        if embedding.is_empty() {
            return Err(IndexError::EmptyEmbedding);
        }
        Ok(embedding)
    }
}

/// Squared Euclidean distance
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

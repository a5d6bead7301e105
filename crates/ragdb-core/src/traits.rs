//! Collaborator interfaces consumed by the retrieval core.
//!
//! These are boundaries, not implementations: binary parsing, embedding
//! generation, and persistent vector storage live outside this workspace.
//! All traits are object-safe and `Send + Sync` so a single instance can be
//! shared across document pipelines and concurrent searches.

use chrono::{DateTime, Utc};

use crate::types::{ChunkId, ChunkRecord, DocumentStatus, Extraction, RankedResult, Scope, StoredChunk};

/// Extracts plain text from raw document bytes. Empty or whitespace-only
/// extracted text is treated as a pipeline failure by the caller.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, content: &[u8], mime_type: &str) -> anyhow::Result<Extraction>;
}

/// Produces dense vectors for batches of text. A per-item failure yields
/// `None` for that slot and must not fail the whole batch.
pub trait EmbeddingProvider: Send + Sync {
    fn is_configured(&self) -> bool;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Option<Vec<f32>>>>;
}

/// Persistent chunk storage with vector-similarity search.
///
/// Implementations must derive chunk ids as `{document_id}_{chunk_index}` so
/// that lexical and semantic rankings for the same fragment share an id and
/// can be merged during fusion.
pub trait VectorStore: Send + Sync {
    /// Persist one document's chunks. Returns the number stored.
    fn store(&self, document_id: &str, records: &[ChunkRecord]) -> anyhow::Result<usize>;

    /// Similarity search over stored vectors, ordered by descending
    /// similarity, filtered to `similarity >= min_similarity`.
    fn semantic_search(
        &self,
        query_vector: &[f32],
        scope: &Scope,
        top_k: usize,
        min_similarity: f64,
    ) -> anyhow::Result<Vec<RankedResult>>;

    /// Delete a document's chunks. Returns the count and the deleted chunk
    /// ids (used to unindex them from the lexical side).
    fn delete(&self, document_id: &str) -> anyhow::Result<(usize, Vec<ChunkId>)>;

    /// Every stored chunk in scope, used to rebuild the lexical index.
    fn list_all(&self, scope: &Scope) -> anyhow::Result<Vec<StoredChunk>>;
}

/// Receives per-document pipeline state transitions.
pub trait StatusSink: Send + Sync {
    fn set_status(
        &self,
        document_id: &str,
        status: DocumentStatus,
        error_message: Option<&str>,
        completed_at: Option<DateTime<Utc>>,
    ) -> anyhow::Result<()>;
}

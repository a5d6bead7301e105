//! RetrievalEngine: one BM25 index plus the semantic collaborators, fused
//! per query.
//!
//! The index is shared state passed in by the caller (never a global); the
//! embedding provider and vector store are trait objects. Hybrid search
//! runs both sub-searches concurrently and degrades to the lexical ranking
//! whenever the semantic side comes back empty.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use ragdb_bm25::Bm25Index;
use ragdb_core::config::SearchSettings;
use ragdb_core::traits::{EmbeddingProvider, VectorStore};
use ragdb_core::types::{
    ChunkId, Meta, RankedResult, ResultSource, Scope, SearchMode, StoredChunk,
};

use crate::context;
use crate::fusion::reciprocal_rank_fusion;

pub struct RetrievalEngine {
    index: Arc<Bm25Index>,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    settings: SearchSettings,
}

impl RetrievalEngine {
    pub fn new(
        index: Arc<Bm25Index>,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        settings: SearchSettings,
    ) -> Self {
        Self { index, embedder, store, settings }
    }

    /// Dispatch on the requested mode. `top_k` of 0 falls back to the
    /// configured default.
    pub async fn search(
        &self,
        mode: SearchMode,
        query: &str,
        scope: &Scope,
        top_k: usize,
    ) -> Vec<RankedResult> {
        let top_k = if top_k == 0 { self.settings.top_k } else { top_k };
        match mode {
            SearchMode::Lexical => self.lexical_search(query, scope, top_k),
            SearchMode::Semantic => self.semantic_search(query, scope, top_k).await,
            SearchMode::Hybrid => self.hybrid_search(query, scope, top_k).await,
        }
    }

    /// Search and assemble citation-formatted context in one call.
    pub async fn context_for_query(
        &self,
        mode: SearchMode,
        query: &str,
        scope: &Scope,
        top_k: usize,
    ) -> (Vec<String>, Vec<ChunkId>) {
        let top_k = if top_k == 0 { self.settings.top_k } else { top_k };
        let results = self.search(mode, query, scope, top_k).await;
        context::assemble(&results, top_k)
    }

    /// BM25 search enriched from the index's stored text and metadata. An
    /// empty index is lazily rebuilt from the store first.
    pub fn lexical_search(&self, query: &str, scope: &Scope, top_k: usize) -> Vec<RankedResult> {
        Self::lexical_blocking(&self.index, self.store.as_ref(), query, scope, top_k)
    }

    fn lexical_blocking(
        index: &Bm25Index,
        store: &dyn VectorStore,
        query: &str,
        scope: &Scope,
        top_k: usize,
    ) -> Vec<RankedResult> {
        if index.is_empty() {
            match store.list_all(scope) {
                Ok(rows) => {
                    let docs = index.rebuild(rows.into_iter().map(stored_chunk_entry));
                    debug!(docs, "lexical index was empty; rebuilt from store");
                }
                Err(err) => warn!(error = %err, "lexical index rebuild failed"),
            }
        }

        index
            .search(query, top_k)
            .into_iter()
            .filter_map(|(id, score)| {
                let (content, meta) = index.document(&id)?;
                Some(result_from_meta(id, content, score, ResultSource::Lexical, &meta))
            })
            .collect()
    }

    /// Semantic search through the embedding provider and vector store.
    /// Every unavailability condition (unconfigured provider, failed query
    /// embedding, store error, timeout) yields an empty list rather than an
    /// error, so the hybrid fallback applies uniformly.
    pub async fn semantic_search(
        &self,
        query: &str,
        scope: &Scope,
        top_k: usize,
    ) -> Vec<RankedResult> {
        if !self.embedder.is_configured() {
            warn!("embedding provider not configured; skipping semantic search");
            return Vec::new();
        }

        let embedder = Arc::clone(&self.embedder);
        let store = Arc::clone(&self.store);
        let query = query.to_string();
        let scope = scope.clone();
        let min_similarity = self.settings.min_similarity;
        let budget = Duration::from_millis(self.settings.semantic_timeout_ms);

        let task = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<RankedResult>> {
            let mut vectors = embedder.embed_batch(&[query])?;
            let Some(query_vector) = vectors.pop().flatten() else {
                return Ok(Vec::new());
            };
            store.semantic_search(&query_vector, &scope, top_k, min_similarity)
        });

        match tokio::time::timeout(budget, task).await {
            Ok(Ok(Ok(mut results))) => {
                for r in &mut results {
                    r.source = ResultSource::Semantic;
                }
                results
            }
            Ok(Ok(Err(err))) => {
                warn!(error = %err, "semantic search failed; returning no results");
                Vec::new()
            }
            Ok(Err(err)) => {
                warn!(error = %err, "semantic search task panicked; returning no results");
                Vec::new()
            }
            Err(_) => {
                warn!(timeout_ms = budget.as_millis() as u64, "semantic search timed out");
                Vec::new()
            }
        }
    }

    /// Lexical and semantic sub-searches run concurrently, each overfetching
    /// `top_k * overfetch_factor` candidates; results merge via RRF. An
    /// empty semantic list degrades to the lexical ranking truncated to
    /// `top_k`; this is a designed fallback, not an error.
    pub async fn hybrid_search(&self, query: &str, scope: &Scope, top_k: usize) -> Vec<RankedResult> {
        let fetch = top_k * self.settings.overfetch_factor.max(1);

        let lexical_task = tokio::task::spawn_blocking({
            let index = Arc::clone(&self.index);
            let store = Arc::clone(&self.store);
            let query = query.to_string();
            let scope = scope.clone();
            move || Self::lexical_blocking(&index, store.as_ref(), &query, &scope, fetch)
        });

        let (lexical, semantic) = futures::join!(
            async {
                match lexical_task.await {
                    Ok(results) => results,
                    Err(err) => {
                        warn!(error = %err, "lexical search task panicked");
                        Vec::new()
                    }
                }
            },
            self.semantic_search(query, scope, fetch),
        );

        if semantic.is_empty() {
            info!(lexical = lexical.len(), "hybrid search degraded to lexical-only");
            let mut results = lexical;
            results.truncate(top_k);
            return results;
        }

        debug!(
            lexical = lexical.len(),
            semantic = semantic.len(),
            "fusing sub-search rankings"
        );
        let mut fused = reciprocal_rank_fusion(lexical, semantic, self.settings.rrf_k);
        fused.truncate(top_k);
        fused
    }

    /// Replace the lexical index from the store's full chunk listing.
    pub fn rebuild_index(&self, scope: &Scope) -> anyhow::Result<usize> {
        let rows = self.store.list_all(scope)?;
        let docs = self.index.rebuild(rows.into_iter().map(stored_chunk_entry));
        info!(docs, "lexical index rebuilt");
        Ok(docs)
    }
}

pub(crate) const META_CHUNK_INDEX: &str = "chunk_index";
pub(crate) const META_PAGE_NUMBER: &str = "page_number";
pub(crate) const META_DOCUMENT_ID: &str = "document_id";
pub(crate) const META_FILENAME: &str = "filename";
pub(crate) const META_ORIGINAL_NAME: &str = "original_name";

/// Index-side metadata for one chunk, carried as strings.
pub(crate) fn chunk_meta(
    chunk_index: usize,
    page_number: Option<u32>,
    document_id: &str,
    filename: &str,
    original_name: Option<&str>,
) -> Meta {
    let mut meta = Meta::new();
    meta.insert(META_CHUNK_INDEX.to_string(), chunk_index.to_string());
    if let Some(page) = page_number {
        meta.insert(META_PAGE_NUMBER.to_string(), page.to_string());
    }
    meta.insert(META_DOCUMENT_ID.to_string(), document_id.to_string());
    meta.insert(META_FILENAME.to_string(), filename.to_string());
    if let Some(name) = original_name {
        meta.insert(META_ORIGINAL_NAME.to_string(), name.to_string());
    }
    meta
}

fn result_from_meta(
    id: ChunkId,
    content: String,
    score: f64,
    source: ResultSource,
    meta: &Meta,
) -> RankedResult {
    RankedResult {
        id,
        content,
        score,
        source,
        chunk_index: meta
            .get(META_CHUNK_INDEX)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0),
        page_number: meta.get(META_PAGE_NUMBER).and_then(|v| v.parse().ok()),
        document_id: meta.get(META_DOCUMENT_ID).cloned().unwrap_or_default(),
        filename: meta.get(META_FILENAME).cloned().unwrap_or_default(),
        original_name: meta.get(META_ORIGINAL_NAME).cloned(),
    }
}

/// A stored chunk row as a lexical index entry, for rebuilds.
pub(crate) fn stored_chunk_entry(row: StoredChunk) -> (ChunkId, String, Meta) {
    let meta = chunk_meta(
        row.chunk_index,
        row.page_number,
        &row.document_id,
        &row.filename,
        row.original_name.as_deref(),
    );
    (row.id, row.content, meta)
}

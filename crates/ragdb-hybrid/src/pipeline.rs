//! Per-document ingestion: extract → chunk → embed → store → index, with
//! status reporting at every transition. Pipelines for distinct documents
//! share nothing but the lexical index (internally locked) and the store,
//! so one document's failure never touches another's.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use ragdb_bm25::Bm25Index;
use ragdb_chunk::{ChunkingEngine, Strategy};
use ragdb_core::error::{Error, Result};
use ragdb_core::traits::{EmbeddingProvider, StatusSink, TextExtractor, VectorStore};
use ragdb_core::types::{ChunkId, ChunkRecord, DocumentStatus, Scope};

use crate::engine::chunk_meta;

pub struct DocumentPipeline {
    extractor: Arc<dyn TextExtractor>,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    status: Arc<dyn StatusSink>,
    index: Arc<Bm25Index>,
    chunker: ChunkingEngine,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub chunks: usize,
    pub stored: usize,
    pub embedded: usize,
    pub indexed: usize,
}

impl DocumentPipeline {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        status: Arc<dyn StatusSink>,
        index: Arc<Bm25Index>,
        chunker: ChunkingEngine,
    ) -> Self {
        Self { extractor, embedder, store, status, index, chunker }
    }

    /// Run the full pipeline for one document. The outcome, completed or
    /// failed with the reason, is always recorded against this document id
    /// before returning.
    pub fn process(
        &self,
        document_id: &str,
        content: &[u8],
        mime_type: &str,
        filename: &str,
    ) -> Result<IngestReport> {
        info!(document_id, filename, mime_type, "processing document");
        self.report(document_id, DocumentStatus::Processing, None);

        match self.run(document_id, content, mime_type, filename) {
            Ok(report) => {
                if let Err(err) = self.status.set_status(
                    document_id,
                    DocumentStatus::Completed,
                    None,
                    Some(Utc::now()),
                ) {
                    warn!(document_id, error = %err, "status sink rejected update");
                }
                info!(
                    document_id,
                    chunks = report.chunks,
                    stored = report.stored,
                    embedded = report.embedded,
                    "document processed"
                );
                Ok(report)
            }
            Err(err) => {
                error!(document_id, error = %err, "document processing failed");
                self.report(document_id, DocumentStatus::Failed, Some(&err.to_string()));
                Err(err)
            }
        }
    }

    fn run(
        &self,
        document_id: &str,
        content: &[u8],
        mime_type: &str,
        filename: &str,
    ) -> Result<IngestReport> {
        let extraction = self
            .extractor
            .extract(content, mime_type)
            .map_err(|e| Error::Extraction(e.to_string()))?;
        if extraction.text.trim().is_empty() {
            return Err(Error::EmptyContent);
        }
        debug!(
            document_id,
            chars = extraction.text.len(),
            pages = extraction.page_count,
            "extracted text"
        );

        let chunks =
            self.chunker
                .chunk_text(&extraction.text, extraction.page_count, Strategy::Paragraph);
        if chunks.is_empty() {
            return Err(Error::EmptyContent);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors: Vec<Option<Vec<f32>>> = if self.embedder.is_configured() {
            match self.embedder.embed_batch(&texts) {
                Ok(v) if v.len() == texts.len() => v,
                Ok(_) => {
                    warn!(document_id, "embedding batch arity mismatch; storing without vectors");
                    vec![None; texts.len()]
                }
                Err(err) => {
                    warn!(document_id, error = %err, "embedding failed; storing without vectors");
                    vec![None; texts.len()]
                }
            }
        } else {
            debug!(document_id, "embedding provider not configured; storing without vectors");
            vec![None; texts.len()]
        };
        let embedded = vectors.iter().filter(|v| v.is_some()).count();

        let records: Vec<ChunkRecord> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| ChunkRecord {
                content: chunk.content.clone(),
                vector,
                chunk_index: chunk.chunk_index,
                page_number: chunk.page_number,
                start_char: chunk.start_char,
                end_char: chunk.end_char,
            })
            .collect();
        let stored = self
            .store
            .store(document_id, &records)
            .map_err(|e| Error::Operation(e.to_string()))?;

        let docs = chunks
            .iter()
            .map(|chunk| {
                (
                    format!("{document_id}_{}", chunk.chunk_index),
                    chunk.content.clone(),
                    chunk_meta(
                        chunk.chunk_index,
                        chunk.page_number,
                        document_id,
                        filename,
                        Some(filename),
                    ),
                )
            })
            .collect();
        let indexed = self.index.add_batch(docs);

        Ok(IngestReport { chunks: chunks.len(), stored, embedded, indexed })
    }

    /// Delete a document's chunks from the store and unindex them. Returns
    /// the number of chunks deleted.
    pub fn delete_document(&self, document_id: &str) -> anyhow::Result<(usize, Vec<ChunkId>)> {
        let (count, ids) = self.store.delete(document_id)?;
        for id in &ids {
            self.index.remove(id);
        }
        info!(document_id, chunks = count, "document deleted");
        Ok((count, ids))
    }

    /// Replace the lexical index from the store's chunk listing for a scope.
    pub fn rebuild_index(&self, scope: &Scope) -> anyhow::Result<usize> {
        let rows = self.store.list_all(scope)?;
        Ok(self.index.rebuild(rows.into_iter().map(crate::engine::stored_chunk_entry)))
    }

    fn report(&self, document_id: &str, status: DocumentStatus, message: Option<&str>) {
        if let Err(err) = self.status.set_status(document_id, status, message, None) {
            warn!(document_id, error = %err, "status sink rejected update");
        }
    }
}

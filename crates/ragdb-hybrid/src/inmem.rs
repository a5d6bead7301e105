//! In-process collaborator implementations: a plain-text extractor, an
//! in-memory vector store, and an in-memory status sink. Production
//! deployments plug real services in behind the same traits; these back the
//! CLI demo and the integration tests.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use ragdb_core::traits::{StatusSink, TextExtractor, VectorStore};
use ragdb_core::types::{
    ChunkId, ChunkRecord, DocumentStatus, Extraction, RankedResult, ResultSource, Scope,
    StoredChunk,
};

/// Rough page estimate for plain text, mirroring common extractor behavior.
const CHARS_PER_PAGE: usize = 3000;
/// Upper bound on extracted text, against memory exhaustion.
const MAX_TEXT_LENGTH: usize = 5_000_000;

/// Extractor for `text/plain` and `text/markdown` payloads. Anything else
/// is an extraction failure.
#[derive(Debug, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, content: &[u8], mime_type: &str) -> anyhow::Result<Extraction> {
        match mime_type {
            "text/plain" | "text/markdown" => {}
            other => anyhow::bail!("Unsupported file type: {other}"),
        }

        let mut text = sanitize(&String::from_utf8_lossy(content));
        if text.len() > MAX_TEXT_LENGTH {
            let mut cut = MAX_TEXT_LENGTH;
            while cut > 0 && !text.is_char_boundary(cut) {
                cut -= 1;
            }
            text.truncate(cut);
        }

        let page_count = (text.len() / CHARS_PER_PAGE).max(1);
        Ok(Extraction { text, page_count })
    }
}

/// Normalize line endings, strip control characters, and collapse runs of
/// blank lines.
fn sanitize(raw: &str) -> String {
    let mut text: String = raw
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .chars()
        .filter(|c| *c == '\n' || *c == '\t' || !c.is_control())
        .collect();
    while text.contains("\n\n\n") {
        text = text.replace("\n\n\n", "\n\n");
    }
    text.trim().to_string()
}

struct DocEntry {
    scope: Scope,
    filename: String,
    original_name: Option<String>,
    chunks: Vec<ChunkRecord>,
}

/// In-memory `VectorStore` with brute-force cosine search. Chunk ids follow
/// the store contract: `{document_id}_{chunk_index}`.
#[derive(Default)]
pub struct MemoryVectorStore {
    docs: RwLock<HashMap<String, DocEntry>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or update the document row that `store` attaches chunks to.
    /// In the real system the API layer owns this record.
    pub fn register_document(
        &self,
        document_id: &str,
        scope: &Scope,
        filename: &str,
        original_name: Option<&str>,
    ) {
        self.docs.write().insert(
            document_id.to_string(),
            DocEntry {
                scope: scope.clone(),
                filename: filename.to_string(),
                original_name: original_name.map(str::to_string),
                chunks: Vec::new(),
            },
        );
    }

    pub fn document_count(&self) -> usize {
        self.docs.read().len()
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0f64;
    let mut na = 0f64;
    let mut nb = 0f64;
    for (x, y) in a.iter().zip(b) {
        dot += f64::from(*x) * f64::from(*y);
        na += f64::from(*x) * f64::from(*x);
        nb += f64::from(*y) * f64::from(*y);
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}

impl VectorStore for MemoryVectorStore {
    fn store(&self, document_id: &str, records: &[ChunkRecord]) -> anyhow::Result<usize> {
        let mut docs = self.docs.write();
        let entry = docs
            .get_mut(document_id)
            .ok_or_else(|| anyhow::anyhow!("document {document_id} is not registered"))?;
        entry.chunks = records.to_vec();
        Ok(records.len())
    }

    fn semantic_search(
        &self,
        query_vector: &[f32],
        scope: &Scope,
        top_k: usize,
        min_similarity: f64,
    ) -> anyhow::Result<Vec<RankedResult>> {
        let docs = self.docs.read();
        let mut hits: Vec<RankedResult> = Vec::new();

        for (document_id, entry) in docs.iter() {
            if entry.scope != *scope {
                continue;
            }
            for chunk in &entry.chunks {
                let Some(vector) = chunk.vector.as_deref() else {
                    continue;
                };
                let similarity = cosine(query_vector, vector);
                if similarity < min_similarity {
                    continue;
                }
                hits.push(RankedResult {
                    id: format!("{document_id}_{}", chunk.chunk_index),
                    content: chunk.content.clone(),
                    score: similarity,
                    source: ResultSource::Semantic,
                    chunk_index: chunk.chunk_index,
                    page_number: chunk.page_number,
                    document_id: document_id.clone(),
                    filename: entry.filename.clone(),
                    original_name: entry.original_name.clone(),
                });
            }
        }

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(top_k);
        Ok(hits)
    }

    fn delete(&self, document_id: &str) -> anyhow::Result<(usize, Vec<ChunkId>)> {
        let mut docs = self.docs.write();
        let Some(entry) = docs.remove(document_id) else {
            return Ok((0, Vec::new()));
        };
        let ids: Vec<ChunkId> = entry
            .chunks
            .iter()
            .map(|c| format!("{document_id}_{}", c.chunk_index))
            .collect();
        Ok((ids.len(), ids))
    }

    fn list_all(&self, scope: &Scope) -> anyhow::Result<Vec<StoredChunk>> {
        let docs = self.docs.read();
        let mut rows: Vec<StoredChunk> = Vec::new();
        for (document_id, entry) in docs.iter() {
            if entry.scope != *scope {
                continue;
            }
            for chunk in &entry.chunks {
                rows.push(StoredChunk {
                    id: format!("{document_id}_{}", chunk.chunk_index),
                    content: chunk.content.clone(),
                    chunk_index: chunk.chunk_index,
                    page_number: chunk.page_number,
                    document_id: document_id.clone(),
                    filename: entry.filename.clone(),
                    original_name: entry.original_name.clone(),
                });
            }
        }
        rows.sort_by(|a, b| {
            (a.document_id.as_str(), a.chunk_index).cmp(&(b.document_id.as_str(), b.chunk_index))
        });
        Ok(rows)
    }
}

#[derive(Debug, Clone)]
pub struct StatusRecord {
    pub status: DocumentStatus,
    pub error_message: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Status sink that keeps the latest record per document.
#[derive(Default)]
pub struct MemoryStatusSink {
    records: RwLock<HashMap<String, StatusRecord>>,
}

impl MemoryStatusSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status_of(&self, document_id: &str) -> Option<StatusRecord> {
        self.records.read().get(document_id).cloned()
    }
}

impl StatusSink for MemoryStatusSink {
    fn set_status(
        &self,
        document_id: &str,
        status: DocumentStatus,
        error_message: Option<&str>,
        completed_at: Option<DateTime<Utc>>,
    ) -> anyhow::Result<()> {
        self.records.write().insert(
            document_id.to_string(),
            StatusRecord {
                status,
                error_message: error_message.map(str::to_string),
                completed_at,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_extractor_rejects_unknown_mime() {
        let e = PlainTextExtractor;
        assert!(e.extract(b"data", "application/pdf").is_err());
    }

    #[test]
    fn plain_text_extractor_sanitizes_and_estimates_pages() {
        let e = PlainTextExtractor;
        let out = e
            .extract(b"line one\r\n\r\n\r\n\r\nline two\x00", "text/plain")
            .expect("extract");
        assert_eq!(out.text, "line one\n\nline two");
        assert_eq!(out.page_count, 1);
    }

    #[test]
    fn store_requires_registration() {
        let store = MemoryVectorStore::new();
        assert!(store.store("ghost", &[]).is_err());
    }

    #[test]
    fn semantic_search_filters_by_scope_and_similarity() {
        let store = MemoryVectorStore::new();
        let scope_a = Scope::new("subject-a", "user-1");
        let scope_b = Scope::new("subject-b", "user-1");
        store.register_document("d1", &scope_a, "a.txt", None);
        store.register_document("d2", &scope_b, "b.txt", None);

        let record = |v: Vec<f32>| ChunkRecord {
            content: "text".to_string(),
            vector: Some(v),
            chunk_index: 0,
            page_number: None,
            start_char: 0,
            end_char: 4,
        };
        store.store("d1", &[record(vec![1.0, 0.0])]).expect("store d1");
        store.store("d2", &[record(vec![1.0, 0.0])]).expect("store d2");

        let hits = store
            .semantic_search(&[1.0, 0.0], &scope_a, 10, 0.5)
            .expect("search");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document_id, "d1");
        assert_eq!(hits[0].id, "d1_0");
        assert!((hits[0].score - 1.0).abs() < 1e-9);

        let none = store
            .semantic_search(&[0.0, 1.0], &scope_a, 10, 0.5)
            .expect("orthogonal query");
        assert!(none.is_empty());
    }
}

//! Okapi BM25 inverted index with incremental add/remove.
//!
//! All state lives behind one readers-writer lock: concurrent searches take
//! the read side, every mutation takes the write side, so `avgdl`,
//! `doc_count`, and the postings are always observed as one consistent
//! snapshot. Rebuilds construct a fresh state off-lock and swap it in, so a
//! concurrent reader never sees a half-populated index.

use parking_lot::RwLock;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use ragdb_core::types::{ChunkId, Meta};

use crate::tokenizer::tokenize;

/// Term-frequency saturation parameter.
pub const K1: f64 = 1.5;
/// Document-length normalization parameter.
pub const B: f64 = 0.75;

#[derive(Debug, Clone)]
struct Posting {
    id: ChunkId,
    tf: u32,
}

#[derive(Default)]
struct IndexState {
    /// term -> postings in document-insertion order.
    postings: HashMap<String, Vec<Posting>>,
    /// term -> number of documents containing it. Dies with its posting list.
    doc_freqs: HashMap<String, usize>,
    doc_lengths: HashMap<ChunkId, usize>,
    doc_texts: HashMap<ChunkId, String>,
    doc_metadata: HashMap<ChunkId, Meta>,
    doc_count: usize,
    avgdl: f64,
}

impl IndexState {
    fn insert(&mut self, id: &str, text: &str, metadata: Meta) {
        // Re-adding an id replaces the old document so doc_count and avgdl
        // stay consistent.
        if self.doc_texts.contains_key(id) {
            self.evict(id);
        }

        let tokens = tokenize(text);
        self.doc_texts.insert(id.to_string(), text.to_string());
        self.doc_metadata.insert(id.to_string(), metadata);
        self.doc_lengths.insert(id.to_string(), tokens.len());

        let mut counts: HashMap<String, u32> = HashMap::new();
        for token in tokens {
            *counts.entry(token).or_insert(0) += 1;
        }
        for (term, tf) in counts {
            self.postings
                .entry(term.clone())
                .or_default()
                .push(Posting { id: id.to_string(), tf });
            *self.doc_freqs.entry(term).or_insert(0) += 1;
        }

        self.doc_count += 1;
        self.recompute_avgdl();
    }

    fn evict(&mut self, id: &str) -> bool {
        let Some(text) = self.doc_texts.remove(id) else {
            return false;
        };

        let mut seen: HashSet<String> = HashSet::new();
        for term in tokenize(&text) {
            if !seen.insert(term.clone()) {
                continue;
            }
            if let Some(list) = self.postings.get_mut(&term) {
                list.retain(|p| p.id != id);
                if list.is_empty() {
                    // Posting list and document-frequency entry die together.
                    self.postings.remove(&term);
                    self.doc_freqs.remove(&term);
                } else if let Some(df) = self.doc_freqs.get_mut(&term) {
                    *df = df.saturating_sub(1);
                }
            }
        }

        self.doc_lengths.remove(id);
        self.doc_metadata.remove(id);
        self.doc_count -= 1;
        self.recompute_avgdl();
        true
    }

    fn recompute_avgdl(&mut self) {
        self.avgdl = if self.doc_count > 0 {
            self.doc_lengths.values().sum::<usize>() as f64 / self.doc_count as f64
        } else {
            0.0
        };
    }

    fn search(&self, query: &str, limit: usize) -> Vec<(ChunkId, f64)> {
        if self.doc_count == 0 {
            return Vec::new();
        }
        let query_tokens = tokenize(query);
        if query_tokens.is_empty() {
            return Vec::new();
        }

        let n = self.doc_count as f64;
        let mut scores: HashMap<ChunkId, f64> = HashMap::new();
        let mut order: Vec<ChunkId> = Vec::new();

        // Query tokens are a multiset: a duplicated token contributes twice.
        for term in &query_tokens {
            let Some(list) = self.postings.get(term.as_str()) else {
                continue;
            };
            let df = self.doc_freqs.get(term.as_str()).copied().unwrap_or(0) as f64;
            let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();

            for posting in list {
                let dl = self.doc_lengths.get(&posting.id).copied().unwrap_or(0) as f64;
                let tf = f64::from(posting.tf);
                let tf_norm = (tf * (K1 + 1.0)) / (tf + K1 * (1.0 - B + B * dl / self.avgdl));
                match scores.entry(posting.id.clone()) {
                    Entry::Occupied(mut e) => *e.get_mut() += idf * tf_norm,
                    Entry::Vacant(e) => {
                        e.insert(idf * tf_norm);
                        order.push(posting.id.clone());
                    }
                }
            }
        }

        // Stable sort over first-seen order keeps ties in insertion order.
        let mut ranked: Vec<(ChunkId, f64)> = order
            .into_iter()
            .map(|id| {
                let score = scores.remove(&id).unwrap_or(0.0);
                (id, score)
            })
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(limit);
        ranked
    }
}

/// In-memory BM25 index. Shared per process (`Arc<Bm25Index>`); interior
/// locking makes all operations safe to call concurrently.
#[derive(Default)]
pub struct Bm25Index {
    state: RwLock<IndexState>,
}

impl Bm25Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index one document. Blank ids and blank texts are ignored; an
    /// existing id is replaced.
    pub fn add(&self, id: &str, text: &str, metadata: Meta) {
        if id.trim().is_empty() || text.trim().is_empty() {
            return;
        }
        self.state.write().insert(id, text, metadata);
    }

    /// Index a batch under one write acquisition. Returns the number of
    /// documents actually indexed.
    pub fn add_batch(&self, docs: Vec<(ChunkId, String, Meta)>) -> usize {
        let mut state = self.state.write();
        let mut count = 0;
        for (id, text, metadata) in docs {
            if id.trim().is_empty() || text.trim().is_empty() {
                continue;
            }
            state.insert(&id, &text, metadata);
            count += 1;
        }
        count
    }

    /// Remove a document. Unknown ids are a no-op.
    pub fn remove(&self, id: &str) {
        self.state.write().evict(id);
    }

    /// BM25 ranked search: descending score, ties in insertion order,
    /// truncated to `limit`. An empty query or empty index yields no results.
    pub fn search(&self, query: &str, limit: usize) -> Vec<(ChunkId, f64)> {
        self.state.read().search(query, limit)
    }

    /// Stored text and metadata for a document, if indexed.
    pub fn document(&self, id: &str) -> Option<(String, Meta)> {
        let state = self.state.read();
        let text = state.doc_texts.get(id)?.clone();
        let meta = state.doc_metadata.get(id).cloned().unwrap_or_default();
        Some((text, meta))
    }

    pub fn size(&self) -> usize {
        self.state.read().doc_count
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Mean token count across the index. 0.0 when empty.
    pub fn average_doc_length(&self) -> f64 {
        self.state.read().avgdl
    }

    pub fn clear(&self) {
        *self.state.write() = IndexState::default();
    }

    /// Replace the whole index. The new state is built before the write
    /// lock is taken, so concurrent readers see either the old index or the
    /// finished new one, never an empty intermediate.
    pub fn rebuild<I>(&self, entries: I) -> usize
    where
        I: IntoIterator<Item = (ChunkId, String, Meta)>,
    {
        let mut fresh = IndexState::default();
        for (id, text, metadata) in entries {
            if id.trim().is_empty() || text.trim().is_empty() {
                continue;
            }
            fresh.insert(&id, &text, metadata);
        }
        let count = fresh.doc_count;
        *self.state.write() = fresh;
        debug!(docs = count, "rebuilt lexical index");
        count
    }
}

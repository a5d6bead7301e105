//! Domain types shared by the chunking, lexical, and fusion layers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub type ChunkId = String;
pub type Meta = HashMap<String, String>;

/// A bounded fragment of a document's text, the unit indexed and retrieved.
///
/// - `chunk_index`: zero-based, contiguous within one chunking run
/// - `page_number`: estimated page (1-based) when the source had multiple pages
/// - `start_char`/`end_char`: offsets into the source text, `start_char < end_char`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub chunk_index: usize,
    pub page_number: Option<u32>,
    pub start_char: usize,
    pub end_char: usize,
    #[serde(default)]
    pub metadata: Meta,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Which retrieval path produced a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    Lexical,
    Semantic,
    Hybrid,
}

/// Search mode requested by the caller. Closed set; every dispatch over it
/// is an exhaustive match.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Lexical,
    Semantic,
    Hybrid,
}

impl std::str::FromStr for SearchMode {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lexical" | "bm25" => Ok(Self::Lexical),
            "semantic" => Ok(Self::Semantic),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(crate::error::Error::InvalidConfig(format!(
                "unknown search mode: {other}"
            ))),
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Lexical => "lexical",
            Self::Semantic => "semantic",
            Self::Hybrid => "hybrid",
        };
        f.write_str(s)
    }
}

/// One ranked hit, produced transiently per query.
///
/// `score` is the engine-specific relevance value: a BM25 score for pure
/// lexical results, a similarity for pure semantic results, and the summed
/// RRF score after fusion. Higher is always better.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedResult {
    pub id: ChunkId,
    pub content: String,
    pub score: f64,
    pub source: ResultSource,
    pub chunk_index: usize,
    pub page_number: Option<u32>,
    pub document_id: String,
    pub filename: String,
    pub original_name: Option<String>,
}

/// Query scoping handed through to the vector store. The core performs no
/// authorization; callers are trusted to scope correctly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Scope {
    pub subject_id: String,
    pub user_id: String,
}

impl Scope {
    pub fn new(subject_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self { subject_id: subject_id.into(), user_id: user_id.into() }
    }
}

/// Per-document processing state reported to the status sink.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Processing,
    Completed,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// Payload for `VectorStore::store`, one row per chunk. A chunk whose
/// embedding failed is stored with `vector: None` and still participates in
/// lexical search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub content: String,
    pub vector: Option<Vec<f32>>,
    pub chunk_index: usize,
    pub page_number: Option<u32>,
    pub start_char: usize,
    pub end_char: usize,
}

/// A stored chunk row as returned by `VectorStore::list_all`, carrying the
/// document metadata needed to rebuild the lexical index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChunk {
    pub id: ChunkId,
    pub content: String,
    pub chunk_index: usize,
    pub page_number: Option<u32>,
    pub document_id: String,
    pub filename: String,
    pub original_name: Option<String>,
}

/// Result of text extraction at the collaborator boundary.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub text: String,
    pub page_count: usize,
}

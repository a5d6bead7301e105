//! ragdb-hybrid
//!
//! The fusion orchestrator: runs lexical (BM25) and semantic sub-searches,
//! merges them with Reciprocal Rank Fusion, assembles citation-ready
//! context, and drives the per-document ingestion pipeline. In-memory
//! collaborator implementations for tests and the CLI live in `inmem`.

pub mod context;
pub mod engine;
pub mod fusion;
pub mod inmem;
pub mod pipeline;

pub use engine::RetrievalEngine;
pub use pipeline::{DocumentPipeline, IngestReport};

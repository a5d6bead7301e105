//! ragdb-chunk
//!
//! Text segmentation for retrieval: paragraph, sentence, and fixed-window
//! strategies producing bounded, addressable chunks. See `chunker`.

pub mod chunker;
pub mod sentence;

pub use chunker::{ChunkingEngine, Strategy};
pub use sentence::split_sentences;

//! ragdb-embed
//!
//! `EmbeddingProvider` implementations. Real embedding generation is an
//! external service; this crate ships a disabled provider (unconfigured,
//! search degrades to lexical-only) and a deterministic hashed bag-of-words
//! embedder for offline runs and tests, selected via
//! `APP_USE_FAKE_EMBEDDINGS`.

use std::hash::{Hash, Hasher};

use tracing::info;
use twox_hash::XxHash64;

use ragdb_core::traits::EmbeddingProvider;

pub const EMBEDDING_DIM: usize = 384;

/// Provider used when no embedding backend is configured. Hybrid search
/// falls back to the lexical ranking.
#[derive(Debug, Default)]
pub struct DisabledProvider;

impl EmbeddingProvider for DisabledProvider {
    fn is_configured(&self) -> bool {
        false
    }

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Option<Vec<f32>>>> {
        Ok(vec![None; texts.len()])
    }
}

/// Deterministic hashed bag-of-words embedder. Each whitespace token is
/// hashed into one of `dim` buckets; the vector is L2-normalized. Similar
/// texts share buckets, which is enough signal for tests and demos.
pub struct HashEmbedder {
    dim: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(EMBEDDING_DIM)
    }
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for token in text.to_lowercase().split_whitespace() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            v[idx] += 1.0 + (((h >> 32) as u32) as f32) / (u32::MAX as f32);
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        v
    }
}

impl EmbeddingProvider for HashEmbedder {
    fn is_configured(&self) -> bool {
        true
    }

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Option<Vec<f32>>>> {
        Ok(texts.iter().map(|t| Some(self.embed_text(t))).collect())
    }
}

/// Pick a provider from the environment: the hashed embedder when
/// `APP_USE_FAKE_EMBEDDINGS` is set, the disabled provider otherwise.
pub fn default_provider() -> Box<dyn EmbeddingProvider> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if use_fake {
        info!("using hashed bag-of-words embedder");
        Box::new(HashEmbedder::default())
    } else {
        info!("no embedding backend configured; semantic search disabled");
        Box::new(DisabledProvider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_provider_returns_absent_vectors() {
        let p = DisabledProvider;
        assert!(!p.is_configured());
        let out = p.embed_batch(&["alpha".to_string(), "beta".to_string()]).expect("batch");
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(Option::is_none));
    }

    #[test]
    fn hash_embedder_is_deterministic_and_normalized() {
        let p = HashEmbedder::default();
        let out = p
            .embed_batch(&["subnet masks divide networks".to_string()])
            .expect("batch");
        let v = out[0].as_ref().expect("vector");
        assert_eq!(v.len(), EMBEDDING_DIM);

        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);

        let again = p
            .embed_batch(&["subnet masks divide networks".to_string()])
            .expect("batch");
        assert_eq!(out, again);
    }

    #[test]
    fn similar_texts_are_closer_than_unrelated_ones() {
        let p = HashEmbedder::default();
        let dot = |a: &[f32], b: &[f32]| a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>();

        let texts = [
            "subnet masks divide networks".to_string(),
            "the subnet mask divides a network".to_string(),
            "chocolate cake recipes".to_string(),
        ];
        let out = p.embed_batch(&texts).expect("batch");
        let (a, b, c) = (
            out[0].as_ref().expect("a"),
            out[1].as_ref().expect("b"),
            out[2].as_ref().expect("c"),
        );
        assert!(dot(a, b) > dot(a, c));
    }
}

//! Configuration loader and typed settings.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env
//! vars, the same layering for every binary. Typed sections carry the
//! chunking and search tunables with their documented defaults.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_"));

        Ok(Self { figment })
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Chunking tunables from the `[chunking]` section, defaults otherwise.
    pub fn chunking(&self) -> ChunkSettings {
        self.get("chunking").unwrap_or_default()
    }

    /// Search tunables from the `[search]` section, defaults otherwise.
    pub fn search(&self) -> SearchSettings {
        self.get("search").unwrap_or_default()
    }
}

/// Chunking Engine tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkSettings {
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Characters of trailing context carried between adjacent chunks.
    pub chunk_overlap: usize,
    /// Chunks shorter than this after trimming are dropped.
    pub min_chunk_size: usize,
    /// Whether the fixed strategy shortens windows to sentence boundaries.
    pub respect_sentences: bool,
}

impl Default for ChunkSettings {
    fn default() -> Self {
        Self { chunk_size: 500, chunk_overlap: 50, min_chunk_size: 50, respect_sentences: true }
    }
}

/// Fusion Orchestrator tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Results returned to the caller.
    pub top_k: usize,
    /// Each hybrid sub-search requests `top_k * overfetch_factor` candidates.
    pub overfetch_factor: usize,
    /// RRF smoothing constant.
    pub rrf_k: u32,
    /// Minimum similarity accepted from the vector store.
    pub min_similarity: f64,
    /// Budget for the semantic sub-search; on expiry hybrid search falls
    /// back to the lexical ranking.
    pub semantic_timeout_ms: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            overfetch_factor: 3,
            rrf_k: 60,
            min_similarity: 0.5,
            semantic_timeout_ms: 30_000,
        }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    // Expand env vars first
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    // Expand ~ at start
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_settings_defaults() {
        let s = ChunkSettings::default();
        assert_eq!(s.chunk_size, 500);
        assert_eq!(s.chunk_overlap, 50);
        assert_eq!(s.min_chunk_size, 50);
        assert!(s.respect_sentences);
    }

    #[test]
    fn search_settings_defaults() {
        let s = SearchSettings::default();
        assert_eq!(s.top_k, 5);
        assert_eq!(s.overfetch_factor, 3);
        assert_eq!(s.rrf_k, 60);
        assert!((s.min_similarity - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn resolve_relative_against_base() {
        let base = Path::new("/srv/ragdb");
        assert_eq!(resolve_with_base(base, "data"), PathBuf::from("/srv/ragdb/data"));
        assert_eq!(resolve_with_base(base, "/abs/data"), PathBuf::from("/abs/data"));
    }
}

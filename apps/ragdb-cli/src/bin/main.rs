use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use walkdir::WalkDir;

use ragdb_bm25::Bm25Index;
use ragdb_chunk::{ChunkingEngine, Strategy};
use ragdb_core::config::Config;
use ragdb_core::traits::VectorStore;
use ragdb_core::types::{Scope, SearchMode};
use ragdb_embed::default_provider;
use ragdb_hybrid::inmem::{MemoryStatusSink, MemoryVectorStore, PlainTextExtractor};
use ragdb_hybrid::{DocumentPipeline, RetrievalEngine};

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.is_empty() {
        eprintln!("Usage: {} <chunk|search> [args...]", prog);
        eprintln!("  chunk <file> [paragraph|sentence|fixed]");
        eprintln!("  search <data_dir> \"<query>\" [lexical|semantic|hybrid]");
        std::process::exit(1);
    }
    let cmd = args.remove(0);
    (cmd, args)
}

fn mime_for(path: &Path) -> Option<&'static str> {
    match path.extension().and_then(|s| s.to_str()) {
        Some("txt") => Some("text/plain"),
        Some("md") => Some("text/markdown"),
        _ => None,
    }
}

fn list_text_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .filter(|p| mime_for(p).is_some())
        .collect();
    files.sort();
    files
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let (cmd, args) = parse_args();

    match cmd.as_str() {
        "chunk" => {
            let file = args.first().map(PathBuf::from).unwrap_or_else(|| {
                eprintln!("Usage: ragdb chunk <file> [paragraph|sentence|fixed]");
                std::process::exit(1)
            });
            let strategy: Strategy = args
                .get(1)
                .map(|s| s.parse())
                .transpose()?
                .unwrap_or_default();

            let text = std::fs::read_to_string(&file)?;
            let engine = ChunkingEngine::new(config.chunking());
            let chunks = engine.chunk_text(&text, 1, strategy);
            println!("{} chunks from {}", chunks.len(), file.display());
            for c in &chunks {
                let preview: String = c.content.chars().take(60).collect();
                println!(
                    "  [{}] {}..{} ({} chars) {}",
                    c.chunk_index,
                    c.start_char,
                    c.end_char,
                    c.content.len(),
                    preview.replace('\n', " ")
                );
            }
        }
        "search" => {
            let data_dir = args.first().map(PathBuf::from).unwrap_or_else(|| {
                let dir: String = config
                    .get("data.raw_txt_dir")
                    .unwrap_or_else(|_| "./data/txt".to_string());
                PathBuf::from(dir)
            });
            let query = args.get(1).cloned().unwrap_or_else(|| {
                eprintln!("Usage: ragdb search <data_dir> \"<query>\" [mode]");
                std::process::exit(1)
            });
            let mode: SearchMode = args
                .get(2)
                .map(|s| s.parse())
                .transpose()?
                .unwrap_or(SearchMode::Hybrid);

            let files = list_text_files(&data_dir);
            if files.is_empty() {
                println!("No .txt or .md files found under {}.", data_dir.display());
                return Ok(());
            }

            let scope = Scope::new("local", "cli");
            let index = Arc::new(Bm25Index::new());
            let store = Arc::new(MemoryVectorStore::new());
            let embedder: Arc<dyn ragdb_core::traits::EmbeddingProvider> =
                Arc::from(default_provider());
            let pipeline = DocumentPipeline::new(
                Arc::new(PlainTextExtractor),
                Arc::clone(&embedder),
                Arc::clone(&store) as Arc<dyn VectorStore>,
                Arc::new(MemoryStatusSink::new()),
                Arc::clone(&index),
                ChunkingEngine::new(config.chunking()),
            );

            let bar = ProgressBar::new(files.len() as u64);
            bar.set_style(ProgressStyle::with_template(
                "{bar:40.cyan/blue} {pos}/{len} {msg}",
            )?);
            let mut failures = 0usize;
            for file in &files {
                let doc_id = file
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_else(|| "doc".to_string());
                let filename = file
                    .file_name()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_else(|| doc_id.clone());
                bar.set_message(filename.clone());

                let Some(mime) = mime_for(file) else { continue };
                let content = std::fs::read(file)?;
                store.register_document(&doc_id, &scope, &filename, None);
                // One bad file must not sink the rest of the ingest.
                if pipeline.process(&doc_id, &content, mime, &filename).is_err() {
                    failures += 1;
                }
                bar.inc(1);
            }
            bar.finish_and_clear();
            println!(
                "Indexed {} files ({} chunks, {} failures)",
                files.len() - failures,
                index.size(),
                failures
            );

            let engine = RetrievalEngine::new(
                Arc::clone(&index),
                embedder,
                Arc::clone(&store) as Arc<dyn VectorStore>,
                config.search(),
            );
            let top_k = config.search().top_k;
            let (texts, ids) = tokio::runtime::Runtime::new()?.block_on(async {
                engine.context_for_query(mode, &query, &scope, top_k).await
            });

            if texts.is_empty() {
                println!("No results for \"{}\" ({})", query, mode);
            } else {
                println!("Top {} results for \"{}\" ({}):\n", texts.len(), query, mode);
                for (text, id) in texts.iter().zip(&ids) {
                    println!("--- {} ---\n{}\n", id, text);
                }
            }
        }
        _ => {
            eprintln!("Unknown command: {}", cmd);
            std::process::exit(1);
        }
    }
    Ok(())
}

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::warn;

use ragdex::config::Config;
use ragdex::embedder::mock::MockEmbedder;
use ragdex::embedder::remote::{RemoteEmbedder, API_KEY_ENV};
use ragdex::embedder::Embedder;
use ragdex::engine::{IngestReport, RagEngine, UploadFile};
use ragdex::retriever::QueryResult;

// ── CLI definition ───────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "ragdex")]
#[command(version, about = "Local RAG knowledge-base engine", long_about = None)]
struct Cli {
    /// Path to the JSON config file
    #[arg(short, long, default_value = "ragdex.json")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add PDF/DOCX documents to a knowledge base (created on first ingest)
    Ingest {
        /// Knowledge base name
        store: String,

        /// Files to ingest
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Retrieve the most relevant chunks for a question
    Query {
        /// Knowledge base name
        store: String,

        /// Question text
        question: String,

        /// Number of chunks to return (defaults to the configured top_k)
        #[arg(short = 'k', long = "top-k")]
        top_k: Option<usize>,
    },

    /// List all knowledge bases
    List,

    /// Show details for one knowledge base
    Info {
        /// Knowledge base name
        store: String,
    },

    /// Delete a knowledge base and its files
    Delete {
        /// Knowledge base name
        store: String,
    },
}

// ── Entry point ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let config = Config::load(&cli.config)?;
    config.validate()?;

    let embedder = select_embedder(&config)?;
    let engine = RagEngine::new(&config, embedder)?;

    // Mutations need the runtime; queries embed on this thread, so they
    // stay outside of it.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build async runtime")?;

    match cli.command {
        Commands::Ingest { store, files } => {
            let uploads = read_uploads(&files)?;
            let report = runtime.block_on(engine.ingest(&store, uploads, None))?;
            print_report(&report);
        }
        Commands::Query {
            store,
            question,
            top_k,
        } => {
            let k = top_k.unwrap_or_else(|| engine.default_top_k());
            if k == 0 {
                bail!("--top-k must be positive");
            }
            let results = engine.retrieve(&store, &question, k)?;
            print_results(&results);
        }
        Commands::List => {
            let names = engine.stores().list()?;
            if names.is_empty() {
                println!("[!] No knowledge bases yet.");
            } else {
                println!("[OK] {} knowledge base(s):\n", names.len());
                for name in names {
                    match engine.stores().info(&name) {
                        Ok(info) => println!(
                            "  {:<24} {} chunk(s), {} dims, created {}",
                            info.name,
                            info.chunk_count,
                            info.dimension,
                            info.created_at.format("%Y-%m-%d %H:%M")
                        ),
                        Err(e) => println!("  {name:<24} (unreadable: {e})"),
                    }
                }
            }
        }
        Commands::Info { store } => {
            let info = engine.stores().info(&store)?;
            println!("Name:       {}", info.name);
            println!("Chunks:     {}", info.chunk_count);
            println!("Dimensions: {}", info.dimension);
            println!("Generation: {}", info.generation);
            println!("Created:    {}", info.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        Commands::Delete { store } => {
            if runtime.block_on(engine.stores().delete(&store))? {
                println!("[OK] Deleted knowledge base \"{store}\"");
            } else {
                println!("[!] No knowledge base named \"{store}\"");
            }
        }
    }

    Ok(())
}

// ── Helpers ──────────────────────────────────────────────────────────

/// Pick the remote embedder when a key is available, otherwise the
/// deterministic mock (useful for offline smoke testing).
fn select_embedder(config: &Config) -> Result<Arc<dyn Embedder>> {
    let has_key = config.embedding.api_key.is_some() || std::env::var(API_KEY_ENV).is_ok();
    if has_key {
        let remote =
            RemoteEmbedder::from_config(&config.embedding).context("embedder setup failed")?;
        Ok(Arc::new(remote))
    } else {
        warn!(
            "No API key in config or {API_KEY_ENV}; falling back to the mock embedder ({} dims)",
            config.embedding.dimensions
        );
        Ok(Arc::new(MockEmbedder::new(config.embedding.dimensions)))
    }
}

fn read_uploads(files: &[PathBuf]) -> Result<Vec<UploadFile>> {
    let mut uploads = Vec::with_capacity(files.len());
    for path in files {
        let bytes =
            std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        uploads.push(UploadFile::new(name, bytes));
    }
    Ok(uploads)
}

fn print_report(report: &IngestReport) {
    if report.created {
        println!("[OK] Created knowledge base \"{}\"", report.store);
    } else if report.chunks_added > 0 {
        println!("[OK] Updated knowledge base \"{}\"", report.store);
    } else {
        println!("[!] Nothing indexed for \"{}\"", report.store);
    }
    println!(
        "     {} document(s), {} chunk(s) added",
        report.documents_indexed, report.chunks_added
    );
    for failure in &report.failures {
        println!("[!] Skipped {}: {}", failure.document, failure.error);
    }
}

fn print_results(results: &QueryResult) {
    if results.is_empty() {
        println!("[!] No results.");
        return;
    }
    println!("[OK] {} result(s):\n", results.len());
    for (rank, scored) in results.iter().enumerate() {
        println!(
            "{}. [score: {:.4}] {}",
            rank + 1,
            scored.score,
            scored.chunk.citation()
        );
        println!("   {}\n", preview(&scored.chunk.text, 200));
    }
}

/// Flatten and cap text for terminal display (UTF-8 safe).
fn preview(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace(['\n', '\r'], " ");
    let cleaned = cleaned.trim();
    if cleaned.chars().count() <= max_chars {
        cleaned.to_string()
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{truncated}...")
    }
}

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use pdf_rag_core::{
    discover_pdf_files, extract_text, CharacterNgramEmbedder, Embedder, HttpEmbedder,
    HttpEmbedderConfig, InMemoryVectorIndex, IngestionOptions, IngestionPipeline,
    RetrievalService, DEFAULT_EMBEDDING_DIMENSIONS,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EmbedderKind {
    /// Hashed character trigrams, no model needed.
    Ngram,
    /// Ollama-compatible /api/embed endpoint.
    Http,
}

#[derive(Parser)]
#[command(name = "pdf-rag", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Embedding backend
    #[arg(long, value_enum, env = "PDF_RAG_EMBEDDER", default_value = "ngram")]
    embedder: EmbedderKind,

    /// Base URL of the embedding server
    #[arg(long, env = "PDF_RAG_EMBEDDING_URL", default_value = "http://localhost:11434")]
    embedding_url: String,

    /// Embedding model name
    #[arg(long, env = "PDF_RAG_EMBEDDING_MODEL", default_value = "all-minilm")]
    embedding_model: String,

    /// Vector dimensions (defaults: 128 for ngram, 384 for http)
    #[arg(long, env = "PDF_RAG_DIMENSIONS")]
    dimensions: Option<usize>,

    /// Chunks embedded per model call
    #[arg(long, default_value = "32")]
    batch_size: usize,

    /// Refuse writes once the index holds this many entries
    #[arg(long)]
    max_entries: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a PDF (or every PDF under a folder) and report the chunks indexed.
    Index {
        /// PDF file or folder searched recursively.
        #[arg(long)]
        path: PathBuf,
    },
    /// Ingest PDFs, then return the chunks closest to a query.
    Search {
        /// PDF file or folder searched recursively.
        #[arg(long)]
        path: PathBuf,
        /// Search query
        #[arg(long)]
        query: String,
        /// Number of chunks to return (default 3).
        #[arg(long)]
        top_k: Option<usize>,
        /// Print hits as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print the text extracted from a PDF.
    Text {
        #[arg(long)]
        path: PathBuf,
    },
}

type Pipeline = IngestionPipeline<dyn Embedder, InMemoryVectorIndex>;

fn build_embedder(cli: &Cli) -> anyhow::Result<Arc<dyn Embedder>> {
    let embedder: Arc<dyn Embedder> = match cli.embedder {
        EmbedderKind::Ngram => Arc::new(CharacterNgramEmbedder {
            dimensions: cli.dimensions.unwrap_or(DEFAULT_EMBEDDING_DIMENSIONS),
        }),
        EmbedderKind::Http => {
            let defaults = HttpEmbedderConfig::default();
            Arc::new(HttpEmbedder::new(HttpEmbedderConfig {
                base_url: cli.embedding_url.clone(),
                model: cli.embedding_model.clone(),
                dimensions: cli.dimensions.unwrap_or(defaults.dimensions),
                ..defaults
            })?)
        }
    };
    Ok(embedder)
}

fn pdf_inputs(path: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let files = if path.is_dir() {
        discover_pdf_files(path)
    } else {
        vec![path.to_path_buf()]
    };

    if files.is_empty() {
        anyhow::bail!("no pdf files found in {}", path.display());
    }
    Ok(files)
}

async fn ingest_all(pipeline: &Pipeline, path: &Path) -> anyhow::Result<usize> {
    let mut total = 0;
    let mut skipped = 0;

    for file in pdf_inputs(path)? {
        match pipeline.ingest_pdf(&file).await {
            Ok(report) => {
                println!(
                    "{} chunks from {} (document_id={})",
                    report.chunk_ids.len(),
                    report.fingerprint.document_title,
                    report.fingerprint.document_id
                );
                total += report.chunk_ids.len();
            }
            Err(error) => {
                skipped += 1;
                warn!(path = %file.display(), kind = %error.kind(), reason = %error, "skipped pdf");
            }
        }
    }

    if skipped > 0 {
        warn!(skipped, folder = %path.display(), "some files were not indexed");
    }
    Ok(total)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    let embedder = build_embedder(&cli)?;
    let mut index = InMemoryVectorIndex::with_dimensions(embedder.dimensions());
    if let Some(limit) = cli.max_entries {
        index = index.with_max_entries(limit);
    }
    let index = Arc::new(index);

    let pipeline: Pipeline = IngestionPipeline::with_options(
        Arc::clone(&embedder),
        Arc::clone(&index),
        IngestionOptions {
            embed_batch_size: cli.batch_size,
        },
    );
    let retrieval = RetrievalService::new(embedder, Arc::clone(&index));

    info!(
        version = app_version,
        embedder = ?cli.embedder,
        started_at = %Utc::now().to_rfc3339(),
        "pdf-rag boot"
    );

    match cli.command {
        Command::Index { path } => {
            let total = ingest_all(&pipeline, &path).await?;
            println!("{total} chunks indexed at {}", Utc::now().to_rfc3339());
        }
        Command::Search {
            path,
            query,
            top_k,
            json,
        } => {
            let total = ingest_all(&pipeline, &path).await?;
            info!(chunks = total, "index ready");

            let hits = retrieval.search_hits(&query, top_k).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&hits)?);
            } else {
                println!("query: {query}");
                for (rank, hit) in hits.iter().enumerate() {
                    println!("[{}] score={:.4} id={}", rank + 1, hit.score, hit.id);
                    println!("  {}", hit.text);
                }
            }
        }
        Command::Text { path } => {
            let text = extract_text(&path)?;
            print!("{text}");
        }
    }

    Ok(())
}

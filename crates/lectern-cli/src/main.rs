//! lectern - turn lecture documents into quizzes or flashcards.
//!
//! Reads PDF, DOCX and TXT files, chunks their combined text, generates
//! study material per chunk and prints the result as JSON on stdout.
//! Diagnostics go to stderr.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use lectern_core::generation::{ChunkOutcome, ChunkReport};
use lectern_core::ingest::{prepare_chunks, DocumentInput, IngestOutput};
use lectern_core::{
    Chunker, GenerationBatch, Generator, LecternConfig, LecternError, LlmProvider,
    TiktokenTokenizer,
};
use lectern_extractors::ExtractionPipeline;
use lectern_llm::LlmFactory;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    Quiz,
    Flashcard,
}

/// Generate quiz questions or flashcards from lecture documents.
#[derive(Parser, Debug)]
#[command(name = "lectern", version, about)]
struct Cli {
    /// Lecture files (.pdf, .docx, .txt), processed in order.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// What to generate.
    #[arg(long, value_enum, default_value_t = Kind::Quiz)]
    kind: Kind,

    /// Config file (.toml, .json, .yaml). Environment variables override it.
    #[arg(long, env = "LECTERN_CONFIG")]
    config: Option<PathBuf>,

    /// LLM provider (groq, openai, ollama).
    #[arg(long)]
    provider: Option<LlmProvider>,

    /// Model name.
    #[arg(long)]
    model: Option<String>,

    /// Token budget per chunk.
    #[arg(long)]
    chunk_tokens: Option<usize>,

    /// Chunks generated at once.
    #[arg(long)]
    concurrency: Option<usize>,

    /// Stop the batch after this many seconds and print what finished.
    #[arg(long)]
    deadline_secs: Option<u64>,

    /// Append generation errors to this file as JSON.
    #[arg(long)]
    error_log: Option<PathBuf>,

    /// Only extract and chunk; print the chunks without calling a model.
    #[arg(long)]
    chunks_only: bool,
}

impl Cli {
    fn load_config(&self) -> anyhow::Result<LecternConfig> {
        let config = match &self.config {
            Some(path) => LecternConfig::from_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => LecternConfig::default(),
        };
        let mut config = config.with_env()?;

        if let Some(provider) = self.provider {
            config.llm.provider = provider;
        }
        if let Some(model) = &self.model {
            config.llm.config.model = model.clone();
        }
        if let Some(tokens) = self.chunk_tokens {
            config.chunking.max_tokens = tokens;
        }
        if let Some(concurrency) = self.concurrency {
            config.generation.concurrency = concurrency;
        }
        if let Some(secs) = self.deadline_secs {
            config.generation.deadline_secs = Some(secs);
        }
        if let Some(path) = &self.error_log {
            config.error_log_path = Some(path.clone());
        }

        config.validate()?;
        Ok(config)
    }
}

fn read_documents(files: &[PathBuf]) -> anyhow::Result<Vec<DocumentInput>> {
    files
        .iter()
        .map(|path| {
            let bytes =
                std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
            Ok(DocumentInput::new(file_name(path), bytes))
        })
        .collect()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn report_json(report: &ChunkReport) -> Value {
    match &report.outcome {
        ChunkOutcome::Accepted { items } => {
            json!({ "index": report.index, "status": "accepted", "items": items })
        }
        ChunkOutcome::Failed { error } => {
            let mut failure = json!({
                "index": report.index,
                "status": "failed",
                "error": error.to_string(),
                "code": error.code().as_str(),
            });
            if let Some(hint) = error.suggestion() {
                failure["suggestion"] = json!(hint);
            }
            failure
        }
        ChunkOutcome::Skipped => json!({ "index": report.index, "status": "skipped" }),
    }
}

/// Log the error's suggestion, if it has one, before handing it to anyhow.
fn with_suggestion(error: LecternError) -> anyhow::Error {
    if let Some(hint) = error.suggestion() {
        warn!(code = error.code().as_str(), "{}", hint);
    }
    error.into()
}

fn batch_json<T: Serialize>(
    kind: &str,
    ingest: &IngestOutput,
    batch: &GenerationBatch<T>,
) -> anyhow::Result<Value> {
    Ok(json!({
        "kind": kind,
        "documents": ingest.documents,
        "items": serde_json::to_value(&batch.items)?,
        "chunks": batch.reports.iter().map(report_json).collect::<Vec<_>>(),
        "partial": batch.partial,
    }))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = cli.load_config()?;

    let pipeline =
        ExtractionPipeline::with_defaults().with_max_file_bytes(config.ingest.max_file_bytes);
    let chunker = Chunker::new(
        Arc::new(TiktokenTokenizer::cl100k()?),
        config.chunking.max_tokens,
    );

    let documents = read_documents(&cli.files)?;
    let ingest = prepare_chunks(&pipeline, &chunker, &documents)
        .await
        .map_err(with_suggestion)?;
    info!(
        documents = ingest.documents.len(),
        chunks = ingest.chunks.len(),
        "Documents ready"
    );

    if cli.chunks_only {
        let output = json!({ "documents": ingest.documents, "chunks": ingest.chunks });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let llm = LlmFactory::from_config(&config.llm).map_err(with_suggestion)?;
    let generator = Generator::from_config(llm, &config);

    let cancel = generator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing with completed chunks");
            cancel.cancel();
        }
    });

    let output = match cli.kind {
        Kind::Quiz => {
            let batch = generator
                .generate_quizzes(&ingest.chunks)
                .await
                .map_err(with_suggestion)?;
            batch_json("quiz", &ingest, &batch)?
        }
        Kind::Flashcard => {
            let batch = generator
                .generate_flashcards(&ingest.chunks)
                .await
                .map_err(with_suggestion)?;
            batch_json("flashcard", &ingest, &batch)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

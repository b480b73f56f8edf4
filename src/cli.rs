use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use rageval::config::{EmbedderKind, EvalConfig};

#[derive(Debug, Parser)]
#[command(name = "rageval")]
#[command(about = "Score RAG retrieval quality. Compare LLM judges against humans.")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Embedding backend for semantic similarity
    #[arg(long, global = true)]
    pub embedder: Option<EmbedderFilter>,

    /// Seconds to wait for one embedding call before scoring it 0.0
    #[arg(long, global = true)]
    pub embed_timeout: Option<u64>,

    /// JSON configuration file (every field optional)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Load the config file, then apply global flag overrides.
    pub fn eval_config(&self) -> anyhow::Result<EvalConfig> {
        let mut config = EvalConfig::load(self.config.as_deref())?;
        if let Some(embedder) = self.embedder {
            config.embedder = embedder.into();
        }
        if let Some(secs) = self.embed_timeout {
            config.embedding_timeout_secs = secs;
        }
        Ok(config)
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum EmbedderFilter {
    /// all-MiniLM-L6-v2 via ONNX Runtime (downloads on first use)
    Fastembed,
    /// Offline feature hashing, no model needed
    Hashed,
}

impl From<EmbedderFilter> for EmbedderKind {
    fn from(f: EmbedderFilter) -> Self {
        match f {
            EmbedderFilter::Fastembed => EmbedderKind::Fastembed,
            EmbedderFilter::Hashed => EmbedderKind::Hashed,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Evaluate test cases and print their metrics
    Evaluate {
        /// Test case file ({"test_cases": [...]})
        test_cases: PathBuf,

        /// Evaluate only the test case at this index
        #[arg(long)]
        case: Option<usize>,

        /// Cutoff for precision@k and recall@k
        #[arg(long)]
        k: Option<usize>,
    },

    /// Generate a versioned report (CSV, Markdown, plots, manifest)
    Report {
        /// Test case file ({"test_cases": [...]})
        test_cases: PathBuf,

        /// Corpus file ({"documents": [...]})
        corpus: PathBuf,

        /// Base directory for report versions
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Version id (defaults to the current local time)
        #[arg(long)]
        version: Option<String>,

        /// Cutoff for precision@k and recall@k
        #[arg(long)]
        k: Option<usize>,
    },

    /// Compare LLM and human answer scores from a CSV file
    Judge {
        /// CSV with Chunk, Question, Answer and "LLM <metric>" / "Human <metric>" columns
        scores: PathBuf,

        /// Maximum score difference that still counts as agreement
        #[arg(long)]
        threshold: Option<f64>,

        /// Minimum score for a high-quality answer
        #[arg(long)]
        min_score: Option<f64>,

        /// Also write the analysis as Markdown to this file
        #[arg(long)]
        report: Option<PathBuf>,

        /// Write LLM-vs-human score distribution charts (PNG) into this directory
        #[arg(long, value_name = "DIR")]
        plots: Option<PathBuf>,
    },

    /// List the available retrieval metrics
    Metrics,

    /// Download the embedding model used for semantic similarity
    Setup,

    /// Start MCP server over stdio (evaluate_single, evaluate_batch, metrics_available)
    Serve,
}

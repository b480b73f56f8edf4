//! Text-to-vector capability used by the semantic similarity metric.
//!
//! The metrics engine only sees the [`Embedder`] trait, so tests and offline
//! runs can swap the ONNX model for [`HashedEmbedder`] or a stub.

pub mod engine;
pub mod hashed;
pub mod setup;
pub mod timeout;

use std::sync::Arc;

use anyhow::Result;

use crate::config::{EmbedderKind, EvalConfig};
use crate::error;

pub use engine::FastEmbedder;
pub use hashed::HashedEmbedder;
pub use timeout::TimeoutEmbedder;

/// Embedding dimension for the all-MiniLM-L6-v2 model.
pub const EMBEDDING_DIM: usize = 384;

/// Turns a batch of texts into a batch of vectors, one per text, same order.
pub trait Embedder: Send + Sync {
    fn embed(&self, texts: &[String]) -> error::Result<Vec<Vec<f32>>>;
}

/// Build the configured embedder, wrapped in the per-call deadline.
pub fn build_embedder(config: &EvalConfig) -> Result<Arc<dyn Embedder>> {
    let inner: Arc<dyn Embedder> = match config.embedder {
        EmbedderKind::Fastembed => Arc::new(FastEmbedder::new()?),
        EmbedderKind::Hashed => Arc::new(HashedEmbedder::default()),
    };
    Ok(Arc::new(TimeoutEmbedder::new(
        inner,
        config.embedding_timeout(),
    )))
}

/// Shared model cache directory for ONNX models.
///
/// Precedence:
/// 1. `FASTEMBED_CACHE_DIR` env var (fastembed's own convention)
/// 2. `XDG_CACHE_HOME/rageval/models` (XDG standard)
/// 3. `~/.cache/rageval/models` (fallback)
pub fn model_cache_dir() -> std::path::PathBuf {
    if let Ok(dir) = std::env::var("FASTEMBED_CACHE_DIR") {
        return std::path::PathBuf::from(dir);
    }

    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        return std::path::PathBuf::from(xdg).join("rageval").join("models");
    }

    if let Some(home) = home_dir() {
        return home.join(".cache").join("rageval").join("models");
    }

    // Last resort: fastembed's default (CWD/.fastembed_cache)
    std::path::PathBuf::from(".fastembed_cache")
}

fn home_dir() -> Option<std::path::PathBuf> {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE")) // Windows fallback
        .ok()
        .map(std::path::PathBuf::from)
}

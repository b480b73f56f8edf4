use std::sync::Mutex;

use anyhow::{Context, Result};
use fastembed::{EmbeddingModel, TextEmbedding, TextInitOptions};

use super::{model_cache_dir, Embedder, EMBEDDING_DIM};
use crate::error::{self, EvalError};

/// Batch size for fastembed internal sub-batching.
/// Smaller batches reduce padding waste when text lengths vary widely.
const EMBED_BATCH_SIZE: usize = 64;

/// Sentence embedder wrapping a fastembed ONNX model.
///
/// fastembed needs `&mut` for inference, so the model sits behind a mutex and
/// calls are serialized.
pub struct FastEmbedder {
    model: Mutex<TextEmbedding>,
}

impl FastEmbedder {
    /// Load all-MiniLM-L6-v2 from the shared cache, downloading it if needed.
    pub fn new() -> Result<Self> {
        Self::load(false)
    }

    /// Same as [`FastEmbedder::new`], showing download progress on stdout.
    pub fn new_with_progress() -> Result<Self> {
        Self::load(true)
    }

    fn load(show_progress: bool) -> Result<Self> {
        let model = TextEmbedding::try_new(
            TextInitOptions::new(EmbeddingModel::AllMiniLML6V2)
                .with_cache_dir(model_cache_dir())
                .with_show_download_progress(show_progress),
        )
        .context("Failed to initialize embedding model")?;

        Ok(Self {
            model: Mutex::new(model),
        })
    }
}

impl Embedder for FastEmbedder {
    fn embed(&self, texts: &[String]) -> error::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut model = self
            .model
            .lock()
            .map_err(|_| EvalError::EmbeddingService("embedding model lock poisoned".into()))?;
        let results = model
            .embed(texts, Some(EMBED_BATCH_SIZE))
            .map_err(|e| EvalError::EmbeddingService(format!("batch embedding failed: {e}")))?;

        debug_assert!(
            results.iter().all(|v| v.len() == EMBEDDING_DIM),
            "All embeddings should be {EMBEDDING_DIM}-dim"
        );

        Ok(results)
    }
}

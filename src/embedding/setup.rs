use anyhow::{Context, Result};

use super::engine::FastEmbedder;
use super::model_cache_dir;

/// Result of the setup operation.
#[derive(Debug, serde::Serialize)]
pub struct SetupResult {
    pub model_dir: String,
}

/// Download the embedding model by initializing the fastembed engine.
///
/// fastembed downloads the ONNX model from HuggingFace on first use; doing it
/// here up front keeps the first report run from stalling on the download.
pub fn download_model() -> Result<SetupResult> {
    let cache_dir = model_cache_dir();

    let _engine =
        FastEmbedder::new_with_progress().context("Failed to download embedding model")?;

    Ok(SetupResult {
        model_dir: cache_dir.display().to_string(),
    })
}

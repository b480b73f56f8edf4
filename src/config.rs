use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::metrics::DEFAULT_K;
use crate::report::markdown::DEFAULT_RECOMMENDATION_THRESHOLD;

/// Which embedding backend computes semantic similarity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedderKind {
    /// all-MiniLM-L6-v2 through fastembed (downloads the model on first use).
    #[default]
    Fastembed,
    /// Deterministic hashed bag-of-words vectors. No model, no network.
    Hashed,
}

/// Configuration for one evaluation or report run.
///
/// Every field has a default, so a config file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Cut-off for precision@k and recall@k.
    pub k: usize,
    /// Metric averages below this trigger report recommendations.
    pub recommendation_threshold: f64,
    /// Deadline for a single embedding call.
    pub embedding_timeout_secs: u64,
    pub embedder: EmbedderKind,
    /// Parent directory of the versioned report directories.
    pub output_dir: PathBuf,
    pub judge: JudgeConfig,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            recommendation_threshold: DEFAULT_RECOMMENDATION_THRESHOLD,
            embedding_timeout_secs: 30,
            embedder: EmbedderKind::Fastembed,
            output_dir: PathBuf::from("reports"),
            judge: JudgeConfig::default(),
        }
    }
}

impl EvalConfig {
    /// Load from a JSON file, or return defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn embedding_timeout(&self) -> Duration {
        Duration::from_secs(self.embedding_timeout_secs)
    }
}

/// Configuration for the LLM-vs-human answer analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgeConfig {
    /// Metric names; each needs `LLM <name>` and `Human <name>` columns.
    pub metrics: Vec<String>,
    /// Expected score range. Violations are logged, never rejected.
    pub score_range: (f64, f64),
    /// Two scores agree when they differ by at most this much.
    pub agreement_threshold: f64,
    /// Minimum score for an answer to count as high quality.
    pub high_quality_min: f64,
    /// Equal-width bins over `score_range` used to discretize scores for
    /// Cohen's kappa.
    pub kappa_bins: usize,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            metrics: ["Stand-alone Quality", "Readiness", "Relevance", "Completeness"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            score_range: (1.0, 5.0),
            agreement_threshold: 0.1,
            high_quality_min: 4.0,
            kappa_bins: 5,
        }
    }
}

impl JudgeConfig {
    pub fn in_range(&self, score: f64) -> bool {
        let (lo, hi) = self.score_range;
        (lo..=hi).contains(&score)
    }

    /// Kappa bin of a score; out-of-range scores land in the edge bins.
    pub fn kappa_bin(&self, score: f64) -> usize {
        let bins = self.kappa_bins.max(1);
        let (lo, hi) = self.score_range;
        if hi <= lo {
            return 0;
        }
        let scaled = ((score - lo) / (hi - lo) * bins as f64).floor();
        (scaled.max(0.0) as usize).min(bins - 1)
    }
}

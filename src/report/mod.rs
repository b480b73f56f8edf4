//! Versioned evaluation reports.
//!
//! A run evaluates every test case, then writes one self-contained version
//! directory:
//!
//! ```text
//! <output_dir>/v<version>/
//!   csv/detailed_results.csv
//!   csv/metric_summaries.csv
//!   csv/metric_values.csv
//!   plots/metric_visualizations.png
//!   plots/<metric>_distribution.png
//!   markdown/evaluation_report.md
//!   version_info.json
//! ```

pub mod markdown;
pub mod plots;
pub mod tables;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::{info, info_span};

use crate::config::EvalConfig;
use crate::dataset::{Corpus, TestCaseSet};
use crate::error::{EvalError, Result};
use crate::metrics::{aggregate, RetrievalEvaluator};
use crate::stats::{summarize, Summary};
use crate::types::{BatchEvaluationResult, MetricName};

pub use tables::{read_metric_summaries, MetricSummaryRecord};

const CSV_DIR: &str = "csv";
const PLOTS_DIR: &str = "plots";
const MARKDOWN_DIR: &str = "markdown";
const MANIFEST_FILE: &str = "version_info.json";

/// Where and how a report is written.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub output_dir: PathBuf,
    /// Version id; defaults to the local time as `%Y%m%d_%H%M%S`.
    pub version: Option<String>,
    pub k: usize,
    pub recommendation_threshold: f64,
}

impl ReportConfig {
    pub fn from_eval_config(config: &EvalConfig) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            version: None,
            k: config.k,
            recommendation_threshold: config.recommendation_threshold,
        }
    }
}

/// Contents of `version_info.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub timestamp: String,
    pub test_cases_count: usize,
    pub corpus_size: usize,
    pub output_files: OutputFiles,
}

/// Filenames present in each category directory, sorted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputFiles {
    pub csv: Vec<String>,
    pub plots: Vec<String>,
    pub markdown: Vec<String>,
}

/// What a finished run hands back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct ReportOutput {
    pub output_root: PathBuf,
    pub manifest: VersionInfo,
    pub batch: BatchEvaluationResult,
}

/// One test case flattened for tabular output.
#[derive(Debug, Clone)]
pub struct ReportRow {
    pub query_id: String,
    pub query: String,
    pub expected_content: String,
    pub scores: Vec<(MetricName, f64)>,
}

impl ReportRow {
    pub fn score(&self, metric: MetricName) -> Option<f64> {
        self.scores
            .iter()
            .find(|(name, _)| *name == metric)
            .map(|(_, score)| *score)
    }
}

/// Scores of one metric across test cases, in test-case order.
#[derive(Debug, Clone)]
pub struct MetricSeries {
    pub metric: MetricName,
    pub values: Vec<f64>,
}

impl MetricSeries {
    pub fn summary(&self) -> Option<Summary> {
        summarize(&self.values)
    }
}

/// Everything the writers need, computed once per run.
#[derive(Debug, Clone)]
pub struct ReportData {
    pub version: String,
    pub generated_at: DateTime<Local>,
    pub rows: Vec<ReportRow>,
    pub series: Vec<MetricSeries>,
    pub test_case_count: usize,
    pub corpus_size: usize,
}

impl ReportData {
    /// Metric columns in first-seen order.
    pub fn metrics(&self) -> Vec<MetricName> {
        self.series.iter().map(|s| s.metric).collect()
    }
}

pub struct ReportGenerator {
    evaluator: RetrievalEvaluator,
    config: ReportConfig,
}

impl ReportGenerator {
    pub fn new(evaluator: RetrievalEvaluator, config: ReportConfig) -> Self {
        Self { evaluator, config }
    }

    /// Evaluate all test cases and write a new report version.
    ///
    /// Fails before touching the filesystem with [`EvalError::EmptyInput`]
    /// when there are no test cases, and with [`EvalError::VersionExists`]
    /// when `v<version>` is already present.
    pub fn generate(&self, test_cases: &TestCaseSet, corpus: &Corpus) -> Result<ReportOutput> {
        if test_cases.is_empty() {
            return Err(EvalError::EmptyInput("test case set has no test cases".into()));
        }

        let generated_at = Local::now();
        let version = self
            .config
            .version
            .clone()
            .unwrap_or_else(|| generated_at.format("%Y%m%d_%H%M%S").to_string());
        let span = info_span!("report", version = %version);
        let _guard = span.enter();

        let output_root = self.config.output_dir.join(format!("v{version}"));
        if output_root.exists() {
            return Err(EvalError::VersionExists(output_root));
        }

        let mut evaluations = Vec::with_capacity(test_cases.len());
        let mut rows = Vec::with_capacity(test_cases.len());
        let mut series: Vec<MetricSeries> = Vec::new();
        for case in &test_cases.test_cases {
            let evaluation =
                self.evaluator
                    .evaluate_single(&case.query, &case.simulated_result, self.config.k);
            for metric in &evaluation.metrics {
                match series.iter_mut().find(|s| s.metric == metric.metric_name) {
                    Some(s) => s.values.push(metric.score),
                    None => series.push(MetricSeries {
                        metric: metric.metric_name,
                        values: vec![metric.score],
                    }),
                }
            }
            rows.push(ReportRow {
                query_id: case.query.query_id.clone(),
                query: case.query.query.clone(),
                expected_content: case.query.expected_relevant_content.clone(),
                scores: evaluation
                    .metrics
                    .iter()
                    .map(|m| (m.metric_name, m.score))
                    .collect(),
            });
            evaluations.push(evaluation);
        }
        let batch = aggregate(evaluations)?;

        let data = ReportData {
            version: version.clone(),
            generated_at,
            rows,
            series,
            test_case_count: test_cases.len(),
            corpus_size: corpus.len(),
        };

        let csv_dir = output_root.join(CSV_DIR);
        let plots_dir = output_root.join(PLOTS_DIR);
        let markdown_dir = output_root.join(MARKDOWN_DIR);
        for dir in [&csv_dir, &plots_dir, &markdown_dir] {
            std::fs::create_dir_all(dir).map_err(|e| EvalError::io(dir, e))?;
        }

        tables::write_all(&csv_dir, &data)?;
        let rules = markdown::default_rules(self.config.recommendation_threshold);
        markdown::write_report(&markdown_dir, &data, &batch, &rules)?;
        plots::write_all(&plots_dir, &data)?;

        let manifest = VersionInfo {
            version,
            timestamp: generated_at.to_rfc3339(),
            test_cases_count: data.test_case_count,
            corpus_size: data.corpus_size,
            output_files: OutputFiles {
                csv: list_files(&csv_dir, "csv")?,
                plots: list_files(&plots_dir, "png")?,
                markdown: list_files(&markdown_dir, "md")?,
            },
        };
        let manifest_path = output_root.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(&manifest)?;
        std::fs::write(&manifest_path, json).map_err(|e| EvalError::io(&manifest_path, e))?;

        info!(
            root = %output_root.display(),
            test_cases = data.test_case_count,
            "report written"
        );
        Ok(ReportOutput {
            output_root,
            manifest,
            batch,
        })
    }
}

/// Sorted names of files in `dir` with the given extension.
fn list_files(dir: &Path, extension: &str) -> Result<Vec<String>> {
    let entries = std::fs::read_dir(dir).map_err(|e| EvalError::io(dir, e))?;
    let mut names = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| EvalError::io(dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == extension) {
            if let Some(name) = path.file_name() {
                names.push(name.to_string_lossy().into_owned());
            }
        }
    }
    names.sort();
    Ok(names)
}

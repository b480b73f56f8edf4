//! Human-readable `evaluation_report.md`.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use crate::error::{EvalError, Result};
use crate::types::{BatchEvaluationResult, MetricName};

use super::ReportData;

pub const REPORT_FILE: &str = "evaluation_report.md";

/// Default score below which a recommendation is emitted.
pub const DEFAULT_RECOMMENDATION_THRESHOLD: f64 = 0.7;

/// Fires when the metric's batch average is below `threshold`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationRule {
    pub metric: MetricName,
    pub threshold: f64,
    pub headline: &'static str,
    pub suggestions: &'static [&'static str],
}

impl RecommendationRule {
    /// A metric missing from `averages` counts as `0.0`.
    pub fn fires(&self, averages: &BTreeMap<MetricName, f64>) -> bool {
        averages.get(&self.metric).copied().unwrap_or(0.0) < self.threshold
    }
}

pub fn default_rules(threshold: f64) -> Vec<RecommendationRule> {
    vec![
        RecommendationRule {
            metric: MetricName::PrecisionAtK,
            threshold,
            headline: "Consider improving the retrieval precision by:",
            suggestions: &[
                "Refining the document ranking algorithm",
                "Adjusting relevance thresholds",
                "Implementing better query preprocessing",
            ],
        },
        RecommendationRule {
            metric: MetricName::SemanticSimilarity,
            threshold,
            headline: "Enhance semantic understanding by:",
            suggestions: &[
                "Using a more sophisticated embedding model",
                "Implementing query expansion",
                "Adding domain-specific pre-training",
            ],
        },
        RecommendationRule {
            metric: MetricName::KeywordCoverage,
            threshold,
            headline: "Improve keyword coverage through:",
            suggestions: &[
                "Enhanced keyword extraction",
                "Synonym expansion",
                "Better document preprocessing",
            ],
        },
    ]
}

pub fn write_report(
    dir: &Path,
    data: &ReportData,
    batch: &BatchEvaluationResult,
    rules: &[RecommendationRule],
) -> Result<()> {
    let path = dir.join(REPORT_FILE);
    std::fs::write(&path, render(data, batch, rules)).map_err(|e| EvalError::io(&path, e))
}

/// Render the whole report. `write!` into a `String` cannot fail.
pub fn render(
    data: &ReportData,
    batch: &BatchEvaluationResult,
    rules: &[RecommendationRule],
) -> String {
    let mut out = String::new();
    let metrics = data.metrics();

    let _ = writeln!(out, "# RAG System Evaluation Report (v{})\n", data.version);
    let _ = writeln!(
        out,
        "Generated on: {}\n",
        data.generated_at.format("%Y-%m-%d %H:%M:%S")
    );

    out.push_str("## Overall Performance Summary\n\n");
    for series in &data.series {
        if let Some(summary) = series.summary() {
            let _ = writeln!(out, "- **{}**: {:.3} (average)", series.metric, summary.mean);
        }
    }
    out.push('\n');

    out.push_str("## Detailed Results\n\n");
    out.push_str(&results_table(data, &metrics));
    out.push('\n');

    out.push_str("## Query-by-Query Analysis\n\n");
    for row in &data.rows {
        let _ = writeln!(out, "### Query {}", row.query_id);
        let _ = writeln!(out, "- **Query**: {}", row.query);
        let _ = writeln!(out, "- **Expected Content**: {}", row.expected_content);
        out.push_str("- **Metrics**:\n");
        for (metric, score) in &row.scores {
            let _ = writeln!(out, "  - {metric}: {score:.3}");
        }
        out.push('\n');
    }

    out.push_str("## Test Dataset Statistics\n\n");
    let _ = writeln!(out, "- Number of test queries: {}", data.test_case_count);
    let _ = writeln!(out, "- Number of documents in corpus: {}", data.corpus_size);
    out.push('\n');

    out.push_str("## Recommendations\n\n");
    out.push_str(&recommendations(&batch.metric_averages, rules));
    out
}

fn results_table(data: &ReportData, metrics: &[MetricName]) -> String {
    let mut out = String::new();
    let mut header = vec!["query_id", "query", "expected_content"];
    header.extend(metrics.iter().map(|m| m.as_str()));
    let _ = writeln!(out, "| {} |", header.join(" | "));
    let _ = writeln!(
        out,
        "|{}|",
        header.iter().map(|_| "---").collect::<Vec<_>>().join("|")
    );

    for row in &data.rows {
        let mut cells = vec![
            escape_cell(&row.query_id),
            escape_cell(&row.query),
            escape_cell(&row.expected_content),
        ];
        cells.extend(metrics.iter().map(|m| {
            row.score(*m)
                .map(|s| format!("{s:.4}"))
                .unwrap_or_default()
        }));
        let _ = writeln!(out, "| {} |", cells.join(" | "));
    }
    out
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

/// Bullet list of fired rules, or a note that nothing needs attention.
pub fn recommendations(
    averages: &BTreeMap<MetricName, f64>,
    rules: &[RecommendationRule],
) -> String {
    let mut out = String::new();
    for rule in rules.iter().filter(|r| r.fires(averages)) {
        let _ = writeln!(out, "- {}", rule.headline);
        for suggestion in rule.suggestions {
            let _ = writeln!(out, "  - {suggestion}");
        }
    }
    if out.is_empty() {
        out.push_str("- All monitored metrics meet their thresholds; no changes recommended.\n");
    }
    out
}

//! LLM-as-judge answer analysis.
//!
//! Compares LLM scores against human scores for the same answers, per
//! metric: rater statistics, agreement and Cohen's kappa, correlation, error,
//! score distribution shape and KS test, position and length bias, and
//! high-quality answer counts.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::config::JudgeConfig;
use crate::error::{EvalError, Result};
use crate::report::plots::{self, RaterPanel};
use crate::stats::{
    cohen_kappa, kurtosis, ks_two_sample, mean, mean_absolute_error, min_max_scaled, pearson,
    population_std, quantile, robust_scaled, root_mean_squared_error, skewness, spearman,
    summarize, z_scores, KsTest, Summary,
};

const BASE_COLUMNS: [&str; 3] = ["Chunk", "Question", "Answer"];
const MAX_EXAMPLES: usize = 3;

/// One answer with its paired scores, indexed like [`AnswerDataset::metrics`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerRecord {
    pub chunk: String,
    pub question: String,
    pub answer: String,
    pub llm: Vec<f64>,
    pub human: Vec<f64>,
}

impl AnswerRecord {
    pub fn word_count(&self) -> usize {
        self.answer.split_whitespace().count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerDataset {
    pub metrics: Vec<String>,
    pub records: Vec<AnswerRecord>,
    /// Scores outside the configured range (kept, only reported).
    pub out_of_range: usize,
}

impl AnswerDataset {
    /// LLM and human score columns of the metric at `index`.
    pub fn columns(&self, index: usize) -> (Vec<f64>, Vec<f64>) {
        self.records
            .iter()
            .map(|r| (r.llm[index], r.human[index]))
            .unzip()
    }
}

pub fn llm_column(metric: &str) -> String {
    format!("LLM {metric}")
}

pub fn human_column(metric: &str) -> String {
    format!("Human {metric}")
}

pub fn load_answers(path: &Path, config: &JudgeConfig) -> Result<AnswerDataset> {
    let file = std::fs::File::open(path).map_err(|e| EvalError::io(path, e))?;
    parse_answers(file, config)
}

/// Read answer scores from CSV. Every required column is checked up front.
pub fn parse_answers<R: std::io::Read>(reader: R, config: &JudgeConfig) -> Result<AnswerDataset> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();
    let position = |name: &str| headers.iter().position(|h| h.trim() == name);

    let mut required: Vec<String> = BASE_COLUMNS.iter().map(|c| c.to_string()).collect();
    for metric in &config.metrics {
        required.push(llm_column(metric));
        required.push(human_column(metric));
    }
    let missing: Vec<String> = required
        .iter()
        .filter(|c| position(c.as_str()).is_none())
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(EvalError::schema("answer evaluation data", missing));
    }

    // Presence was checked above.
    let column = |name: &str| position(name).unwrap_or_default();
    let [chunk_col, question_col, answer_col] = BASE_COLUMNS.map(|c| column(c));
    let score_cols: Vec<(usize, usize)> = config
        .metrics
        .iter()
        .map(|m| (column(llm_column(m).as_str()), column(human_column(m).as_str())))
        .collect();

    let mut records = Vec::new();
    let mut out_of_range = 0;
    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        let field = |i: usize| record.get(i).unwrap_or("").to_string();

        let mut llm = Vec::with_capacity(score_cols.len());
        let mut human = Vec::with_capacity(score_cols.len());
        for (metric, &(llm_idx, human_idx)) in config.metrics.iter().zip(&score_cols) {
            let raters = [("LLM", llm_idx, &mut llm), ("Human", human_idx, &mut human)];
            for (rater, idx, scores) in raters {
                let raw = field(idx);
                // NaN and infinities parse but poison every statistic.
                let score = raw
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|s| s.is_finite())
                    .ok_or_else(|| EvalError::InvalidValue {
                        context: format!("row {row}, {rater} {metric}"),
                        value: raw.clone(),
                    })?;
                if !config.in_range(score) {
                    warn!(row, rater, metric = %metric, score, "score outside expected range");
                    out_of_range += 1;
                }
                scores.push(score);
            }
        }

        records.push(AnswerRecord {
            chunk: field(chunk_col),
            question: field(question_col),
            answer: field(answer_col),
            llm,
            human,
        });
    }

    Ok(AnswerDataset {
        metrics: config.metrics.clone(),
        records,
        out_of_range,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BiasAnalysis {
    /// Spearman of row index vs LLM score.
    pub position_bias: Option<f64>,
    /// Spearman of answer word count vs LLM score.
    pub length_bias: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighQualityAnalysis {
    pub min_score: f64,
    pub llm_count: usize,
    pub human_count: usize,
    pub agreement_count: usize,
    pub example_answers: Vec<String>,
}

/// Shape of one rater's score distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistributionShape {
    pub skewness: Option<f64>,
    /// Excess kurtosis.
    pub kurtosis: Option<f64>,
}

impl DistributionShape {
    fn of(values: &[f64]) -> Self {
        Self {
            skewness: skewness(values),
            kurtosis: kurtosis(values),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationMethod {
    ZScore,
    MinMax,
    Robust,
}

impl NormalizationMethod {
    pub const ALL: [NormalizationMethod; 3] = [Self::ZScore, Self::MinMax, Self::Robust];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ZScore => "zscore",
            Self::MinMax => "minmax",
            Self::Robust => "robust",
        }
    }

    pub fn apply(self, values: &[f64]) -> Option<Vec<f64>> {
        match self {
            Self::ZScore => z_scores(values),
            Self::MinMax => min_max_scaled(values),
            Self::Robust => robust_scaled(values),
        }
    }
}

/// LLM minus human statistics after normalizing both columns the same way.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalizedDifference {
    pub method: NormalizationMethod,
    pub mean_diff: f64,
    pub std_diff: f64,
    pub median_diff: f64,
    pub range_diff: f64,
    pub ks_statistic: f64,
}

impl NormalizedDifference {
    /// `None` when either column cannot be normalized with `method`.
    fn compute(method: NormalizationMethod, llm: &[f64], human: &[f64]) -> Option<Self> {
        let llm = method.apply(llm)?;
        let human = method.apply(human)?;
        let range = |v: &[f64]| summarize(v).map(|s| s.max - s.min);
        Some(Self {
            method,
            mean_diff: mean(&llm)? - mean(&human)?,
            std_diff: population_std(&llm)? - population_std(&human)?,
            median_diff: quantile(&llm, 0.5)? - quantile(&human, 0.5)?,
            range_diff: range(&llm)? - range(&human)?,
            ks_statistic: ks_two_sample(&llm, &human)?.statistic,
        })
    }
}

/// How the LLM score distribution differs from the human one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionComparison {
    pub llm: DistributionShape,
    pub human: DistributionShape,
    pub ks_test: KsTest,
    /// One entry per method both columns support; constant columns have none.
    pub normalized: Vec<NormalizedDifference>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricAnalysis {
    pub metric: String,
    pub llm: Summary,
    pub human: Summary,
    pub agreement_rate: f64,
    /// Cohen's kappa over binned scores; `None` when chance agreement is total.
    pub cohen_kappa: Option<f64>,
    pub pearson: Option<f64>,
    pub spearman: Option<f64>,
    pub mae: f64,
    pub rmse: f64,
    pub distribution: DistributionComparison,
    pub bias: BiasAnalysis,
    pub high_quality: HighQualityAnalysis,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerAnalysis {
    pub answers: usize,
    pub agreement_threshold: f64,
    pub out_of_range: usize,
    pub metrics: Vec<MetricAnalysis>,
}

pub fn analyze(dataset: &AnswerDataset, config: &JudgeConfig) -> Result<AnswerAnalysis> {
    if dataset.records.is_empty() {
        return Err(EvalError::EmptyInput("answer evaluation data has no rows".into()));
    }

    let positions: Vec<f64> = (0..dataset.records.len()).map(|i| i as f64).collect();
    let lengths: Vec<f64> = dataset
        .records
        .iter()
        .map(|r| r.word_count() as f64)
        .collect();

    let metrics = dataset
        .metrics
        .iter()
        .enumerate()
        .map(|(i, metric)| {
            let (llm, human) = dataset.columns(i);
            analyze_metric(metric, &llm, &human, &positions, &lengths, dataset, config)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(AnswerAnalysis {
        answers: dataset.records.len(),
        agreement_threshold: config.agreement_threshold,
        out_of_range: dataset.out_of_range,
        metrics,
    })
}

fn analyze_metric(
    metric: &str,
    llm: &[f64],
    human: &[f64],
    positions: &[f64],
    lengths: &[f64],
    dataset: &AnswerDataset,
    config: &JudgeConfig,
) -> Result<MetricAnalysis> {
    let empty = || EvalError::EmptyInput(format!("no scores for {metric}"));
    let llm_stats = summarize(llm).ok_or_else(empty)?;
    let human_stats = summarize(human).ok_or_else(empty)?;

    let agreeing = llm
        .iter()
        .zip(human)
        .filter(|(a, b)| (*a - *b).abs() <= config.agreement_threshold)
        .count();

    let bins = |scores: &[f64]| -> Vec<usize> {
        scores.iter().map(|&s| config.kappa_bin(s)).collect()
    };
    let ks_test = ks_two_sample(llm, human).ok_or_else(empty)?;

    let min = config.high_quality_min;
    let both_high: Vec<usize> = (0..llm.len())
        .filter(|&i| llm[i] >= min && human[i] >= min)
        .collect();

    Ok(MetricAnalysis {
        metric: metric.to_string(),
        llm: llm_stats,
        human: human_stats,
        agreement_rate: agreeing as f64 / llm.len() as f64,
        cohen_kappa: cohen_kappa(&bins(llm), &bins(human)),
        pearson: pearson(llm, human),
        spearman: spearman(llm, human),
        mae: mean_absolute_error(llm, human).ok_or_else(empty)?,
        rmse: root_mean_squared_error(llm, human).ok_or_else(empty)?,
        distribution: DistributionComparison {
            llm: DistributionShape::of(llm),
            human: DistributionShape::of(human),
            ks_test,
            normalized: NormalizationMethod::ALL
                .iter()
                .filter_map(|&m| NormalizedDifference::compute(m, llm, human))
                .collect(),
        },
        bias: BiasAnalysis {
            position_bias: spearman(positions, llm),
            length_bias: spearman(lengths, llm),
        },
        high_quality: HighQualityAnalysis {
            min_score: min,
            llm_count: llm.iter().filter(|&&s| s >= min).count(),
            human_count: human.iter().filter(|&&s| s >= min).count(),
            agreement_count: both_high.len(),
            example_answers: both_high
                .iter()
                .take(MAX_EXAMPLES)
                .map(|&i| dataset.records[i].answer.clone())
                .collect(),
        },
    })
}

pub const DISTRIBUTIONS_FILE: &str = "score_distributions.png";

/// File-name form of a metric: lower case, runs of other characters as `_`.
fn slug(metric: &str) -> String {
    let mut out = String::new();
    for c in metric.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}

/// LLM-vs-human score histograms: one grid with a panel per metric, plus
/// `<metric>_llm_vs_human.png` for each metric. Returns the written paths.
pub fn write_plots(dir: &Path, dataset: &AnswerDataset, config: &JudgeConfig) -> Result<Vec<PathBuf>> {
    if dataset.records.is_empty() {
        return Err(EvalError::EmptyInput("answer evaluation data has no rows".into()));
    }
    std::fs::create_dir_all(dir).map_err(|e| EvalError::io(dir, e))?;

    let columns: Vec<(Vec<f64>, Vec<f64>)> =
        (0..dataset.metrics.len()).map(|i| dataset.columns(i)).collect();
    let panels: Vec<RaterPanel<'_>> = dataset
        .metrics
        .iter()
        .zip(&columns)
        .map(|(metric, (llm, human))| RaterPanel {
            title: metric,
            llm,
            human,
        })
        .collect();

    let mut written = vec![dir.join(DISTRIBUTIONS_FILE)];
    plots::write_rater_grid(&written[0], &panels, config.score_range)?;
    for panel in &panels {
        let path = dir.join(format!("{}_llm_vs_human.png", slug(panel.title)));
        plots::write_rater_panel(&path, panel, config.score_range)?;
        written.push(path);
    }
    info!(dir = %dir.display(), files = written.len(), "judge plots written");
    Ok(written)
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.3}"))
}

/// Markdown rendering of an analysis. `write!` into a `String` cannot fail.
pub fn render_markdown(analysis: &AnswerAnalysis) -> String {
    let mut out = String::from("# Answer Evaluation Analysis Report\n\n");
    let _ = writeln!(out, "- Answers analyzed: {}", analysis.answers);
    if analysis.out_of_range > 0 {
        let _ = writeln!(
            out,
            "- Scores outside the expected range: {}",
            analysis.out_of_range
        );
    }
    out.push('\n');

    out.push_str("## Score Statistics\n\n");
    out.push_str("| Metric | Rater | Count | Mean | Std | Min | 25% | 50% | 75% | Max |\n");
    out.push_str("|---|---|---|---|---|---|---|---|---|---|\n");
    for m in &analysis.metrics {
        for (rater, s) in [("LLM", &m.llm), ("Human", &m.human)] {
            let _ = writeln!(
                out,
                "| {} | {rater} | {} | {:.3} | {:.3} | {:.3} | {:.3} | {:.3} | {:.3} | {:.3} |",
                m.metric, s.count, s.mean, s.std, s.min, s.q1, s.median, s.q3, s.max
            );
        }
    }

    let _ = writeln!(
        out,
        "\n## LLM-Human Agreement\n\nScores agree when they differ by at most {}.\n",
        analysis.agreement_threshold
    );
    out.push_str("| Metric | Agreement | Cohen's kappa | Pearson | Spearman | MAE | RMSE |\n");
    out.push_str("|---|---|---|---|---|---|---|\n");
    for m in &analysis.metrics {
        let _ = writeln!(
            out,
            "| {} | {:.3} | {} | {} | {} | {:.3} | {:.3} |",
            m.metric,
            m.agreement_rate,
            fmt_opt(m.cohen_kappa),
            fmt_opt(m.pearson),
            fmt_opt(m.spearman),
            m.mae,
            m.rmse
        );
    }

    out.push_str("\n## Score Distributions\n\n");
    out.push_str("| Metric | LLM skew | LLM kurtosis | Human skew | Human kurtosis | KS statistic | KS p-value |\n");
    out.push_str("|---|---|---|---|---|---|---|\n");
    for m in &analysis.metrics {
        let d = &m.distribution;
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} | {:.3} | {:.3} |",
            m.metric,
            fmt_opt(d.llm.skewness),
            fmt_opt(d.llm.kurtosis),
            fmt_opt(d.human.skewness),
            fmt_opt(d.human.kurtosis),
            d.ks_test.statistic,
            d.ks_test.p_value
        );
    }

    out.push_str("\n### Normalized Differences (LLM - Human)\n\n");
    out.push_str("| Metric | Method | Mean | Std | Median | Range | KS statistic |\n");
    out.push_str("|---|---|---|---|---|---|---|\n");
    for m in &analysis.metrics {
        for n in &m.distribution.normalized {
            let _ = writeln!(
                out,
                "| {} | {} | {:.3} | {:.3} | {:.3} | {:.3} | {:.3} |",
                m.metric,
                n.method.as_str(),
                n.mean_diff,
                n.std_diff,
                n.median_diff,
                n.range_diff,
                n.ks_statistic
            );
        }
    }

    out.push_str("\n## Bias Analysis\n\n");
    out.push_str("| Metric | Position bias | Length bias |\n");
    out.push_str("|---|---|---|\n");
    for m in &analysis.metrics {
        let _ = writeln!(
            out,
            "| {} | {} | {} |",
            m.metric,
            fmt_opt(m.bias.position_bias),
            fmt_opt(m.bias.length_bias)
        );
    }

    out.push_str("\n## High Quality Answer Analysis\n");
    for m in &analysis.metrics {
        let hq = &m.high_quality;
        let _ = writeln!(out, "\n### {}\n", m.metric);
        let _ = writeln!(out, "- LLM High Scores (>= {}): {}", hq.min_score, hq.llm_count);
        let _ = writeln!(out, "- Human High Scores (>= {}): {}", hq.min_score, hq.human_count);
        let _ = writeln!(out, "- Agreement Count: {}", hq.agreement_count);
        if !hq.example_answers.is_empty() {
            out.push_str("\nExample High Quality Answers:\n\n");
            for (i, answer) in hq.example_answers.iter().enumerate() {
                let _ = writeln!(out, "{}. {}", i + 1, answer.replace('\n', " "));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(metrics: &[&str]) -> JudgeConfig {
        JudgeConfig {
            metrics: metrics.iter().map(|m| m.to_string()).collect(),
            ..JudgeConfig::default()
        }
    }

    const CSV: &str = "\
Chunk,Question,Answer,LLM Relevance,Human Relevance
c1,q1,short answer,4.5,4.5
c2,q2,a somewhat longer answer here,3.0,3.0
c3,q3,the longest answer of them all by far,5.0,5.0
";

    #[test]
    fn identical_raters_agree_perfectly() {
        let cfg = config(&["Relevance"]);
        let data = parse_answers(CSV.as_bytes(), &cfg).unwrap();
        let analysis = analyze(&data, &cfg).unwrap();
        let m = &analysis.metrics[0];

        assert_eq!(analysis.answers, 3);
        assert_eq!(m.agreement_rate, 1.0);
        assert_eq!(m.mae, 0.0);
        assert_eq!(m.rmse, 0.0);
        assert!((m.pearson.unwrap() - 1.0).abs() < 1e-12);
        assert!((m.spearman.unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(m.high_quality.llm_count, 2);
        assert_eq!(m.high_quality.agreement_count, 2);
        assert_eq!(
            m.high_quality.example_answers,
            vec!["short answer", "the longest answer of them all by far"]
        );
    }

    #[test]
    fn missing_columns_are_all_listed() {
        let csv = "Chunk,Answer,LLM Relevance\nc,a,4\n";
        let err = parse_answers(csv.as_bytes(), &config(&["Relevance", "Readiness"])).unwrap_err();
        match err {
            EvalError::Schema { missing, .. } => assert_eq!(
                missing,
                vec![
                    "Question",
                    "Human Relevance",
                    "LLM Readiness",
                    "Human Readiness"
                ]
            ),
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn out_of_range_scores_are_kept() {
        let csv = "Chunk,Question,Answer,LLM Relevance,Human Relevance\nc,q,a,7,0.5\n";
        let cfg = config(&["Relevance"]);
        let data = parse_answers(csv.as_bytes(), &cfg).unwrap();
        assert_eq!(data.out_of_range, 2);
        assert_eq!(data.records[0].llm, vec![7.0]);
    }

    #[test]
    fn non_numeric_score_is_rejected() {
        let csv = "Chunk,Question,Answer,LLM Relevance,Human Relevance\nc,q,a,high,4\n";
        let err = parse_answers(csv.as_bytes(), &config(&["Relevance"])).unwrap_err();
        assert!(matches!(err, EvalError::InvalidValue { .. }));
    }

    #[test]
    fn non_finite_scores_are_rejected() {
        let cfg = config(&["Relevance"]);
        for value in ["NaN", "inf", "-infinity"] {
            let csv = format!("Chunk,Question,Answer,LLM Relevance,Human Relevance\nc,q,a,4,{value}\n");
            match parse_answers(csv.as_bytes(), &cfg).unwrap_err() {
                EvalError::InvalidValue { context, value: v } => {
                    assert_eq!(context, "row 0, Human Relevance");
                    assert_eq!(v, value);
                }
                other => panic!("expected invalid value for {value}, got {other:?}"),
            }
        }
    }

    #[test]
    fn empty_data_is_an_error() {
        let csv = "Chunk,Question,Answer,LLM Relevance,Human Relevance\n";
        let cfg = config(&["Relevance"]);
        let data = parse_answers(csv.as_bytes(), &cfg).unwrap();
        assert!(matches!(analyze(&data, &cfg), Err(EvalError::EmptyInput(_))));
    }

    #[test]
    fn agreement_uses_threshold() {
        let csv = "\
Chunk,Question,Answer,LLM Relevance,Human Relevance
c,q,a,4.0,4.05
c,q,b,4.0,4.5
";
        let cfg = config(&["Relevance"]);
        let analysis = analyze(&parse_answers(csv.as_bytes(), &cfg).unwrap(), &cfg).unwrap();
        assert_eq!(analysis.metrics[0].agreement_rate, 0.5);
        // constant LLM column has no defined correlation
        assert!(analysis.metrics[0].pearson.is_none());
    }

    #[test]
    fn length_bias_tracks_word_count() {
        let cfg = config(&["Relevance"]);
        let analysis = analyze(&parse_answers(CSV.as_bytes(), &cfg).unwrap(), &cfg).unwrap();
        // word counts 2, 5, 8 vs scores 4.5, 3.0, 5.0
        assert!((analysis.metrics[0].bias.length_bias.unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn kappa_uses_score_bins() {
        let csv = "\
Chunk,Question,Answer,LLM Relevance,Human Relevance
c,q,a,1,1
c,q,b,2,2
c,q,c,4,4
c,q,d,5,4.9
";
        let cfg = config(&["Relevance"]);
        let analysis = analyze(&parse_answers(csv.as_bytes(), &cfg).unwrap(), &cfg).unwrap();
        // 4.9 and 5 share the top bin
        assert!((analysis.metrics[0].cohen_kappa.unwrap() - 1.0).abs() < 1e-12);

        let shifted = "\
Chunk,Question,Answer,LLM Relevance,Human Relevance
c,q,a,1,2
c,q,b,2,3
c,q,c,3,4
c,q,d,4,5
";
        let analysis = analyze(&parse_answers(shifted.as_bytes(), &cfg).unwrap(), &cfg).unwrap();
        assert!(analysis.metrics[0].cohen_kappa.unwrap() < 0.0);
    }

    #[test]
    fn distribution_comparison_of_identical_raters() {
        let cfg = config(&["Relevance"]);
        let analysis = analyze(&parse_answers(CSV.as_bytes(), &cfg).unwrap(), &cfg).unwrap();
        let d = &analysis.metrics[0].distribution;
        assert_eq!(d.ks_test.statistic, 0.0);
        assert_eq!(d.ks_test.p_value, 1.0);
        assert_eq!(d.llm, d.human);
        assert_eq!(d.normalized.len(), 3);
        for n in &d.normalized {
            assert_eq!(n.mean_diff, 0.0);
            assert_eq!(n.ks_statistic, 0.0);
        }
        let s = &analysis.metrics[0].llm;
        assert_eq!((s.q1, s.median, s.q3), (3.75, 4.5, 4.75));
    }

    #[test]
    fn constant_column_skips_normalization() {
        let csv = "\
Chunk,Question,Answer,LLM Relevance,Human Relevance
c,q,a,4,3
c,q,b,4,5
";
        let cfg = config(&["Relevance"]);
        let analysis = analyze(&parse_answers(csv.as_bytes(), &cfg).unwrap(), &cfg).unwrap();
        let d = &analysis.metrics[0].distribution;
        assert!(d.normalized.is_empty());
        assert!(d.llm.skewness.is_none());
        assert_eq!(d.ks_test.statistic, 0.5);
    }

    #[test]
    fn slug_is_file_safe() {
        assert_eq!(slug("Stand-alone Quality"), "stand_alone_quality");
        assert_eq!(slug(" Relevance "), "relevance");
    }

    #[test]
    fn writes_distribution_plots() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(&["Relevance", "Stand-alone Quality"]);
        let csv = "\
Chunk,Question,Answer,LLM Relevance,Human Relevance,LLM Stand-alone Quality,Human Stand-alone Quality
c,q,a,4,5,3,3
c,q,b,2,3,5,4
";
        let data = parse_answers(csv.as_bytes(), &cfg).unwrap();
        let written = write_plots(dir.path(), &data, &cfg).unwrap();
        assert_eq!(
            written,
            vec![
                dir.path().join(DISTRIBUTIONS_FILE),
                dir.path().join("relevance_llm_vs_human.png"),
                dir.path().join("stand_alone_quality_llm_vs_human.png"),
            ]
        );
        for path in &written {
            let bytes = std::fs::read(path).unwrap();
            assert_eq!(&bytes[..4], b"\x89PNG");
        }
    }

    #[test]
    fn markdown_has_sections() {
        let cfg = config(&["Relevance"]);
        let analysis = analyze(&parse_answers(CSV.as_bytes(), &cfg).unwrap(), &cfg).unwrap();
        let md = render_markdown(&analysis);
        assert!(md.starts_with("# Answer Evaluation Analysis Report"));
        assert!(md.contains("## Score Statistics"));
        assert!(md.contains("## LLM-Human Agreement"));
        assert!(md.contains("## Bias Analysis"));
        assert!(md.contains("## Score Distributions"));
        assert!(md.contains("Cohen's kappa"));
        assert!(md.contains("| Relevance | zscore |"));
        assert!(md.contains("### Relevance"));
        assert!(md.contains("1. short answer"));
    }
}

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Serialize;

use rageval::config::EvalConfig;
use rageval::dataset::{load_corpus, load_test_cases};
use rageval::embedding::{build_embedder, setup};
use rageval::judge;
use rageval::metrics::{available_metrics, RetrievalEvaluator};
use rageval::report::{ReportConfig, ReportGenerator};
use rageval::types::{EvaluationResult, RetrievalResult, SearchQuery};

/// Print `data` as pretty JSON if `json` is true, otherwise call `human_fmt`.
fn output<T: Serialize>(data: &T, json: bool, human_fmt: impl FnOnce(&T)) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(data)?);
    } else {
        human_fmt(data);
    }
    Ok(())
}

fn evaluator(config: &EvalConfig) -> Result<RetrievalEvaluator> {
    let embedder = build_embedder(config).context("Failed to initialize embedding backend")?;
    Ok(RetrievalEvaluator::new(embedder))
}

fn print_evaluation(result: &EvaluationResult) {
    println!("{}  average {:.3}", result.query_id, result.average_score);
    for metric in &result.metrics {
        println!("  {:<24} {:.3}", metric.metric_name.as_str(), metric.score);
    }
}

/// Evaluate one test case, or all of them as a batch.
pub fn cmd_evaluate(
    config: &EvalConfig,
    test_cases: &Path,
    case: Option<usize>,
    k: Option<usize>,
    json: bool,
) -> Result<()> {
    let set = load_test_cases(test_cases)
        .with_context(|| format!("Failed to load test cases from {}", test_cases.display()))?;
    let k = k.unwrap_or(config.k);
    let evaluator = evaluator(config)?;

    if let Some(index) = case {
        let Some(tc) = set.test_cases.get(index) else {
            bail!(
                "test case {index} out of range ({} test cases)",
                set.test_cases.len()
            );
        };
        let result = evaluator.evaluate_single(&tc.query, &tc.simulated_result, k);
        return output(&result, json, print_evaluation);
    }

    let (queries, results): (Vec<SearchQuery>, Vec<RetrievalResult>) = set
        .test_cases
        .into_iter()
        .map(|tc| (tc.query, tc.simulated_result))
        .unzip();
    let batch = evaluator.evaluate_batch(&queries, &results, k)?;

    output(&batch, json, |b| {
        for result in &b.results {
            print_evaluation(result);
        }
        println!();
        println!("Metric averages ({} queries):", b.results.len());
        for (metric, avg) in &b.metric_averages {
            println!("  {:<24} {avg:.3}", metric.as_str());
        }
        println!("Overall average: {:.3}", b.overall_average);
    })
}

/// Generate a versioned evaluation report.
pub fn cmd_report(
    config: &EvalConfig,
    test_cases: &Path,
    corpus: &Path,
    output_dir: Option<PathBuf>,
    version: Option<String>,
    k: Option<usize>,
    json: bool,
) -> Result<()> {
    let set = load_test_cases(test_cases)
        .with_context(|| format!("Failed to load test cases from {}", test_cases.display()))?;
    let corpus = load_corpus(corpus)
        .with_context(|| format!("Failed to load corpus from {}", corpus.display()))?;

    let mut report_config = ReportConfig::from_eval_config(config);
    if let Some(dir) = output_dir {
        report_config.output_dir = dir;
    }
    if let Some(k) = k {
        report_config.k = k;
    }
    report_config.version = version;

    let generator = ReportGenerator::new(evaluator(config)?, report_config);
    let report = generator
        .generate(&set, &corpus)
        .context("Report generation failed")?;

    output(&report, json, |r| {
        println!(
            "Report v{} written to {}",
            r.manifest.version,
            r.output_root.display()
        );
        println!(
            "  {} test cases, {} corpus documents, overall average {:.3}",
            r.manifest.test_cases_count, r.manifest.corpus_size, r.batch.overall_average
        );
        let files = &r.manifest.output_files;
        println!(
            "  {} csv, {} plots, {} markdown",
            files.csv.len(),
            files.plots.len(),
            files.markdown.len()
        );
    })
}

/// Compare LLM and human answer scores.
pub fn cmd_judge(
    config: &EvalConfig,
    scores: &Path,
    threshold: Option<f64>,
    min_score: Option<f64>,
    report: Option<&Path>,
    plots: Option<&Path>,
    json: bool,
) -> Result<()> {
    let mut judge_config = config.judge.clone();
    if let Some(threshold) = threshold {
        judge_config.agreement_threshold = threshold;
    }
    if let Some(min) = min_score {
        judge_config.high_quality_min = min;
    }

    let dataset = judge::load_answers(scores, &judge_config)
        .with_context(|| format!("Failed to load answer scores from {}", scores.display()))?;
    let analysis = judge::analyze(&dataset, &judge_config)?;
    let markdown = judge::render_markdown(&analysis);

    if let Some(path) = report {
        std::fs::write(path, &markdown)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    let charts = match plots {
        Some(dir) => judge::write_plots(dir, &dataset, &judge_config)
            .with_context(|| format!("Failed to write plots to {}", dir.display()))?,
        None => Vec::new(),
    };

    output(&analysis, json, |_| {
        print!("{markdown}");
        for chart in &charts {
            println!("Plot written to {}", chart.display());
        }
    })
}

/// List the metric catalog.
pub fn cmd_metrics(json: bool) -> Result<()> {
    let metrics = available_metrics();
    output(&metrics, json, |metrics| {
        for m in metrics {
            println!("{:<24} {}", m.name.as_str(), m.description);
        }
    })
}

/// Download the embedding model.
pub fn cmd_setup(json: bool) -> Result<()> {
    let result = setup::download_model()?;
    output(&result, json, |r| {
        println!("Embedding model ready in {}", r.model_dir);
    })
}

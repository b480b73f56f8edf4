//! CSV artifacts of a report version.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};
use crate::types::MetricName;

use super::ReportData;

pub const DETAILED_RESULTS: &str = "detailed_results.csv";
pub const METRIC_SUMMARIES: &str = "metric_summaries.csv";
pub const METRIC_VALUES: &str = "metric_values.csv";

/// One row of `metric_summaries.csv`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSummaryRecord {
    pub metric: MetricName,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub std: f64,
}

pub fn write_all(dir: &Path, data: &ReportData) -> Result<()> {
    write_detailed_results(&dir.join(DETAILED_RESULTS), data)?;
    write_metric_summaries(&dir.join(METRIC_SUMMARIES), data)?;
    write_metric_values(&dir.join(METRIC_VALUES), data)?;
    Ok(())
}

/// `query_id, query, expected_content` followed by one column per metric.
pub fn write_detailed_results(path: &Path, data: &ReportData) -> Result<()> {
    let metrics = data.metrics();
    let mut wtr = csv::Writer::from_path(path)?;

    let mut header = vec!["query_id", "query", "expected_content"];
    header.extend(metrics.iter().map(|m| m.as_str()));
    wtr.write_record(&header)?;

    for row in &data.rows {
        let mut record = vec![
            row.query_id.clone(),
            row.query.clone(),
            row.expected_content.clone(),
        ];
        record.extend(
            metrics
                .iter()
                .map(|m| row.score(*m).map(|s| s.to_string()).unwrap_or_default()),
        );
        wtr.write_record(&record)?;
    }
    wtr.flush().map_err(|e| EvalError::io(path, e))
}

pub fn write_metric_summaries(path: &Path, data: &ReportData) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for series in &data.series {
        if let Some(summary) = series.summary() {
            wtr.serialize(MetricSummaryRecord {
                metric: series.metric,
                mean: summary.mean,
                min: summary.min,
                max: summary.max,
                std: summary.std,
            })?;
        }
    }
    wtr.flush().map_err(|e| EvalError::io(path, e))
}

/// One column per metric, one row per test case.
pub fn write_metric_values(path: &Path, data: &ReportData) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(data.series.iter().map(|s| s.metric.as_str()))?;

    let rows = data.series.iter().map(|s| s.values.len()).max().unwrap_or(0);
    for i in 0..rows {
        wtr.write_record(data.series.iter().map(|s| {
            s.values
                .get(i)
                .map(|v| v.to_string())
                .unwrap_or_default()
        }))?;
    }
    wtr.flush().map_err(|e| EvalError::io(path, e))
}

/// Read `metric_summaries.csv` back.
pub fn read_metric_summaries(path: &Path) -> Result<Vec<MetricSummaryRecord>> {
    let mut rdr = csv::Reader::from_path(path)?;
    let records = rdr
        .deserialize()
        .collect::<std::result::Result<Vec<MetricSummaryRecord>, csv::Error>>()?;
    Ok(records)
}

//! PNG charts of metric distributions.
//!
//! Text is drawn with DejaVu Sans compiled into the binary, so rendering needs
//! no system font libraries.

use std::path::Path;
use std::sync::OnceLock;

use plotters::coord::combinators::BindKeyPoints;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::register_font;

use crate::error::{EvalError, Result};
use crate::stats::{mean, summarize};
use crate::types::MetricName;

use super::{MetricSeries, ReportData};

pub const COMBINED_FILE: &str = "metric_visualizations.png";
const COMBINED_SIZE: (u32, u32) = (1200, 600);
const HISTOGRAM_SIZE: (u32, u32) = (800, 400);
const HISTOGRAM_BINS: usize = 10;
const PANEL_SIZE: (u32, u32) = (750, 600);
const RATER_BINS: usize = 10;

const FONT: &str = "sans-serif";
const FONT_BYTES: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

fn plot_err<E: std::fmt::Display>(e: E) -> EvalError {
    EvalError::Plot(e.to_string())
}

/// Register the embedded font once per process.
fn ensure_font() -> Result<()> {
    static REGISTERED: OnceLock<std::result::Result<(), String>> = OnceLock::new();
    REGISTERED
        .get_or_init(|| {
            register_font(FONT, FontStyle::Normal, FONT_BYTES)
                .map_err(|_| "embedded font rejected".to_string())
        })
        .clone()
        .map_err(EvalError::Plot)
}

fn short_label(metric: MetricName) -> &'static str {
    match metric {
        MetricName::PrecisionAtK => "precision@k",
        MetricName::RecallAtK => "recall@k",
        MetricName::MeanAveragePrecision => "MAP",
        MetricName::NdcgAtK => "NDCG@k",
        MetricName::SemanticSimilarity => "semantic",
        MetricName::KeywordCoverage => "keywords",
    }
}

pub fn write_all(dir: &Path, data: &ReportData) -> Result<()> {
    write_combined(&dir.join(COMBINED_FILE), &data.series)?;
    for series in &data.series {
        let path = dir.join(format!("{}_distribution.png", series.metric));
        write_histogram(&path, series)?;
    }
    Ok(())
}

/// Box plot of each metric's distribution beside a bar chart of averages.
pub fn write_combined(path: &Path, series: &[MetricSeries]) -> Result<()> {
    ensure_font()?;
    let root = BitMapBackend::new(path, COMBINED_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    let (left, right) = root.split_horizontally(COMBINED_SIZE.0 / 2);

    let columns = series.len().max(1) as f64;
    let centers: Vec<f64> = (0..series.len()).map(|i| i as f64 + 0.5).collect();
    let (lo, hi) = score_range(series);
    let column_label = |x: &f64| {
        series
            .get(x.floor() as usize)
            .map(|s| short_label(s.metric).to_string())
            .unwrap_or_default()
    };

    let mut boxes = ChartBuilder::on(&left)
        .caption("Distribution of Metric Scores", (FONT, 22))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d((0.0..columns).with_key_points(centers.clone()), lo..hi)
        .map_err(plot_err)?;
    boxes
        .configure_mesh()
        .disable_x_mesh()
        .x_label_formatter(&column_label)
        .x_desc("Metric")
        .y_desc("Score")
        .draw()
        .map_err(plot_err)?;

    for (i, s) in series.iter().enumerate() {
        let Some(summary) = summarize(&s.values) else {
            continue;
        };
        let x = centers[i];
        let color = Palette99::pick(i);

        boxes
            .draw_series(std::iter::once(PathElement::new(
                vec![(x, summary.min), (x, summary.max)],
                BLACK.stroke_width(1),
            )))
            .map_err(plot_err)?;
        boxes
            .draw_series([summary.min, summary.max].into_iter().map(|y| {
                PathElement::new(vec![(x - 0.1, y), (x + 0.1, y)], BLACK.stroke_width(1))
            }))
            .map_err(plot_err)?;
        boxes
            .draw_series(std::iter::once(Rectangle::new(
                [(x - 0.25, summary.q1), (x + 0.25, summary.q3)],
                color.mix(0.6).filled(),
            )))
            .map_err(plot_err)?;
        boxes
            .draw_series(std::iter::once(Rectangle::new(
                [(x - 0.25, summary.q1), (x + 0.25, summary.q3)],
                BLACK.stroke_width(1),
            )))
            .map_err(plot_err)?;
        boxes
            .draw_series(std::iter::once(PathElement::new(
                vec![(x - 0.25, summary.median), (x + 0.25, summary.median)],
                BLACK.stroke_width(2),
            )))
            .map_err(plot_err)?;
    }

    let mut bars = ChartBuilder::on(&right)
        .caption("Average Metric Scores", (FONT, 22))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d((0.0..columns).with_key_points(centers), lo..hi)
        .map_err(plot_err)?;
    bars.configure_mesh()
        .disable_x_mesh()
        .x_label_formatter(&column_label)
        .x_desc("Metric")
        .y_desc("Average Score")
        .draw()
        .map_err(plot_err)?;
    bars.draw_series(series.iter().enumerate().filter_map(|(i, s)| {
        let avg = mean(&s.values)?;
        let x = i as f64;
        Some(Rectangle::new(
            [(x + 0.15, 0.0), (x + 0.85, avg)],
            Palette99::pick(i).mix(0.8).filled(),
        ))
    }))
    .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

/// 10-bin histogram of one metric's scores.
pub fn write_histogram(path: &Path, series: &MetricSeries) -> Result<()> {
    ensure_font()?;
    let histogram = Histogram::of(&series.values, HISTOGRAM_BINS);
    let tallest = histogram.counts.iter().copied().max().unwrap_or(0);

    let root = BitMapBackend::new(path, HISTOGRAM_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(format!("Distribution of {}", series.metric), (FONT, 20))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(histogram.lo..histogram.hi, 0.0..(tallest as f64 + 1.0))
        .map_err(plot_err)?;
    chart
        .configure_mesh()
        .x_desc("Score")
        .y_desc("Count")
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(histogram.bars(BLUE.mix(0.7).filled()))
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

/// Paired LLM and human scores of one judged metric.
#[derive(Debug, Clone, Copy)]
pub struct RaterPanel<'a> {
    pub title: &'a str,
    pub llm: &'a [f64],
    pub human: &'a [f64],
}

/// One LLM-vs-human histogram panel per metric, two panels to a row.
pub fn write_rater_grid(path: &Path, panels: &[RaterPanel<'_>], range: (f64, f64)) -> Result<()> {
    ensure_font()?;
    let cols = panels.len().clamp(1, 2);
    let rows = ((panels.len() + cols - 1) / cols).max(1);
    let size = (PANEL_SIZE.0 * cols as u32, PANEL_SIZE.1 * rows as u32 + 60);

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    let body = root
        .titled("Score Distributions: LLM vs Human Evaluations", (FONT, 28))
        .map_err(plot_err)?;
    for (area, panel) in body.split_evenly((rows, cols)).iter().zip(panels) {
        draw_rater_panel(area, panel, range)?;
    }
    root.present().map_err(plot_err)?;
    Ok(())
}

pub fn write_rater_panel(path: &Path, panel: &RaterPanel<'_>, range: (f64, f64)) -> Result<()> {
    ensure_font()?;
    let root = BitMapBackend::new(path, PANEL_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    draw_rater_panel(&root, panel, range)?;
    root.present().map_err(plot_err)?;
    Ok(())
}

fn draw_rater_panel(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    panel: &RaterPanel<'_>,
    range: (f64, f64),
) -> Result<()> {
    // widen to the data when scores fall outside the configured range
    let (lo, hi) = panel
        .llm
        .iter()
        .chain(panel.human)
        .fold(range, |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let llm = Histogram::over(panel.llm, lo, hi, RATER_BINS);
    let human = Histogram::over(panel.human, lo, hi, RATER_BINS);
    let tallest = llm
        .counts
        .iter()
        .chain(&human.counts)
        .copied()
        .max()
        .unwrap_or(0);

    let mut chart = ChartBuilder::on(area)
        .caption(panel.title, (FONT, 20))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(llm.lo..llm.hi, 0.0..(tallest as f64 + 1.0))
        .map_err(plot_err)?;
    chart
        .configure_mesh()
        .x_desc("Score")
        .y_desc("Count")
        .draw()
        .map_err(plot_err)?;

    for (label, histogram, color) in [("LLM", &llm, BLUE), ("Human", &human, RED)] {
        chart
            .draw_series(histogram.bars(color.mix(0.45).filled()))
            .map_err(plot_err)?
            .label(label)
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled()));
    }
    chart
        .configure_series_labels()
        .label_font((FONT, 14))
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plot_err)?;
    Ok(())
}

/// Equal-width bins; the last bin is closed.
#[derive(Debug, Clone, PartialEq)]
struct Histogram {
    lo: f64,
    hi: f64,
    width: f64,
    counts: Vec<usize>,
}

impl Histogram {
    /// Bins over the data range; a constant series gets a unit-wide range.
    fn of(values: &[f64], bins: usize) -> Self {
        let (lo, hi) = match summarize(values) {
            Some(s) => (s.min, s.max),
            None => (0.0, 1.0),
        };
        Self::over(values, lo, hi, bins)
    }

    /// Bins over `[lo, hi]`; values outside are clamped into the edge bins.
    fn over(values: &[f64], mut lo: f64, mut hi: f64, bins: usize) -> Self {
        let bins = bins.max(1);
        if lo >= hi {
            lo -= 0.5;
            hi += 0.5;
        }
        let width = (hi - lo) / bins as f64;

        let mut counts = vec![0; bins];
        for v in values {
            let idx = (((v - lo) / width).floor().max(0.0) as usize).min(bins - 1);
            counts[idx] += 1;
        }
        Self {
            lo,
            hi,
            width,
            counts,
        }
    }

    fn bars(&self, style: ShapeStyle) -> impl Iterator<Item = Rectangle<(f64, f64)>> + '_ {
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, count)| **count > 0)
            .map(move |(i, count)| {
                let x0 = self.lo + i as f64 * self.width;
                Rectangle::new([(x0, 0.0), (x0 + self.width, *count as f64)], style)
            })
    }
}

/// Y range covering `[0, 1]` and every score, with a little headroom.
fn score_range(series: &[MetricSeries]) -> (f64, f64) {
    let (lo, hi) = series
        .iter()
        .flat_map(|s| s.values.iter().copied())
        .fold((0.0f64, 1.0f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let pad = (hi - lo) * 0.05;
    (if lo < 0.0 { lo - pad } else { lo }, hi + pad)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_png(path: &Path) -> bool {
        std::fs::read(path).is_ok_and(|bytes| bytes.starts_with(b"\x89PNG"))
    }

    #[test]
    fn histogram_bins_cover_range() {
        let h = Histogram::of(&[0.0, 0.05, 0.5, 1.0], 10);
        assert_eq!(h.counts.len(), 10);
        assert_eq!(h.counts[0], 2);
        assert_eq!(h.counts[5], 1);
        // max lands in the closed last bin
        assert_eq!(h.counts[9], 1);
        assert_eq!(h.counts.iter().sum::<usize>(), 4);
    }

    #[test]
    fn constant_values_get_unit_span() {
        let h = Histogram::of(&[0.4, 0.4, 0.4], 10);
        assert!((h.hi - h.lo - 1.0).abs() < 1e-12);
        assert_eq!(h.counts.iter().sum::<usize>(), 3);
    }

    #[test]
    fn fixed_range_clamps_outliers() {
        let h = Histogram::over(&[0.0, 1.0, 3.0, 6.0], 1.0, 5.0, 4);
        assert_eq!(h.counts, vec![2, 0, 1, 1]);
    }

    #[test]
    fn score_range_includes_negatives() {
        let series = [MetricSeries {
            metric: MetricName::SemanticSimilarity,
            values: vec![-0.2, 0.3],
        }];
        let (lo, hi) = score_range(&series);
        assert!(lo < -0.2);
        assert!(hi > 1.0);
    }

    #[test]
    fn every_metric_has_a_column_label() {
        let labels: std::collections::HashSet<&str> =
            MetricName::ALL.iter().map(|&m| short_label(m)).collect();
        assert_eq!(labels.len(), MetricName::ALL.len());
    }

    #[test]
    fn writes_labelled_png_files() {
        let dir = tempfile::tempdir().unwrap();
        let series = vec![
            MetricSeries {
                metric: MetricName::PrecisionAtK,
                values: vec![1.0, 0.5, 0.0],
            },
            MetricSeries {
                metric: MetricName::KeywordCoverage,
                values: vec![0.25],
            },
        ];
        write_combined(&dir.path().join(COMBINED_FILE), &series).unwrap();
        write_histogram(&dir.path().join("h.png"), &series[0]).unwrap();

        assert!(is_png(&dir.path().join(COMBINED_FILE)));
        assert!(is_png(&dir.path().join("h.png")));
    }

    #[test]
    fn writes_rater_grid_with_odd_panel_count() {
        let dir = tempfile::tempdir().unwrap();
        let (llm, human) = ([4.0, 5.0, 3.0], [4.5, 5.0, 2.0]);
        let panels: Vec<RaterPanel<'_>> = ["Relevance", "Readiness", "Completeness"]
            .iter()
            .map(|title| RaterPanel {
                title,
                llm: &llm,
                human: &human,
            })
            .collect();
        let path = dir.path().join("grid.png");
        write_rater_grid(&path, &panels, (1.0, 5.0)).unwrap();
        assert!(is_png(&path));
    }
}

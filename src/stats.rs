//! Summary statistics, correlation and distribution helpers shared by the
//! report generator and the judge analyzer.

use serde::{Deserialize, Serialize};

/// Mean, extremes, quartiles and sample standard deviation of one series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Sample standard deviation (n − 1). `0.0` for a single value.
    pub std: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
}

/// Summarize a series. `None` for an empty slice.
pub fn summarize(values: &[f64]) -> Option<Summary> {
    if values.is_empty() {
        return None;
    }
    let count = values.len();
    let mean = mean(values)?;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let std = if count < 2 {
        0.0
    } else {
        let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
        (ss / (count - 1) as f64).sqrt()
    };
    Some(Summary {
        count,
        mean,
        min,
        max,
        std,
        q1: quantile(values, 0.25)?,
        median: quantile(values, 0.5)?,
        q3: quantile(values, 0.75)?,
    })
}

/// Population standard deviation (n denominator).
pub fn population_std(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / values.len() as f64).sqrt())
}

/// Central moments 2..=4, population-normalized.
fn central_moments(values: &[f64]) -> Option<(f64, f64, f64)> {
    let m = mean(values)?;
    let n = values.len() as f64;
    let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
    for v in values {
        let d = v - m;
        m2 += d * d;
        m3 += d * d * d;
        m4 += d * d * d * d;
    }
    Some((m2 / n, m3 / n, m4 / n))
}

/// Biased sample skewness `m3 / m2^1.5`. `None` for a constant series.
pub fn skewness(values: &[f64]) -> Option<f64> {
    let (m2, m3, _) = central_moments(values)?;
    (m2 > 0.0).then(|| m3 / m2.powf(1.5))
}

/// Excess (Fisher) kurtosis `m4 / m2² − 3`. `None` for a constant series.
pub fn kurtosis(values: &[f64]) -> Option<f64> {
    let (m2, _, m4) = central_moments(values)?;
    (m2 > 0.0).then(|| m4 / (m2 * m2) - 3.0)
}

/// Two-sample Kolmogorov-Smirnov test result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KsTest {
    /// Largest gap between the two empirical CDFs.
    pub statistic: f64,
    /// Asymptotic two-sided p-value.
    pub p_value: f64,
}

/// Two-sample KS test. `None` when either sample is empty.
///
/// The p-value uses the Kolmogorov distribution with Stephens' correction
/// for the effective sample size `n·m / (n + m)`.
pub fn ks_two_sample(x: &[f64], y: &[f64]) -> Option<KsTest> {
    if x.is_empty() || y.is_empty() {
        return None;
    }
    let xs = sorted(x);
    let ys = sorted(y);
    let (n, m) = (xs.len() as f64, ys.len() as f64);

    let (mut i, mut j) = (0, 0);
    let mut statistic = 0.0f64;
    while i < xs.len() && j < ys.len() {
        let t = xs[i].min(ys[j]);
        while i < xs.len() && xs[i] <= t {
            i += 1;
        }
        while j < ys.len() && ys[j] <= t {
            j += 1;
        }
        statistic = statistic.max((i as f64 / n - j as f64 / m).abs());
    }

    let en = (n * m / (n + m)).sqrt();
    let p_value = kolmogorov_q((en + 0.12 + 0.11 / en) * statistic);
    Some(KsTest { statistic, p_value })
}

/// Survival function of the Kolmogorov distribution.
fn kolmogorov_q(lambda: f64) -> f64 {
    if lambda < 1e-3 {
        return 1.0;
    }
    let a2 = -2.0 * lambda * lambda;
    let mut sign = 2.0;
    let mut sum = 0.0;
    let mut previous = 0.0f64;
    for j in 1..=100 {
        let term = sign * (a2 * (j * j) as f64).exp();
        sum += term;
        if term.abs() <= 1e-3 * previous || term.abs() <= 1e-8 * sum {
            return sum.clamp(0.0, 1.0);
        }
        sign = -sign;
        previous = term.abs();
    }
    // no convergence: lambda is tiny, the samples are indistinguishable
    1.0
}

/// `(v − mean) / σ` with population σ. `None` for a constant series.
pub fn z_scores(values: &[f64]) -> Option<Vec<f64>> {
    let m = mean(values)?;
    let sd = population_std(values)?;
    (sd > 0.0).then(|| values.iter().map(|v| (v - m) / sd).collect())
}

/// Rescale to `[0, 1]`. `None` for a constant series.
pub fn min_max_scaled(values: &[f64]) -> Option<Vec<f64>> {
    let s = summarize(values)?;
    let range = s.max - s.min;
    (range > 0.0).then(|| values.iter().map(|v| (v - s.min) / range).collect())
}

/// `(v − median) / IQR`. `None` when the interquartile range is zero.
pub fn robust_scaled(values: &[f64]) -> Option<Vec<f64>> {
    let s = summarize(values)?;
    let iqr = s.q3 - s.q1;
    (iqr > 0.0).then(|| values.iter().map(|v| (v - s.median) / iqr).collect())
}

/// Cohen's kappa for two raters over the same items, labels as category
/// indices. `None` for mismatched or empty input, or when chance agreement
/// is already perfect.
pub fn cohen_kappa(a: &[usize], b: &[usize]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let categories = a.iter().chain(b).copied().max()? + 1;
    let n = a.len() as f64;

    let mut count_a = vec![0usize; categories];
    let mut count_b = vec![0usize; categories];
    let mut agree = 0usize;
    for (&x, &y) in a.iter().zip(b) {
        count_a[x] += 1;
        count_b[y] += 1;
        if x == y {
            agree += 1;
        }
    }

    let observed = agree as f64 / n;
    let expected: f64 = count_a
        .iter()
        .zip(&count_b)
        .map(|(&ca, &cb)| (ca as f64 / n) * (cb as f64 / n))
        .sum();
    (expected < 1.0).then(|| (observed - expected) / (1.0 - expected))
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    sorted
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Linear-interpolated quantile, `q` in `[0, 1]`.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sorted = sorted(values);
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Pearson correlation. `None` when lengths differ, fewer than two points, or
/// either series is constant.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let mx = mean(x)?;
    let my = mean(y)?;
    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (a, b) in x.iter().zip(y) {
        cov += (a - mx) * (b - my);
        vx += (a - mx).powi(2);
        vy += (b - my).powi(2);
    }
    if vx == 0.0 || vy == 0.0 {
        return None;
    }
    Some(cov / (vx.sqrt() * vy.sqrt()))
}

/// Spearman rank correlation: Pearson over average ranks (ties share a rank).
pub fn spearman(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() {
        return None;
    }
    pearson(&ranks(x), &ranks(y))
}

/// 1-based ranks; tied values get the mean of the ranks they span.
fn ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| {
        values[a]
            .partial_cmp(&values[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut ranks = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        let avg = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg;
        }
        i = j + 1;
    }
    ranks
}

pub fn mean_absolute_error(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() {
        return None;
    }
    let diffs: Vec<f64> = x.iter().zip(y).map(|(a, b)| (a - b).abs()).collect();
    mean(&diffs)
}

pub fn root_mean_squared_error(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() {
        return None;
    }
    let squares: Vec<f64> = x.iter().zip(y).map(|(a, b)| (a - b).powi(2)).collect();
    mean(&squares).map(f64::sqrt)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn summarize_basic() {
        let s = summarize(&[1.0, 0.5, 0.0]).unwrap();
        assert_eq!(s.count, 3);
        assert!(close(s.mean, 0.5));
        assert_eq!(s.min, 0.0);
        assert_eq!(s.max, 1.0);
        assert!(close(s.std, 0.5));
    }

    #[test]
    fn summarize_single_and_empty() {
        let s = summarize(&[0.3]).unwrap();
        assert_eq!(s.std, 0.0);
        assert!(summarize(&[]).is_none());
    }

    #[test]
    fn quantile_interpolates() {
        let v = [4.0, 1.0, 3.0, 2.0];
        assert!(close(quantile(&v, 0.5).unwrap(), 2.5));
        assert!(close(quantile(&v, 0.0).unwrap(), 1.0));
        assert!(close(quantile(&v, 1.0).unwrap(), 4.0));
        assert!(close(quantile(&v, 0.25).unwrap(), 1.75));
    }

    #[test]
    fn pearson_perfect_and_undefined() {
        assert!(close(pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).unwrap(), 1.0));
        assert!(close(pearson(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]).unwrap(), -1.0));
        assert!(pearson(&[1.0, 1.0], &[1.0, 2.0]).is_none());
        assert!(pearson(&[1.0], &[1.0]).is_none());
    }

    #[test]
    fn spearman_is_rank_based() {
        // monotone but non-linear
        assert!(close(spearman(&[1.0, 2.0, 3.0, 4.0], &[1.0, 8.0, 27.0, 64.0]).unwrap(), 1.0));
    }

    #[test]
    fn ties_share_average_rank() {
        assert_eq!(ranks(&[10.0, 20.0, 10.0]), vec![1.5, 3.0, 1.5]);
    }

    #[test]
    fn summary_carries_quartiles() {
        let s = summarize(&[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert!(close(s.q1, 1.75));
        assert!(close(s.median, 2.5));
        assert!(close(s.q3, 3.25));
    }

    #[test]
    fn skewness_and_kurtosis() {
        assert!(close(skewness(&[1.0, 2.0, 3.0]).unwrap(), 0.0));
        // deviations -1, -1, 2: m2 = 2, m3 = 2
        assert!(close(skewness(&[1.0, 1.0, 4.0]).unwrap(), 2.0 / 2f64.powf(1.5)));
        // m2 = 2/3, m4 = 2/3
        assert!(close(kurtosis(&[1.0, 2.0, 3.0]).unwrap(), -1.5));
        assert!(skewness(&[2.0, 2.0]).is_none());
        assert!(kurtosis(&[]).is_none());
    }

    #[test]
    fn ks_identical_samples() {
        let ks = ks_two_sample(&[1.0, 2.0, 3.0], &[3.0, 1.0, 2.0]).unwrap();
        assert_eq!(ks.statistic, 0.0);
        assert_eq!(ks.p_value, 1.0);
    }

    #[test]
    fn ks_disjoint_samples() {
        let ks = ks_two_sample(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]).unwrap();
        assert_eq!(ks.statistic, 1.0);
        assert!(ks.p_value > 0.0 && ks.p_value < 0.05, "p={}", ks.p_value);
        assert!(ks_two_sample(&[], &[1.0]).is_none());
    }

    #[test]
    fn ks_partial_overlap() {
        // CDF gap peaks at 2.0: 2/3 vs 0
        let ks = ks_two_sample(&[1.0, 2.0, 3.0], &[2.5, 3.0, 4.0]).unwrap();
        assert!(close(ks.statistic, 2.0 / 3.0));
        assert!(ks.p_value > 0.05 && ks.p_value <= 1.0);
    }

    #[test]
    fn normalizations() {
        let z = z_scores(&[1.0, 2.0, 3.0]).unwrap();
        let sd = (2.0f64 / 3.0).sqrt();
        assert!(close(z[0], -1.0 / sd) && close(z[1], 0.0) && close(z[2], 1.0 / sd));
        assert_eq!(min_max_scaled(&[2.0, 4.0, 3.0]).unwrap(), vec![0.0, 1.0, 0.5]);
        // median 2.5, IQR 1.5
        let r = robust_scaled(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!(close(r[0], -1.0));
        assert!(z_scores(&[5.0, 5.0]).is_none());
        assert!(min_max_scaled(&[5.0]).is_none());
        assert!(robust_scaled(&[1.0, 1.0, 1.0, 1.0, 9.0]).is_none());
    }

    #[test]
    fn kappa_perfect_chance_and_undefined() {
        assert!(close(cohen_kappa(&[0, 1, 2, 1], &[0, 1, 2, 1]).unwrap(), 1.0));
        // observed 0.5, expected 0.5
        assert!(close(cohen_kappa(&[0, 0, 1, 1], &[0, 1, 0, 1]).unwrap(), 0.0));
        assert!(cohen_kappa(&[2, 2], &[2, 2]).is_none());
        assert!(cohen_kappa(&[0], &[0, 1]).is_none());
    }

    #[test]
    fn error_metrics() {
        let x = [1.0, 2.0, 3.0];
        let y = [1.0, 3.0, 5.0];
        assert!(close(mean_absolute_error(&x, &y).unwrap(), 1.0));
        assert!(close(root_mean_squared_error(&x, &y).unwrap(), (5.0f64 / 3.0).sqrt()));
        assert!(mean_absolute_error(&x, &y[..2]).is_none());
    }
}

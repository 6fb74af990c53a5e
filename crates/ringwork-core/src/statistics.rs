use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal, StudentsT};
use statrs::statistics::{Data, Distribution};

/// Minimum number of paired observations for a defined correlation.
pub const MIN_PAIRS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationMethod {
    Pearson,
    #[default]
    Spearman,
    Kendall,
}

impl CorrelationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CorrelationMethod::Pearson => "pearson",
            CorrelationMethod::Spearman => "spearman",
            CorrelationMethod::Kendall => "kendall",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Correlation {
    pub r: f64,
    /// Two-sided p-value.
    pub p_value: f64,
    pub n: usize,
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Sample standard deviation (n - 1 denominator).
pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    Data::new(values.to_vec()).std_dev()
}

/// Standardises values to zero mean and unit sample variance.
pub fn z_scores(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    match (mean(&present), std_dev(&present)) {
        (Some(m), Some(sd)) if sd > 0.0 => values
            .iter()
            .map(|value| value.map(|v| (v - m) / sd))
            .collect(),
        _ => vec![None; values.len()],
    }
}

/// Complete cases of two aligned series.
pub fn paired(x: &[Option<f64>], y: &[Option<f64>]) -> (Vec<f64>, Vec<f64>) {
    x.iter()
        .zip(y.iter())
        .filter_map(|(a, b)| match (a, b) {
            (Some(a), Some(b)) => Some((*a, *b)),
            _ => None,
        })
        .unzip()
}

pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let mx = mean(x)?;
    let my = mean(y)?;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in x.iter().zip(y.iter()) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx).powi(2);
        syy += (b - my).powi(2);
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }
    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

/// Ranks starting at 1, ties receive their average rank.
pub fn ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|a, b| values[*a].total_cmp(&values[*b]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        let average = (start + end + 1) as f64 / 2.0;
        for idx in &order[start..end] {
            ranks[*idx] = average;
        }
        start = end;
    }
    ranks
}

pub fn spearman(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() {
        return None;
    }
    pearson(&ranks(x), &ranks(y))
}

/// Kendall's tau-b.
pub fn kendall(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len();
    if n != y.len() || n < 2 {
        return None;
    }
    let mut concordant = 0i64;
    let mut discordant = 0i64;
    let mut ties_x = 0i64;
    let mut ties_y = 0i64;
    for i in 0..n {
        for j in (i + 1)..n {
            let dx = x[i] - x[j];
            let dy = y[i] - y[j];
            if dx == 0.0 && dy == 0.0 {
                continue;
            } else if dx == 0.0 {
                ties_x += 1;
            } else if dy == 0.0 {
                ties_y += 1;
            } else if dx * dy > 0.0 {
                concordant += 1;
            } else {
                discordant += 1;
            }
        }
    }
    let n0 = (concordant + discordant + ties_x) as f64;
    let n1 = (concordant + discordant + ties_y) as f64;
    if n0 <= 0.0 || n1 <= 0.0 {
        return None;
    }
    Some(((concordant - discordant) as f64 / (n0 * n1).sqrt()).clamp(-1.0, 1.0))
}

/// Correlation with a two-sided p-value. `None` when fewer than
/// [`MIN_PAIRS`] complete pairs exist or either side is constant.
pub fn correlate(
    method: CorrelationMethod,
    x: &[Option<f64>],
    y: &[Option<f64>],
) -> Option<Correlation> {
    let (a, b) = paired(x, y);
    correlate_complete(method, &a, &b)
}

pub fn correlate_complete(
    method: CorrelationMethod,
    x: &[f64],
    y: &[f64],
) -> Option<Correlation> {
    let n = x.len();
    if n < MIN_PAIRS || n != y.len() {
        return None;
    }
    let r = match method {
        CorrelationMethod::Pearson => pearson(x, y)?,
        CorrelationMethod::Spearman => spearman(x, y)?,
        CorrelationMethod::Kendall => kendall(x, y)?,
    };
    let p_value = match method {
        CorrelationMethod::Kendall => kendall_p_value(r, n),
        _ => t_test_p_value(r, n),
    }?;
    Some(Correlation { r, p_value, n })
}

fn t_test_p_value(r: f64, n: usize) -> Option<f64> {
    if (1.0 - r.abs()) <= f64::EPSILON {
        return Some(0.0);
    }
    let df = (n - 2) as f64;
    let t = r * (df / (1.0 - r * r)).sqrt();
    let dist = StudentsT::new(0.0, 1.0, df).ok()?;
    Some((2.0 * (1.0 - dist.cdf(t.abs()))).clamp(0.0, 1.0))
}

fn kendall_p_value(tau: f64, n: usize) -> Option<f64> {
    let n = n as f64;
    let z = 3.0 * tau * (n * (n - 1.0)).sqrt() / (2.0 * (2.0 * n + 5.0)).sqrt();
    let dist = Normal::new(0.0, 1.0).ok()?;
    Some((2.0 * (1.0 - dist.cdf(z.abs()))).clamp(0.0, 1.0))
}

/// Smallest correlation significant at `pcrit` under a one-sided t-test with
/// `n` pairs.
pub fn critical_correlation(n: usize, pcrit: f64) -> Option<f64> {
    if n < MIN_PAIRS || !(0.0..1.0).contains(&pcrit) || pcrit == 0.0 {
        return None;
    }
    let df = (n - 2) as f64;
    let dist = StudentsT::new(0.0, 1.0, df).ok()?;
    let t = dist.inverse_cdf(1.0 - pcrit);
    Some(t / (df + t * t).sqrt())
}

/// Lag-1 autocorrelation over consecutive present values.
pub fn ar1(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let m = mean(&present)?;
    let denominator: f64 = present.iter().map(|v| (v - m).powi(2)).sum();
    if denominator <= 0.0 {
        return None;
    }
    let numerator: f64 = values
        .windows(2)
        .filter_map(|pair| match (pair[0], pair[1]) {
            (Some(a), Some(b)) => Some((a - m) * (b - m)),
            _ => None,
        })
        .sum();
    Some(numerator / denominator)
}

/// Mean absolute relative difference between consecutive rings.
pub fn mean_sensitivity(values: &[Option<f64>]) -> Option<f64> {
    let terms: Vec<f64> = values
        .windows(2)
        .filter_map(|pair| match (pair[0], pair[1]) {
            (Some(a), Some(b)) if a + b > 0.0 => Some(2.0 * (b - a).abs() / (a + b)),
            _ => None,
        })
        .collect();
    mean(&terms)
}

/// Index of the first and last present value.
pub fn span(values: &[Option<f64>]) -> Option<(usize, usize)> {
    let first = values.iter().position(Option::is_some)?;
    let last = values.iter().rposition(Option::is_some)?;
    Some((first, last))
}

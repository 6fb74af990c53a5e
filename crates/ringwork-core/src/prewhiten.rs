//! Autoregressive prewhitening.
//!
//! Series are modelled as AR(p) with Yule-Walker estimates from the
//! Levinson-Durbin recursion. The order is chosen by AIC up to
//! `min(n - 1, 10·log10(n))`. The prewhitened series is the model residual
//! plus the series mean; the first `p` values have no residual.

use crate::statistics::mean;

#[derive(Debug, Clone, PartialEq)]
pub struct ArModel {
    pub order: usize,
    pub coefficients: Vec<f64>,
    pub mean: f64,
    pub innovation_variance: f64,
}

fn autocovariance(values: &[f64], mean: f64, max_lag: usize) -> Vec<f64> {
    let n = values.len() as f64;
    (0..=max_lag)
        .map(|lag| {
            values
                .iter()
                .zip(values.iter().skip(lag))
                .map(|(a, b)| (a - mean) * (b - mean))
                .sum::<f64>()
                / n
        })
        .collect()
}

pub fn default_max_order(n: usize) -> usize {
    if n < 2 {
        return 0;
    }
    let by_length = (10.0 * (n as f64).log10()).floor() as usize;
    by_length.min(n - 1)
}

/// Fits an AR model to contiguous values. `None` when the series is too
/// short or constant.
pub fn fit_ar(values: &[f64], max_order: usize) -> Option<ArModel> {
    if values.len() < 3 {
        return None;
    }
    let m = mean(values)?;
    let max_order = max_order.min(values.len() - 1);
    let acov = autocovariance(values, m, max_order);
    if acov[0] <= 0.0 {
        return None;
    }

    let n = values.len() as f64;
    let mut best = ArModel {
        order: 0,
        coefficients: Vec::new(),
        mean: m,
        innovation_variance: acov[0],
    };
    let mut best_aic = n * acov[0].ln();

    let mut phi: Vec<f64> = Vec::new();
    let mut variance = acov[0];
    for k in 1..=max_order {
        let acc = acov[k]
            - phi
                .iter()
                .enumerate()
                .map(|(j, coefficient)| coefficient * acov[k - 1 - j])
                .sum::<f64>();
        let kappa = acc / variance;
        if !kappa.is_finite() || kappa.abs() >= 1.0 {
            break;
        }

        let mut next = Vec::with_capacity(k);
        for j in 0..(k - 1) {
            next.push(phi[j] - kappa * phi[k - 2 - j]);
        }
        next.push(kappa);
        phi = next;
        variance *= 1.0 - kappa * kappa;
        if variance <= 0.0 {
            break;
        }

        let aic = n * variance.ln() + 2.0 * k as f64;
        if aic < best_aic {
            best_aic = aic;
            best = ArModel {
                order: k,
                coefficients: phi.clone(),
                mean: m,
                innovation_variance: variance,
            };
        }
    }

    Some(best)
}

/// Prewhitens a series with missing cells. The model is fitted on the
/// present values in order (gaps are closed, as the values are treated as
/// consecutive) and the residuals are written back to their years.
pub fn prewhiten(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let positions: Vec<usize> = values
        .iter()
        .enumerate()
        .filter_map(|(idx, value)| value.map(|_| idx))
        .collect();
    let present: Vec<f64> = values.iter().flatten().copied().collect();

    let Some(model) = fit_ar(&present, default_max_order(present.len())) else {
        return values.to_vec();
    };

    let mut output = vec![None; values.len()];
    for (t, position) in positions.iter().enumerate().skip(model.order) {
        let prediction: f64 = model
            .coefficients
            .iter()
            .enumerate()
            .map(|(j, coefficient)| coefficient * (present[t - 1 - j] - model.mean))
            .sum();
        // residual plus the series mean
        output[*position] = Some(present[t] - prediction);
    }
    output
}

/// Prewhitens every series of a table.
pub fn prewhiten_all(series: &[(String, Vec<Option<f64>>)]) -> Vec<(String, Vec<Option<f64>>)> {
    series
        .iter()
        .map(|(id, values)| (id.clone(), prewhiten(values)))
        .collect()
}

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::statistics::{mean, span};
use ringwork_parser::RingWidthTable;

const GOLDEN: f64 = 0.618_033_988_749_894_8;
const GRID_POINTS: usize = 120;
const LN_B_MIN: f64 = -13.8; // b ~ 1e-6 per year
const LN_B_MAX: f64 = 0.7; // b ~ 2 per year

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetrendMethod {
    #[default]
    NegativeExponential,
    Linear,
    Mean,
}

impl DetrendMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetrendMethod::NegativeExponential => "negative_exponential",
            DetrendMethod::Linear => "linear",
            DetrendMethod::Mean => "mean",
        }
    }
}

/// Fitted growth curve. `t` counts years from the first measured ring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GrowthCurve {
    NegativeExponential { a: f64, b: f64, k: f64 },
    Linear { intercept: f64, slope: f64 },
    Mean { mean: f64 },
}

impl GrowthCurve {
    pub fn method(&self) -> DetrendMethod {
        match self {
            GrowthCurve::NegativeExponential { .. } => DetrendMethod::NegativeExponential,
            GrowthCurve::Linear { .. } => DetrendMethod::Linear,
            GrowthCurve::Mean { .. } => DetrendMethod::Mean,
        }
    }

    pub fn evaluate(&self, t: f64) -> f64 {
        match *self {
            GrowthCurve::NegativeExponential { a, b, k } => a * (-b * t).exp() + k,
            GrowthCurve::Linear { intercept, slope } => intercept + slope * t,
            GrowthCurve::Mean { mean } => mean,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DetrendFit {
    pub series_id: String,
    pub requested: DetrendMethod,
    pub curve: Option<GrowthCurve>,
    pub fitted: Vec<Option<f64>>,
}

impl DetrendFit {
    pub fn fell_back(&self) -> bool {
        self.curve
            .map(|curve| curve.method() != self.requested)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone)]
pub struct DetrendOutcome {
    /// Ring-width indices, same shape as the input table.
    pub rwi: RingWidthTable,
    pub fits: Vec<DetrendFit>,
}

fn observations(values: &[Option<f64>], origin: usize) -> Vec<(f64, f64)> {
    values
        .iter()
        .enumerate()
        .skip(origin)
        .filter_map(|(idx, value)| value.map(|v| ((idx - origin) as f64, v)))
        .collect()
}

fn fit_mean(points: &[(f64, f64)]) -> Option<GrowthCurve> {
    let ys: Vec<f64> = points.iter().map(|(_, y)| *y).collect();
    let m = mean(&ys)?;
    (m > 0.0).then_some(GrowthCurve::Mean { mean: m })
}

/// Least-squares line, accepted only when the slope is non-positive and the
/// line stays positive over the fitted span.
fn fit_linear(points: &[(f64, f64)]) -> Option<GrowthCurve> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mt = points.iter().map(|(t, _)| t).sum::<f64>() / n;
    let my = points.iter().map(|(_, y)| y).sum::<f64>() / n;
    let stt: f64 = points.iter().map(|(t, _)| (t - mt).powi(2)).sum();
    if stt <= 0.0 {
        return None;
    }
    let sty: f64 = points.iter().map(|(t, y)| (t - mt) * (y - my)).sum();
    let slope = sty / stt;
    let intercept = my - slope * mt;
    let t_max = points.last().map(|(t, _)| *t).unwrap_or(0.0);
    let curve = GrowthCurve::Linear { intercept, slope };
    (slope <= 0.0 && intercept > 0.0 && curve.evaluate(t_max) > 0.0).then_some(curve)
}

/// For a fixed rate `b`, the best `a` and `k` are linear least squares in
/// `exp(-b·t)`. Returns the curve and its SSE when `a > 0` and `k >= 0`.
fn fit_negexp_given_b(points: &[(f64, f64)], b: f64) -> Option<(GrowthCurve, f64)> {
    let n = points.len() as f64;
    let basis: Vec<f64> = points.iter().map(|(t, _)| (-b * t).exp()).collect();
    let me = basis.iter().sum::<f64>() / n;
    let my = points.iter().map(|(_, y)| y).sum::<f64>() / n;
    let see: f64 = basis.iter().map(|e| (e - me).powi(2)).sum();
    if see <= f64::EPSILON {
        return None;
    }
    let sey: f64 = basis
        .iter()
        .zip(points.iter())
        .map(|(e, (_, y))| (e - me) * (y - my))
        .sum();

    let mut a = sey / see;
    let mut k = my - a * me;
    if k < 0.0 {
        // constrained to pass through zero asymptote
        let ee: f64 = basis.iter().map(|e| e * e).sum();
        let ey: f64 = basis.iter().zip(points.iter()).map(|(e, (_, y))| e * y).sum();
        a = ey / ee;
        k = 0.0;
    }
    if a <= 0.0 || !a.is_finite() {
        return None;
    }

    let curve = GrowthCurve::NegativeExponential { a, b, k };
    let sse = points
        .iter()
        .map(|(t, y)| (y - curve.evaluate(*t)).powi(2))
        .sum();
    Some((curve, sse))
}

/// Modified negative exponential `a·exp(-b·t) + k`. The rate is searched on a
/// log grid and refined by golden-section search around the best grid point.
fn fit_negative_exponential(points: &[(f64, f64)]) -> Option<GrowthCurve> {
    if points.len() < 3 {
        return None;
    }
    let sse_at = |ln_b: f64| fit_negexp_given_b(points, ln_b.exp()).map(|(_, sse)| sse);

    let step = (LN_B_MAX - LN_B_MIN) / (GRID_POINTS - 1) as f64;
    let mut best: Option<(usize, f64)> = None;
    for i in 0..GRID_POINTS {
        if let Some(sse) = sse_at(LN_B_MIN + step * i as f64) {
            if best.map(|(_, current)| sse < current).unwrap_or(true) {
                best = Some((i, sse));
            }
        }
    }
    let (best_idx, _) = best?;

    let mut lo = LN_B_MIN + step * best_idx.saturating_sub(1) as f64;
    let mut hi = LN_B_MIN + step * (best_idx + 1).min(GRID_POINTS - 1) as f64;
    let objective = |ln_b: f64| sse_at(ln_b).unwrap_or(f64::INFINITY);
    let mut x1 = hi - GOLDEN * (hi - lo);
    let mut x2 = lo + GOLDEN * (hi - lo);
    let mut f1 = objective(x1);
    let mut f2 = objective(x2);
    for _ in 0..60 {
        if f1 < f2 {
            hi = x2;
            x2 = x1;
            f2 = f1;
            x1 = hi - GOLDEN * (hi - lo);
            f1 = objective(x1);
        } else {
            lo = x1;
            x1 = x2;
            f1 = f2;
            x2 = lo + GOLDEN * (hi - lo);
            f2 = objective(x2);
        }
    }

    let grid_best = LN_B_MIN + step * best_idx as f64;
    let refined = (lo + hi) / 2.0;
    let ln_b = if objective(refined) <= objective(grid_best) {
        refined
    } else {
        grid_best
    };
    fit_negexp_given_b(points, ln_b.exp()).map(|(curve, _)| curve)
}

/// Fits the requested curve, falling back from negative exponential to a
/// declining line and then to the mean.
pub fn fit_curve(values: &[Option<f64>], method: DetrendMethod) -> Option<GrowthCurve> {
    let (origin, _) = span(values)?;
    let points = observations(values, origin);

    match method {
        DetrendMethod::NegativeExponential => fit_negative_exponential(&points)
            .or_else(|| fit_linear(&points))
            .or_else(|| fit_mean(&points)),
        DetrendMethod::Linear => fit_linear(&points).or_else(|| fit_mean(&points)),
        DetrendMethod::Mean => fit_mean(&points),
    }
}

/// Divides a series by its fitted curve. Cells without a measurement or with
/// a non-positive curve value have no index.
pub fn detrend_series(
    values: &[Option<f64>],
    method: DetrendMethod,
) -> (Option<GrowthCurve>, Vec<Option<f64>>, Vec<Option<f64>>) {
    let Some(curve) = fit_curve(values, method) else {
        return (None, vec![None; values.len()], vec![None; values.len()]);
    };
    let origin = span(values).map(|(first, _)| first).unwrap_or(0);

    let mut fitted = vec![None; values.len()];
    let mut rwi = vec![None; values.len()];
    for (idx, value) in values.iter().enumerate() {
        let Some(raw) = value else { continue };
        let t = idx.saturating_sub(origin) as f64;
        let level = curve.evaluate(t);
        fitted[idx] = Some(level);
        if level > 0.0 {
            rwi[idx] = Some(raw / level);
        }
    }
    (Some(curve), fitted, rwi)
}

pub fn detrend_table(table: &RingWidthTable, method: DetrendMethod) -> Result<DetrendOutcome> {
    let mut indices = Vec::with_capacity(table.series_count());
    let mut fits = Vec::with_capacity(table.series_count());

    for (series_id, values) in table.all_series()? {
        let (curve, fitted, rwi) = detrend_series(&values, method);
        match curve {
            Some(curve) if curve.method() != method => warn!(
                series = %series_id,
                requested = method.as_str(),
                used = curve.method().as_str(),
                "detrending fell back to a simpler curve"
            ),
            Some(curve) => debug!(series = %series_id, ?curve, "fitted growth curve"),
            None => warn!(series = %series_id, "no growth curve could be fitted"),
        }
        indices.push((series_id.clone(), rwi));
        fits.push(DetrendFit {
            series_id,
            requested: method,
            curve,
            fitted,
        });
    }

    Ok(DetrendOutcome {
        rwi: table.with_series(indices)?,
        fits,
    })
}

/// One row per series describing the fitted curve.
pub fn fits_frame(fits: &[DetrendFit]) -> PolarsResult<DataFrame> {
    let mut ids = Vec::with_capacity(fits.len());
    let mut methods: Vec<Option<&str>> = Vec::with_capacity(fits.len());
    let mut p1 = Vec::with_capacity(fits.len());
    let mut p2 = Vec::with_capacity(fits.len());
    let mut p3 = Vec::with_capacity(fits.len());

    for fit in fits {
        ids.push(fit.series_id.as_str());
        methods.push(fit.curve.map(|curve| curve.method().as_str()));
        let (a, b, c) = match fit.curve {
            Some(GrowthCurve::NegativeExponential { a, b, k }) => (Some(a), Some(b), Some(k)),
            Some(GrowthCurve::Linear { intercept, slope }) => (Some(intercept), Some(slope), None),
            Some(GrowthCurve::Mean { mean }) => (Some(mean), None, None),
            None => (None, None, None),
        };
        p1.push(a);
        p2.push(b);
        p3.push(c);
    }

    DataFrame::new(vec![
        Series::new("series".into(), ids).into(),
        Series::new("curve".into(), methods).into(),
        Series::new("param_1".into(), p1).into(),
        Series::new("param_2".into(), p2).into(),
        Series::new("param_3".into(), p3).into(),
    ])
}

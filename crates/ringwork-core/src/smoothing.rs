/// Hanning window weights of odd length `n`.
pub fn hanning_weights(n: usize) -> Vec<f64> {
    (0..n)
        .map(|j| 0.5 - 0.5 * (2.0 * std::f64::consts::PI * (j + 1) as f64 / (n + 1) as f64).cos())
        .collect()
}

/// Centred Hanning low-pass filter. Neighbours that are missing or beyond
/// the ends are left out and the remaining weights renormalised; missing
/// centre values stay missing.
pub fn hanning_smooth(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    if window <= 1 {
        return values.to_vec();
    }
    let weights = hanning_weights(window);
    let half = window / 2;

    values
        .iter()
        .enumerate()
        .map(|(idx, centre)| {
            centre.as_ref()?;
            let mut total = 0.0;
            let mut weight_sum = 0.0;
            for (offset, weight) in weights.iter().enumerate() {
                let Some(position) = (idx + offset).checked_sub(half) else {
                    continue;
                };
                if let Some(Some(value)) = values.get(position) {
                    total += weight * value;
                    weight_sum += weight;
                }
            }
            (weight_sum > 0.0).then(|| total / weight_sum)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_are_symmetric_and_peak_in_the_centre() {
        let weights = hanning_weights(7);
        assert_eq!(weights.len(), 7);
        assert!((weights[0] - weights[6]).abs() < 1e-12);
        assert!(weights[3] > weights[2]);
        assert!((weights[3] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn constant_series_is_unchanged() {
        let values = vec![Some(2.0); 20];
        let smoothed = hanning_smooth(&values, 7);
        assert!(smoothed.iter().all(|v| (v.unwrap() - 2.0).abs() < 1e-12));
    }

    #[test]
    fn dampens_alternating_signal_and_keeps_gaps() {
        let mut values: Vec<Option<f64>> = (0..30)
            .map(|i| Some(if i % 2 == 0 { 1.5 } else { 0.5 }))
            .collect();
        values[10] = None;
        let smoothed = hanning_smooth(&values, 9);
        assert!(smoothed[10].is_none());
        assert!((smoothed[20].unwrap() - 1.0).abs() < 0.1);
    }
}

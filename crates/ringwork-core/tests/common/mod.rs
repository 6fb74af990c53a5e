#![allow(dead_code)]

use ringwork_core::RingWidthTable;

/// Deterministic uniform noise in `[-0.5, 0.5)`.
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub fn noise(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 33) as f64 / 2f64.powi(31) - 0.5
    }
}

pub const FIRST_YEAR: i32 = 1800;

pub fn growth_curve(t: usize) -> f64 {
    1.5 * (-0.02 * t as f64).exp() + 0.5
}

/// Series sharing one annual signal on a declining age trend. Ids listed in
/// `noise_ids` get their own signal instead.
pub fn synthetic_series(
    n_series: usize,
    n_years: usize,
    seed: u64,
    noise_ids: &[usize],
) -> Vec<(String, Vec<Option<f64>>)> {
    let mut common = Lcg::new(seed);
    let signal: Vec<f64> = (0..n_years).map(|_| common.noise()).collect();

    (0..n_series)
        .map(|i| {
            let mut own = Lcg::new(seed + 1 + i as u64);
            let error: Vec<f64> = (0..n_years).map(|_| own.noise()).collect();
            let driver: Vec<f64> = if noise_ids.contains(&i) {
                (0..n_years).map(|_| own.noise()).collect()
            } else {
                signal.clone()
            };
            let values = (0..n_years)
                .map(|t| Some(growth_curve(t) * (1.0 + 0.6 * driver[t] + 0.2 * error[t])))
                .collect();
            (format!("S{i:02}"), values)
        })
        .collect()
}

pub fn years(n_years: usize) -> Vec<i32> {
    (FIRST_YEAR..FIRST_YEAR + n_years as i32).collect()
}

pub fn synthetic_table(n_series: usize, n_years: usize, seed: u64) -> RingWidthTable {
    RingWidthTable::from_columns(
        years(n_years),
        synthetic_series(n_series, n_years, seed, &[]),
    )
    .unwrap()
}

pub fn table_to_csv(table: &RingWidthTable) -> String {
    let years = table.years().unwrap();
    let series = table.all_series().unwrap();
    let mut out = String::from("year");
    for (id, _) in &series {
        out.push(',');
        out.push_str(id);
    }
    out.push('\n');
    for (idx, year) in years.iter().enumerate() {
        out.push_str(&year.to_string());
        for (_, values) in &series {
            out.push(',');
            if let Some(value) = values[idx] {
                out.push_str(&format!("{value:.4}"));
            } else {
                out.push_str("NA");
            }
        }
        out.push('\n');
    }
    out
}

//! Small numerical utilities shared across the crate.
//!
//! All statistics here use numerically stable one-pass algorithms; quantiles
//! use linear interpolation over the sorted sample so percentile bands are
//! continuous in the sample values.

/// Numerical safety constants.
pub mod constants {
    /// Minimum variance treated as non-degenerate.
    pub const MIN_VARIANCE: f64 = 1e-15;

    /// Regularization added to covariance diagonals during HMM fitting.
    pub const COVARIANCE_REGULARIZATION: f64 = 1e-6;

    /// Floor for probability mass before renormalization.
    pub const MIN_PROBABILITY: f64 = 1e-100;

    /// Trading days per year; the simulation time step is its reciprocal.
    pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
}

/// Arithmetic mean. Returns 0.0 for an empty slice.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Sample variance via Welford's one-pass algorithm.
///
/// Returns 0.0 for fewer than two observations.
pub fn sample_variance(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }

    let mut count = 0.0;
    let mut running_mean = 0.0;
    let mut m2 = 0.0;

    for &x in data {
        count += 1.0;
        let delta = x - running_mean;
        running_mean += delta / count;
        m2 += delta * (x - running_mean);
    }

    m2 / (count - 1.0)
}

/// Sample standard deviation.
pub fn sample_std(data: &[f64]) -> f64 {
    sample_variance(data).sqrt()
}

/// Trailing rolling standard deviation of `data` over `window` observations.
///
/// Positions before the first full window are back-filled with the first
/// computable value, so the output is aligned one-to-one with the input and
/// never contains undefined entries. Returns an empty vector if the input is
/// shorter than the window.
pub fn trailing_volatility(data: &[f64], window: usize) -> Vec<f64> {
    if window == 0 || data.len() < window {
        return Vec::new();
    }

    let mut vols = vec![0.0; data.len()];
    for t in (window - 1)..data.len() {
        vols[t] = sample_std(&data[t + 1 - window..=t]);
    }

    // Back-fill the warm-up region with the first computable value.
    let first = vols[window - 1];
    for v in vols.iter_mut().take(window - 1) {
        *v = first;
    }

    vols
}

/// Empirical quantile with linear interpolation (q in [0, 1]).
///
/// Returns `None` for an empty sample.
pub fn quantile(data: &[f64], q: f64) -> Option<f64> {
    if data.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }

    let mut sorted: Vec<f64> = data.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    if lower == upper {
        return Some(sorted[lower]);
    }
    let frac = pos - lower as f64;
    Some(sorted[lower] * (1.0 - frac) + sorted[upper] * frac)
}

//! Synthetic price-series generators for testing and validation.
//!
//! These produce daily series with known dynamics so that model behavior can
//! be checked against ground truth: plain geometric Brownian motion, and a
//! block regime-switching variant whose volatility alternates between a calm
//! and a turbulent level.

use crate::errors::MarketResult;
use crate::price_series::PriceSeries;
use crate::sim_rng::SimRng;
use chrono::NaiveDate;

fn start_date() -> NaiveDate {
    // Fixed anchor so generated series are fully determined by the config.
    NaiveDate::from_ymd_opt(2020, 1, 2).unwrap()
}

/// Configuration for geometric Brownian motion series generation.
#[derive(Debug, Clone)]
pub struct GbmSeriesConfig {
    /// Number of daily observations
    pub length: usize,
    /// First close
    pub start_price: f64,
    /// Daily log-return drift
    pub daily_drift: f64,
    /// Daily log-return volatility
    pub daily_volatility: f64,
    /// Seed for the generator
    pub seed: u64,
}

impl Default for GbmSeriesConfig {
    fn default() -> Self {
        Self {
            length: 500,
            start_price: 100.0,
            daily_drift: 2e-4,
            daily_volatility: 0.01,
            seed: 42,
        }
    }
}

/// Generate a daily GBM price series.
pub fn gbm_series(config: &GbmSeriesConfig) -> MarketResult<PriceSeries> {
    let mut rng = SimRng::with_seed(config.seed);
    let mut price = config.start_price;
    let mut points = Vec::with_capacity(config.length);

    for day in 0..config.length {
        if day > 0 {
            let log_return =
                config.daily_drift + config.daily_volatility * rng.standard_normal();
            price *= log_return.exp();
        }
        points.push((start_date() + chrono::Duration::days(day as i64), price));
    }

    PriceSeries::from_pairs(points)
}

/// Configuration for block regime-switching series generation.
#[derive(Debug, Clone)]
pub struct RegimeSwitchingConfig {
    /// (daily drift, daily volatility) of the calm blocks
    pub calm: (f64, f64),
    /// (daily drift, daily volatility) of the turbulent blocks
    pub turbulent: (f64, f64),
    /// Observations per block
    pub block_length: usize,
    /// Total number of alternating blocks, starting calm
    pub blocks: usize,
    /// First close
    pub start_price: f64,
    /// Seed for the generator
    pub seed: u64,
}

impl Default for RegimeSwitchingConfig {
    fn default() -> Self {
        Self {
            calm: (3e-4, 0.006),
            turbulent: (-5e-4, 0.03),
            block_length: 60,
            blocks: 8,
            start_price: 100.0,
            seed: 42,
        }
    }
}

/// Generate a series whose volatility alternates between two levels.
pub fn regime_switching_series(config: &RegimeSwitchingConfig) -> MarketResult<PriceSeries> {
    let mut rng = SimRng::with_seed(config.seed);
    let mut price = config.start_price;
    let mut points = Vec::with_capacity(config.block_length * config.blocks);
    let mut day = 0i64;

    for block in 0..config.blocks {
        let (drift, volatility) = if block % 2 == 0 {
            config.calm
        } else {
            config.turbulent
        };
        for i in 0..config.block_length {
            if !(block == 0 && i == 0) {
                let log_return = drift + volatility * rng.standard_normal();
                price *= log_return.exp();
            }
            points.push((start_date() + chrono::Duration::days(day), price));
            day += 1;
        }
    }

    PriceSeries::from_pairs(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math_utils::sample_std;

    #[test]
    fn test_gbm_series_is_reproducible() {
        let config = GbmSeriesConfig::default();
        let a = gbm_series(&config).unwrap();
        let b = gbm_series(&config).unwrap();
        assert_eq!(a.closes(), b.closes());
        assert_eq!(a.len(), 500);
        assert_eq!(a.points()[0].close, 100.0);
    }

    #[test]
    fn test_gbm_series_volatility_is_in_the_right_range() {
        let series = gbm_series(&GbmSeriesConfig {
            length: 4000,
            daily_volatility: 0.02,
            ..Default::default()
        })
        .unwrap();
        let returns = series.simple_returns();
        let realized = sample_std(&returns);
        assert!(
            (realized - 0.02).abs() < 0.004,
            "realized volatility {} far from 0.02",
            realized
        );
    }

    #[test]
    fn test_regime_switching_blocks_have_distinct_volatility() {
        let config = RegimeSwitchingConfig::default();
        let series = regime_switching_series(&config).unwrap();
        assert_eq!(series.len(), config.block_length * config.blocks);

        let returns = series.simple_returns();
        let calm_vol = sample_std(&returns[5..55]);
        let turbulent_vol = sample_std(&returns[65..115]);
        assert!(
            turbulent_vol > 2.0 * calm_vol,
            "turbulent {} vs calm {}",
            turbulent_vol,
            calm_vol
        );
    }
}

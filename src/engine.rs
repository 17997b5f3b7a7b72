//! Generative market model: calibration and Monte Carlo path simulation.
//!
//! [`GenerativeEngine::fit`] runs the state-space filter over log-prices and
//! the regime detector over simple returns, producing an immutable
//! [`FitResult`] snapshot. Simulation borrows a `FitResult` explicitly, so
//! two sequential fits inside one analysis can never contaminate each other
//! and a path set can never be generated from a stale or absent calibration
//! by construction.
//!
//! The regime is frozen at simulation start: the volatility multiplier
//! implied by the current regime applies over the whole horizon rather than
//! being re-sampled day by day from the transition matrix. This is a
//! deliberate first-order simplification of the dynamics.

use crate::config::EngineConfig;
use crate::errors::{MarketAnalysisError, MarketResult};
use crate::math_utils::{constants, quantile};
use crate::price_series::PriceSeries;
use crate::regime_detection::{RegimeDetector, RegimeLabel};
use crate::sim_rng::SimRng;
use crate::state_space::StateSpaceModel;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Immutable calibration snapshot produced by one `fit` call.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FitResult {
    /// Last observed close
    pub last_price: f64,
    /// Filtered log-price trend at the final step
    pub last_trend: f64,
    /// Filtered trend velocity at the final step (daily log drift)
    pub last_velocity: f64,
    /// Standard deviation of filter innovations over the fitted window
    pub resid_std: f64,
    /// Regime assigned to the final time step
    pub regime: RegimeLabel,
    /// HMM log-likelihood, as a calibration diagnostic
    pub log_likelihood: f64,
    /// Number of observations the fit consumed
    pub n_observations: usize,
    /// Seed that simulations from this fit will use
    seed: u64,
}

/// Matrix of simulated price paths.
///
/// Row-major storage, `paths_count` rows by `n_days + 1` columns; column 0
/// is always the start price.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SimulatedPathSet {
    n_paths: usize,
    n_days: usize,
    data: Vec<f64>,
}

/// Percentile band of the simulated distribution at one day.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BandPoint {
    /// Day offset from simulation start (0 = start price)
    pub day: usize,
    /// 10th percentile price
    pub p10: f64,
    /// Median price
    pub p50: f64,
    /// 90th percentile price
    pub p90: f64,
}

impl SimulatedPathSet {
    /// Number of simulated paths.
    pub fn paths_count(&self) -> usize {
        self.n_paths
    }

    /// Simulated horizon in days (columns minus the start column).
    pub fn horizon_days(&self) -> usize {
        self.n_days
    }

    /// One full path including the start price column.
    pub fn path(&self, index: usize) -> &[f64] {
        let width = self.n_days + 1;
        &self.data[index * width..(index + 1) * width]
    }

    /// Price distribution across paths at a given day offset.
    pub fn day_prices(&self, day: usize) -> Vec<f64> {
        let width = self.n_days + 1;
        (0..self.n_paths).map(|p| self.data[p * width + day]).collect()
    }

    /// Terminal-day price distribution.
    pub fn terminal_prices(&self) -> Vec<f64> {
        self.day_prices(self.n_days)
    }

    /// p10/p50/p90 band at a given day offset.
    pub fn band(&self, day: usize) -> BandPoint {
        let dist = self.day_prices(day);
        // Invariant: paths_count >= 1, so the quantiles exist.
        BandPoint {
            day,
            p10: quantile(&dist, 0.1).unwrap_or(f64::NAN),
            p50: quantile(&dist, 0.5).unwrap_or(f64::NAN),
            p90: quantile(&dist, 0.9).unwrap_or(f64::NAN),
        }
    }

    /// Up to `limit` full paths for visualization.
    pub fn sample_paths(&self, limit: usize) -> Vec<Vec<f64>> {
        (0..self.n_paths.min(limit)).map(|p| self.path(p).to_vec()).collect()
    }
}

/// Orchestrates calibration of both latent models and forward simulation.
#[derive(Debug, Clone)]
pub struct GenerativeEngine {
    config: EngineConfig,
}

impl Default for GenerativeEngine {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }
}

impl GenerativeEngine {
    /// Engine with a validated configuration.
    pub fn new(config: EngineConfig) -> MarketResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The engine's configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Calibrate both latent models against a price history.
    ///
    /// Runs the Kalman filter on log-prices and the regime detector on
    /// simple returns of the same series. The returned snapshot is the only
    /// handle simulation accepts.
    pub fn fit(&self, prices: &PriceSeries) -> MarketResult<FitResult> {
        let state_space =
            StateSpaceModel::new(self.config.process_noise, self.config.measurement_noise)?;
        let ssm_fit = state_space.fit(&prices.log_closes())?;

        let returns = prices.simple_returns();
        let detector = RegimeDetector::from_config(&self.config);
        let regime_model = detector.fit(&returns)?;
        let labels = regime_model.predict_regime(&returns)?;
        // labels is nonempty: the detector rejects series shorter than the
        // volatility window, which is >= 2.
        let regime = labels[labels.len() - 1];

        Ok(FitResult {
            last_price: prices.last_close(),
            last_trend: ssm_fit.last_trend(),
            last_velocity: ssm_fit.last_velocity(),
            resid_std: ssm_fit.residual_std(),
            regime,
            log_likelihood: regime_model.log_likelihood(),
            n_observations: prices.len(),
            seed: self.config.seed,
        })
    }

    /// Simulate regime-conditioned geometric Brownian motion paths.
    ///
    /// Drift is the fitted trend velocity; volatility is the innovation
    /// standard deviation scaled by the current regime's multiplier, frozen
    /// over the horizon. Each path draws from its own derived RNG stream,
    /// so the ensemble is reproducible for a fixed seed regardless of
    /// evaluation order.
    pub fn generate_paths(
        &self,
        fit: &FitResult,
        start_price: f64,
        n_days: usize,
        paths_count: usize,
    ) -> MarketResult<SimulatedPathSet> {
        if !start_price.is_finite() || start_price <= 0.0 {
            return Err(MarketAnalysisError::InvalidParameter {
                parameter: "start_price".to_string(),
                value: start_price,
                constraint: "> 0".to_string(),
            });
        }
        if n_days == 0 {
            return Err(MarketAnalysisError::InvalidParameter {
                parameter: "n_days".to_string(),
                value: 0.0,
                constraint: ">= 1".to_string(),
            });
        }
        if paths_count == 0 {
            return Err(MarketAnalysisError::InvalidParameter {
                parameter: "paths_count".to_string(),
                value: 0.0,
                constraint: ">= 1".to_string(),
            });
        }

        let mu = fit.last_velocity;
        let sigma = fit.resid_std * fit.regime.volatility_multiplier();
        let dt = 1.0 / constants::TRADING_DAYS_PER_YEAR;

        let drift = (mu - 0.5 * sigma * sigma) * dt;
        let diffusion = sigma * dt.sqrt();

        let width = n_days + 1;
        let mut data = vec![0.0; paths_count * width];

        for path in 0..paths_count {
            let mut rng = SimRng::derive_stream(fit.seed, path as u64);
            let row = path * width;
            data[row] = start_price;

            let mut cum_log_return = 0.0;
            for day in 1..=n_days {
                cum_log_return += drift + diffusion * rng.standard_normal();
                data[row + day] = start_price * cum_log_return.exp();
            }
        }

        Ok(SimulatedPathSet {
            n_paths: paths_count,
            n_days,
            data,
        })
    }
}

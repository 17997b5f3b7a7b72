//! Configuration structures for model calibration and analysis requests.
//!
//! All bounds are enforced eagerly through `validate()` before any
//! computation begins, so a malformed request can never reach the numerical
//! code.

use crate::errors::{validate_parameter, MarketAnalysisError, MarketResult};
use chrono::NaiveDate;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Supported forward-simulation horizon in trading days.
pub const HORIZON_BOUNDS: (usize, usize) = (1, 756);

/// Supported Monte Carlo path counts.
pub const PATHS_BOUNDS: (usize, usize) = (500, 20_000);

/// Supported regime counts for the HMM.
pub const REGIME_BOUNDS: (usize, usize) = (2, 8);

/// Calibration parameters for the generative engine.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EngineConfig {
    /// Kalman process noise q; Q = diag(q, q)
    pub process_noise: f64,
    /// Kalman measurement noise r
    pub measurement_noise: f64,
    /// Number of HMM regimes (K)
    pub num_regimes: usize,
    /// Iteration budget for Baum-Welch EM
    pub max_em_iterations: usize,
    /// Trailing window for the volatility feature
    pub volatility_window: usize,
    /// Seed for HMM initialization and path simulation
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            process_noise: 1e-4,
            measurement_noise: 1e-3,
            num_regimes: 3,
            max_em_iterations: 100,
            volatility_window: 5,
            seed: 42,
        }
    }
}

impl EngineConfig {
    /// Validate all calibration parameters.
    pub fn validate(&self) -> MarketResult<()> {
        if !self.process_noise.is_finite() || self.process_noise <= 0.0 {
            return Err(MarketAnalysisError::InvalidParameter {
                parameter: "process_noise".to_string(),
                value: self.process_noise,
                constraint: "> 0".to_string(),
            });
        }
        if !self.measurement_noise.is_finite() || self.measurement_noise <= 0.0 {
            return Err(MarketAnalysisError::InvalidParameter {
                parameter: "measurement_noise".to_string(),
                value: self.measurement_noise,
                constraint: "> 0".to_string(),
            });
        }
        validate_parameter(
            self.num_regimes as f64,
            REGIME_BOUNDS.0 as f64,
            REGIME_BOUNDS.1 as f64,
            "num_regimes",
        )?;
        if self.max_em_iterations == 0 {
            return Err(MarketAnalysisError::InvalidParameter {
                parameter: "max_em_iterations".to_string(),
                value: 0.0,
                constraint: ">= 1".to_string(),
            });
        }
        if self.volatility_window < 2 {
            return Err(MarketAnalysisError::InvalidParameter {
                parameter: "volatility_window".to_string(),
                value: self.volatility_window as f64,
                constraint: ">= 2".to_string(),
            });
        }
        Ok(())
    }
}

/// One ex-ante analysis request.
///
/// `buy_price` and `current_price` override resolution from the series when
/// provided; otherwise the buy price is resolved at `buy_date` (with a
/// fallback flag when the exact date is absent) and the current price is the
/// last close.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AnalysisRequest {
    /// Purchase date under evaluation
    pub buy_date: NaiveDate,
    /// Explicit purchase price, if known
    pub buy_price: Option<f64>,
    /// Explicit current price; defaults to the last close
    pub current_price: Option<f64>,
    /// Forward simulation horizon for bands and risk statistics
    pub horizon: usize,
    /// Number of Monte Carlo paths per simulation
    pub paths: usize,
    /// Confidence level for VaR / expected shortfall
    pub confidence: f64,
    /// Mean-variance risk aversion lambda
    pub risk_aversion: f64,
    /// Drawdown threshold (fraction of start price)
    pub drawdown_pct: f64,
    /// Target return threshold (fraction of start price)
    pub target_pct: f64,
}

impl AnalysisRequest {
    /// Request with the default run parameters for a given buy date.
    pub fn new(buy_date: NaiveDate) -> Self {
        Self {
            buy_date,
            buy_price: None,
            current_price: None,
            horizon: 252,
            paths: 2000,
            confidence: 0.95,
            risk_aversion: 0.5,
            drawdown_pct: 0.1,
            target_pct: 0.1,
        }
    }

    /// Validate all request parameters against the supported bounds.
    pub fn validate(&self) -> MarketResult<()> {
        validate_parameter(
            self.horizon as f64,
            HORIZON_BOUNDS.0 as f64,
            HORIZON_BOUNDS.1 as f64,
            "horizon",
        )?;
        validate_parameter(
            self.paths as f64,
            PATHS_BOUNDS.0 as f64,
            PATHS_BOUNDS.1 as f64,
            "paths",
        )?;
        if !self.confidence.is_finite() || self.confidence <= 0.0 || self.confidence >= 1.0 {
            return Err(MarketAnalysisError::InvalidParameter {
                parameter: "confidence".to_string(),
                value: self.confidence,
                constraint: "(0, 1)".to_string(),
            });
        }
        if !self.risk_aversion.is_finite() || self.risk_aversion <= 0.0 {
            return Err(MarketAnalysisError::InvalidParameter {
                parameter: "risk_aversion".to_string(),
                value: self.risk_aversion,
                constraint: "> 0".to_string(),
            });
        }
        validate_parameter(self.drawdown_pct, 0.0, 1.0, "drawdown_pct")?;
        if !self.target_pct.is_finite() {
            return Err(MarketAnalysisError::InvalidParameter {
                parameter: "target_pct".to_string(),
                value: self.target_pct,
                constraint: "finite".to_string(),
            });
        }
        for (name, px) in [("buy_price", self.buy_price), ("current_price", self.current_price)] {
            if let Some(px) = px {
                if !px.is_finite() || px <= 0.0 {
                    return Err(MarketAnalysisError::InvalidParameter {
                        parameter: name.to_string(),
                        value: px,
                        constraint: "> 0".to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Fixed decision-protocol parameters for the ex-ante analyzer.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AnalyzerConfig {
    /// Minimum pre-buy observations required to calibrate
    pub min_calibration_window: usize,
    /// Forward horizon (trading days) for the hold/sell comparison
    pub decision_horizon: usize,
    /// Annual risk-free rate used for the sell branch
    pub risk_free_rate: f64,
    /// Maximum number of forward paths returned for visualization
    pub path_sample_size: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            min_calibration_window: 252,
            decision_horizon: 60,
            risk_free_rate: 0.05,
            path_sample_size: 50,
        }
    }
}

impl AnalyzerConfig {
    /// Validate the protocol parameters.
    pub fn validate(&self) -> MarketResult<()> {
        if self.min_calibration_window < 2 {
            return Err(MarketAnalysisError::InvalidParameter {
                parameter: "min_calibration_window".to_string(),
                value: self.min_calibration_window as f64,
                constraint: ">= 2".to_string(),
            });
        }
        validate_parameter(
            self.decision_horizon as f64,
            HORIZON_BOUNDS.0 as f64,
            HORIZON_BOUNDS.1 as f64,
            "decision_horizon",
        )?;
        validate_parameter(self.risk_free_rate, 0.0, 1.0, "risk_free_rate")?;
        Ok(())
    }
}

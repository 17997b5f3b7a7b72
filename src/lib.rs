//! # Ex-Ante Finance
//!
//! Generative market model for retrospective and prospective evaluation of a
//! single investment decision. Given a historical price series, a past buy
//! date/price, and the current price, the crate decomposes the realized
//! outcome into market-path luck versus a forward-looking hold/sell
//! recommendation.
//!
//! ## Key Components
//!
//! - **State-Space Trend Extraction**: local-linear-trend Kalman filter
//!   recovering latent trend, velocity, and innovations from log-prices
//! - **Regime Classification**: K-state full-covariance Gaussian HMM over
//!   return/volatility features with rank-stable canonical labels
//! - **Monte Carlo Simulation**: regime-conditioned geometric Brownian
//!   motion with reproducible per-path random streams
//! - **Ex-Ante Decision Engine**: no-lookahead luck scoring and a
//!   certainty-equivalent hold/sell verdict with full risk statistics
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use exante_finance::{AnalysisRequest, ExAnteAnalyzer, PriceSeries};
//! use chrono::NaiveDate;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Daily closes from your data source, oldest first.
//!     let history = PriceSeries::from_pairs(
//!         (0..500).map(|i| {
//!             let date = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
//!                 + chrono::Duration::days(i);
//!             (date, 100.0 + i as f64 * 0.1)
//!         }),
//!     )?;
//!
//!     let request = AnalysisRequest::new(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
//!     let result = ExAnteAnalyzer::default().run(&history, &request)?;
//!
//!     println!("luck score: {:.2}", result.luck_score);
//!     println!("verdict:    {}", result.verdict);
//!     println!("{}", result.decision_text);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! Data flows one way: raw price series → fitted latent states and regimes
//! → simulated path ensembles → scalar decision statistics. Calibration
//! snapshots are immutable [`FitResult`] values threaded explicitly through
//! the pipeline, so the two sequential fits of an ex-ante analysis can never
//! bleed into each other.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod config;
pub mod errors;
pub mod math_utils;
pub mod price_series;
pub mod sim_rng;

// Models
pub mod emission;
pub mod hmm_core;
pub mod regime_detection;
pub mod state_space;

// Simulation and decision logic
pub mod analyzer;
pub mod engine;
pub mod generators;
pub mod results;

// Re-exports for convenience - main public API
pub use analyzer::ExAnteAnalyzer;
pub use config::{AnalysisRequest, AnalyzerConfig, EngineConfig};
pub use errors::{MarketAnalysisError, MarketResult};
pub use price_series::{PricePoint, PriceSeries, ResolvedBuy};
pub use results::{AnalysisResult, AnalysisStatus, CeComparison, RiskStats, Verdict};

pub use engine::{BandPoint, FitResult, GenerativeEngine, SimulatedPathSet};
pub use regime_detection::{RegimeDetector, RegimeLabel, RegimeModel, RegimeParams};
pub use state_space::{LatentState, StateSpaceFit, StateSpaceModel};

pub use generators::{
    gbm_series, regime_switching_series, GbmSeriesConfig, RegimeSwitchingConfig,
};

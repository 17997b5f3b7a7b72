//! Result structures for the ex-ante analysis.
//!
//! Everything the decision engine reports lives here: the luck/verdict pair,
//! the certainty-equivalent comparison, forward percentile bands, and risk
//! statistics computed from the simulated path distribution.

use crate::engine::BandPoint;
use crate::price_series::ResolvedBuy;
use crate::regime_detection::RegimeLabel;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Hold/sell recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Verdict {
    /// Certainty equivalent of holding exceeds selling
    Hold,
    /// Selling at the risk-free rate dominates
    Sell,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Hold => write!(f, "HOLD"),
            Verdict::Sell => write!(f, "SELL"),
        }
    }
}

/// Outcome class of an analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AnalysisStatus {
    /// Full pipeline ran; all statistics are model-derived
    Calibrated,
    /// Too little pre-buy history to calibrate; neutral fallback returned
    InsufficientHistory,
    /// No observations after the buy date yet; nothing to evaluate
    TooSoonToEvaluate,
}

/// Certainty-equivalent comparison between holding and selling.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CeComparison {
    /// Mean-variance certainty equivalent of holding over the decision horizon
    pub ce_hold: f64,
    /// Risk-free value of selling now, simple interest over the same horizon
    pub ce_sell: f64,
    /// ce_hold - ce_sell
    pub delta_ce: f64,
    /// Fraction of simulated forward outcomes that beat the risk-free value
    pub prob_hold_beats_sell: f64,
}

/// Risk statistics computed from the simulated forward distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RiskStats {
    /// Fraction of paths whose terminal return reaches the target threshold
    pub prob_target: f64,
    /// Fraction of paths whose running minimum breaches the drawdown threshold
    pub prob_drawdown: f64,
    /// Value at risk over the horizon, as a positive loss fraction
    pub value_at_risk: f64,
    /// Expected shortfall beyond the VaR level, as a positive loss fraction
    pub expected_shortfall: f64,
    /// Confidence level the tail statistics were computed at
    pub confidence: f64,
    /// (current - buy) / buy; always computed, even on fallback results
    pub realized_return: f64,
    /// Trading days between buy date and the end of the series
    pub elapsed_trading_days: usize,
    /// Percentile of the realized outcome in the counterfactual distribution
    pub percentile_elapsed: f64,
}

impl RiskStats {
    /// Neutral statistics for fallback results, with the realized fields
    /// still filled in.
    pub(crate) fn fallback(
        realized_return: f64,
        elapsed_trading_days: usize,
        confidence: f64,
    ) -> Self {
        Self {
            prob_target: 0.5,
            prob_drawdown: 0.5,
            value_at_risk: 0.0,
            expected_shortfall: 0.0,
            confidence,
            realized_return,
            elapsed_trading_days,
            percentile_elapsed: 0.5,
        }
    }
}

/// Complete output of one ex-ante analysis.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AnalysisResult {
    /// Outcome class; fallback statuses carry neutral statistics
    pub status: AnalysisStatus,
    /// Empirical percentile of the realized outcome, in [0, 1]
    pub luck_score: f64,
    /// Hold/sell recommendation
    pub verdict: Verdict,
    /// Certainty-equivalent comparison behind the verdict
    pub ce: CeComparison,
    /// Current regime from the full-history fit, when calibrated
    pub regime: Option<RegimeLabel>,
    /// Forward percentile bands at reduced cadence across the horizon
    pub bands: Vec<BandPoint>,
    /// Risk statistics from the simulated distribution
    pub risk: RiskStats,
    /// Purchase price resolution, including the fallback flag
    pub buy: ResolvedBuy,
    /// Price the analysis evaluated against
    pub current_price: f64,
    /// Human-readable rationale for the verdict
    pub decision_text: String,
    /// Bounded sample of forward paths for visualization
    pub forward_paths: Vec<Vec<f64>>,
}

//! Ex-ante luck-vs-skill analysis.
//!
//! The analyzer evaluates a past buy decision with information available at
//! the time of purchase, then makes a forward-looking hold/sell call with
//! information available now. Two separate calibrations back those two
//! questions, threaded through the pipeline as explicit immutable
//! [`FitResult`](crate::engine::FitResult) values:
//!
//! 1. fit on pre-buy history only (strict no-lookahead), simulate the
//!    elapsed window from the buy price, and rank the realized outcome
//!    inside that counterfactual distribution to obtain the luck score;
//! 2. fit on the full history, simulate a fixed decision horizon from the
//!    current price, and compare the certainty equivalent of holding with
//!    risk-free proceeds from selling.
//!
//! Thin histories and too-recent purchases return distinguishable fallback
//! results rather than errors.

use crate::config::{AnalysisRequest, AnalyzerConfig, EngineConfig};
use crate::engine::{BandPoint, GenerativeEngine, SimulatedPathSet};
use crate::errors::MarketResult;
use crate::math_utils::{constants, mean, quantile, sample_std};
use crate::price_series::{PriceSeries, ResolvedBuy};
use crate::results::{AnalysisResult, AnalysisStatus, CeComparison, RiskStats, Verdict};

/// Luck-vs-skill decision engine.
#[derive(Debug, Clone)]
pub struct ExAnteAnalyzer {
    engine: GenerativeEngine,
    config: AnalyzerConfig,
}

impl Default for ExAnteAnalyzer {
    fn default() -> Self {
        Self {
            engine: GenerativeEngine::default(),
            config: AnalyzerConfig::default(),
        }
    }
}

impl ExAnteAnalyzer {
    /// Analyzer with validated engine and protocol configuration.
    pub fn new(engine_config: EngineConfig, config: AnalyzerConfig) -> MarketResult<Self> {
        config.validate()?;
        Ok(Self {
            engine: GenerativeEngine::new(engine_config)?,
            config,
        })
    }

    /// Run the full ex-ante pipeline for one buy decision.
    ///
    /// The pipeline holds no state between calls; every invocation re-fits
    /// both calibrations from scratch.
    pub fn run(
        &self,
        full_history: &PriceSeries,
        request: &AnalysisRequest,
    ) -> MarketResult<AnalysisResult> {
        request.validate()?;

        let buy = match request.buy_price {
            Some(price) => ResolvedBuy {
                price,
                date: request.buy_date,
                used_fallback: false,
            },
            None => full_history.resolve_buy_price(request.buy_date),
        };
        let current_price = request
            .current_price
            .unwrap_or_else(|| full_history.last_close());
        let realized_return = (current_price - buy.price) / buy.price;
        let elapsed = full_history.count_after(request.buy_date);

        // Step 1: pre-buy slice; thin history short-circuits to a neutral
        // fallback instead of an error.
        let pre_buy = full_history.slice_on_or_before(request.buy_date);
        let actual = pre_buy.as_ref().map(|s| s.len()).unwrap_or(0);
        let pre_buy = match pre_buy {
            Some(s) if s.len() >= self.config.min_calibration_window => s,
            _ => {
                return Ok(self.fallback_result(
                    AnalysisStatus::InsufficientHistory,
                    buy,
                    current_price,
                    realized_return,
                    elapsed,
                    request.confidence,
                    format!(
                        "Insufficient pre-buy history to calibrate ({} of {} required observations); returning neutral verdict.",
                        actual, self.config.min_calibration_window
                    ),
                ));
            }
        };

        if elapsed < 1 {
            return Ok(self.fallback_result(
                AnalysisStatus::TooSoonToEvaluate,
                buy,
                current_price,
                realized_return,
                elapsed,
                request.confidence,
                "No observations after the buy date yet; too soon to evaluate.".to_string(),
            ));
        }

        // Step 2: calibrate on pre-buy data only. Nothing after the buy
        // date influences this fit.
        let fit_pre = self.engine.fit(&pre_buy)?;

        // Steps 3-5: counterfactual simulation of the elapsed window and the
        // realized outcome's percentile inside it.
        let elapsed_paths =
            self.engine
                .generate_paths(&fit_pre, buy.price, elapsed, request.paths)?;
        let counterfactual = elapsed_paths.terminal_prices();
        let below = counterfactual.iter().filter(|&&p| p < current_price).count();
        let luck_score = below as f64 / counterfactual.len() as f64;

        // Steps 6-9: present-day calibration and hold/sell comparison over
        // the fixed decision horizon.
        let fit_now = self.engine.fit(full_history)?;
        let decision_paths = self.engine.generate_paths(
            &fit_now,
            current_price,
            self.config.decision_horizon,
            request.paths,
        )?;
        let forward_terminal = decision_paths.terminal_prices();

        let expected_wealth = mean(&forward_terminal);
        let risk_wealth = sample_std(&forward_terminal);
        let ce_hold = expected_wealth - request.risk_aversion * risk_wealth;

        let rf_daily = self.config.risk_free_rate / constants::TRADING_DAYS_PER_YEAR;
        let ce_sell = current_price * (1.0 + rf_daily * self.config.decision_horizon as f64);

        let verdict = if ce_hold > ce_sell {
            Verdict::Hold
        } else {
            Verdict::Sell
        };
        let beats = forward_terminal.iter().filter(|&&p| p > ce_sell).count();
        let ce = CeComparison {
            ce_hold,
            ce_sell,
            delta_ce: ce_hold - ce_sell,
            prob_hold_beats_sell: beats as f64 / forward_terminal.len() as f64,
        };

        // Forward cone at the requested horizon for bands and risk stats.
        let band_paths =
            self.engine
                .generate_paths(&fit_now, current_price, request.horizon, request.paths)?;
        let bands = sampled_bands(&band_paths, request.horizon);
        let risk = compute_risk_stats(
            &band_paths,
            current_price,
            request,
            realized_return,
            elapsed,
            luck_score,
        );

        let decision_text = format!(
            "Market regime: {}. Luck score: {:.1}%. CE(hold) {:.2} vs CE(sell) {:.2} over {} trading days: {}.",
            fit_now.regime,
            luck_score * 100.0,
            ce_hold,
            ce_sell,
            self.config.decision_horizon,
            verdict
        );

        Ok(AnalysisResult {
            status: AnalysisStatus::Calibrated,
            luck_score,
            verdict,
            ce,
            regime: Some(fit_now.regime),
            bands,
            risk,
            buy,
            current_price,
            decision_text,
            forward_paths: decision_paths.sample_paths(self.config.path_sample_size),
        })
    }

    fn fallback_result(
        &self,
        status: AnalysisStatus,
        buy: ResolvedBuy,
        current_price: f64,
        realized_return: f64,
        elapsed: usize,
        confidence: f64,
        decision_text: String,
    ) -> AnalysisResult {
        AnalysisResult {
            status,
            luck_score: 0.5,
            verdict: Verdict::Hold,
            ce: CeComparison {
                ce_hold: 0.0,
                ce_sell: 0.0,
                delta_ce: 0.0,
                prob_hold_beats_sell: 0.5,
            },
            regime: None,
            bands: Vec::new(),
            risk: RiskStats::fallback(realized_return, elapsed, confidence),
            buy,
            current_price,
            decision_text,
            forward_paths: Vec::new(),
        }
    }
}

/// Percentile bands at reduced cadence: every `horizon / 20` days.
fn sampled_bands(paths: &SimulatedPathSet, horizon: usize) -> Vec<BandPoint> {
    let step = (horizon / 20).max(1);
    (1..=horizon).step_by(step).map(|day| paths.band(day)).collect()
}

/// Risk statistics from the simulated forward distribution.
fn compute_risk_stats(
    paths: &SimulatedPathSet,
    current_price: f64,
    request: &AnalysisRequest,
    realized_return: f64,
    elapsed: usize,
    luck_score: f64,
) -> RiskStats {
    let terminal_returns: Vec<f64> = paths
        .terminal_prices()
        .iter()
        .map(|&p| p / current_price - 1.0)
        .collect();

    let prob_target = terminal_returns
        .iter()
        .filter(|&&r| r >= request.target_pct)
        .count() as f64
        / terminal_returns.len() as f64;

    // Drawdown is path-level: the running minimum, not the terminal price.
    let drawdown_floor = current_price * (1.0 - request.drawdown_pct);
    let breached = (0..paths.paths_count())
        .filter(|&p| {
            paths
                .path(p)
                .iter()
                .any(|&price| price <= drawdown_floor)
        })
        .count();
    let prob_drawdown = breached as f64 / paths.paths_count() as f64;

    let losses: Vec<f64> = terminal_returns.iter().map(|&r| -r).collect();
    let value_at_risk = quantile(&losses, request.confidence).unwrap_or(0.0);
    let tail: Vec<f64> = losses
        .iter()
        .copied()
        .filter(|&l| l >= value_at_risk)
        .collect();
    let expected_shortfall = if tail.is_empty() {
        value_at_risk
    } else {
        mean(&tail)
    };

    RiskStats {
        prob_target,
        prob_drawdown,
        value_at_risk,
        expected_shortfall,
        confidence: request.confidence,
        realized_return,
        elapsed_trading_days: elapsed,
        percentile_elapsed: luck_score,
    }
}

//! Integration tests for full workflow scenarios
//!
//! These tests validate end-to-end functionality of the ex-ante analysis
//! pipeline: calibration of both latent models, forward simulation, and the
//! assembled decision output.

use assert_approx_eq::assert_approx_eq;
use exante_finance::{
    gbm_series, regime_switching_series, AnalysisRequest, AnalysisStatus, ExAnteAnalyzer,
    GbmSeriesConfig, GenerativeEngine, RegimeSwitchingConfig, Verdict,
};

/// Test scenario: investor evaluates a year-old purchase on a trending asset
///
/// This simulates the most common usage pattern:
/// 1. Load two years of daily closes
/// 2. Run the ex-ante analysis for a buy one year in
/// 3. Inspect luck score, verdict, bands and risk statistics
#[test]
fn test_complete_ex_ante_analysis_workflow() {
    let history = gbm_series(&GbmSeriesConfig {
        length: 504,
        daily_drift: 4e-4,
        daily_volatility: 0.012,
        seed: 2024,
        ..Default::default()
    })
    .expect("series generation should succeed");

    let buy_date = history.points()[300].date;
    let mut request = AnalysisRequest::new(buy_date);
    request.paths = 1000;
    request.horizon = 120;

    let analyzer = ExAnteAnalyzer::default();
    let result = analyzer
        .run(&history, &request)
        .expect("analysis should succeed");

    assert_eq!(result.status, AnalysisStatus::Calibrated);
    assert!((0.0..=1.0).contains(&result.luck_score));
    assert!(result.regime.is_some(), "calibrated run must report a regime");

    // Verdict must be consistent with the CE comparison.
    match result.verdict {
        Verdict::Hold => assert!(result.ce.ce_hold > result.ce.ce_sell),
        Verdict::Sell => assert!(result.ce.ce_hold <= result.ce.ce_sell),
    }
    assert_approx_eq!(
        result.ce.delta_ce,
        result.ce.ce_hold - result.ce.ce_sell,
        1e-9
    );

    // Bands cover the horizon at reduced cadence and are ordered.
    assert!(!result.bands.is_empty());
    assert!(result.bands.len() <= 21);
    for band in &result.bands {
        assert!(band.day >= 1 && band.day <= request.horizon);
        assert!(band.p10 <= band.p50 && band.p50 <= band.p90);
    }

    // Risk statistics are probabilities / loss fractions, not placeholders.
    assert!((0.0..=1.0).contains(&result.risk.prob_target));
    assert!((0.0..=1.0).contains(&result.risk.prob_drawdown));
    assert!(result.risk.value_at_risk.is_finite());
    assert!(result.risk.expected_shortfall >= result.risk.value_at_risk);
    assert_eq!(result.risk.elapsed_trading_days, 203);
    assert_approx_eq!(result.risk.percentile_elapsed, result.luck_score, 1e-12);

    // The realized return is a plain arithmetic fact of the inputs.
    let expected_return = (result.current_price - result.buy.price) / result.buy.price;
    assert_approx_eq!(result.risk.realized_return, expected_return, 1e-12);

    // Visualization sample is bounded and each path starts at the current price.
    assert!(result.forward_paths.len() <= 50);
    for path in &result.forward_paths {
        assert_approx_eq!(path[0], result.current_price, 1e-9);
    }

    // Rationale names the regime and the verdict.
    let label = format!("{}", result.regime.unwrap());
    assert!(result.decision_text.contains(&label));
    assert!(result.decision_text.contains(&format!("{}", result.verdict)));
}

/// Test scenario: regime-switching history ends in a turbulent block
///
/// The full-history fit should pick up an elevated-volatility regime, and
/// the forward cone should be wider than for a calm-ending history.
#[test]
fn test_turbulent_tail_widens_the_forward_cone() {
    // Ends turbulent: odd number of blocks finishing on the turbulent leg.
    let turbulent_tail = regime_switching_series(&RegimeSwitchingConfig {
        blocks: 8,
        block_length: 70,
        seed: 5,
        ..Default::default()
    })
    .expect("series generation should succeed");

    let calm_tail = regime_switching_series(&RegimeSwitchingConfig {
        blocks: 7,
        block_length: 70,
        seed: 5,
        ..Default::default()
    })
    .expect("series generation should succeed");

    let engine = GenerativeEngine::default();

    let fit_turbulent = engine.fit(&turbulent_tail).expect("fit should succeed");
    let fit_calm = engine.fit(&calm_tail).expect("fit should succeed");

    let wide = engine
        .generate_paths(&fit_turbulent, 100.0, 60, 2000)
        .expect("simulation should succeed");
    let narrow = engine
        .generate_paths(&fit_calm, 100.0, 60, 2000)
        .expect("simulation should succeed");

    let wide_band = wide.band(60);
    let narrow_band = narrow.band(60);
    let wide_spread = wide_band.p90 - wide_band.p10;
    let narrow_spread = narrow_band.p90 - narrow_band.p10;

    assert!(
        wide_spread > narrow_spread,
        "turbulent-tail spread {} should exceed calm-tail spread {}",
        wide_spread,
        narrow_spread
    );
}

/// Test scenario: extreme current prices pin the luck score to its bounds
#[test]
fn test_luck_score_extremes() {
    let history = gbm_series(&GbmSeriesConfig {
        length: 400,
        seed: 77,
        ..Default::default()
    })
    .expect("series generation should succeed");

    let buy_date = history.points()[300].date;
    let analyzer = ExAnteAnalyzer::default();

    // Current price far above any simulated counterfactual: pure good luck.
    let mut lucky = AnalysisRequest::new(buy_date);
    lucky.paths = 500;
    lucky.current_price = Some(1e9);
    let result = analyzer.run(&history, &lucky).expect("analysis should succeed");
    assert_approx_eq!(result.luck_score, 1.0, 1e-12);

    // Current price far below: pure bad luck.
    let mut unlucky = AnalysisRequest::new(buy_date);
    unlucky.paths = 500;
    unlucky.current_price = Some(0.01);
    let result = analyzer
        .run(&history, &unlucky)
        .expect("analysis should succeed");
    assert_approx_eq!(result.luck_score, 0.0, 1e-12);
}

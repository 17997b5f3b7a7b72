//! Edge-case scenarios for the ex-ante analyzer
//!
//! Thin histories, degenerate series, buy-date resolution, and the
//! risk-aversion sensitivity of the certainty-equivalent verdict.

use assert_approx_eq::assert_approx_eq;
use exante_finance::{
    gbm_series, AnalysisRequest, AnalysisStatus, ExAnteAnalyzer, GbmSeriesConfig,
    MarketAnalysisError, PriceSeries, RegimeDetector, Verdict,
};

fn default_history() -> PriceSeries {
    gbm_series(&GbmSeriesConfig {
        length: 420,
        seed: 31,
        ..Default::default()
    })
    .expect("series generation should succeed")
}

/// Scenario: 100 pre-buy observations against a 252-observation minimum
/// window must yield the insufficient-history result, not an exception.
#[test]
fn test_insufficient_history_is_a_result_not_an_error() {
    let history = default_history();
    let buy_date = history.points()[99].date;
    let mut request = AnalysisRequest::new(buy_date);
    request.paths = 500;

    let result = ExAnteAnalyzer::default()
        .run(&history, &request)
        .expect("thin history must not raise");

    assert_eq!(result.status, AnalysisStatus::InsufficientHistory);
    assert_approx_eq!(result.luck_score, 0.5, 1e-12);
    assert_eq!(result.verdict, Verdict::Hold);
    assert!(result.bands.is_empty());
    assert!(result.forward_paths.is_empty());
    assert!(result.decision_text.contains("Insufficient"));
}

/// Scenario: flat (zero-variance) calibration window is a distinguishable
/// regime fit failure, never silent NaN parameters.
#[test]
fn test_flat_series_is_distinguishable_fit_failure() {
    // Detector level.
    let flat_returns = vec![0.0; 300];
    let err = RegimeDetector::new(3)
        .fit(&flat_returns)
        .expect_err("flat returns must not fit");
    assert!(matches!(
        err,
        MarketAnalysisError::RegimeDetectionError { .. }
    ));

    // Analyzer level: a constant-price history propagates the same failure.
    let dates = gbm_series(&GbmSeriesConfig {
        length: 400,
        seed: 1,
        ..Default::default()
    })
    .unwrap();
    let flat = PriceSeries::from_pairs(dates.points().iter().map(|p| (p.date, 100.0)))
        .expect("constant positive closes are a valid series");

    let mut request = AnalysisRequest::new(flat.points()[300].date);
    request.paths = 500;
    let err = ExAnteAnalyzer::default()
        .run(&flat, &request)
        .expect_err("flat history cannot calibrate");
    assert!(matches!(
        err,
        MarketAnalysisError::RegimeDetectionError { .. }
    ));
}

/// Scenario: buy date exactly present in the series resolves to that close
/// with no fallback flag; an absent date falls back and flags it.
#[test]
fn test_buy_date_resolution() {
    let history = default_history();
    let exact = history.points()[310];

    let mut request = AnalysisRequest::new(exact.date);
    request.paths = 500;
    let result = ExAnteAnalyzer::default()
        .run(&history, &request)
        .expect("analysis should succeed");
    assert_eq!(result.buy.price, exact.close);
    assert_eq!(result.buy.date, exact.date);
    assert!(!result.buy.used_fallback);

    // A weekend-style gap: remove one date and request it.
    let gapped = PriceSeries::from_pairs(
        history
            .points()
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != 310)
            .map(|(_, p)| (p.date, p.close)),
    )
    .unwrap();
    let result = ExAnteAnalyzer::default()
        .run(&gapped, &request)
        .expect("analysis should succeed");
    assert!(result.buy.used_fallback);
    assert_eq!(result.buy.date, history.points()[309].date);
    assert_eq!(result.buy.price, history.points()[309].close);
}

/// Scenario: buying on the final observation leaves nothing to evaluate.
#[test]
fn test_too_soon_to_evaluate() {
    let history = default_history();
    let mut request = AnalysisRequest::new(history.last().date);
    request.paths = 500;

    let result = ExAnteAnalyzer::default()
        .run(&history, &request)
        .expect("too-recent buy must not raise");
    assert_eq!(result.status, AnalysisStatus::TooSoonToEvaluate);
    assert_eq!(result.risk.elapsed_trading_days, 0);
}

/// Property: holding all else fixed, increasing risk aversion strictly
/// decreases CE_hold, and far enough out flips the verdict to SELL.
#[test]
fn test_risk_aversion_monotonicity_flips_verdict() {
    let history = default_history();
    let buy_date = history.points()[300].date;

    let run = |risk_aversion: f64| {
        let mut request = AnalysisRequest::new(buy_date);
        request.paths = 1000;
        request.risk_aversion = risk_aversion;
        ExAnteAnalyzer::default()
            .run(&history, &request)
            .expect("analysis should succeed")
    };

    let lambdas = [0.1, 0.5, 2.0, 8.0, 32.0];
    let results: Vec<_> = lambdas.iter().map(|&l| run(l)).collect();

    for pair in results.windows(2) {
        assert!(
            pair[1].ce.ce_hold < pair[0].ce.ce_hold,
            "CE_hold must strictly decrease with risk aversion: {} vs {}",
            pair[1].ce.ce_hold,
            pair[0].ce.ce_hold
        );
        // CE_sell does not depend on risk aversion.
        assert_approx_eq!(pair[1].ce.ce_sell, pair[0].ce.ce_sell, 1e-9);
    }

    assert_eq!(
        results[results.len() - 1].verdict,
        Verdict::Sell,
        "an extremely risk-averse agent must prefer the risk-free branch"
    );
}

/// Out-of-bounds run parameters are rejected before any computation.
#[test]
fn test_request_bounds_rejected() {
    let history = default_history();
    let buy_date = history.points()[300].date;

    let mutations: Vec<Box<dyn Fn(&mut AnalysisRequest)>> = vec![
        Box::new(|r| r.horizon = 0),
        Box::new(|r| r.horizon = 1000),
        Box::new(|r| r.paths = 5),
        Box::new(|r| r.paths = 100_000),
        Box::new(|r| r.confidence = 0.0),
        Box::new(|r| r.risk_aversion = -1.0),
    ];

    for mutate in &mutations {
        let mut request = AnalysisRequest::new(buy_date);
        mutate(&mut request);
        let err = ExAnteAnalyzer::default()
            .run(&history, &request)
            .expect_err("invalid request must be rejected");
        assert!(matches!(err, MarketAnalysisError::InvalidParameter { .. }));
    }
}

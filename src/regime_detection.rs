//! Market regime classification over return/volatility features.
//!
//! A [`RegimeDetector`] fits a Gaussian HMM to a return series and produces
//! an immutable [`RegimeModel`]. Canonical labels are assigned by rank of
//! per-state volatility mean, ascending, so the labeling is stable under
//! arbitrary internal state ordering: the calmest state is always
//! `Low-Vol/Bull` and the most turbulent of three is always `Crisis`,
//! whatever indices EM happened to assign them.

use crate::config::EngineConfig;
use crate::emission::EmissionParameters;
use crate::errors::{validate_all_finite, MarketAnalysisError, MarketResult};
use crate::hmm_core::{GaussianHmm, Observation};
use crate::math_utils::{constants, sample_variance, trailing_volatility};
use crate::sim_rng::SimRng;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Feature scaling factor for numerical conditioning.
const FEATURE_SCALE: f64 = 100.0;

/// Canonical market-condition label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RegimeLabel {
    /// Lowest-volatility state
    LowVolBull,
    /// Middle-volatility state
    HighVolBear,
    /// Highest-volatility state of a three-state model
    Crisis,
    /// Synthetic label for states beyond the first three, by volatility rank
    Synthetic(usize),
}

impl RegimeLabel {
    /// Volatility multiplier applied during path simulation.
    pub fn volatility_multiplier(&self) -> f64 {
        match self {
            RegimeLabel::HighVolBear => 1.5,
            RegimeLabel::Crisis => 3.0,
            _ => 1.0,
        }
    }

    fn for_rank(rank: usize) -> Self {
        match rank {
            0 => RegimeLabel::LowVolBull,
            1 => RegimeLabel::HighVolBear,
            2 => RegimeLabel::Crisis,
            r => RegimeLabel::Synthetic(r),
        }
    }
}

impl std::fmt::Display for RegimeLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegimeLabel::LowVolBull => write!(f, "Low-Vol/Bull"),
            RegimeLabel::HighVolBear => write!(f, "High-Vol/Bear"),
            RegimeLabel::Crisis => write!(f, "Crisis"),
            RegimeLabel::Synthetic(rank) => write!(f, "State {}", rank),
        }
    }
}

/// Unscaled parameters of one regime.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RegimeParams {
    /// Mean simple return per step
    pub mean_return: f64,
    /// Mean trailing volatility per step
    pub mean_volatility: f64,
    /// Feature covariance, unscaled
    pub covariance: [[f64; 2]; 2],
}

/// Regime classifier configuration. Holds no fit state; every call to
/// [`RegimeDetector::fit`] produces a fresh, immutable [`RegimeModel`].
#[derive(Debug, Clone)]
pub struct RegimeDetector {
    num_states: usize,
    max_em_iterations: usize,
    volatility_window: usize,
    seed: u64,
}

/// Fitted regime model: HMM parameters plus the rank-based label map.
#[derive(Debug, Clone)]
pub struct RegimeModel {
    hmm: GaussianHmm,
    /// Label per internal state index
    state_labels: Vec<RegimeLabel>,
    log_likelihood: f64,
    volatility_window: usize,
}

impl RegimeDetector {
    /// Detector with the given state count and defaults for everything else.
    pub fn new(num_states: usize) -> Self {
        let defaults = EngineConfig::default();
        Self {
            num_states,
            max_em_iterations: defaults.max_em_iterations,
            volatility_window: defaults.volatility_window,
            seed: defaults.seed,
        }
    }

    /// Detector configured from an [`EngineConfig`].
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            num_states: config.num_regimes,
            max_em_iterations: config.max_em_iterations,
            volatility_window: config.volatility_window,
            seed: config.seed,
        }
    }

    /// Fit a K-state Gaussian HMM to a simple-return series.
    ///
    /// A constant or near-constant return sequence would drive the emission
    /// covariance singular, so it is rejected up front as a distinguishable
    /// fit failure instead of surfacing later as NaN parameters.
    pub fn fit(&self, returns: &[f64]) -> MarketResult<RegimeModel> {
        validate_all_finite(returns, "returns")?;

        if returns.len() < self.num_states {
            return Err(MarketAnalysisError::InsufficientData {
                required: self.num_states,
                actual: returns.len(),
            });
        }

        if sample_variance(returns) < constants::MIN_VARIANCE {
            return Err(MarketAnalysisError::RegimeDetectionError {
                reason: "constant return sequence: feature covariance would be singular"
                    .to_string(),
            });
        }

        let observations = prepare_features(returns, self.volatility_window)?;

        let mut rng = SimRng::with_seed(self.seed);
        let mut hmm = GaussianHmm::new_with_initialization(
            self.num_states,
            &observations,
            self.max_em_iterations,
            &mut rng,
        )?;
        let log_likelihood = hmm.fit(&observations).map_err(|e| match e {
            MarketAnalysisError::NumericalError { reason } => {
                MarketAnalysisError::RegimeDetectionError { reason }
            }
            other => other,
        })?;

        let state_labels = assign_labels(&hmm.emission_params);

        Ok(RegimeModel {
            hmm,
            state_labels,
            log_likelihood,
            volatility_window: self.volatility_window,
        })
    }
}

impl RegimeModel {
    /// Decode the most likely regime sequence for a return series.
    ///
    /// Output is aligned one-to-one with the input returns.
    pub fn predict_regime(&self, returns: &[f64]) -> MarketResult<Vec<RegimeLabel>> {
        let observations = prepare_features(returns, self.volatility_window)?;
        let path = self.hmm.decode(&observations)?;
        Ok(path.into_iter().map(|s| self.state_labels[s]).collect())
    }

    /// Unscaled mean return, mean volatility and covariance for a label.
    pub fn regime_params(&self, label: RegimeLabel) -> MarketResult<RegimeParams> {
        let state = self
            .state_labels
            .iter()
            .position(|&l| l == label)
            .ok_or_else(|| MarketAnalysisError::RegimeDetectionError {
                reason: format!("unknown regime label: {}", label),
            })?;

        let params = &self.hmm.emission_params[state];
        let mut covariance = params.covariance;
        for row in covariance.iter_mut() {
            for v in row.iter_mut() {
                *v /= FEATURE_SCALE * FEATURE_SCALE;
            }
        }

        Ok(RegimeParams {
            mean_return: params.mean[0] / FEATURE_SCALE,
            mean_volatility: params.mean[1] / FEATURE_SCALE,
            covariance,
        })
    }

    /// Row-stochastic K×K transition matrix.
    pub fn transition_matrix(&self) -> &[Vec<f64>] {
        &self.hmm.transition_matrix
    }

    /// Label per internal state index.
    pub fn state_labels(&self) -> &[RegimeLabel] {
        &self.state_labels
    }

    /// Log-likelihood of the fitted model.
    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }
}

/// Rank states by ascending volatility mean and assign canonical labels.
pub(crate) fn assign_labels(emissions: &[EmissionParameters]) -> Vec<RegimeLabel> {
    let mut order: Vec<usize> = (0..emissions.len()).collect();
    order.sort_by(|&a, &b| {
        emissions[a].mean[1]
            .partial_cmp(&emissions[b].mean[1])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut labels = vec![RegimeLabel::LowVolBull; emissions.len()];
    for (rank, &state) in order.iter().enumerate() {
        labels[state] = RegimeLabel::for_rank(rank);
    }
    labels
}

/// Build the HMM feature matrix from a return series.
///
/// Feature 1 is the simple return, feature 2 the trailing standard
/// deviation of returns over the detector's window (warm-up back-filled),
/// both scaled by 100 for numerical conditioning.
fn prepare_features(returns: &[f64], window: usize) -> MarketResult<Vec<Observation>> {
    if returns.len() < window {
        return Err(MarketAnalysisError::InsufficientData {
            required: window,
            actual: returns.len(),
        });
    }

    let vols = trailing_volatility(returns, window);
    Ok(returns
        .iter()
        .zip(&vols)
        .map(|(&r, &v)| [r * FEATURE_SCALE, v * FEATURE_SCALE])
        .collect())
}

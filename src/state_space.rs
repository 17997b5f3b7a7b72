//! Local-linear-trend state-space model.
//!
//! A two-dimensional Kalman filter extracts a latent trend level and its
//! velocity from a noisy observation series:
//!
//! ```text
//! [trend_t  ]   [1 1] [trend_t-1  ]
//! [velocity_t] = [0 1] [velocity_t-1] + w_t,   w_t ~ N(0, diag(q, q))
//! z_t = [1 0] x_t + v_t,                       v_t ~ N(0, r)
//! ```
//!
//! The recursion is deterministic given inputs and hyperparameters, runs in
//! O(n) time with O(1) filter state, and records the innovation at every
//! step. State covariance is re-symmetrized after each update so it stays
//! positive semidefinite through long recursions.

use crate::errors::{validate_all_finite, MarketAnalysisError, MarketResult};
use crate::math_utils::sample_std;
use nalgebra::{Matrix2, RowVector2, Vector2};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Filtered latent state at one time step.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LatentState {
    /// Filtered trend level
    pub trend: f64,
    /// Filtered per-step velocity of the trend
    pub velocity: f64,
    /// Innovation (observed minus one-step prediction)
    pub residual: f64,
}

/// Local-linear-trend Kalman filter.
#[derive(Debug, Clone)]
pub struct StateSpaceModel {
    process_noise: f64,
    measurement_noise: f64,
}

/// Immutable output of one filter pass.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StateSpaceFit {
    states: Vec<LatentState>,
}

impl StateSpaceModel {
    /// Create a filter with the given noise hyperparameters.
    pub fn new(process_noise: f64, measurement_noise: f64) -> MarketResult<Self> {
        for (name, v) in [
            ("process_noise", process_noise),
            ("measurement_noise", measurement_noise),
        ] {
            if !v.is_finite() || v <= 0.0 {
                return Err(MarketAnalysisError::InvalidParameter {
                    parameter: name.to_string(),
                    value: v,
                    constraint: "> 0".to_string(),
                });
            }
        }
        Ok(Self {
            process_noise,
            measurement_noise,
        })
    }

    /// Run the filter over an observation series.
    ///
    /// The state is initialized from the first observation (trend = z_0,
    /// velocity = 0, P_0 = 10·I) and recorded as step 0 with a zero
    /// residual; each subsequent observation runs one predict/update cycle.
    /// A single-observation series therefore yields trend = price and
    /// velocity = 0 trivially.
    pub fn fit(&self, observations: &[f64]) -> MarketResult<StateSpaceFit> {
        if observations.is_empty() {
            return Err(MarketAnalysisError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }
        validate_all_finite(observations, "observations")?;

        let f = Matrix2::new(1.0, 1.0, 0.0, 1.0);
        let q = Matrix2::new(self.process_noise, 0.0, 0.0, self.process_noise);
        let h = RowVector2::new(1.0, 0.0);
        let r = self.measurement_noise;
        let identity = Matrix2::identity();

        let mut x = Vector2::new(observations[0], 0.0);
        let mut p = identity * 10.0;

        let mut states = Vec::with_capacity(observations.len());
        states.push(LatentState {
            trend: x[0],
            velocity: x[1],
            residual: 0.0,
        });

        for &z in &observations[1..] {
            // Predict
            x = f * x;
            p = f * p * f.transpose() + q;

            // Update
            let innovation = z - (h * x)[0];
            let s = (h * p * h.transpose())[0] + r;
            if !s.is_finite() || s <= 0.0 {
                return Err(MarketAnalysisError::NumericalError {
                    reason: format!("innovation covariance degenerate: {}", s),
                });
            }
            let gain = p * h.transpose() / s;
            x += gain * innovation;
            p = (identity - gain * h) * p;
            // Symmetrize to keep P positive semidefinite.
            p = (p + p.transpose()) * 0.5;

            states.push(LatentState {
                trend: x[0],
                velocity: x[1],
                residual: innovation,
            });
        }

        Ok(StateSpaceFit { states })
    }
}

impl StateSpaceFit {
    /// Per-step latent states, aligned one-to-one with the observations.
    pub fn states(&self) -> &[LatentState] {
        &self.states
    }

    /// Trend level at the final step.
    pub fn last_trend(&self) -> f64 {
        self.states[self.states.len() - 1].trend
    }

    /// Velocity at the final step.
    pub fn last_velocity(&self) -> f64 {
        self.states[self.states.len() - 1].velocity
    }

    /// Standard deviation of the innovations over the full fitted window.
    pub fn residual_std(&self) -> f64 {
        let residuals: Vec<f64> = self.states.iter().map(|s| s.residual).collect();
        sample_std(&residuals)
    }
}

//! Gaussian emission parameters for HMM regime states.
//!
//! Each hidden state emits a 2-D feature vector (scaled return, scaled
//! trailing volatility) from a full-covariance Gaussian. The precision
//! matrix and log-determinant are cached via Cholesky decomposition so
//! density evaluation inside the EM loop stays cheap; a covariance that
//! cannot be decomposed even after progressive regularization is reported
//! as a numerical error rather than silently producing NaN densities.

use crate::errors::{MarketAnalysisError, MarketResult};
use crate::math_utils::constants;
use nalgebra::{Cholesky, Matrix2};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 2·ln(2π), the dimension-dependent normalization term.
const LOG_2PI_TIMES_2: f64 = 2.0 * 1.8378770664093453;

/// Emission distribution of one regime state.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EmissionParameters {
    /// Mean vector [scaled return, scaled volatility]
    pub mean: [f64; 2],
    /// Covariance matrix of the feature vector
    pub covariance: [[f64; 2]; 2],
    /// Inverse covariance (cached)
    pub precision: [[f64; 2]; 2],
    /// Log determinant of the covariance (cached)
    pub log_det_cov: f64,
}

impl Default for EmissionParameters {
    fn default() -> Self {
        let covariance = [[1.0, 0.0], [0.0, 1.0]];
        Self {
            mean: [0.0, 1.0],
            covariance,
            precision: covariance,
            log_det_cov: 0.0,
        }
    }
}

impl EmissionParameters {
    /// Recompute the cached precision matrix and log-determinant.
    ///
    /// Must be called after every covariance update. Applies a small
    /// diagonal regularization first, then attempts Cholesky decomposition
    /// with progressively stronger regularization before giving up.
    pub fn update_cached_values(&mut self) -> MarketResult<()> {
        for i in 0..2 {
            self.covariance[i][i] += constants::COVARIANCE_REGULARIZATION;
        }

        let cov = Matrix2::new(
            self.covariance[0][0],
            self.covariance[0][1],
            self.covariance[1][0],
            self.covariance[1][1],
        );

        let cholesky = match Cholesky::new(cov) {
            Some(chol) => chol,
            None => {
                let mut success = None;
                for &reg in &[1e-5, 1e-4, 1e-3] {
                    let regularized = cov + Matrix2::identity() * reg;
                    if let Some(chol) = Cholesky::new(regularized) {
                        success = Some(chol);
                        break;
                    }
                }
                success.ok_or_else(|| MarketAnalysisError::NumericalError {
                    reason: format!(
                        "emission covariance not positive definite (det = {:.3e})",
                        cov.determinant()
                    ),
                })?
            }
        };

        let precision = cholesky.inverse();
        for i in 0..2 {
            for j in 0..2 {
                self.precision[i][j] = precision[(i, j)];
            }
        }
        self.log_det_cov = 2.0 * cholesky.l().diagonal().iter().map(|x| x.ln()).sum::<f64>();

        Ok(())
    }

    /// Log density of an observation under this state's Gaussian.
    ///
    /// Clamped to avoid NaN propagation through the EM recursion.
    pub fn log_density(&self, obs: [f64; 2]) -> f64 {
        let diff = [obs[0] - self.mean[0], obs[1] - self.mean[1]];

        let mut mahalanobis_sq = 0.0;
        for i in 0..2 {
            for j in 0..2 {
                mahalanobis_sq += diff[i] * self.precision[i][j] * diff[j];
            }
        }

        let log_prob = -0.5 * (LOG_2PI_TIMES_2 + self.log_det_cov + mahalanobis_sq);
        log_prob.clamp(-1000.0, 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_identity_covariance_density() {
        let mut params = EmissionParameters {
            mean: [0.0, 0.0],
            covariance: [[1.0, 0.0], [0.0, 1.0]],
            ..Default::default()
        };
        params.update_cached_values().unwrap();

        // At the mean, the log density is -ln(2π) - 0.5*log|Σ| with |Σ| ≈ 1.
        let at_mean = params.log_density([0.0, 0.0]);
        assert_approx_eq!(at_mean, -LOG_2PI_TIMES_2 / 2.0, 1e-4);

        // Farther from the mean, the density drops.
        assert!(params.log_density([2.0, 2.0]) < at_mean);
    }

    #[test]
    fn test_singular_covariance_is_an_error() {
        let mut params = EmissionParameters {
            mean: [0.0, 0.0],
            covariance: [[0.0, 0.0], [0.0, 0.0]],
            ..Default::default()
        };
        // Zero matrix becomes positive definite only through regularization;
        // a negative-definite one must fail outright.
        assert!(params.update_cached_values().is_ok());

        let mut bad = EmissionParameters {
            mean: [0.0, 0.0],
            covariance: [[-1.0, 0.0], [0.0, -1.0]],
            ..Default::default()
        };
        assert!(matches!(
            bad.update_cached_values(),
            Err(MarketAnalysisError::NumericalError { .. })
        ));
    }

    #[test]
    fn test_precision_is_inverse_of_covariance() {
        let mut params = EmissionParameters {
            mean: [0.0, 0.0],
            covariance: [[2.0, 0.3], [0.3, 1.0]],
            ..Default::default()
        };
        params.update_cached_values().unwrap();

        // Σ · Σ⁻¹ ≈ I (regularization perturbs the product slightly).
        let c = params.covariance;
        let p = params.precision;
        for i in 0..2 {
            for j in 0..2 {
                let product: f64 = (0..2).map(|k| c[i][k] * p[k][j]).sum();
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_approx_eq!(product, expected, 1e-4);
            }
        }
    }

    #[test]
    fn test_log_density_is_clamped() {
        let mut params = EmissionParameters {
            mean: [0.0, 0.0],
            covariance: [[1e-6, 0.0], [0.0, 1e-6]],
            ..Default::default()
        };
        params.update_cached_values().unwrap();
        let far = params.log_density([1e6, 1e6]);
        assert!(far.is_finite());
        assert!(far >= -1000.0);
    }
}

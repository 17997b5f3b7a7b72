//! Core Hidden Markov Model implementation for regime classification.
//!
//! K-state full-covariance Gaussian HMM over 2-D market features, with
//! seeded k-means++ initialization, scaled forward-backward recursion,
//! Baum-Welch parameter estimation, and Viterbi decoding. All randomness
//! flows through [`SimRng`] so a fixed seed reproduces the fit exactly.

use crate::emission::EmissionParameters;
use crate::errors::{MarketAnalysisError, MarketResult};
use crate::math_utils::constants;
use crate::sim_rng::SimRng;

/// One HMM observation: [scaled return, scaled trailing volatility].
pub type Observation = [f64; 2];

/// Gaussian Hidden Markov Model.
#[derive(Debug, Clone)]
pub struct GaussianHmm {
    /// Number of hidden states
    pub num_states: usize,
    /// Initial state probabilities
    pub initial_probs: Vec<f64>,
    /// Row-stochastic transition matrix
    pub transition_matrix: Vec<Vec<f64>>,
    /// Emission distribution per state
    pub emission_params: Vec<EmissionParameters>,
    /// Convergence tolerance for the EM log-likelihood
    pub convergence_tolerance: f64,
    /// Iteration budget for EM
    pub max_iterations: usize,
}

impl GaussianHmm {
    /// Create an HMM initialized from the observations via seeded k-means++.
    pub fn new_with_initialization(
        num_states: usize,
        observations: &[Observation],
        max_iterations: usize,
        rng: &mut SimRng,
    ) -> MarketResult<Self> {
        if observations.len() < num_states {
            return Err(MarketAnalysisError::InsufficientData {
                required: num_states,
                actual: observations.len(),
            });
        }

        let initial_probs = vec![1.0 / num_states as f64; num_states];

        // Persistence-biased transition matrix: regimes are sticky.
        let mut transition_matrix = vec![vec![0.0; num_states]; num_states];
        for i in 0..num_states {
            for j in 0..num_states {
                transition_matrix[i][j] = if i == j {
                    0.7
                } else {
                    0.3 / (num_states - 1) as f64
                };
            }
        }

        let emission_params = Self::initialize_with_kmeans(observations, num_states, rng)?;

        Ok(Self {
            num_states,
            initial_probs,
            transition_matrix,
            emission_params,
            convergence_tolerance: 1e-4,
            max_iterations,
        })
    }

    /// Fit the HMM to an observation sequence via Baum-Welch EM.
    ///
    /// Returns the final log-likelihood. Stops early once the improvement
    /// falls below the tolerance or stagnates for several iterations.
    pub fn fit(&mut self, observations: &[Observation]) -> MarketResult<f64> {
        if observations.len() < 10 {
            return Err(MarketAnalysisError::InsufficientData {
                required: 10,
                actual: observations.len(),
            });
        }

        let mut prev_log_likelihood = f64::NEG_INFINITY;
        let mut stagnation_count = 0;
        const MAX_STAGNATION: usize = 5;

        for iteration in 0..self.max_iterations {
            let (alpha, beta, log_likelihood) = self.forward_backward(observations)?;

            let improvement = log_likelihood - prev_log_likelihood;
            if iteration > 0 {
                if improvement.abs() < self.convergence_tolerance {
                    return Ok(log_likelihood);
                }
                if improvement < self.convergence_tolerance * 0.1 {
                    stagnation_count += 1;
                    if stagnation_count >= MAX_STAGNATION {
                        return Ok(log_likelihood);
                    }
                } else {
                    stagnation_count = 0;
                }
            }

            self.update_parameters(observations, &alpha, &beta)?;
            prev_log_likelihood = log_likelihood;
        }

        log::warn!(
            "EM stopped at iteration budget {} without convergence",
            self.max_iterations
        );
        Ok(prev_log_likelihood)
    }

    /// Decode the most likely state sequence via the Viterbi algorithm.
    pub fn decode(&self, observations: &[Observation]) -> MarketResult<Vec<usize>> {
        let t = observations.len();
        if t == 0 {
            return Err(MarketAnalysisError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }

        let mut delta = vec![vec![0.0; self.num_states]; t];
        let mut psi = vec![vec![0usize; self.num_states]; t];

        for j in 0..self.num_states {
            delta[0][j] =
                self.initial_probs[j].ln() + self.emission_params[j].log_density(observations[0]);
        }

        for i in 1..t {
            for j in 0..self.num_states {
                let mut max_val = f64::NEG_INFINITY;
                let mut max_idx = 0;
                for k in 0..self.num_states {
                    let val = delta[i - 1][k] + self.transition_matrix[k][j].ln();
                    if val > max_val {
                        max_val = val;
                        max_idx = k;
                    }
                }
                delta[i][j] = max_val + self.emission_params[j].log_density(observations[i]);
                psi[i][j] = max_idx;
            }
        }

        let mut best_final_state = 0;
        let mut best_final_prob = f64::NEG_INFINITY;
        for j in 0..self.num_states {
            if delta[t - 1][j] > best_final_prob {
                best_final_prob = delta[t - 1][j];
                best_final_state = j;
            }
        }

        let mut path = vec![0usize; t];
        path[t - 1] = best_final_state;
        for i in (0..t - 1).rev() {
            path[i] = psi[i + 1][path[i + 1]];
        }

        Ok(path)
    }

    /// Scaled forward-backward recursion.
    ///
    /// Returns (alpha, beta, log-likelihood). Per-step scaling keeps the
    /// recursion in a representable range for long sequences.
    pub fn forward_backward(
        &self,
        observations: &[Observation],
    ) -> MarketResult<(Vec<Vec<f64>>, Vec<Vec<f64>>, f64)> {
        let t = observations.len();

        let mut alpha = vec![vec![0.0; self.num_states]; t];
        let mut beta = vec![vec![0.0; self.num_states]; t];

        let mut emission_probs = vec![vec![0.0; self.num_states]; t];
        for i in 0..t {
            for j in 0..self.num_states {
                emission_probs[i][j] = self.emission_params[j].log_density(observations[i]).exp();
            }
        }

        let mut log_scale_factors = vec![0.0; t];

        for j in 0..self.num_states {
            alpha[0][j] = self.initial_probs[j] * emission_probs[0][j];
        }
        let scale = alpha[0].iter().sum::<f64>().max(constants::MIN_PROBABILITY);
        log_scale_factors[0] = scale.ln();
        for j in 0..self.num_states {
            alpha[0][j] /= scale;
        }

        for i in 1..t {
            for j in 0..self.num_states {
                alpha[i][j] = 0.0;
                for k in 0..self.num_states {
                    alpha[i][j] += alpha[i - 1][k] * self.transition_matrix[k][j];
                }
                alpha[i][j] *= emission_probs[i][j];
            }
            let scale = alpha[i].iter().sum::<f64>().max(constants::MIN_PROBABILITY);
            log_scale_factors[i] = scale.ln();
            for j in 0..self.num_states {
                alpha[i][j] /= scale;
            }
        }

        for j in 0..self.num_states {
            beta[t - 1][j] = 1.0;
        }
        for i in (0..t - 1).rev() {
            for j in 0..self.num_states {
                beta[i][j] = 0.0;
                for k in 0..self.num_states {
                    beta[i][j] +=
                        self.transition_matrix[j][k] * emission_probs[i + 1][k] * beta[i + 1][k];
                }
                beta[i][j] /= log_scale_factors[i + 1].exp();
            }
        }

        let log_likelihood: f64 = log_scale_factors.iter().sum();
        if !log_likelihood.is_finite() {
            return Err(MarketAnalysisError::NumericalError {
                reason: "forward recursion produced non-finite log-likelihood".to_string(),
            });
        }

        Ok((alpha, beta, log_likelihood))
    }

    /// M-step: update initial, transition and emission parameters.
    ///
    /// Transition statistics are accumulated in a single pass without
    /// storing the full xi tensor.
    fn update_parameters(
        &mut self,
        observations: &[Observation],
        alpha: &[Vec<f64>],
        beta: &[Vec<f64>],
    ) -> MarketResult<()> {
        let t = observations.len();

        let mut gamma = vec![vec![0.0; self.num_states]; t];
        for i in 0..t {
            let mut sum = 0.0;
            for j in 0..self.num_states {
                gamma[i][j] = alpha[i][j] * beta[i][j];
                sum += gamma[i][j];
            }
            if sum > constants::MIN_PROBABILITY {
                let inv = 1.0 / sum;
                for j in 0..self.num_states {
                    gamma[i][j] *= inv;
                }
            }
        }

        let mut transition_numerators = vec![vec![0.0; self.num_states]; self.num_states];
        let mut transition_denominators = vec![0.0; self.num_states];

        let mut next_emission_probs = vec![vec![0.0; self.num_states]; t.saturating_sub(1)];
        for i in 0..t - 1 {
            for k in 0..self.num_states {
                next_emission_probs[i][k] =
                    self.emission_params[k].log_density(observations[i + 1]).exp();
            }
        }

        let mut xi_values = vec![vec![0.0; self.num_states]; self.num_states];
        for i in 0..t - 1 {
            for j in 0..self.num_states {
                transition_denominators[j] += gamma[i][j];
            }

            let mut xi_sum = 0.0;
            for j in 0..self.num_states {
                for k in 0..self.num_states {
                    xi_values[j][k] = alpha[i][j]
                        * self.transition_matrix[j][k]
                        * next_emission_probs[i][k]
                        * beta[i + 1][k];
                    xi_sum += xi_values[j][k];
                }
            }

            if xi_sum > constants::MIN_PROBABILITY {
                let inv = 1.0 / xi_sum;
                for j in 0..self.num_states {
                    for k in 0..self.num_states {
                        transition_numerators[j][k] += xi_values[j][k] * inv;
                    }
                }
            }
        }

        for j in 0..self.num_states {
            self.initial_probs[j] = gamma[0][j];
        }

        for j in 0..self.num_states {
            if transition_denominators[j] > constants::MIN_PROBABILITY {
                let inv = 1.0 / transition_denominators[j];
                for k in 0..self.num_states {
                    self.transition_matrix[j][k] = transition_numerators[j][k] * inv;
                }
            }
        }

        for j in 0..self.num_states {
            let weight_sum: f64 = (0..t).map(|i| gamma[i][j]).sum();
            if weight_sum <= 1e-10 {
                continue;
            }
            let inv_weight_sum = 1.0 / weight_sum;

            let mut new_mean = [0.0; 2];
            for i in 0..t {
                let w = gamma[i][j];
                new_mean[0] += w * observations[i][0];
                new_mean[1] += w * observations[i][1];
            }
            new_mean[0] *= inv_weight_sum;
            new_mean[1] *= inv_weight_sum;
            // Volatility feature is a standard deviation, so non-negative.
            new_mean[1] = new_mean[1].max(0.0);
            self.emission_params[j].mean = new_mean;

            let mut new_cov = [[0.0; 2]; 2];
            for i in 0..t {
                let w = gamma[i][j];
                let diff = [
                    observations[i][0] - new_mean[0],
                    observations[i][1] - new_mean[1],
                ];
                for p in 0..2 {
                    for q in p..2 {
                        let contribution = w * diff[p] * diff[q];
                        new_cov[p][q] += contribution;
                        if p != q {
                            new_cov[q][p] += contribution;
                        }
                    }
                }
            }
            for p in 0..2 {
                for q in 0..2 {
                    new_cov[p][q] *= inv_weight_sum;
                    if p == q {
                        new_cov[p][q] = new_cov[p][q].max(constants::COVARIANCE_REGULARIZATION);
                    }
                }
            }
            self.emission_params[j].covariance = new_cov;
            self.emission_params[j].update_cached_values()?;
        }

        Ok(())
    }

    /// Seeded k-means++ initialization of the emission parameters.
    fn initialize_with_kmeans(
        observations: &[Observation],
        num_states: usize,
        rng: &mut SimRng,
    ) -> MarketResult<Vec<EmissionParameters>> {
        let mut centroids = Self::initialize_centroids_plus_plus(observations, num_states, rng)?;

        let max_iterations = 100;
        let tolerance = 1e-6;
        let mut assignments = vec![0usize; observations.len()];

        for _iteration in 0..max_iterations {
            for (i, obs) in observations.iter().enumerate() {
                let mut min_dist = f64::INFINITY;
                let mut best = 0;
                for (j, c) in centroids.iter().enumerate() {
                    let dist = squared_distance(obs, c);
                    if dist < min_dist {
                        min_dist = dist;
                        best = j;
                    }
                }
                assignments[i] = best;
            }

            let mut new_centroids = vec![[0.0; 2]; num_states];
            let mut counts = vec![0usize; num_states];
            for (obs, &cluster) in observations.iter().zip(&assignments) {
                new_centroids[cluster][0] += obs[0];
                new_centroids[cluster][1] += obs[1];
                counts[cluster] += 1;
            }

            let mut max_change = 0.0f64;
            for j in 0..num_states {
                if counts[j] > 0 {
                    new_centroids[j][0] /= counts[j] as f64;
                    new_centroids[j][1] /= counts[j] as f64;
                    max_change = max_change.max(squared_distance(&new_centroids[j], &centroids[j]));
                } else {
                    log::warn!("k-means cluster {} empty; keeping previous centroid", j);
                    new_centroids[j] = centroids[j];
                }
            }
            centroids = new_centroids;

            if max_change < tolerance {
                break;
            }
        }

        // Per-cluster diagonal covariance from the final assignment.
        let mut emission_params = Vec::with_capacity(num_states);
        for (j, centroid) in centroids.iter().enumerate() {
            let members: Vec<&Observation> = observations
                .iter()
                .zip(&assignments)
                .filter(|(_, &a)| a == j)
                .map(|(o, _)| o)
                .collect();

            let mut covariance = [[0.0; 2]; 2];
            for dim in 0..2 {
                let var = if members.len() > 1 {
                    members
                        .iter()
                        .map(|o| {
                            let d = o[dim] - centroid[dim];
                            d * d
                        })
                        .sum::<f64>()
                        / (members.len() - 1) as f64
                } else {
                    1.0
                };
                covariance[dim][dim] = var.max(1e-4);
            }

            let mut params = EmissionParameters {
                mean: *centroid,
                covariance,
                ..Default::default()
            };
            params.update_cached_values()?;
            emission_params.push(params);
        }

        Ok(emission_params)
    }

    /// k-means++ centroid seeding with the given RNG.
    fn initialize_centroids_plus_plus(
        observations: &[Observation],
        num_states: usize,
        rng: &mut SimRng,
    ) -> MarketResult<Vec<Observation>> {
        if observations.is_empty() {
            return Err(MarketAnalysisError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }

        let mut centroids = Vec::with_capacity(num_states);
        centroids.push(observations[rng.usize(0..observations.len())]);

        for _ in 1..num_states {
            let mut distances = Vec::with_capacity(observations.len());
            let mut total = 0.0;
            for obs in observations {
                let min_dist = centroids
                    .iter()
                    .map(|c| squared_distance(obs, c))
                    .fold(f64::INFINITY, f64::min);
                distances.push(min_dist);
                total += min_dist;
            }

            let target = rng.f64() * total;
            let mut cumulative = 0.0;
            let mut chosen = 0;
            for (i, &d) in distances.iter().enumerate() {
                cumulative += d;
                if cumulative >= target {
                    chosen = i;
                    break;
                }
            }
            centroids.push(observations[chosen]);
        }

        Ok(centroids)
    }
}

fn squared_distance(a: &Observation, b: &Observation) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    dx * dx + dy * dy
}

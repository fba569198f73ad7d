use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::GmmError;

/// Configures GMM training.
///
/// Defaults are sized for per-speaker models over 39-dim MFCC frames:
/// 16 diagonal components, 3 random restarts keeping the best fit,
/// up to 100 EM iterations with a 1e-3 convergence tolerance.
#[derive(Debug, Clone)]
pub struct GmmConfig {
    /// Number of mixture components (default: 16).
    pub n_components: usize,
    /// Number of random restarts; the fit with the best final
    /// log-likelihood wins (default: 3).
    pub n_init: usize,
    /// Maximum EM iterations per restart (default: 100).
    pub max_iter: usize,
    /// Convergence tolerance on the mean log-likelihood delta (default: 1e-3).
    pub tol: f64,
    /// Floor added to every variance after each M-step (default: 1e-6).
    pub reg_covar: f64,
    /// Fixed RNG seed. `None` draws entropy; set in tests for
    /// reproducible fits.
    pub seed: Option<u64>,
}

impl Default for GmmConfig {
    fn default() -> Self {
        Self {
            n_components: 16,
            n_init: 3,
            max_iter: 100,
            tol: 1e-3,
            reg_covar: 1e-6,
            seed: None,
        }
    }
}

/// Gaussian mixture model with diagonal covariances.
///
/// Parameters are plain vectors so the model serializes as an opaque
/// blob and reloads without loss of behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagGmm {
    /// Mixture weights, summing to 1.
    pub weights: Vec<f64>,
    /// Component means, `[n_components][dim]`.
    pub means: Vec<Vec<f64>>,
    /// Diagonal variances, `[n_components][dim]`.
    pub variances: Vec<Vec<f64>>,
}

impl DiagGmm {
    /// Fits a mixture to the given frames with EM.
    ///
    /// Each restart seeds component means from randomly chosen distinct
    /// frames, initializes variances from the global per-feature variance,
    /// and iterates E/M steps until the mean log-likelihood moves less
    /// than `tol` or `max_iter` is hit. The restart with the best final
    /// log-likelihood is kept.
    pub fn fit(frames: &[Vec<f32>], cfg: &GmmConfig) -> Result<Self, GmmError> {
        let first = frames.first().ok_or(GmmError::EmptyInput)?;
        let dim = first.len();
        if dim == 0 {
            return Err(GmmError::EmptyInput);
        }
        for f in frames {
            if f.len() != dim {
                return Err(GmmError::DimensionMismatch {
                    expected: dim,
                    got: f.len(),
                });
            }
        }
        let k = cfg.n_components.max(1);
        if frames.len() < k {
            return Err(GmmError::TooFewFrames {
                needed: k,
                got: frames.len(),
            });
        }

        let data: Vec<Vec<f64>> = frames
            .iter()
            .map(|f| f.iter().map(|&x| x as f64).collect())
            .collect();
        let global_var = global_variance(&data, cfg.reg_covar);

        let mut rng = match cfg.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };

        let mut best: Option<(DiagGmm, f64)> = None;
        for _ in 0..cfg.n_init.max(1) {
            let (model, ll) = em_single(&data, k, &global_var, cfg, &mut rng);
            match &best {
                Some((_, best_ll)) if *best_ll >= ll => {}
                _ => best = Some((model, ll)),
            }
        }
        // n_init >= 1, so best is always present.
        Ok(best.map(|(m, _)| m).ok_or(GmmError::EmptyInput)?)
    }

    /// Number of mixture components.
    pub fn n_components(&self) -> usize {
        self.weights.len()
    }

    /// Feature dimension.
    pub fn dimension(&self) -> usize {
        self.means.first().map(Vec::len).unwrap_or(0)
    }

    /// Log-density of a single frame under the mixture.
    pub fn log_prob(&self, frame: &[f32]) -> f64 {
        let mut terms = Vec::with_capacity(self.weights.len());
        for c in 0..self.weights.len() {
            terms.push(self.weights[c].max(f64::MIN_POSITIVE).ln()
                + log_gauss_diag(frame, &self.means[c], &self.variances[c]));
        }
        log_sum_exp(&terms)
    }

    /// Mean per-frame log-likelihood of a batch of frames.
    ///
    /// Length-normalized so utterances of different duration score on the
    /// same scale. Returns `EmptyInput` for zero frames and
    /// `DimensionMismatch` if any frame disagrees with the model.
    pub fn score(&self, frames: &[Vec<f32>]) -> Result<f64, GmmError> {
        if frames.is_empty() {
            return Err(GmmError::EmptyInput);
        }
        let dim = self.dimension();
        let mut total = 0.0;
        for f in frames {
            if f.len() != dim {
                return Err(GmmError::DimensionMismatch {
                    expected: dim,
                    got: f.len(),
                });
            }
            total += self.log_prob(f);
        }
        Ok(total / frames.len() as f64)
    }
}

/// One EM run from a fresh random initialization.
/// Returns the fitted model and its final mean log-likelihood.
fn em_single(
    data: &[Vec<f64>],
    k: usize,
    global_var: &[f64],
    cfg: &GmmConfig,
    rng: &mut StdRng,
) -> (DiagGmm, f64) {
    let n = data.len();
    let dim = data[0].len();

    // Means from k distinct random frames.
    let picks = rand::seq::index::sample(rng, n, k);
    let mut means: Vec<Vec<f64>> = picks.iter().map(|i| data[i].clone()).collect();
    let mut variances: Vec<Vec<f64>> = vec![global_var.to_vec(); k];
    let mut weights = vec![1.0 / k as f64; k];

    let mut prev_ll = f64::NEG_INFINITY;
    let mut ll = prev_ll;
    let mut resp = vec![vec![0.0f64; k]; n];

    for _ in 0..cfg.max_iter {
        // E-step: responsibilities and total log-likelihood.
        let mut total = 0.0;
        for (i, x) in data.iter().enumerate() {
            let mut terms = Vec::with_capacity(k);
            for c in 0..k {
                terms.push(
                    weights[c].max(f64::MIN_POSITIVE).ln()
                        + log_gauss_diag_f64(x, &means[c], &variances[c]),
                );
            }
            let lse = log_sum_exp(&terms);
            total += lse;
            for c in 0..k {
                resp[i][c] = (terms[c] - lse).exp();
            }
        }
        ll = total / n as f64;
        if (ll - prev_ll).abs() < cfg.tol {
            break;
        }
        prev_ll = ll;

        // M-step.
        for c in 0..k {
            let nk: f64 = resp.iter().map(|r| r[c]).sum();
            if nk < 1e-10 {
                // Dead component: reseed on a random frame.
                let i = rng.gen_range(0..n);
                means[c] = data[i].clone();
                variances[c] = global_var.to_vec();
                weights[c] = 1.0 / n as f64;
                continue;
            }
            weights[c] = nk / n as f64;
            for d in 0..dim {
                let mut m = 0.0;
                for (i, x) in data.iter().enumerate() {
                    m += resp[i][c] * x[d];
                }
                means[c][d] = m / nk;
            }
            for d in 0..dim {
                let mut v = 0.0;
                for (i, x) in data.iter().enumerate() {
                    let diff = x[d] - means[c][d];
                    v += resp[i][c] * diff * diff;
                }
                variances[c][d] = v / nk + cfg.reg_covar;
            }
        }
        // Renormalize weights after any reseeds.
        let wsum: f64 = weights.iter().sum();
        for w in &mut weights {
            *w /= wsum;
        }
    }

    (
        DiagGmm {
            weights,
            means,
            variances,
        },
        ll,
    )
}

/// Per-feature variance over the whole data set, floored.
fn global_variance(data: &[Vec<f64>], floor: f64) -> Vec<f64> {
    let n = data.len() as f64;
    let dim = data[0].len();
    let mut mean = vec![0.0f64; dim];
    for x in data {
        for d in 0..dim {
            mean[d] += x[d];
        }
    }
    for m in &mut mean {
        *m /= n;
    }
    let mut var = vec![0.0f64; dim];
    for x in data {
        for d in 0..dim {
            let diff = x[d] - mean[d];
            var[d] += diff * diff;
        }
    }
    var.into_iter().map(|v| (v / n).max(floor)).collect()
}

fn log_gauss_diag(x: &[f32], mean: &[f64], var: &[f64]) -> f64 {
    let mut acc = 0.0;
    for d in 0..mean.len() {
        let v = var[d];
        let diff = x[d] as f64 - mean[d];
        acc += -0.5 * (2.0 * PI * v).ln() - diff * diff / (2.0 * v);
    }
    acc
}

fn log_gauss_diag_f64(x: &[f64], mean: &[f64], var: &[f64]) -> f64 {
    let mut acc = 0.0;
    for d in 0..mean.len() {
        let v = var[d];
        let diff = x[d] - mean[d];
        acc += -0.5 * (2.0 * PI * v).ln() - diff * diff / (2.0 * v);
    }
    acc
}

/// Numerically stable log(sum(exp(terms))).
fn log_sum_exp(terms: &[f64]) -> f64 {
    let max = terms.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    let sum: f64 = terms.iter().map(|t| (t - max).exp()).sum();
    max + sum.ln()
}

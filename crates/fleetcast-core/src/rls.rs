//! Recursive Least Squares with exponential forgetting
//!
//! An online linear model `y ≈ theta · x` that is updated exactly (not
//! gradient-approximated) one observation at a time. The forgetting factor
//! `lambda` exponentially down-weights older observations, letting the
//! model track slowly drifting demand patterns.
//!
//! Each estimator owns its weight vector and covariance matrix outright;
//! [`Rls::state`] returns a deep copy so callers can never alias internal
//! buffers.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

/// Default forgetting factor
pub const DEFAULT_LAMBDA: f64 = 0.98;

/// Initial diagonal of the covariance matrix. Large values reflect high
/// initial uncertainty so early updates move the weights quickly.
pub const INITIAL_VARIANCE: f64 = 1000.0;

/// Update denominators below this magnitude indicate a numerically
/// degenerate step; the update is skipped to keep the state intact.
const DENOMINATOR_EPSILON: f64 = 1e-10;

/// Serializable snapshot of an RLS model.
///
/// Round-trips through JSON with numeric equality within floating-point
/// tolerance. `p` is row-major: `p[i][j]` is the covariance entry for
/// weights `i` and `j`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RlsState {
    /// Weight vector
    pub theta: Vec<f64>,
    /// Covariance matrix, `theta.len()` square
    pub p: Vec<Vec<f64>>,
}

/// Online linear estimator using recursive least squares.
///
/// # Example
///
/// ```rust
/// use fleetcast_core::rls::{Rls, DEFAULT_LAMBDA};
///
/// let mut model = Rls::new(2, DEFAULT_LAMBDA).unwrap();
/// for _ in 0..50 {
///     model.update(&[1.0, 2.0], 5.0);
/// }
/// let prediction = model.predict(&[1.0, 2.0]);
/// assert!((prediction - 5.0).abs() < 0.1);
/// ```
#[derive(Debug, Clone)]
pub struct Rls {
    dim: usize,
    lambda: f64,
    theta: Vec<f64>,
    p: Vec<Vec<f64>>,
}

impl Rls {
    /// Create a new estimator with `dim` features.
    ///
    /// Weights start at zero and the covariance matrix at
    /// `INITIAL_VARIANCE * I`.
    ///
    /// # Arguments
    ///
    /// * `dim` - Feature dimension (must be at least 1)
    /// * `lambda` - Forgetting factor in (0, 1]; 1 means no forgetting
    pub fn new(dim: usize, lambda: f64) -> Result<Self> {
        if dim == 0 {
            return Err(ForecastError::InvalidParameter {
                name: "dim".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if !(lambda > 0.0 && lambda <= 1.0) {
            return Err(ForecastError::InvalidParameter {
                name: "lambda".to_string(),
                reason: "must be in (0, 1]".to_string(),
            });
        }

        let mut p = vec![vec![0.0; dim]; dim];
        for (i, row) in p.iter_mut().enumerate() {
            row[i] = INITIAL_VARIANCE;
        }

        Ok(Self {
            dim,
            lambda,
            theta: vec![0.0; dim],
            p,
        })
    }

    /// Feature dimension of this estimator.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Predict `theta · x`. No side effects.
    ///
    /// Tolerates a feature vector shorter than the model dimension by
    /// summing only the available indices; the canonical contract is that
    /// `x` has exactly `dim` elements.
    pub fn predict(&self, x: &[f64]) -> f64 {
        self.theta.iter().zip(x.iter()).map(|(t, v)| t * v).sum()
    }

    /// One step of recursive least squares with forgetting.
    ///
    /// Returns `true` if the update was applied and `false` if it was
    /// skipped because the gain denominator was too close to zero to be
    /// numerically safe (the prior state is preserved in that case).
    ///
    /// Precondition: `x.len() == self.dim()`. Shorter vectors are a caller
    /// contract violation and leave the untouched trailing weights stale.
    pub fn update(&mut self, x: &[f64], y: f64) -> bool {
        let error = y - self.predict(x);

        // Px = P · x
        let px: Vec<f64> = self
            .p
            .iter()
            .map(|row| row.iter().zip(x.iter()).map(|(p, v)| p * v).sum())
            .collect();

        let x_px: f64 = x.iter().zip(px.iter()).map(|(v, p)| v * p).sum();
        let denominator = self.lambda + x_px;

        if denominator.abs() < DENOMINATOR_EPSILON {
            return false;
        }

        // P <- (P - Px·Pxᵀ / denom) / lambda
        for i in 0..self.dim {
            for j in 0..self.dim {
                self.p[i][j] = (self.p[i][j] - px[i] * px[j] / denominator) / self.lambda;
            }
        }

        // theta <- theta + error · Px / denom
        for (weight, gain) in self.theta.iter_mut().zip(px.iter()) {
            *weight += error * gain / denominator;
        }

        true
    }

    /// Deep-copy snapshot of the current weights and covariance.
    pub fn state(&self) -> RlsState {
        RlsState {
            theta: self.theta.clone(),
            p: self.p.clone(),
        }
    }

    /// Replace the weights and covariance wholesale.
    ///
    /// The state must match this estimator's dimension exactly; a mismatch
    /// yields [`ForecastError::CorruptState`] and leaves the model
    /// unchanged.
    pub fn set_state(&mut self, state: RlsState) -> Result<()> {
        if state.theta.len() != self.dim {
            return Err(ForecastError::CorruptState {
                reason: format!(
                    "theta has {} weights, expected {}",
                    state.theta.len(),
                    self.dim
                ),
            });
        }
        if state.p.len() != self.dim || state.p.iter().any(|row| row.len() != self.dim) {
            return Err(ForecastError::CorruptState {
                reason: format!("covariance matrix is not {dim}x{dim}", dim = self.dim),
            });
        }

        self.theta = state.theta;
        self.p = state.p;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==========================================================================
    // Construction Tests
    // ==========================================================================

    #[test]
    fn test_new_initializes_zero_weights_and_diagonal_covariance() {
        let model = Rls::new(3, DEFAULT_LAMBDA).unwrap();
        let state = model.state();

        assert_eq!(state.theta, vec![0.0, 0.0, 0.0]);
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { INITIAL_VARIANCE } else { 0.0 };
                assert_eq!(state.p[i][j], expected);
            }
        }
    }

    #[test]
    fn test_new_rejects_zero_dim() {
        assert!(Rls::new(0, DEFAULT_LAMBDA).is_err());
    }

    #[test]
    fn test_new_rejects_lambda_out_of_range() {
        assert!(Rls::new(4, 0.0).is_err());
        assert!(Rls::new(4, 1.5).is_err());
        assert!(Rls::new(4, -0.5).is_err());
        assert!(Rls::new(4, 1.0).is_ok());
    }

    // ==========================================================================
    // Prediction Tests
    // ==========================================================================

    #[test]
    fn test_predict_with_zero_weights_is_zero() {
        let model = Rls::new(5, DEFAULT_LAMBDA).unwrap();
        assert_eq!(model.predict(&[1.0, 2.0, 3.0, 4.0, 5.0]), 0.0);
        assert_eq!(model.predict(&[-10.0, 0.0, 99.0, 1e6, -1e6]), 0.0);
    }

    #[test]
    fn test_predict_after_set_state_zero_theta_is_zero() {
        let mut model = Rls::new(3, DEFAULT_LAMBDA).unwrap();
        model
            .set_state(RlsState {
                theta: vec![0.0; 3],
                p: vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0], vec![0.0, 0.0, 1.0]],
            })
            .unwrap();

        assert_eq!(model.predict(&[7.0, -3.0, 12.5]), 0.0);
    }

    #[test]
    fn test_predict_is_dot_product() {
        let mut model = Rls::new(3, DEFAULT_LAMBDA).unwrap();
        model
            .set_state(RlsState {
                theta: vec![1.0, 2.0, 3.0],
                p: vec![vec![0.0; 3]; 3],
            })
            .unwrap();

        assert!((model.predict(&[4.0, 5.0, 6.0]) - 32.0).abs() < 1e-12);
    }

    #[test]
    fn test_predict_tolerates_short_feature_vector() {
        let mut model = Rls::new(4, DEFAULT_LAMBDA).unwrap();
        model
            .set_state(RlsState {
                theta: vec![1.0, 1.0, 1.0, 1.0],
                p: vec![vec![0.0; 4]; 4],
            })
            .unwrap();

        // Only the first two indices participate.
        assert!((model.predict(&[2.0, 3.0]) - 5.0).abs() < 1e-12);
    }

    // ==========================================================================
    // Update / Convergence Tests
    // ==========================================================================

    #[test]
    fn test_update_converges_on_noiseless_linear_relationship() {
        // y = 3 * x for a fixed feature direction; squared error must
        // decrease monotonically and prediction approach the target.
        let mut model = Rls::new(2, DEFAULT_LAMBDA).unwrap();
        let x = [1.0, 0.5];
        let y = 3.0 * x[0] + 3.0 * x[1];

        let mut last_sq_error = f64::MAX;
        for _ in 0..30 {
            let sq_error = (y - model.predict(&x)).powi(2);
            assert!(sq_error <= last_sq_error + 1e-12);
            last_sq_error = sq_error;
            assert!(model.update(&x, y));
        }

        assert!((model.predict(&x) - y).abs() < 1e-3);
    }

    #[test]
    fn test_update_recovers_weights_from_varied_inputs() {
        // Noiseless y = 2*x0 - 1*x1 over varied inputs recovers theta.
        let mut model = Rls::new(2, 1.0).unwrap();
        let samples = [
            ([1.0, 0.0], 2.0),
            ([0.0, 1.0], -1.0),
            ([1.0, 1.0], 1.0),
            ([2.0, 1.0], 3.0),
            ([1.0, 3.0], -1.0),
            ([4.0, 2.0], 6.0),
        ];

        for _ in 0..10 {
            for (x, y) in &samples {
                model.update(x, *y);
            }
        }

        let state = model.state();
        assert!((state.theta[0] - 2.0).abs() < 1e-3, "theta0 {}", state.theta[0]);
        assert!((state.theta[1] + 1.0).abs() < 1e-3, "theta1 {}", state.theta[1]);
    }

    #[test]
    fn test_update_with_zero_features_is_harmless() {
        // x = 0 gives denom = lambda (well above epsilon): the update
        // applies but changes nothing, since every gain term is zero.
        let mut model = Rls::new(3, DEFAULT_LAMBDA).unwrap();
        let before = model.state();

        assert!(model.update(&[0.0, 0.0, 0.0], 42.0));
        assert_eq!(model.state().theta, before.theta);
    }

    #[test]
    fn test_degenerate_denominator_skips_update() {
        // Force a state whose covariance cancels lambda for this input,
        // driving the denominator to zero.
        let mut model = Rls::new(1, 1.0).unwrap();
        model
            .set_state(RlsState {
                theta: vec![5.0],
                p: vec![vec![-1.0]],
            })
            .unwrap();

        assert!(!model.update(&[1.0], 10.0));
        // State preserved rather than corrupted.
        assert_eq!(model.state().theta, vec![5.0]);
        assert_eq!(model.state().p, vec![vec![-1.0]]);
    }

    // ==========================================================================
    // State Snapshot / Round-Trip Tests
    // ==========================================================================

    #[test]
    fn test_state_is_a_deep_copy() {
        let mut model = Rls::new(2, DEFAULT_LAMBDA).unwrap();
        let snapshot = model.state();

        model.update(&[1.0, 2.0], 3.0);

        // The earlier snapshot must not observe the update.
        assert_eq!(snapshot.theta, vec![0.0, 0.0]);
        assert_eq!(snapshot.p[0][0], INITIAL_VARIANCE);
    }

    #[test]
    fn test_set_state_replaces_never_merges() {
        let mut model = Rls::new(2, DEFAULT_LAMBDA).unwrap();
        model.update(&[1.0, 1.0], 4.0);

        let replacement = RlsState {
            theta: vec![9.0, -9.0],
            p: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
        };
        model.set_state(replacement.clone()).unwrap();

        assert_eq!(model.state(), replacement);
    }

    #[test]
    fn test_set_state_rejects_dimension_mismatch() {
        let mut model = Rls::new(3, DEFAULT_LAMBDA).unwrap();

        let bad_theta = RlsState {
            theta: vec![1.0, 2.0],
            p: vec![vec![0.0; 3]; 3],
        };
        assert!(matches!(
            model.set_state(bad_theta),
            Err(ForecastError::CorruptState { .. })
        ));

        let bad_p = RlsState {
            theta: vec![1.0, 2.0, 3.0],
            p: vec![vec![0.0; 2]; 3],
        };
        assert!(model.set_state(bad_p).is_err());

        // Failed set_state leaves the model untouched.
        assert_eq!(model.state().theta, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_state_json_round_trip() {
        let mut model = Rls::new(4, DEFAULT_LAMBDA).unwrap();
        for i in 0..20 {
            let x = [1.0, i as f64, (i as f64).sin(), 0.25];
            model.update(&x, 2.0 + 0.5 * i as f64);
        }

        let state = model.state();
        let json = serde_json::to_string(&state).unwrap();
        let restored: RlsState = serde_json::from_str(&json).unwrap();

        for (a, b) in state.theta.iter().zip(restored.theta.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
        for (row_a, row_b) in state.p.iter().zip(restored.p.iter()) {
            for (a, b) in row_a.iter().zip(row_b.iter()) {
                assert!((a - b).abs() < 1e-9);
            }
        }
    }
}

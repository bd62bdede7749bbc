use faer::{c64, Col, ColRef, Mat};

use crate::pod::PodFactorization;

/// Error types for decomposition and sparsification operations.
#[derive(Debug, thiserror::Error)]
pub enum DmdError {
    /// Fewer than two snapshots remain after the burn-in offset, so no
    /// past/current pair can be formed. Raised before any factorization work.
    #[error("insufficient snapshots: {available} remain after burn-in {burn}, need at least 2")]
    InsufficientSnapshots { available: usize, burn: usize },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The SVD or eigendecomposition backend failed to converge.
    #[error("factorization failed: {0}")]
    Factorization(String),

    /// Building the reduced operator would divide by a singular value below
    /// the rank tolerance. The past snapshots are linearly dependent, or an
    /// explicit rank request reaches beyond the numerical rank of the data.
    #[error(
        "ill-conditioned operator: singular value {value:.3e} at index {index} is below the rank tolerance"
    )]
    IllConditionedOperator { index: usize, value: f64 },

    /// The amplitude weight matrix is not positive definite, so the
    /// Cholesky solve for optimal amplitudes cannot proceed.
    #[error("singular weight matrix: {0}")]
    SingularWeightMatrix(String),

    /// The KKT refinement system is singular or over-constrained for the
    /// requested sparsity pattern.
    #[error("amplitude polishing failed: {0}")]
    Polishing(String),
}

/// Configuration for the [`dmd`](crate::dmd::dmd) pipeline.
#[derive(Debug, Clone)]
pub struct DmdConfig {
    /// Leading snapshots to discard before the past/current split.
    /// Nonzero values skip spin-up transients.
    pub burn: usize,
    /// Optional cap on the retained modal rank. None keeps every singular
    /// value above the rank tolerance. Requesting a rank that would retain
    /// sub-tolerance singular values is an error, not a silent division.
    pub rank: Option<usize>,
    /// Relative rank tolerance as a fraction of the largest singular value.
    /// None uses `max(dims) * f64::EPSILON`.
    pub rank_tolerance: Option<f64>,
    /// Time step between snapshots (only affects spectrum units).
    pub dt: f64,
}

impl Default for DmdConfig {
    fn default() -> Self {
        Self {
            burn: 0,
            rank: None,
            rank_tolerance: None,
            dt: 1.0,
        }
    }
}

/// Quadratic form J(a) = Re(aᴴ P a) - 2 Re(qᴴ a) + s measuring the squared
/// reconstruction deviation of an amplitude vector.
#[derive(Debug, Clone)]
pub struct QuadraticForm {
    /// Mode interaction matrix (Yᴴ Y) ⊙ conj(Z Zᴴ), Hermitian PSD (r × r).
    pub p: Mat<c64>,
    /// Projection of the snapshot trajectory onto the modes (r).
    pub q: Col<c64>,
    /// Total snapshot energy Σ σᵢ².
    pub s: f64,
}

impl QuadraticForm {
    /// Side length of P (number of modes).
    pub fn size(&self) -> usize {
        self.q.nrows()
    }

    /// Evaluate J(a). The imaginary round-off of the Hermitian form is
    /// discarded; the value is mathematically real.
    pub fn objective(&self, a: ColRef<'_, c64>) -> f64 {
        let n = self.size();
        let mut quad = c64::new(0.0, 0.0);
        for i in 0..n {
            for j in 0..n {
                quad += a[i].conj() * self.p[(i, j)] * a[j];
            }
        }
        let mut cross = c64::new(0.0, 0.0);
        for i in 0..n {
            cross += self.q[i].conj() * a[i];
        }
        quad.re - 2.0 * cross.re + self.s
    }
}

/// Result of the decomposition pipeline. Owns every array it holds; the
/// snapshot matrix it was computed from can be dropped freely.
#[derive(Debug, Clone)]
pub struct DmdResult {
    /// Eigenvalues λ of the reduced operator (r), sorted by |λ| descending.
    pub eigenvalues: Vec<c64>,
    /// Eigenvectors Y of the reduced operator, one column per eigenvalue (r × r).
    pub eigenvectors: Mat<c64>,
    /// Optimal amplitudes a, the exact minimizer of [`weights`](Self::weights) (r).
    pub amplitudes: Col<c64>,
    /// Amplitude-weighted spatial modes Re(U Y diag(a)) (n_samples × r).
    pub modes: Mat<f64>,
    /// Quadratic form consumed by the sparsification stage.
    pub weights: QuadraticForm,
    /// POD basis the reduced operator was built in, truncated to `rank`.
    pub pod: PodFactorization,
    /// Retained modal rank r.
    pub rank: usize,
    /// Time step between snapshots.
    pub dt: f64,
}

impl DmdResult {
    /// Number of state samples per snapshot.
    pub fn n_samples(&self) -> usize {
        self.modes.nrows()
    }

    /// Length of the past snapshot window the amplitudes were fit over.
    pub fn n_past(&self) -> usize {
        self.pod.temporal.nrows()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DmdConfig::default();
        assert_eq!(config.burn, 0);
        assert!(config.rank.is_none());
        assert!(config.rank_tolerance.is_none());
        assert_eq!(config.dt, 1.0);
    }

    #[test]
    fn test_objective_matches_hand_computation() {
        // P = diag(2, 4), q = [1, 1 + 0.5i], s = 3
        let p = Mat::from_fn(2, 2, |i, j| {
            if i == j {
                c64::new(2.0 * (i + 1) as f64, 0.0)
            } else {
                c64::new(0.0, 0.0)
            }
        });
        let q = Col::from_fn(2, |i| c64::new(1.0, i as f64 * 0.5));
        let form = QuadraticForm { p, q, s: 3.0 };

        let a = Col::from_fn(2, |i| c64::new(1.0 - i as f64 * 0.5, 0.25));
        let quad = 2.0 * (1.0 + 0.0625) + 4.0 * (0.25 + 0.0625);
        let cross = 1.0 + (0.5 + 0.5 * 0.25);
        let expected = quad - 2.0 * cross + 3.0;
        assert!((form.objective(a.as_ref()) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_objective_at_zero_is_total_energy() {
        let p = Mat::from_fn(3, 3, |i, j| {
            if i == j {
                c64::new(1.0, 0.0)
            } else {
                c64::new(0.0, 0.0)
            }
        });
        let q = Col::from_fn(3, |i| c64::new(i as f64, -1.0));
        let form = QuadraticForm { p, q, s: 42.0 };
        let zero = Col::from_fn(3, |_| c64::new(0.0, 0.0));
        assert_eq!(form.objective(zero.as_ref()), 42.0);
    }

    #[test]
    fn test_error_messages_carry_context() {
        let err = DmdError::InsufficientSnapshots {
            available: 1,
            burn: 4,
        };
        let text = err.to_string();
        assert!(text.contains('1'));
        assert!(text.contains('4'));

        let err = DmdError::IllConditionedOperator {
            index: 3,
            value: 1e-17,
        };
        assert!(err.to_string().contains("index 3"));
    }
}

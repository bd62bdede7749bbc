//! ADMM sparsification of mode amplitudes.
//!
//! Trades reconstruction fidelity for a small set of active modes by
//! minimizing J(a) + γ Σ |aᵢ| with the alternating direction method of
//! multipliers. The splitting keeps the quadratic part in `x`, the
//! l1 part in `z`, and couples them through the scaled dual `y`:
//!
//! 1. x-update: solve (P + ρ/2·I) x = q + ρ/2·(z − y/ρ)
//! 2. z-update: soft-threshold x + y/ρ at γ/ρ
//! 3. dual update: y += ρ (x − z)
//!
//! Iteration stops when both feasibility residuals drop under their
//! tolerances, or at `max_iter` (reported, not fatal). The thresholded
//! amplitudes then go through the KKT polisher for bias removal.

use faer::linalg::solvers::Solve;
use faer::{c64, Col, Mat, Side};
use log::{debug, trace, warn};
use rayon::prelude::*;

use crate::polish::{self, ZERO_AMPLITUDE_TOLERANCE};
use crate::types::{DmdError, DmdResult, QuadraticForm};

/// ADMM iteration controls.
#[derive(Debug, Clone)]
pub struct SparsifyOptions {
    /// Augmented Lagrangian penalty ρ.
    pub rho: f64,
    /// Iteration cap. Exhaustion is reported in the result, not an error.
    pub max_iter: usize,
    /// Absolute feasibility tolerance.
    pub absolute_tol: f64,
    /// Relative feasibility tolerance.
    pub relative_tol: f64,
}

impl Default for SparsifyOptions {
    fn default() -> Self {
        Self {
            rho: 1.0,
            max_iter: 10_000,
            absolute_tol: 1e-6,
            relative_tol: 1e-4,
        }
    }
}

/// Iteration summary of one ADMM run.
#[derive(Debug, Clone, Copy)]
pub struct AdmmReport {
    /// Iterations actually performed.
    pub iterations: usize,
    /// Whether both residuals dropped under their tolerances.
    pub converged: bool,
    /// Final primal residual ‖x − z‖.
    pub primal_residual: f64,
    /// Final dual residual ρ ‖z − z_prev‖.
    pub dual_residual: f64,
    /// Final primal tolerance √n·atol + rtol·max(‖x‖, ‖z‖).
    pub eps_primal: f64,
    /// Final dual tolerance √n·atol + rtol·‖y‖.
    pub eps_dual: f64,
}

/// Sparse amplitude selection at one value of gamma.
#[derive(Debug, Clone)]
pub struct SparseDmdResult {
    /// Sparsity weight this run used.
    pub gamma: f64,
    /// Thresholded ADMM amplitudes with exact structural zeros (r).
    pub amplitudes: Col<c64>,
    /// Count of surviving amplitudes.
    pub n_nonzero: usize,
    /// Objective value of the thresholded amplitudes, before polishing.
    pub pre_polish_norm: f64,
    /// Re-optimized amplitudes with the zero pattern held fixed (r).
    pub polished_amplitudes: Col<c64>,
    /// Objective value of the polished amplitudes.
    pub residual: f64,
    /// 100 · sqrt(|residual| / s), percent loss against the full signal.
    pub performance_loss: f64,
    /// Iteration summary.
    pub admm: AdmmReport,
}

/// Sparsify the amplitudes of a decomposition at one sparsity weight.
///
/// Leaves `result` untouched; the returned record carries both the raw
/// thresholded amplitudes and their polished refinement. A gamma of zero
/// reproduces the dense amplitudes (no thresholding takes place).
pub fn sparsify(
    result: &DmdResult,
    gamma: f64,
    options: &SparsifyOptions,
) -> Result<SparseDmdResult, DmdError> {
    validate_options(gamma, options)?;
    let weights = &result.weights;
    let (amplitudes, admm) = admm_iterate(weights, gamma, options)?;

    let n = weights.size();
    let n_nonzero = (0..n)
        .filter(|&i| amplitudes[i].norm() >= ZERO_AMPLITUDE_TOLERANCE)
        .count();
    let pre_polish_norm = weights.objective(amplitudes.as_ref());
    let polished = polish::polish(weights, amplitudes.as_ref())?;

    Ok(SparseDmdResult {
        gamma,
        amplitudes,
        n_nonzero,
        pre_polish_norm,
        polished_amplitudes: polished.amplitudes,
        residual: polished.residual,
        performance_loss: polished.performance_loss,
        admm,
    })
}

/// Run independent sparsifications over a gamma grid in parallel.
///
/// Results come back in the order of `gammas`. The usual workflow sweeps
/// a logarithmic grid and picks the knee of the loss/sparsity trade-off.
pub fn sparsify_sweep(
    result: &DmdResult,
    gammas: &[f64],
    options: &SparsifyOptions,
) -> Result<Vec<SparseDmdResult>, DmdError> {
    gammas
        .par_iter()
        .map(|&gamma| sparsify(result, gamma, options))
        .collect()
}

fn validate_options(gamma: f64, options: &SparsifyOptions) -> Result<(), DmdError> {
    if !gamma.is_finite() || gamma < 0.0 {
        return Err(DmdError::InvalidInput(format!(
            "gamma must be finite and non-negative, got {gamma}"
        )));
    }
    if !options.rho.is_finite() || options.rho <= 0.0 {
        return Err(DmdError::InvalidInput(format!(
            "rho must be finite and positive, got {}",
            options.rho
        )));
    }
    if options.max_iter == 0 {
        return Err(DmdError::InvalidInput(
            "max_iter must be at least 1".to_string(),
        ));
    }
    if !options.absolute_tol.is_finite() || options.absolute_tol <= 0.0 {
        return Err(DmdError::InvalidInput(format!(
            "absolute_tol must be finite and positive, got {}",
            options.absolute_tol
        )));
    }
    if !options.relative_tol.is_finite() || options.relative_tol < 0.0 {
        return Err(DmdError::InvalidInput(format!(
            "relative_tol must be finite and non-negative, got {}",
            options.relative_tol
        )));
    }
    Ok(())
}

/// The ADMM loop. Returns the final thresholded iterate and its report.
fn admm_iterate(
    weights: &QuadraticForm,
    gamma: f64,
    options: &SparsifyOptions,
) -> Result<(Col<c64>, AdmmReport), DmdError> {
    let n = weights.size();
    let rho = options.rho;
    let threshold = gamma / rho;
    let sqrt_n = (n as f64).sqrt();

    // P + ρ/2·I is Hermitian positive definite; one factorization serves
    // every x-update.
    let mut shifted = weights.p.clone();
    for i in 0..n {
        shifted[(i, i)] += c64::new(rho / 2.0, 0.0);
    }
    let chol = shifted.llt(Side::Lower).map_err(|e| {
        DmdError::SingularWeightMatrix(format!(
            "shifted weight matrix is not positive definite: {e:?}"
        ))
    })?;

    let mut z: Col<c64> = Col::zeros(n);
    let mut y: Col<c64> = Col::zeros(n);
    let mut report = AdmmReport {
        iterations: 0,
        converged: false,
        primal_residual: f64::INFINITY,
        dual_residual: f64::INFINITY,
        eps_primal: 0.0,
        eps_dual: 0.0,
    };

    for step in 0..options.max_iter {
        let rhs = Mat::from_fn(n, 1, |i, _| {
            weights.q[i] + (z[i] - y[i] * (1.0 / rho)) * (rho / 2.0)
        });
        let x = chol.solve(&rhs);

        let mut z_new: Col<c64> = Col::zeros(n);
        for i in 0..n {
            z_new[i] = soft_threshold(x[(i, 0)] + y[i] * (1.0 / rho), threshold);
        }

        let mut primal_sq = 0.0;
        let mut dual_sq = 0.0;
        for i in 0..n {
            primal_sq += (x[(i, 0)] - z_new[i]).norm_sqr();
            dual_sq += (z_new[i] - z[i]).norm_sqr();
        }
        let primal_residual = primal_sq.sqrt();
        let dual_residual = rho * dual_sq.sqrt();

        for i in 0..n {
            y[i] += (x[(i, 0)] - z_new[i]) * rho;
        }

        let mut x_sq = 0.0;
        let mut z_sq = 0.0;
        let mut y_sq = 0.0;
        for i in 0..n {
            x_sq += x[(i, 0)].norm_sqr();
            z_sq += z_new[i].norm_sqr();
            y_sq += y[i].norm_sqr();
        }
        let eps_primal =
            sqrt_n * options.absolute_tol + options.relative_tol * x_sq.max(z_sq).sqrt();
        let eps_dual = sqrt_n * options.absolute_tol + options.relative_tol * y_sq.sqrt();

        z = z_new;
        report = AdmmReport {
            iterations: step + 1,
            converged: primal_residual < eps_primal && dual_residual < eps_dual,
            primal_residual,
            dual_residual,
            eps_primal,
            eps_dual,
        };

        if step % 50 == 0 {
            trace!(
                "admm step {step}: primal {primal_residual:.3e}/{eps_primal:.3e}, dual {dual_residual:.3e}/{eps_dual:.3e}"
            );
        }
        if report.converged {
            debug!(
                "admm converged after {} iterations (gamma {gamma})",
                report.iterations
            );
            break;
        }
    }

    if !report.converged {
        warn!(
            "admm exhausted {} iterations without convergence (gamma {gamma}, primal {:.3e}, dual {:.3e})",
            options.max_iter, report.primal_residual, report.dual_residual
        );
    }
    Ok((z, report))
}

/// Complex soft threshold: shrink the magnitude by `threshold`, keep the
/// phase, zero out anything at or below the threshold.
fn soft_threshold(v: c64, threshold: f64) -> c64 {
    let magnitude = v.norm();
    if magnitude > threshold {
        v * (1.0 - threshold / magnitude)
    } else {
        c64::new(0.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_near(a: f64, b: f64, eps: f64) {
        assert!(
            (a - b).abs() < eps,
            "expected {a} ≈ {b} (diff = {})",
            (a - b).abs()
        );
    }

    fn diag_form(diag: &[f64], q: &[(f64, f64)], s: f64) -> QuadraticForm {
        let n = diag.len();
        QuadraticForm {
            p: Mat::from_fn(n, n, |i, j| {
                if i == j {
                    c64::new(diag[i], 0.0)
                } else {
                    c64::new(0.0, 0.0)
                }
            }),
            q: Col::from_fn(n, |i| c64::new(q[i].0, q[i].1)),
            s,
        }
    }

    #[test]
    fn test_default_options() {
        let options = SparsifyOptions::default();
        assert_eq!(options.rho, 1.0);
        assert_eq!(options.max_iter, 10_000);
        assert_eq!(options.absolute_tol, 1e-6);
        assert_eq!(options.relative_tol, 1e-4);
    }

    #[test]
    fn test_soft_threshold_zeroes_small_values() {
        assert_eq!(soft_threshold(c64::new(0.3, 0.4), 0.5), c64::new(0.0, 0.0));
        assert_eq!(soft_threshold(c64::new(0.0, 0.0), 0.0), c64::new(0.0, 0.0));
    }

    #[test]
    fn test_soft_threshold_shrinks_preserving_phase() {
        let v = c64::new(3.0, 4.0);
        let out = soft_threshold(v, 1.0);
        // magnitude 5 shrinks to 4, phase unchanged
        assert_near(out.norm(), 4.0, 1e-12);
        assert_near(out.arg(), v.arg(), 1e-12);
    }

    #[test]
    fn test_soft_threshold_identity_at_zero() {
        let v = c64::new(-0.7, 0.2);
        assert_eq!(soft_threshold(v, 0.0), v);
    }

    #[test]
    fn test_admm_drops_weak_mode() {
        // strong mode at q0, weak mode at q1; moderate gamma kills the weak one
        let form = diag_form(&[4.0, 4.0], &[(8.0, 0.0), (0.4, 0.0)], 20.0);
        let (z, report) = admm_iterate(&form, 1.0, &SparsifyOptions::default()).unwrap();
        assert!(report.converged);
        assert!(z[0].norm() > 1.0);
        assert_eq!(z[1], c64::new(0.0, 0.0));
    }

    #[test]
    fn test_admm_zero_gamma_recovers_dense_solution() {
        let form = diag_form(&[2.0, 5.0], &[(4.0, 2.0), (-5.0, 10.0)], 30.0);
        let (z, report) = admm_iterate(&form, 0.0, &SparsifyOptions::default()).unwrap();
        assert!(report.converged);
        // dense solution is P⁻¹ q
        assert_near(z[0].re, 2.0, 1e-3);
        assert_near(z[0].im, 1.0, 1e-3);
        assert_near(z[1].re, -1.0, 1e-3);
        assert_near(z[1].im, 2.0, 1e-3);
    }

    /// Minimal decomposition carrying just the weights, for options tests.
    fn make_result(weights: QuadraticForm) -> DmdResult {
        let n = weights.size();
        DmdResult {
            eigenvalues: vec![c64::new(1.0, 0.0); n],
            eigenvectors: Mat::<c64>::identity(n, n),
            amplitudes: Col::zeros(n),
            modes: Mat::<f64>::zeros(n, n),
            weights,
            pod: crate::pod::PodFactorization {
                spatial: Mat::<c64>::identity(n, n),
                singular_values: vec![1.0; n],
                temporal: Mat::<c64>::identity(n, n),
            },
            rank: n,
            dt: 1.0,
        }
    }

    #[test]
    fn test_validate_rejects_bad_parameters() {
        let result = make_result(diag_form(&[1.0], &[(1.0, 0.0)], 1.0));

        let bad_gamma = sparsify(&result, -1.0, &SparsifyOptions::default());
        assert!(matches!(bad_gamma, Err(DmdError::InvalidInput(_))));

        let bad_rho = SparsifyOptions {
            rho: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            sparsify(&result, 1.0, &bad_rho),
            Err(DmdError::InvalidInput(_))
        ));

        let bad_iter = SparsifyOptions {
            max_iter: 0,
            ..Default::default()
        };
        assert!(matches!(
            sparsify(&result, 1.0, &bad_iter),
            Err(DmdError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_sparsify_reports_nonzero_count_and_polish() {
        // strong mode survives gamma, weak mode is zeroed and polished away
        let result = make_result(diag_form(&[4.0, 4.0], &[(8.0, 0.0), (0.4, 0.0)], 20.0));
        let sparse = sparsify(&result, 1.0, &SparsifyOptions::default()).unwrap();

        assert_eq!(sparse.n_nonzero, 1);
        assert_eq!(sparse.amplitudes[1], c64::new(0.0, 0.0));
        assert_eq!(sparse.polished_amplitudes[1], c64::new(0.0, 0.0));
        // polish restores the unconstrained optimum in the surviving slot
        assert_near(sparse.polished_amplitudes[0].re, 2.0, 1e-9);
        // polishing never increases the objective
        assert!(sparse.residual <= sparse.pre_polish_norm + 1e-9);
    }
}

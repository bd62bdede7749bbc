use faer::linalg::solvers::Solve;
use faer::{c64, Col, Mat, MatRef, Side};
use log::debug;

use crate::pod::{self, PodFactorization};
use crate::snapshots::SnapshotMatrix;
use crate::types::{DmdConfig, DmdError, DmdResult, QuadraticForm};
use crate::utils::numerical_rank;

/// Perform Dynamic Mode Decomposition on a snapshot matrix.
///
/// # Arguments
/// * `snapshots` - Complex state snapshots, columns time-ordered.
/// * `config` - Burn-in, rank control, and time step.
///
/// # Algorithm
/// 1. Split into past = M[:, b..n-1] and current = M[:, b+1..n]
/// 2. Economy SVD: past ≈ U Σ Vᴴ, truncated at the numerical rank
/// 3. Reduced operator: F = Uᴴ · current · V · Σ⁻¹
/// 4. Eigendecomposition: F Y = Y Λ, sorted by |λ| descending
/// 5. Vandermonde Z from Λ, weights (P, q, s), amplitudes a = P⁻¹ q
/// 6. Weighted modes: Re(U Y diag(a))
///
/// The amplitudes minimize ‖Σ Vᴴ − Y diag(a) Z‖_F², so the returned
/// decomposition reproduces the snapshot trajectory as well as the
/// retained rank allows.
pub fn dmd(snapshots: &SnapshotMatrix, config: &DmdConfig) -> Result<DmdResult, DmdError> {
    let (past, current) = snapshots.split(config.burn)?;
    debug!(
        "dmd: {} samples, {} snapshot pairs, burn {}",
        past.nrows(),
        past.ncols(),
        config.burn
    );

    let pod_full = pod::factorize(past)?;
    let rank = select_rank(&pod_full, config)?;
    let mut pod = pod_full.truncate(rank);
    let mut reduced = reduced_operator(&pod, current);

    // The reduced operator can lose rank relative to the POD basis when the
    // current window leaves the span of the past window. Rebuild in the
    // smaller basis so the eigendecomposition stays square of full rank.
    let operator_rank = operator_numerical_rank(reduced.as_ref(), config)?;
    if operator_rank == 0 {
        return Err(DmdError::IllConditionedOperator {
            index: 0,
            value: 0.0,
        });
    }
    if operator_rank < pod.rank() {
        pod = pod_full.truncate(operator_rank);
        reduced = reduced_operator(&pod, current);
    }
    debug!(
        "dmd: retained rank {} of {} singular values",
        pod.rank(),
        pod_full.rank()
    );

    let (eigenvalues, eigenvectors) = eigendecompose(reduced.as_ref())?;
    let vandermonde = vandermonde(&eigenvalues, pod.temporal.nrows());
    let weights = quadratic_form(&pod, eigenvectors.as_ref(), vandermonde.as_ref());
    let amplitudes = solve_amplitudes(&weights)?;
    let modes = weighted_modes(&pod, eigenvectors.as_ref(), &amplitudes);

    Ok(DmdResult {
        eigenvalues,
        eigenvectors,
        amplitudes,
        modes,
        weights,
        rank: pod.rank(),
        pod,
        dt: config.dt,
    })
}

/// Pick the retained rank from the singular value profile.
///
/// Default: every value above the relative tolerance. An explicit request
/// is honored when it stays within the numerical rank and fails otherwise,
/// since keeping sub-tolerance values means dividing by them next.
fn select_rank(pod: &PodFactorization, config: &DmdConfig) -> Result<usize, DmdError> {
    let sv = &pod.singular_values;
    let dims = (pod.spatial.nrows(), pod.temporal.nrows());
    let by_tolerance = numerical_rank(sv, dims, config.rank_tolerance);
    if by_tolerance == 0 {
        return Err(DmdError::IllConditionedOperator {
            index: 0,
            value: sv.first().copied().unwrap_or(0.0),
        });
    }
    match config.rank {
        Some(requested) => {
            let capped = requested.min(sv.len()).max(1);
            if capped > by_tolerance {
                return Err(DmdError::IllConditionedOperator {
                    index: by_tolerance,
                    value: sv[by_tolerance],
                });
            }
            Ok(capped)
        }
        None => Ok(by_tolerance),
    }
}

/// F = Uᴴ · current · V · Σ⁻¹ (division realized as column scaling).
fn reduced_operator(pod: &PodFactorization, current: MatRef<'_, c64>) -> Mat<c64> {
    let mut reduced = pod.spatial.adjoint() * current * &pod.temporal;
    for j in 0..reduced.ncols() {
        let inv = 1.0 / pod.singular_values[j];
        for i in 0..reduced.nrows() {
            reduced[(i, j)] *= inv;
        }
    }
    reduced
}

/// Numerical rank of the reduced operator, by the same tolerance rule as
/// the POD truncation.
fn operator_numerical_rank(f: MatRef<'_, c64>, config: &DmdConfig) -> Result<usize, DmdError> {
    let svd = f
        .svd()
        .map_err(|e| DmdError::Factorization(format!("operator rank probe failed: {e:?}")))?;
    let s = svd.S().column_vector();
    let sv: Vec<f64> = (0..s.nrows()).map(|i| s[i].re).collect();
    Ok(numerical_rank(&sv, (f.nrows(), f.ncols()), config.rank_tolerance))
}

/// Eigendecomposition of the reduced operator, eigenpairs sorted by
/// magnitude descending.
fn eigendecompose(f: MatRef<'_, c64>) -> Result<(Vec<c64>, Mat<c64>), DmdError> {
    let eigen = f
        .eigen()
        .map_err(|e| DmdError::Factorization(format!("eigendecomposition failed: {e:?}")))?;
    let values = eigen.S().column_vector();
    let vectors = eigen.U();
    let r = values.nrows();

    let mut order: Vec<usize> = (0..r).collect();
    order.sort_by(|&a, &b| {
        values[b]
            .norm()
            .partial_cmp(&values[a].norm())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let eigenvalues: Vec<c64> = order.iter().map(|&i| values[i]).collect();
    let eigenvectors = Mat::from_fn(r, r, |i, j| vectors[(i, order[j])]);
    Ok((eigenvalues, eigenvectors))
}

/// Z[i, n] = λᵢⁿ over the past window, built by cumulative products.
fn vandermonde(eigenvalues: &[c64], n_past: usize) -> Mat<c64> {
    let r = eigenvalues.len();
    let mut z: Mat<c64> = Mat::zeros(r, n_past);
    for i in 0..r {
        let mut power = c64::new(1.0, 0.0);
        for n in 0..n_past {
            z[(i, n)] = power;
            power *= eigenvalues[i];
        }
    }
    z
}

/// Weight triple of the amplitude objective:
/// P = (Yᴴ Y) ⊙ conj(Z Zᴴ), q = conj(diag(Z V Σ Y)), s = Σ σᵢ².
fn quadratic_form(
    pod: &PodFactorization,
    y: MatRef<'_, c64>,
    z: MatRef<'_, c64>,
) -> QuadraticForm {
    let r = pod.rank();
    let gram_y = y.adjoint() * y;
    let gram_z = z * z.adjoint();
    let p = Mat::from_fn(r, r, |i, j| gram_y[(i, j)] * gram_z[(i, j)].conj());

    // Z V Σ scales the columns of Z V; the diagonal of its product with Y
    // projects the trajectory onto each mode.
    let mut zv = z * &pod.temporal;
    for j in 0..r {
        for i in 0..r {
            zv[(i, j)] *= pod.singular_values[j];
        }
    }
    let projected = &zv * y;
    let q = Col::from_fn(r, |i| projected[(i, i)].conj());

    let s: f64 = pod.singular_values.iter().map(|v| v * v).sum();
    QuadraticForm { p, q, s }
}

/// Solve P a = q through the Cholesky factor of P.
fn solve_amplitudes(weights: &QuadraticForm) -> Result<Col<c64>, DmdError> {
    let n = weights.size();
    let chol = weights.p.llt(Side::Lower).map_err(|e| {
        DmdError::SingularWeightMatrix(format!("weight matrix is not positive definite: {e:?}"))
    })?;
    let rhs = Mat::from_fn(n, 1, |i, _| weights.q[i]);
    let solution = chol.solve(&rhs);
    Ok(solution.col(0).to_owned())
}

/// Re(U Y diag(a)): real spatial structures weighted by their amplitudes.
fn weighted_modes(
    pod: &PodFactorization,
    y: MatRef<'_, c64>,
    amplitudes: &Col<c64>,
) -> Mat<f64> {
    let projected = &pod.spatial * y;
    Mat::from_fn(projected.nrows(), projected.ncols(), |i, j| {
        (projected[(i, j)] * amplitudes[j]).re
    })
}

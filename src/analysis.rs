//! Spectrum and reconstruction diagnostics for a computed decomposition.

use std::f64::consts::PI;

use faer::{c64, ColRef, Mat};

use crate::snapshots::SnapshotMatrix;
use crate::types::{DmdError, DmdResult};

/// Per-mode spectral summary derived from one eigenvalue/amplitude pair.
#[derive(Debug, Clone)]
pub struct ModeInfo {
    /// Position in the decomposition (eigenvalues are sorted by |λ| descending).
    pub index: usize,
    /// Discrete-time eigenvalue λ.
    pub eigenvalue: c64,
    /// |λ|. Above one the mode grows, below one it decays.
    pub magnitude: f64,
    /// Oscillation frequency arg(λ) / (2π dt), in cycles per time unit.
    /// Conjugate pairs show up with opposite signs.
    pub frequency: f64,
    /// Continuous-time growth rate ln|λ| / dt.
    pub growth_rate: f64,
    /// Amplitude magnitude |aᵢ|.
    pub amplitude: f64,
}

/// Summarize the eigenvalue spectrum of a decomposition.
pub fn spectrum(result: &DmdResult) -> Vec<ModeInfo> {
    let dt = result.dt;
    (0..result.rank)
        .map(|i| {
            let lambda = result.eigenvalues[i];
            let magnitude = lambda.norm();
            ModeInfo {
                index: i,
                eigenvalue: lambda,
                magnitude,
                frequency: lambda.arg() / (2.0 * PI * dt),
                growth_rate: magnitude.ln() / dt,
                amplitude: result.amplitudes[i].norm(),
            }
        })
        .collect()
}

/// Reconstruct the fitted snapshot window from the modal expansion.
///
/// X_recon[:, t] = Σⱼ (U Y)ⱼ · aⱼ · λⱼᵗ
///
/// With `amplitudes = None` the optimal dense amplitudes are used; passing
/// a sparsified vector shows what the surviving modes alone reproduce.
pub fn reconstruct(
    result: &DmdResult,
    amplitudes: Option<ColRef<'_, c64>>,
) -> Result<Mat<c64>, DmdError> {
    let amplitudes = match amplitudes {
        Some(a) => {
            if a.nrows() != result.rank {
                return Err(DmdError::InvalidInput(format!(
                    "amplitude override has {} entries, expected {}",
                    a.nrows(),
                    result.rank
                )));
            }
            a
        }
        None => result.amplitudes.as_ref(),
    };

    let projected = &result.pod.spatial * &result.eigenvectors;
    let n_samples = projected.nrows();
    let n_past = result.n_past();

    let mut recon = Mat::<c64>::zeros(n_samples, n_past);
    let mut powers = vec![c64::new(1.0, 0.0); result.rank];
    for t in 0..n_past {
        for j in 0..result.rank {
            let weight = amplitudes[j] * powers[j];
            for i in 0..n_samples {
                recon[(i, t)] += projected[(i, j)] * weight;
            }
            powers[j] *= result.eigenvalues[j];
        }
    }
    Ok(recon)
}

/// Relative Frobenius error of the modal reconstruction against the past
/// snapshot window.
///
/// `burn` must match the offset the decomposition was fit with; a window
/// shape mismatch is rejected rather than silently compared.
pub fn reconstruction_error(
    result: &DmdResult,
    snapshots: &SnapshotMatrix,
    burn: usize,
    amplitudes: Option<ColRef<'_, c64>>,
) -> Result<f64, DmdError> {
    let (past, _) = snapshots.split(burn)?;
    if past.nrows() != result.n_samples() || past.ncols() != result.n_past() {
        return Err(DmdError::InvalidInput(format!(
            "snapshot window is {} x {}, decomposition was fit on {} x {}",
            past.nrows(),
            past.ncols(),
            result.n_samples(),
            result.n_past()
        )));
    }

    let recon = reconstruct(result, amplitudes)?;
    let mut diff_sq = 0.0;
    let mut base_sq = 0.0;
    for j in 0..past.ncols() {
        for i in 0..past.nrows() {
            diff_sq += (recon[(i, j)] - past[(i, j)]).norm_sqr();
            base_sq += past[(i, j)].norm_sqr();
        }
    }
    if base_sq == 0.0 {
        return Ok(0.0);
    }
    Ok((diff_sq / base_sq).sqrt())
}

//! Proper orthogonal decomposition of a snapshot window.

use faer::{c64, Mat, MatRef};

use crate::types::DmdError;

/// Economy SVD triple `past ≈ U diag(σ) Vᴴ`.
#[derive(Debug, Clone)]
pub struct PodFactorization {
    /// Left singular vectors U (n_samples × r), orthonormal columns.
    /// Each column is a spatial structure of the flow.
    pub spatial: Mat<c64>,
    /// Singular values σ (r), descending.
    pub singular_values: Vec<f64>,
    /// Right singular vectors V (n_past × r), orthonormal columns.
    /// Rows follow the snapshot ordering of the past window.
    pub temporal: Mat<c64>,
}

impl PodFactorization {
    /// Number of retained directions.
    pub fn rank(&self) -> usize {
        self.singular_values.len()
    }

    /// Rebuild `U diag(σ) Vᴴ`.
    pub fn reconstruct(&self) -> Mat<c64> {
        let mut scaled = self.temporal.adjoint().to_owned();
        for i in 0..self.rank() {
            for j in 0..scaled.ncols() {
                scaled[(i, j)] *= self.singular_values[i];
            }
        }
        &self.spatial * &scaled
    }

    /// Keep the `r` leading directions.
    pub(crate) fn truncate(&self, r: usize) -> Self {
        Self {
            spatial: self.spatial.subcols(0, r).to_owned(),
            singular_values: self.singular_values[..r].to_vec(),
            temporal: self.temporal.subcols(0, r).to_owned(),
        }
    }
}

/// Economy SVD of the past snapshot window.
///
/// Singular values come back descending; zero or near-zero values are
/// retained here and dealt with at rank selection, where linearly
/// dependent snapshots either truncate cleanly or surface as
/// [`DmdError::IllConditionedOperator`].
pub fn factorize(past: MatRef<'_, c64>) -> Result<PodFactorization, DmdError> {
    let svd = past
        .thin_svd()
        .map_err(|e| DmdError::Factorization(format!("SVD did not converge: {e:?}")))?;
    let s = svd.S().column_vector();
    let singular_values: Vec<f64> = (0..s.nrows()).map(|i| s[i].re).collect();
    Ok(PodFactorization {
        spatial: svd.U().to_owned(),
        singular_values,
        temporal: svd.V().to_owned(),
    })
}

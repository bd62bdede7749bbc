//! Time-ordered snapshot storage and the past/current split.

use faer::{c64, Mat, MatRef};

use crate::types::DmdError;
use crate::utils::validate_finite;

/// Immutable collection of state snapshots, one complex column per time
/// step. Velocity-field data is conventionally stored as `u + i·v` so a
/// planar flow fits in a single column per snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotMatrix {
    data: Mat<c64>,
}

impl SnapshotMatrix {
    /// Wrap a prebuilt complex matrix (n_samples × n_snapshots).
    ///
    /// Rejects matrices with fewer than two columns, zero rows, or any
    /// non-finite entry.
    pub fn from_complex(data: Mat<c64>) -> Result<Self, DmdError> {
        if data.nrows() == 0 {
            return Err(DmdError::InvalidInput(
                "snapshot matrix has no rows".to_string(),
            ));
        }
        if data.ncols() < 2 {
            return Err(DmdError::InvalidInput(format!(
                "snapshot matrix has {} columns, need at least 2",
                data.ncols()
            )));
        }
        validate_finite("snapshot matrix", data.as_ref())?;
        Ok(Self { data })
    }

    /// Fuse two velocity components into complex snapshots `u + i·v`.
    pub fn from_components(u: MatRef<'_, f64>, v: MatRef<'_, f64>) -> Result<Self, DmdError> {
        if u.nrows() != v.nrows() || u.ncols() != v.ncols() {
            return Err(DmdError::InvalidInput(format!(
                "component shapes differ: {}x{} vs {}x{}",
                u.nrows(),
                u.ncols(),
                v.nrows(),
                v.ncols()
            )));
        }
        let data = Mat::from_fn(u.nrows(), u.ncols(), |i, j| c64::new(u[(i, j)], v[(i, j)]));
        Self::from_complex(data)
    }

    /// Wrap a real-valued scalar field with a zero imaginary channel.
    pub fn from_real(m: MatRef<'_, f64>) -> Result<Self, DmdError> {
        let data = Mat::from_fn(m.nrows(), m.ncols(), |i, j| c64::new(m[(i, j)], 0.0));
        Self::from_complex(data)
    }

    /// Number of state samples per snapshot.
    pub fn n_samples(&self) -> usize {
        self.data.nrows()
    }

    /// Number of snapshots (time steps).
    pub fn n_snapshots(&self) -> usize {
        self.data.ncols()
    }

    /// View of the underlying matrix.
    pub fn data(&self) -> MatRef<'_, c64> {
        self.data.as_ref()
    }

    /// Keep every `stride`-th snapshot, starting from the first.
    ///
    /// Oversampled simulations thin down to `ceil(n / stride)` snapshots.
    pub fn thin(&self, stride: usize) -> Result<Self, DmdError> {
        if stride == 0 {
            return Err(DmdError::InvalidInput(
                "thinning stride must be at least 1".to_string(),
            ));
        }
        let kept = thinned_length(self.n_snapshots(), stride);
        if kept < 2 {
            return Err(DmdError::InvalidInput(format!(
                "thinning {} snapshots by {stride} leaves {kept}, need at least 2",
                self.n_snapshots()
            )));
        }
        let data = Mat::from_fn(self.n_samples(), kept, |i, j| self.data[(i, j * stride)]);
        Ok(Self { data })
    }

    /// Past/current views offset by one time step, after `burn` leading
    /// snapshots are dropped.
    ///
    /// `past = M[:, burn..n-1]`, `current = M[:, burn+1..n]`, both
    /// (n_samples × n - burn - 1). Fails with
    /// [`DmdError::InsufficientSnapshots`] when fewer than two snapshots
    /// survive the burn-in.
    pub fn split(&self, burn: usize) -> Result<(MatRef<'_, c64>, MatRef<'_, c64>), DmdError> {
        let available = self.n_snapshots().saturating_sub(burn);
        if available < 2 {
            return Err(DmdError::InsufficientSnapshots { available, burn });
        }
        let past = self.data.subcols(burn, available - 1);
        let current = self.data.subcols(burn + 1, available - 1);
        Ok((past, current))
    }
}

/// Snapshot count after keeping every `stride`-th column of `length`.
pub(crate) fn thinned_length(length: usize, stride: usize) -> usize {
    length.div_ceil(stride)
}

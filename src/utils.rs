use faer::{c64, MatRef};

use crate::types::DmdError;

/// Validate that a complex matrix contains no NaN/Inf entries.
pub(crate) fn validate_finite(name: &str, x: MatRef<'_, c64>) -> Result<(), DmdError> {
    for j in 0..x.ncols() {
        for i in 0..x.nrows() {
            let val = x[(i, j)];
            if !val.re.is_finite() || !val.im.is_finite() {
                return Err(DmdError::InvalidInput(format!(
                    "{name} contains a non-finite entry at ({i}, {j})"
                )));
            }
        }
    }
    Ok(())
}

/// Count of singular values above the relative rank tolerance.
///
/// `singular_values` must be sorted descending. The default tolerance is
/// `max(dims) * f64::EPSILON` relative to the largest singular value, the
/// convention dense rank estimators use.
pub(crate) fn numerical_rank(
    singular_values: &[f64],
    dims: (usize, usize),
    tolerance: Option<f64>,
) -> usize {
    let max_sv = singular_values.first().copied().unwrap_or(0.0);
    if max_sv <= 0.0 {
        return 0;
    }
    let tol = tolerance.unwrap_or_else(|| dims.0.max(dims.1) as f64 * f64::EPSILON);
    let cutoff = tol * max_sv;
    singular_values.iter().filter(|&&s| s > cutoff).count()
}

//! # sparse-dmd
//!
//! Sparsity-promoting Dynamic Mode Decomposition for time-ordered
//! snapshot data.
//!
//! DMD extracts coherent spatial structures from a sequence of state
//! snapshots, each paired with an eigenvalue describing its growth and
//! oscillation. This library adds the sparsity-promoting variant: an l1
//! relaxation selects the few modes that matter, then a constrained
//! refit tells you exactly how much reconstruction quality the smaller
//! set costs.
//!
//! - **Snapshot handling** ([`SnapshotMatrix`]): complex or two-component
//!   planar fields, thinning, burn-in splits
//! - **Optimal-amplitude DMD** ([`dmd()`]): POD-projected operator,
//!   eigenvalues, amplitudes minimizing the reconstruction error
//! - **Sparsification** ([`sparsify`], [`sparsify_sweep`]): ADMM l1
//!   relaxation, swept over a gamma grid in parallel
//! - **Polishing** ([`polish()`]): KKT refit of the surviving amplitudes
//!   with a percent performance-loss figure
//! - **Diagnostics** ([`spectrum`], [`reconstruct()`]): per-mode
//!   frequencies and growth rates, modal reconstruction
//!
//! ## Quick Start
//!
//! ```rust
//! use faer::{c64, Mat};
//! use sparse_dmd::{dmd, sparsify, DmdConfig, SnapshotMatrix, SparsifyOptions};
//!
//! // One decaying oscillatory mode sampled at four probes
//! let lambda = c64::new(0.9, 0.08);
//! let data = Mat::from_fn(4, 12, |i, t| {
//!     c64::new(1.0 + i as f64 * 0.1, 0.0) * lambda.powu(t as u32)
//! });
//! let snapshots = SnapshotMatrix::from_complex(data).unwrap();
//!
//! // Decompose, then ask for a sparse amplitude subset
//! let result = dmd(&snapshots, &DmdConfig::default()).unwrap();
//! let sparse = sparsify(&result, 0.5, &SparsifyOptions::default()).unwrap();
//!
//! assert_eq!(sparse.n_nonzero, 1);
//! assert!(sparse.performance_loss < 1.0);
//! ```
//!
//! ## References
//!
//! - Schmid (2010), *J. Fluid Mech.*, 656, 5-28
//! - Jovanovic, Schmid & Nichols (2014), *Phys. Fluids*, 26, 024103
//! - Kutz et al. (2016), *Dynamic Mode Decomposition*, SIAM

pub mod analysis;
pub mod dmd;
pub mod pod;
pub mod polish;
pub mod snapshots;
pub mod sparse;
pub mod types;

mod utils;

pub use analysis::{reconstruct, reconstruction_error, spectrum, ModeInfo};
pub use dmd::dmd;
pub use pod::{factorize, PodFactorization};
pub use polish::{polish, PolishedAmplitudes, ZERO_AMPLITUDE_TOLERANCE};
pub use snapshots::SnapshotMatrix;
pub use sparse::{sparsify, sparsify_sweep, AdmmReport, SparseDmdResult, SparsifyOptions};
pub use types::{DmdConfig, DmdError, DmdResult, QuadraticForm};

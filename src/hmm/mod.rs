//! Banded pair-HMM realignment.
//!
//! Each clipped read is realigned globally against the draft window it covers.
//! The dynamic-programming matrix is restricted to a band around the read's
//! coarse alignment path, and forward-backward runs in log space to give
//! per-cell state posteriors. Posteriors are then folded onto draft columns
//! and insertion slots.

mod aligner;
mod band;
mod matrix;
mod model;
mod posterior;

pub use aligner::{BandedAligner, ReadSegment};
pub use band::{Band, CoarsePath};
pub use matrix::{BandedMatrix, HmmWorkspace};
pub use model::{EmissionModel, HmmState, PairHmm, TransitionTable};
pub use posterior::{DraftColumnPosterior, InsertionPosterior, ReadPosteriors, Realignment};

use thiserror::Error;

/// Per-read realignment failures. None of them is fatal to a run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlignError {
    /// Posterior mass stayed on the band edge after the retry.
    #[error("band exhausted at half-width {half_width} (edge mass {edge_mass:.4})")]
    BandExhausted {
        /// Widest half-width attempted.
        half_width: usize,
        /// Edge mass of the last attempt.
        edge_mass: f64,
    },

    /// A recursion produced NaN or a non-finite total likelihood.
    #[error("non-finite value during {stage}")]
    NonFinite {
        /// Recursion stage.
        stage: &'static str,
    },

    /// Coarse alignment steps do not form a path through the window.
    #[error("coarse path breaks at step {step}")]
    PathMismatch {
        /// Index of the offending step.
        step: usize,
    },
}

pub(crate) const LOG_ZERO: f64 = f64::NEG_INFINITY;

/// `ln(e^a + e^b)`, propagating NaN.
#[inline]
pub(crate) fn log_add(a: f64, b: f64) -> f64 {
    let (hi, lo) = if a >= b { (a, b) } else { (b, a) };
    if hi == LOG_ZERO {
        return LOG_ZERO;
    }
    hi + (lo - hi).exp().ln_1p()
}

#[inline]
pub(crate) fn log_add3(a: f64, b: f64, c: f64) -> f64 {
    log_add(log_add(a, b), c)
}

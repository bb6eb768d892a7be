//! # Draft Assembly Polishing via Banded Pair-HMM Realignment
//!
//! This library corrects a draft genome assembly by realigning long reads
//! against it and summarising the realignments per draft column.
//!
//! ## Core Algorithm
//!
//! 1. **Partitioning**: split the draft into windows, each padded by an overlap margin
//! 2. **Pileup**: clip every overlapping read to the padded window and lay out
//!    one column per draft base plus insertion columns
//! 3. **Realignment**: run a banded forward-backward pass for each read,
//!    retrying once with a wider band when posterior mass hugs the band edge
//! 4. **Estimation**: sum per-read posteriors into a consensus call or a
//!    versioned feature vector per column
//! 5. **Stitching**: keep, for each draft position, only the region whose core owns it
//!
//! Regions run in parallel; output is always in draft order.
//!
//! ## Usage Example
//!
//! ```ignore
//! use marginpolish::{polish, AlignmentIndex, DraftSequence, PolishConfig};
//!
//! let draft = DraftSequence::new("contig_1", b"ACGTACGT".to_vec());
//! let index = AlignmentIndex::new(reads);
//! let config = PolishConfig::default().with_window(8, 0);
//! let polished = polish(&draft, &index, &config)?;
//! println!("{}", String::from_utf8_lossy(&polished.output));
//! ```

#![warn(missing_docs, missing_debug_implementations)]
#![allow(clippy::new_without_default)]

pub mod config;      // Run configuration and validation
pub mod diagnostics; // Non-fatal per-read and per-region findings
pub mod genomics;    // Draft, read alignments, alignment sources, file adapters
pub mod region;      // Partitioning and stitching
pub mod pileup;      // Per-region pileup construction
pub mod hmm;         // Banded pair-HMM realignment
pub mod estimator;   // Consensus and feature estimation
pub mod pipeline;    // Region-parallel orchestration
/// Python bindings for exposing the polisher to external runtimes.
#[cfg(feature = "python-bindings")]
pub mod python_bindings;

// Re-exports for convenience
pub use config::{ConfigError, HmmConfig, MismatchCurve, OutputMode, PolishConfig};
pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use estimator::{ConsensusCall, FeatureColumn, FEATURE_FIELDS, FEATURE_VERSION, FEATURE_WIDTH};
pub use genomics::{AlignmentIndex, AlignmentSource, DraftSequence, ReadAlignment};
pub use pipeline::{
    extract_features, polish, run, CancelToken, PolishOutput, Polisher, RunOutput, RunStats,
};
pub use region::{partition, Region};

use thiserror::Error;

/// Errors that abort a polishing run.
///
/// Per-read and per-region problems never surface here; they are reported as
/// [`Diagnostic`]s alongside the output.
#[derive(Error, Debug)]
pub enum PolishError {
    /// Configuration rejected before any region was dispatched.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Worker pool could not be created.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),

    /// Run was cancelled before every region finished.
    #[error("run cancelled after {completed} of {total} regions")]
    Cancelled {
        /// Regions that completed before cancellation took effect.
        completed: usize,
        /// Total regions in the run.
        total: usize,
    },
}

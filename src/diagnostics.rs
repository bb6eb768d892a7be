//! Non-fatal findings collected during a run.
//!
//! Malformed records, infeasible realignments, an undersized overlap margin
//! and stitching defects never abort a run. They are recorded here, logged, and returned with the output.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use crate::genomics::MalformedAlignment;
use crate::hmm::AlignError;

/// What went wrong.
#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticKind {
    /// Alignment record failed validation and was skipped.
    MalformedAlignment(MalformedAlignment),
    /// Read mapping quality below the configured minimum.
    LowMappingQuality {
        /// Mapping quality of the read.
        mapq: u8,
        /// Configured minimum.
        minimum: u8,
    },
    /// Realignment mass stayed on the band edge even after the retry.
    BandExhausted {
        /// Widest half-width attempted.
        half_width: usize,
        /// Edge mass observed on the last attempt.
        edge_mass: f64,
    },
    /// A recursion produced a non-finite value.
    NumericInstability {
        /// Recursion stage that failed.
        stage: &'static str,
    },
    /// Draft positions no region core claims.
    UnownedPositions {
        /// Unowned draft interval.
        range: Range<u32>,
    },
    /// Overlap margin narrower than the longest read span, so a read may
    /// reach past a region's span and core calls may depend on the window.
    MarginBelowReadSpan {
        /// Configured overlap margin.
        margin: u32,
        /// Longest read span in the alignment source.
        read_span: u32,
    },
    /// A draft position claimed by more than one region core.
    DuplicateOwner {
        /// Draft coordinate.
        position: u32,
        /// Region whose claim was ignored.
        region: usize,
    },
}

/// A single diagnostic with its context.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// Region index the finding belongs to, if any.
    pub region: Option<usize>,
    /// Read identifier the finding belongs to, if any.
    pub read: Option<Arc<str>>,
    /// Finding.
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    /// Finding about one read in one region.
    pub fn for_read(region: usize, read: &Arc<str>, kind: DiagnosticKind) -> Self {
        Self {
            region: Some(region),
            read: Some(Arc::clone(read)),
            kind,
        }
    }

    /// Finding about the run as a whole.
    pub fn global(kind: DiagnosticKind) -> Self {
        Self {
            region: None,
            read: None,
            kind,
        }
    }

    /// Whether this finding excluded a read from its region.
    pub fn skips_read(&self) -> bool {
        matches!(
            self.kind,
            DiagnosticKind::MalformedAlignment(_)
                | DiagnosticKind::LowMappingQuality { .. }
                | DiagnosticKind::BandExhausted { .. }
                | DiagnosticKind::NumericInstability { .. }
        )
    }
}

impl From<AlignError> for DiagnosticKind {
    fn from(err: AlignError) -> Self {
        match err {
            AlignError::BandExhausted {
                half_width,
                edge_mass,
            } => DiagnosticKind::BandExhausted {
                half_width,
                edge_mass,
            },
            AlignError::NonFinite { stage } => DiagnosticKind::NumericInstability { stage },
            AlignError::PathMismatch { .. } => DiagnosticKind::NumericInstability {
                stage: "coarse path",
            },
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::MalformedAlignment(err) => write!(f, "malformed alignment: {err}"),
            DiagnosticKind::LowMappingQuality { mapq, minimum } => {
                write!(f, "mapping quality {mapq} below {minimum}")
            }
            DiagnosticKind::BandExhausted {
                half_width,
                edge_mass,
            } => write!(
                f,
                "band exhausted at half-width {half_width} (edge mass {edge_mass:.3})"
            ),
            DiagnosticKind::NumericInstability { stage } => {
                write!(f, "non-finite value in {stage}")
            }
            DiagnosticKind::UnownedPositions { range } => {
                write!(f, "no region owns positions [{}, {})", range.start, range.end)
            }
            DiagnosticKind::MarginBelowReadSpan { margin, read_span } => {
                write!(f, "overlap margin {margin} below longest read span {read_span}")
            }
            DiagnosticKind::DuplicateOwner { position, region } => {
                write!(f, "position {position} also claimed by region {region}")
            }
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(region) = self.region {
            write!(f, "region {region}: ")?;
        }
        if let Some(read) = &self.read {
            write!(f, "read {read}: ")?;
        }
        write!(f, "{}", self.kind)
    }
}

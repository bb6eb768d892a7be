use tracing::trace;

use crate::config::HmmConfig;
use crate::genomics::DraftSequence;
use crate::hmm::{AlignError, Band, CoarsePath, HmmWorkspace, PairHmm, ReadPosteriors, Realignment};
use crate::pileup::ClippedRead;

/// A clipped read paired with the draft bases it covers.
#[derive(Debug, Clone)]
pub struct ReadSegment<'a> {
    /// Read bases.
    pub read: &'a [u8],
    /// Read base qualities.
    pub qualities: &'a [u8],
    /// Draft bases of the window.
    pub draft: &'a [u8],
    /// Draft coordinate of `draft[0]`.
    pub draft_start: u32,
    /// Coarse path through the window.
    pub path: CoarsePath,
}

impl<'a> ReadSegment<'a> {
    /// Segment of `read` against `draft`.
    pub fn new(read: &ClippedRead<'a>, draft: &'a DraftSequence) -> Result<Self, AlignError> {
        let path = CoarsePath::from_pairs(read.pairs, &read.draft_window, &read.read_window)?;
        Ok(Self {
            read: read.sequence(),
            qualities: read.qualities(),
            draft: draft.window(read.draft_window.clone()),
            draft_start: read.draft_window.start,
            path,
        })
    }
}

/// Realigns read segments with a banded pair-HMM.
#[derive(Debug, Clone)]
pub struct BandedAligner {
    hmm: PairHmm,
    half_width: usize,
    retry_half_width: Option<usize>,
    edge_mass_threshold: f64,
}

impl BandedAligner {
    /// Build an aligner from validated configuration.
    pub fn new(config: &HmmConfig) -> Self {
        let retry = config.retry_half_width();
        Self {
            hmm: PairHmm::new(config),
            half_width: config.band_half_width,
            retry_half_width: (retry > config.band_half_width).then_some(retry),
            edge_mass_threshold: config.edge_mass_threshold,
        }
    }

    /// Realign one segment.
    ///
    /// When more than the edge-mass threshold sits on the band edge the
    /// segment is realigned once with the widened band; if that still fails
    /// the read is infeasible.
    pub fn align(
        &self,
        segment: &ReadSegment<'_>,
        workspace: &mut HmmWorkspace,
    ) -> Result<Realignment, AlignError> {
        let (posteriors, edge_mass) = self.attempt(segment, self.half_width, workspace)?;
        if edge_mass <= self.edge_mass_threshold {
            return Ok(Realignment {
                posteriors,
                half_width: self.half_width,
                retried: false,
                edge_mass,
            });
        }

        let Some(wider) = self.retry_half_width else {
            return Err(AlignError::BandExhausted {
                half_width: self.half_width,
                edge_mass,
            });
        };
        trace!(half_width = wider, edge_mass, "retrying with wider band");
        let (posteriors, edge_mass) = self.attempt(segment, wider, workspace)?;
        if edge_mass <= self.edge_mass_threshold {
            Ok(Realignment {
                posteriors,
                half_width: wider,
                retried: true,
                edge_mass,
            })
        } else {
            Err(AlignError::BandExhausted {
                half_width: wider,
                edge_mass,
            })
        }
    }

    fn attempt(
        &self,
        segment: &ReadSegment<'_>,
        half_width: usize,
        workspace: &mut HmmWorkspace,
    ) -> Result<(ReadPosteriors, f64), AlignError> {
        let matrix = workspace.prepare(Band::around(&segment.path, half_width));
        matrix.fill_forward(&self.hmm, segment.read, segment.qualities, segment.draft)?;
        matrix.fill_backward(&self.hmm, segment.read, segment.qualities, segment.draft)?;
        ReadPosteriors::from_matrix(matrix, segment.read, segment.draft_start)
    }
}

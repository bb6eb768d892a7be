use crate::estimator::{ColumnSummary, RegionSummary};
use crate::genomics::{DraftSequence, BASES, NUM_BASES};
use crate::pileup::Pileup;

/// Consensus call for one draft position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsensusCall {
    /// Draft coordinate.
    pub draft_pos: u32,
    /// Called base, or `None` when the draft base is deleted.
    pub base: Option<u8>,
    /// Bases inserted after this position.
    pub inserted: Vec<u8>,
    /// Whether any accepted read covered the position.
    pub covered: bool,
}

impl ConsensusCall {
    /// Call for a position no accepted read covers: the draft base is kept.
    pub fn uncovered(draft_pos: u32, draft_base: u8) -> Self {
        Self {
            draft_pos,
            base: Some(draft_base),
            inserted: Vec::new(),
            covered: false,
        }
    }

    /// Append the called bases to `sequence`.
    pub fn extend_sequence(&self, sequence: &mut Vec<u8>) {
        sequence.extend(self.base);
        sequence.extend_from_slice(&self.inserted);
    }
}

/// Consensus calls for every position of the pileup's span.
pub fn call_consensus(
    pileup: &Pileup<'_>,
    summary: &RegionSummary,
    draft: &DraftSequence,
) -> Vec<ConsensusCall> {
    pileup
        .region
        .span
        .clone()
        .map(|pos| {
            let draft_base = draft.base_at(pos).unwrap_or(b'N');
            let columns = pileup.position_columns(pos);
            let Some(own) = columns.clone().next().map(|col| &summary.columns[col]) else {
                return ConsensusCall::uncovered(pos, draft_base);
            };

            let inserted = summary.columns[columns.start + 1..columns.end]
                .iter()
                .filter(|slot| slot.depth > 0 && slot.base_mass() > slot.gap)
                .filter_map(best_base)
                .map(|idx| BASES[idx])
                .collect();

            if own.depth == 0 {
                return ConsensusCall {
                    inserted,
                    ..ConsensusCall::uncovered(pos, draft_base)
                };
            }
            ConsensusCall {
                draft_pos: pos,
                base: best_candidate(own).map(|idx| BASES[idx]),
                inserted,
                covered: true,
            }
        })
        .collect()
}

/// Winner over gap < A < C < G < T; `None` means gap. Ties keep the earlier
/// candidate.
fn best_candidate(summary: &ColumnSummary) -> Option<usize> {
    let mut best = None;
    let mut best_mass = summary.gap;
    for (idx, &mass) in summary.bases.iter().enumerate() {
        if mass > best_mass {
            best = Some(idx);
            best_mass = mass;
        }
    }
    best
}

fn best_base(summary: &ColumnSummary) -> Option<usize> {
    (0..NUM_BASES).reduce(|best, idx| {
        if summary.bases[idx] > summary.bases[best] {
            idx
        } else {
            best
        }
    })
}

use crate::estimator::homopolymer::left_align;
use crate::genomics::{DraftSequence, NUM_BASES};
use crate::hmm::{HmmState, Realignment};
use crate::pileup::Pileup;

/// Posterior sums of one pileup column over accepted reads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnSummary {
    /// Accepted reads contributing to the column.
    pub depth: u32,
    /// Summed base mass [A, C, G, T].
    pub bases: [f64; NUM_BASES],
    /// Summed gap mass (deletion, or no insertion at an insertion slot).
    pub gap: f64,
    /// Summed state mass indexed by [`HmmState::index`].
    pub states: [f64; 3],
    /// Summed normalised base quality [A, C, G, T] of accepted reads.
    pub quality: [f32; NUM_BASES],
}

impl ColumnSummary {
    /// Total base mass.
    pub fn base_mass(&self) -> f64 {
        self.bases.iter().sum()
    }
}

/// Column summaries parallel to [`Pileup::columns`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionSummary {
    /// One summary per pileup column.
    pub columns: Vec<ColumnSummary>,
}

/// Sum accepted realignments onto the pileup columns.
///
/// `realignments[r]` belongs to `pileup.reads[r]`; `None` marks a read that
/// was not accepted. Reads are visited in order so sums are reproducible.
/// Indel mass inside draft homopolymers is first packed onto one placement
/// per run. At an insertion slot, a read that spans the slot but puts less
/// than unit mass there contributes the remainder as gap.
pub fn summarize(
    pileup: &Pileup<'_>,
    draft: &DraftSequence,
    realignments: &[Option<Realignment>],
) -> RegionSummary {
    let mut columns = vec![ColumnSummary::default(); pileup.columns.len()];

    for realignment in realignments.iter().flatten() {
        let posteriors = &left_align(&realignment.posteriors, draft, pileup);
        let window = posteriors.window();

        for (pos, column) in window.clone().zip(&posteriors.columns) {
            let Some(col) = pileup.draft_column(pos) else {
                continue;
            };
            let summary = &mut columns[col];
            summary.depth += 1;
            for (sum, mass) in summary.bases.iter_mut().zip(column.bases) {
                *sum += mass;
            }
            summary.gap += column.delete;
            summary.states[HmmState::Match.index()] += column.match_mass();
            summary.states[HmmState::InsertInRead.index()] += column.insert;
            summary.states[HmmState::DeleteInDraft.index()] += column.delete;
        }

        for insertion in &posteriors.insertions {
            // Mass past the last slot has no column and is dropped.
            let Some(col) = pileup.insertion_column(insertion.anchor, insertion.rank) else {
                continue;
            };
            let summary = &mut columns[col];
            for (sum, mass) in summary.bases.iter_mut().zip(insertion.bases) {
                *sum += mass;
            }
            summary.states[HmmState::InsertInRead.index()] += insertion.mass();
            if insertion.anchor + 1 >= window.end {
                summary.depth += 1;
            }
        }

        for anchor in window.start..window.end.saturating_sub(1) {
            for rank in 0..pileup.insertion_slots(anchor) {
                let Some(col) = pileup.insertion_column(anchor, rank) else {
                    continue;
                };
                let inserted = posteriors
                    .insertions
                    .binary_search_by_key(&(anchor, rank), |p| (p.anchor, p.rank))
                    .map_or(0.0, |idx| posteriors.insertions[idx].mass());
                let gap = (1.0 - inserted).max(0.0);
                let summary = &mut columns[col];
                summary.depth += 1;
                summary.gap += gap;
                summary.states[HmmState::DeleteInDraft.index()] += gap;
            }
        }
    }

    let accepted: Vec<bool> = realignments.iter().map(Option::is_some).collect();
    for (summary, column) in columns.iter_mut().zip(&pileup.columns) {
        summary.quality = column.quality_composition(|read| accepted.get(read).copied().unwrap_or(false));
    }

    RegionSummary { columns }
}

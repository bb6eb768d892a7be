use std::collections::BTreeMap;
use std::ops::{Range, RangeInclusive};

use crate::genomics::{base_index, DraftSequence, NUM_BASES};
use crate::hmm::{InsertionPosterior, ReadPosteriors};
use crate::pileup::Pileup;

/// Move one read's indel mass inside each draft homopolymer to a single
/// placement.
///
/// Within a run of identical draft bases every placement of a deletion, or of
/// an insertion of the run's base, explains the read equally well, so the
/// realignment spreads that mass across the run. Deletion mass is packed onto
/// the leftmost columns of the run. Inserted run-base mass is packed onto the
/// first equivalent anchor that owns pileup insertion slots, filling ranks in
/// order; mass past the last slot is dropped.
pub(crate) fn left_align(
    posteriors: &ReadPosteriors,
    draft: &DraftSequence,
    pileup: &Pileup<'_>,
) -> ReadPosteriors {
    let window = posteriors.window();
    let mut aligned = posteriors.clone();
    let mut inserted: BTreeMap<(u32, u32), [f64; NUM_BASES]> = posteriors
        .insertions
        .iter()
        .map(|insertion| ((insertion.anchor, insertion.rank), insertion.bases))
        .collect();

    for (base, run) in base_runs(draft, window.clone()) {
        if run.end - run.start > 1 {
            pack_deletions(&mut aligned, base, run.clone());
        }
        // Inserting the run base just before the run is equivalent too.
        let anchors = run.start.saturating_sub(1).max(window.start)..=run.end - 1;
        pack_insertions(&mut inserted, pileup, base, anchors);
    }

    aligned.insertions = inserted
        .into_iter()
        .map(|((anchor, rank), bases)| InsertionPosterior {
            anchor,
            rank,
            bases,
        })
        .filter(|insertion| insertion.mass() > 0.0)
        .collect();
    aligned
}

/// Maximal runs of one base inside `window` as `(base index, draft range)`.
/// Ambiguous draft bases end a run.
fn base_runs(draft: &DraftSequence, window: Range<u32>) -> Vec<(usize, Range<u32>)> {
    let mut runs: Vec<(usize, Range<u32>)> = Vec::new();
    for pos in window {
        let Some(idx) = draft.base_at(pos).and_then(base_index) else {
            continue;
        };
        match runs.last_mut() {
            Some((base, range)) if *base == idx && range.end == pos => range.end = pos + 1,
            _ => runs.push((idx, pos..pos + 1)),
        }
    }
    runs
}

fn pack_deletions(posteriors: &mut ReadPosteriors, base: usize, run: Range<u32>) {
    let start = (run.start - posteriors.window_start) as usize;
    let end = (run.end - posteriors.window_start) as usize;
    let columns = &mut posteriors.columns[start..end];

    let mut deleted: f64 = columns.iter().map(|column| column.delete).sum();
    for column in columns.iter_mut() {
        let matched = column.match_mass();
        let delete = deleted.min(matched + column.delete);
        deleted -= delete;
        let kept = matched + column.delete - delete;

        if kept >= matched {
            column.bases[base] += kept - matched;
        } else if matched > 0.0 {
            let scale = kept / matched;
            column.bases.iter_mut().for_each(|mass| *mass *= scale);
        }
        column.delete = delete;
    }
}

fn pack_insertions(
    inserted: &mut BTreeMap<(u32, u32), [f64; NUM_BASES]>,
    pileup: &Pileup<'_>,
    base: usize,
    anchors: RangeInclusive<u32>,
) {
    let Some(target) = anchors.clone().find(|&anchor| pileup.insertion_slots(anchor) > 0) else {
        return;
    };

    let keys = (*anchors.start(), 0)..=(*anchors.end(), u32::MAX);
    let mut mass = 0.0;
    for (_, bases) in inserted.range_mut(keys) {
        mass += bases[base];
        bases[base] = 0.0;
    }

    for rank in 0..pileup.insertion_slots(target) {
        if mass <= 0.0 {
            break;
        }
        let bases = inserted.entry((target, rank)).or_insert([0.0; NUM_BASES]);
        let room = (1.0 - bases.iter().sum::<f64>()).max(0.0);
        let moved = mass.min(room);
        bases[base] += moved;
        mass -= moved;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::{parse_cigar, ReadAlignment, Strand};
    use crate::hmm::DraftColumnPosterior;
    use crate::pileup::PileupBuilder;
    use crate::region::partition;

    fn aligned(cigar: &str, seq: &[u8]) -> ReadAlignment {
        let ops = parse_cigar(cigar).unwrap();
        ReadAlignment::from_cigar("r", Strand::Forward, 60, 0, &ops, seq, &vec![30; seq.len()])
            .unwrap()
    }

    fn column(a: f64, delete: f64) -> DraftColumnPosterior {
        DraftColumnPosterior {
            bases: [a, 0.0, 0.0, 0.0],
            delete,
            insert: 0.0,
        }
    }

    #[test]
    fn runs_split_on_base_changes_and_ambiguity() {
        let draft = DraftSequence::new("ctg", b"AACNCCT".to_vec());
        let runs = base_runs(&draft, 0..7);
        assert_eq!(runs, vec![(0, 0..2), (1, 2..3), (1, 4..6), (3, 6..7)]);
        assert_eq!(base_runs(&draft, 1..5), vec![(0, 1..2), (1, 2..3), (1, 4..5)]);
    }

    #[test]
    fn spread_deletion_is_packed_onto_the_first_run_column() {
        let draft = DraftSequence::new("ctg", b"CAAAAG".to_vec());
        let reads = vec![aligned("6M", b"CAAAAG")];
        let region = partition(6, 6, 0).unwrap().remove(0);
        let pileup = PileupBuilder::new(0).build(&region, &draft, &reads, &mut Vec::new());

        let posteriors = ReadPosteriors {
            window_start: 0,
            columns: vec![
                DraftColumnPosterior {
                    bases: [0.0, 1.0, 0.0, 0.0],
                    delete: 0.0,
                    insert: 0.0,
                },
                column(0.75, 0.25),
                column(0.75, 0.25),
                column(0.75, 0.25),
                column(0.75, 0.25),
                DraftColumnPosterior {
                    bases: [0.0, 0.0, 1.0, 0.0],
                    delete: 0.0,
                    insert: 0.0,
                },
            ],
            insertions: Vec::new(),
        };
        let packed = left_align(&posteriors, &draft, &pileup);

        assert!((packed.columns[1].delete - 1.0).abs() < 1e-12);
        assert!(packed.columns[1].bases[0].abs() < 1e-12);
        for column in &packed.columns[2..5] {
            assert!(column.delete.abs() < 1e-12);
            assert!((column.bases[0] - 1.0).abs() < 1e-12);
        }
        assert_eq!(packed.columns[0], posteriors.columns[0]);
        assert_eq!(packed.columns[5], posteriors.columns[5]);
    }

    #[test]
    fn mismatch_inside_a_run_stays_in_place() {
        let draft = DraftSequence::new("ctg", b"AAAA".to_vec());
        let reads = vec![aligned("4M", b"AAAA")];
        let region = partition(4, 4, 0).unwrap().remove(0);
        let pileup = PileupBuilder::new(0).build(&region, &draft, &reads, &mut Vec::new());

        let mut columns = vec![column(1.0, 0.0); 4];
        columns[2].bases = [0.0, 1.0, 0.0, 0.0];
        let posteriors = ReadPosteriors {
            window_start: 0,
            columns,
            insertions: Vec::new(),
        };
        assert_eq!(left_align(&posteriors, &draft, &pileup), posteriors);
    }

    #[test]
    fn spread_insertion_is_gathered_into_the_pileup_slot() {
        let draft = DraftSequence::new("ctg", b"CAAAG".to_vec());
        let reads = vec![aligned("4M1I1M", b"CAAAAG")];
        let region = partition(5, 5, 0).unwrap().remove(0);
        let pileup = PileupBuilder::new(0).build(&region, &draft, &reads, &mut Vec::new());
        assert_eq!(pileup.insertion_slots(3), 1);

        let insertion = |anchor| InsertionPosterior {
            anchor,
            rank: 0,
            bases: [0.25, 0.0, 0.0, 0.0],
        };
        let posteriors = ReadPosteriors {
            window_start: 0,
            columns: vec![column(1.0, 0.0); 5],
            insertions: (0..4).map(insertion).collect(),
        };
        let packed = left_align(&posteriors, &draft, &pileup);

        assert_eq!(packed.insertions.len(), 1);
        assert_eq!((packed.insertions[0].anchor, packed.insertions[0].rank), (3, 0));
        assert!((packed.insertions[0].bases[0] - 1.0).abs() < 1e-12);
    }
}

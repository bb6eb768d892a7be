use std::ops::Range;

use tracing::debug;

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::genomics::{AlignOp, AlignedPair, DraftSequence, ReadAlignment};
use crate::pileup::PileupColumn;
use crate::region::Region;

/// A read's alignment restricted to a region span.
#[derive(Debug, Clone)]
pub struct ClippedRead<'a> {
    /// Full alignment record.
    pub alignment: &'a ReadAlignment,
    /// Steps whose draft coordinate lies inside the span.
    pub pairs: &'a [AlignedPair],
    /// Draft interval covered by the clipped steps.
    pub draft_window: Range<u32>,
    /// Read interval covered by the clipped steps.
    pub read_window: Range<usize>,
}

impl<'a> ClippedRead<'a> {
    /// Clip `alignment` to `span`, or `None` when no aligned base remains.
    ///
    /// Steps are ordered by draft coordinate (insertions carry their anchor),
    /// so the clipped steps form one contiguous run.
    pub fn clip(alignment: &'a ReadAlignment, span: &Range<u32>) -> Option<Self> {
        let all = alignment.pairs.as_slice();
        let lo = all.partition_point(|p| p.draft_pos < span.start);
        let hi = all.partition_point(|p| p.draft_pos < span.end);
        let pairs = &all[lo..hi];

        if !pairs.iter().any(|p| p.op == AlignOp::Match) {
            return None;
        }
        let first = pairs.first()?;
        let last = pairs.last()?;
        let read_start = pairs.iter().find(|p| p.consumes_read())?.read_pos as usize;
        let read_end = pairs.iter().rev().find(|p| p.consumes_read())?.read_pos as usize + 1;

        Some(Self {
            alignment,
            pairs,
            draft_window: first.draft_pos..last.draft_pos + 1,
            read_window: read_start..read_end,
        })
    }

    /// Read bases inside the clipped window.
    pub fn sequence(&self) -> &'a [u8] {
        &self.alignment.sequence[self.read_window.clone()]
    }

    /// Base qualities inside the clipped window.
    pub fn qualities(&self) -> &'a [u8] {
        &self.alignment.qualities[self.read_window.clone()]
    }

    /// Whether the clipped read spans draft coordinate `pos`.
    pub fn covers(&self, pos: u32) -> bool {
        self.draft_window.contains(&pos)
    }
}

/// Pileup of one region.
#[derive(Debug, Clone)]
pub struct Pileup<'a> {
    /// Region the pileup was built for.
    pub region: Region,
    /// Reads kept for the region, in source order.
    pub reads: Vec<ClippedRead<'a>>,
    /// Columns in draft order, insertion columns following their anchor.
    pub columns: Vec<PileupColumn>,
    draft_columns: Vec<usize>,
    insertion_slots: Vec<u32>,
}

impl<'a> Pileup<'a> {
    /// Column index of draft coordinate `pos`.
    pub fn draft_column(&self, pos: u32) -> Option<usize> {
        self.region
            .span_offset(pos)
            .map(|offset| self.draft_columns[offset])
    }

    /// Number of insertion columns after `pos`.
    pub fn insertion_slots(&self, pos: u32) -> u32 {
        self.region
            .span_offset(pos)
            .map_or(0, |offset| self.insertion_slots[offset])
    }

    /// Column index of insertion slot `rank` after `pos`.
    pub fn insertion_column(&self, pos: u32, rank: u32) -> Option<usize> {
        if rank >= self.insertion_slots(pos) {
            return None;
        }
        self.draft_column(pos).map(|col| col + 1 + rank as usize)
    }

    /// Columns belonging to draft coordinate `pos` (its own plus insertions).
    pub fn position_columns(&self, pos: u32) -> Range<usize> {
        match self.draft_column(pos) {
            Some(col) => col..col + 1 + self.insertion_slots(pos) as usize,
            None => 0..0,
        }
    }
}

/// Builds region pileups from alignment records.
#[derive(Debug, Clone)]
pub struct PileupBuilder {
    min_mapping_quality: u8,
}

impl PileupBuilder {
    /// Create a builder that skips reads below `min_mapping_quality`.
    pub fn new(min_mapping_quality: u8) -> Self {
        Self {
            min_mapping_quality,
        }
    }

    /// Build the pileup of `region` from the alignments overlapping it.
    ///
    /// Malformed and low mapping quality records are skipped and reported in
    /// `diagnostics`; they never abort the region.
    pub fn build<'a, I>(
        &self,
        region: &Region,
        draft: &DraftSequence,
        alignments: I,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Pileup<'a>
    where
        I: IntoIterator<Item = &'a ReadAlignment>,
    {
        let mut reads = Vec::new();
        for alignment in alignments {
            if let Err(err) = alignment.validate(draft.len()) {
                debug!(read = %alignment.id, error = %err, "skipping malformed alignment");
                diagnostics.push(Diagnostic::for_read(
                    region.index,
                    &alignment.id,
                    DiagnosticKind::MalformedAlignment(err),
                ));
                continue;
            }
            if alignment.mapq < self.min_mapping_quality {
                diagnostics.push(Diagnostic::for_read(
                    region.index,
                    &alignment.id,
                    DiagnosticKind::LowMappingQuality {
                        mapq: alignment.mapq,
                        minimum: self.min_mapping_quality,
                    },
                ));
                continue;
            }
            if let Some(clipped) = ClippedRead::clip(alignment, &region.span) {
                reads.push(clipped);
            }
        }

        let span_len = region.span_len();
        let mut insertion_slots = vec![0u32; span_len];
        for read in &reads {
            for (anchor, run) in insertion_runs(read.pairs) {
                let offset = (anchor - region.span.start) as usize;
                insertion_slots[offset] = insertion_slots[offset].max(run);
            }
        }

        let mut columns = Vec::with_capacity(span_len);
        let mut draft_columns = Vec::with_capacity(span_len);
        for (offset, &slots) in insertion_slots.iter().enumerate() {
            let pos = region.span.start + offset as u32;
            draft_columns.push(columns.len());
            columns.push(PileupColumn::draft(pos));
            columns.extend((0..slots).map(|rank| PileupColumn::insertion(pos, rank)));
        }

        let mut pileup = Pileup {
            region: region.clone(),
            reads,
            columns,
            draft_columns,
            insertion_slots,
        };
        let observations = collect_observations(&pileup);
        for (col, read, base, quality) in observations {
            pileup.columns[col].observe(read, base, quality);
        }
        pileup
    }
}

/// `(anchor, run length)` of every insertion run in `pairs`.
fn insertion_runs(pairs: &[AlignedPair]) -> Vec<(u32, u32)> {
    let mut runs: Vec<(u32, u32)> = Vec::new();
    let mut prev_insert = false;
    for pair in pairs {
        if pair.op == AlignOp::Insert {
            match runs.last_mut() {
                Some((anchor, run)) if prev_insert && *anchor == pair.draft_pos => {
                    *run = run.saturating_add(1)
                }
                _ => runs.push((pair.draft_pos, 1)),
            }
        }
        prev_insert = pair.op == AlignOp::Insert;
    }
    runs
}

/// `(column, read, base, quality)` for every coarse observation, in read order.
fn collect_observations(pileup: &Pileup<'_>) -> Vec<(usize, usize, Option<u8>, u8)> {
    let mut out = Vec::new();
    for (read_idx, read) in pileup.reads.iter().enumerate() {
        let alignment = read.alignment;
        // Anchor of the current insertion run and bases seen in it.
        let mut run: Option<(u32, u32)> = None;

        for pair in read.pairs {
            match pair.op {
                AlignOp::Match | AlignOp::Delete => {
                    let anchor = run.take();
                    let prev = pair.draft_pos.checked_sub(1);
                    if let Some(prev) = prev.filter(|p| read.covers(*p)) {
                        // Read continues past `prev`: unfilled insertion slots are gaps.
                        let seen = anchor
                            .filter(|(anchor, _)| *anchor == prev)
                            .map_or(0, |(_, seen)| seen);
                        for rank in seen..pileup.insertion_slots(prev) {
                            if let Some(col) = pileup.insertion_column(prev, rank) {
                                out.push((col, read_idx, None, 0));
                            }
                        }
                    }
                    if let Some(col) = pileup.draft_column(pair.draft_pos) {
                        if pair.op == AlignOp::Match {
                            let offset = pair.read_pos as usize;
                            out.push((
                                col,
                                read_idx,
                                alignment.base_at(offset),
                                alignment.quality_at(offset).unwrap_or(0),
                            ));
                        } else {
                            out.push((col, read_idx, None, 0));
                        }
                    }
                    run = Some((pair.draft_pos, 0));
                }
                AlignOp::Insert => {
                    let seen = match run {
                        Some((anchor, seen)) if anchor == pair.draft_pos => seen,
                        _ => 0,
                    };
                    if let Some(col) = pileup.insertion_column(pair.draft_pos, seen) {
                        let offset = pair.read_pos as usize;
                        out.push((
                            col,
                            read_idx,
                            alignment.base_at(offset),
                            alignment.quality_at(offset).unwrap_or(0),
                        ));
                    }
                    run = Some((pair.draft_pos, seen.saturating_add(1)));
                }
            }
        }
    }
    out.sort_by_key(|&(col, read, _, _)| (col, read));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::{parse_cigar, Strand};
    use crate::region::partition;

    fn aligned(id: &str, start: u32, cigar: &str, seq: &[u8]) -> ReadAlignment {
        let ops = parse_cigar(cigar).unwrap();
        ReadAlignment::from_cigar(id, Strand::Forward, 60, start, &ops, seq, &vec![30; seq.len()])
            .unwrap()
    }

    fn whole(len: u32) -> Region {
        partition(len, len, 0).unwrap().remove(0)
    }

    #[test]
    fn builds_draft_and_insertion_columns() {
        let draft = DraftSequence::new("ctg", b"ACGTACGT".to_vec());
        let reads = vec![
            aligned("ins", 0, "4M1I4M", b"ACGTGACGT"),
            aligned("ref", 0, "8M", b"ACGTACGT"),
        ];
        let mut diagnostics = Vec::new();
        let pileup = PileupBuilder::new(0).build(&whole(8), &draft, &reads, &mut diagnostics);

        assert!(diagnostics.is_empty());
        assert_eq!(pileup.columns.len(), 9);
        assert_eq!(pileup.insertion_slots(3), 1);
        let ins = pileup.insertion_column(3, 0).unwrap();
        assert_eq!(ins, 4);
        let column = &pileup.columns[ins];
        assert_eq!(column.insert_rank, Some(0));
        let bases: Vec<_> = column.observations.iter().map(|obs| obs.base).collect();
        assert_eq!(bases, [Some(b'G'), None]);
        assert_eq!(pileup.position_columns(3), 3..5);
        assert_eq!(pileup.draft_column(4), Some(5));
    }

    #[test]
    fn insertion_runs_longer_than_u16_get_every_slot() {
        let draft = DraftSequence::new("ctg", b"ACGT".to_vec());
        let mut seq = b"AC".to_vec();
        seq.extend(std::iter::repeat(b'T').take(70_000));
        seq.extend_from_slice(b"GT");
        let reads = vec![aligned("long", 0, "2M70000I2M", &seq)];
        let mut diagnostics = Vec::new();
        let pileup = PileupBuilder::new(0).build(&whole(4), &draft, &reads, &mut diagnostics);

        assert!(diagnostics.is_empty());
        assert_eq!(pileup.insertion_slots(1), 70_000);
        assert_eq!(pileup.columns.len(), 70_004);
        let last = &pileup.columns[pileup.insertion_column(1, 69_999).unwrap()];
        assert_eq!(last.insert_rank, Some(69_999));
        assert_eq!(last.observations[0].base, Some(b'T'));
        assert_eq!(pileup.draft_column(2), Some(70_002));
    }

    #[test]
    fn deletion_is_observed_as_gap() {
        let draft = DraftSequence::new("ctg", b"ACGTACGT".to_vec());
        let reads = vec![aligned("del", 0, "3M1D4M", b"ACGACGT")];
        let mut diagnostics = Vec::new();
        let pileup = PileupBuilder::new(0).build(&whole(8), &draft, &reads, &mut diagnostics);

        let col = &pileup.columns[pileup.draft_column(3).unwrap()];
        assert_eq!(col.observations[0].base, None);
        assert_eq!(col.depth(), 1);
        assert!(pileup.columns.iter().all(|c| c.depth() == 1));
    }

    #[test]
    fn reads_are_clipped_to_the_span() {
        let draft = DraftSequence::new("ctg", b"ACGTACGTACGT".to_vec());
        let regions = partition(12, 4, 2).unwrap();
        let reads = vec![aligned("r", 0, "12M", b"ACGTACGTACGT")];
        let mut diagnostics = Vec::new();
        let pileup = PileupBuilder::new(0).build(&regions[1], &draft, &reads, &mut diagnostics);

        assert_eq!(pileup.region.span, 2..10);
        let read = &pileup.reads[0];
        assert_eq!(read.draft_window, 2..10);
        assert_eq!(read.read_window, 2..10);
        assert_eq!(read.sequence(), b"GTACGTAC");
    }

    #[test]
    fn malformed_and_low_mapq_reads_are_skipped_with_diagnostics() {
        let draft = DraftSequence::new("ctg", b"ACGT".to_vec());
        let mut low = aligned("low", 0, "4M", b"ACGT");
        low.mapq = 3;
        let broken = ReadAlignment::new(
            "broken",
            Strand::Forward,
            60,
            vec![AlignedPair::new(0, 0, AlignOp::Match)],
            b"ACGT".to_vec(),
            vec![30; 4],
        );
        let good = aligned("good", 0, "4M", b"ACGT");
        let reads = vec![low, broken, good];

        let mut diagnostics = Vec::new();
        let pileup = PileupBuilder::new(10).build(&whole(4), &draft, &reads, &mut diagnostics);

        assert_eq!(pileup.reads.len(), 1);
        assert_eq!(pileup.reads[0].alignment.id.as_ref(), "good");
        assert_eq!(diagnostics.len(), 2);
        assert!(matches!(
            diagnostics[0].kind,
            DiagnosticKind::LowMappingQuality { mapq: 3, minimum: 10 }
        ));
        assert!(matches!(
            diagnostics[1].kind,
            DiagnosticKind::MalformedAlignment(_)
        ));
    }

    #[test]
    fn reads_outside_the_span_are_dropped() {
        let draft = DraftSequence::new("ctg", b"ACGTACGTACGT".to_vec());
        let regions = partition(12, 4, 0).unwrap();
        let reads = vec![aligned("r", 8, "4M", b"ACGT")];
        let mut diagnostics = Vec::new();
        let pileup = PileupBuilder::new(0).build(&regions[0], &draft, &reads, &mut diagnostics);
        assert!(pileup.reads.is_empty());
        assert!(pileup.columns.iter().all(|c| c.depth() == 0));
    }
}

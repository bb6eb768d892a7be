use std::ops::Range;

use crate::genomics::ReadAlignment;

/// Upstream supplier of read alignments, queried once per region.
pub trait AlignmentSource: Sync {
    /// All alignments whose draft span intersects `range`, in a stable order.
    fn overlapping(&self, range: Range<u32>) -> Vec<&ReadAlignment>;

    /// Longest draft span of any alignment the source can return.
    fn max_span(&self) -> u32;
}

/// In-memory alignment store sorted by draft start.
///
/// Overlap queries binary-search the start coordinates, looking back by the
/// longest span seen so no intersecting read is missed.
#[derive(Debug, Clone, Default)]
pub struct AlignmentIndex {
    reads: Vec<ReadAlignment>,
    spans: Vec<Range<u32>>,
    max_span: u32,
}

impl AlignmentIndex {
    /// Build an index. Reads with identical spans keep their input order.
    pub fn new(reads: Vec<ReadAlignment>) -> Self {
        let mut entries: Vec<(Range<u32>, ReadAlignment)> = reads
            .into_iter()
            .map(|read| (read.draft_span().unwrap_or(0..0), read))
            .collect();
        entries.sort_by_key(|(span, _)| (span.start, span.end));

        let max_span = entries
            .iter()
            .map(|(span, _)| span.end.saturating_sub(span.start))
            .max()
            .unwrap_or(0);
        let (spans, reads) = entries.into_iter().unzip();

        Self {
            reads,
            spans,
            max_span,
        }
    }

    /// Number of indexed reads.
    pub fn len(&self) -> usize {
        self.reads.len()
    }

    /// Whether the index holds no reads.
    pub fn is_empty(&self) -> bool {
        self.reads.is_empty()
    }

    /// Iterate reads in index order.
    pub fn iter(&self) -> impl Iterator<Item = &ReadAlignment> {
        self.reads.iter()
    }
}

impl AlignmentSource for AlignmentIndex {
    fn overlapping(&self, range: Range<u32>) -> Vec<&ReadAlignment> {
        if range.start >= range.end {
            return Vec::new();
        }
        let lower = range.start.saturating_sub(self.max_span);
        let first = self.spans.partition_point(|span| span.start < lower);

        self.spans[first..]
            .iter()
            .zip(&self.reads[first..])
            .take_while(|(span, _)| span.start < range.end)
            .filter(|(span, _)| span.end > range.start && span.start < span.end)
            .map(|(_, read)| read)
            .collect()
    }

    fn max_span(&self) -> u32 {
        self.max_span
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::{parse_cigar, Strand};

    fn read(id: &str, start: u32, len: u32) -> ReadAlignment {
        let ops = parse_cigar(&format!("{len}M")).unwrap();
        let seq = vec![b'A'; len as usize];
        ReadAlignment::from_cigar(id, Strand::Forward, 60, start, &ops, &seq, &seq.clone())
            .unwrap()
    }

    #[test]
    fn overlapping_finds_long_reads_starting_early() {
        let index = AlignmentIndex::new(vec![
            read("late", 50, 5),
            read("long", 0, 100),
            read("short", 10, 5),
        ]);
        assert_eq!(index.max_span(), 100);

        let ids: Vec<&str> = index
            .overlapping(60..70)
            .into_iter()
            .map(|r| r.id.as_ref())
            .collect();
        assert_eq!(ids, vec!["long"]);

        let ids: Vec<&str> = index
            .overlapping(12..52)
            .into_iter()
            .map(|r| r.id.as_ref())
            .collect();
        assert_eq!(ids, vec!["long", "short", "late"]);
    }

    #[test]
    fn empty_range_returns_nothing() {
        let index = AlignmentIndex::new(vec![read("a", 0, 10)]);
        assert!(index.overlapping(5..5).is_empty());
        assert!(index.overlapping(10..20).is_empty());
    }
}

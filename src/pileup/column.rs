use crate::config::MAX_QUALITY;
use crate::genomics::{base_index, NUM_BASES};

/// One read's coarse observation in a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    /// Index of the read in [`super::Pileup::reads`].
    pub read: usize,
    /// Observed base, or `None` for a gap.
    pub base: Option<u8>,
    /// Base quality (0 for gaps).
    pub quality: u8,
}

/// Coarse pileup statistics for one draft coordinate or insertion slot.
#[derive(Debug, Clone, PartialEq)]
pub struct PileupColumn {
    /// Draft coordinate (the anchor, for insertion columns).
    pub draft_pos: u32,
    /// Rank within the insertion run after `draft_pos`; `None` for the draft column.
    pub insert_rank: Option<u32>,
    /// Observations in read order.
    pub observations: Vec<Observation>,
}

impl PileupColumn {
    pub(crate) fn draft(draft_pos: u32) -> Self {
        Self::with_rank(draft_pos, None)
    }

    pub(crate) fn insertion(draft_pos: u32, rank: u32) -> Self {
        Self::with_rank(draft_pos, Some(rank))
    }

    fn with_rank(draft_pos: u32, insert_rank: Option<u32>) -> Self {
        Self {
            draft_pos,
            insert_rank,
            observations: Vec::new(),
        }
    }

    pub(crate) fn observe(&mut self, read: usize, base: Option<u8>, quality: u8) {
        self.observations.push(Observation {
            read,
            base,
            quality: if base.is_some() { quality } else { 0 },
        });
    }

    /// Total number of reads covering this column.
    pub fn depth(&self) -> u32 {
        self.observations.len() as u32
    }

    /// Whether this is an insertion column.
    pub fn is_insertion(&self) -> bool {
        self.insert_rank.is_some()
    }

    /// Quality-weighted base composition over reads accepted by `keep`.
    pub fn quality_composition<F>(&self, keep: F) -> [f32; NUM_BASES]
    where
        F: Fn(usize) -> bool,
    {
        let mut sums = [0.0f32; NUM_BASES];
        for obs in self.observations.iter().filter(|obs| keep(obs.read)) {
            if let Some(idx) = obs.base.and_then(base_index) {
                sums[idx] += normalised_quality(obs.quality);
            }
        }
        sums
    }
}

/// Quality rescaled to `[0, 1]`.
pub(crate) fn normalised_quality(quality: u8) -> f32 {
    quality.min(MAX_QUALITY) as f32 / MAX_QUALITY as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observe_tracks_bases_and_gaps() {
        let mut column = PileupColumn::draft(100);
        column.observe(0, Some(b'A'), 93);
        column.observe(1, Some(b'A'), 0);
        column.observe(2, None, 40);
        column.observe(3, Some(b'N'), 30);

        assert_eq!(column.depth(), 4);
        assert_eq!(column.observations[2].base, None);
        assert_eq!(column.quality_composition(|_| true), [1.0, 0.0, 0.0, 0.0]);
        assert_eq!(column.observations[2].quality, 0);
    }

    #[test]
    fn quality_composition_filters_reads() {
        let mut column = PileupColumn::insertion(5, 0);
        column.observe(0, Some(b'C'), 93);
        column.observe(1, Some(b'C'), 93);
        assert_eq!(column.quality_composition(|read| read == 1), [0.0, 1.0, 0.0, 0.0]);
        assert!(column.is_insertion());
    }
}

use std::sync::Arc;

use crate::diagnostics::Diagnostic;
use crate::estimator::FeatureColumn;

/// Counters describing a run.
///
/// Read counters count read-region pairs: a read overlapping two spans is
/// counted in both regions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunStats {
    /// Regions processed.
    pub regions: usize,
    /// Alignments returned by the source.
    pub reads_considered: usize,
    /// Alignments skipped before realignment (malformed or low mapping quality).
    pub reads_skipped: usize,
    /// Realignments accepted.
    pub reads_accepted: usize,
    /// Realignments rejected (band exhausted, numeric failure).
    pub reads_infeasible: usize,
    /// Accepted realignments that needed the wider band.
    pub band_retries: usize,
    /// Draft positions no accepted read covered.
    pub uncovered_positions: usize,
}

impl RunStats {
    /// Add another set of counters.
    pub fn merge(&mut self, other: &RunStats) {
        self.regions += other.regions;
        self.reads_considered += other.reads_considered;
        self.reads_skipped += other.reads_skipped;
        self.reads_accepted += other.reads_accepted;
        self.reads_infeasible += other.reads_infeasible;
        self.band_retries += other.band_retries;
        self.uncovered_positions += other.uncovered_positions;
    }
}

/// Stitched result of one run.
#[derive(Debug, Clone)]
pub struct PolishOutput<T> {
    /// Draft sequence name.
    pub name: Arc<str>,
    /// Stitched output in draft order.
    pub output: T,
    /// Non-fatal findings, per region in region order, then stitching.
    pub diagnostics: Vec<Diagnostic>,
    /// Run counters.
    pub stats: RunStats,
}

impl PolishOutput<Vec<u8>> {
    /// Digest of the polished sequence, stable across runs and thread counts.
    pub fn fingerprint(&self) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.name.as_bytes());
        hasher.update(&[0]);
        hasher.update(&self.output);
        hasher.finalize()
    }
}

impl PolishOutput<Vec<FeatureColumn>> {
    /// Digest of the feature stream, stable across runs and thread counts.
    pub fn fingerprint(&self) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.name.as_bytes());
        hasher.update(&[0]);
        for column in &self.output {
            hasher.update(&column.draft_pos.to_le_bytes());
            hasher.update(&column.insert_rank.map_or(u32::MAX, u32::from).to_le_bytes());
            hasher.update(&[column.draft_base.unwrap_or(0)]);
            for value in column.values {
                hasher.update(&value.to_bits().to_le_bytes());
            }
        }
        hasher.finalize()
    }
}

/// Output of [`crate::run`], shaped by the configured output mode.
#[derive(Debug, Clone)]
pub enum RunOutput {
    /// Polished sequence.
    Consensus(PolishOutput<Vec<u8>>),
    /// Feature stream.
    Features(PolishOutput<Vec<FeatureColumn>>),
}

impl RunOutput {
    /// Diagnostics of the run.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            RunOutput::Consensus(out) => &out.diagnostics,
            RunOutput::Features(out) => &out.diagnostics,
        }
    }

    /// Counters of the run.
    pub fn stats(&self) -> &RunStats {
        match self {
            RunOutput::Consensus(out) => &out.stats,
            RunOutput::Features(out) => &out.stats,
        }
    }

    /// Digest of the output.
    pub fn fingerprint(&self) -> blake3::Hash {
        match self {
            RunOutput::Consensus(out) => out.fingerprint(),
            RunOutput::Features(out) => out.fingerprint(),
        }
    }
}

#![allow(dead_code)]

use marginpolish::genomics::{parse_cigar, Strand};
use marginpolish::{AlignmentIndex, DraftSequence, PolishConfig, ReadAlignment};

pub fn aligned(id: &str, start: u32, cigar: &str, seq: &[u8]) -> ReadAlignment {
    let ops = parse_cigar(cigar).expect("valid cigar");
    ReadAlignment::from_cigar(
        id,
        Strand::Forward,
        60,
        start,
        &ops,
        seq,
        &vec![30; seq.len()],
    )
    .expect("valid alignment")
}

/// Index over `reads`, named `r0`, `r1`, ... in input order.
pub fn index_of(reads: &[(u32, &str, &str)]) -> AlignmentIndex {
    AlignmentIndex::new(
        reads
            .iter()
            .enumerate()
            .map(|(i, (start, cigar, seq))| aligned(&format!("r{i}"), *start, cigar, seq.as_bytes()))
            .collect(),
    )
}

/// Whole draft in one region.
pub fn single_window(draft: &DraftSequence) -> PolishConfig {
    PolishConfig::default().with_window(draft.len() as u32, 0)
}

/// Runs of `len` identical bases cycling through ACGT.
pub fn homopolymer_runs(count: usize, len: usize) -> Vec<u8> {
    (0..count)
        .flat_map(|run| std::iter::repeat(b"ACGT"[run % 4]).take(len))
        .collect()
}

/// Reproducible pseudo-random bases.
pub fn pseudo_random_bases(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed.max(1);
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            b"ACGT"[(state % 4) as usize]
        })
        .collect()
}

/// Perfect `read_len`-base reads starting every `step` bases.
pub fn perfect_tiles(draft: &[u8], read_len: usize, step: usize) -> Vec<ReadAlignment> {
    let cigar = format!("{read_len}M");
    (0..=draft.len().saturating_sub(read_len))
        .step_by(step.max(1))
        .filter(|&start| start + read_len <= draft.len())
        .map(|start| {
            aligned(
                &format!("tile_{start}"),
                start as u32,
                &cigar,
                &draft[start..start + read_len],
            )
        })
        .collect()
}

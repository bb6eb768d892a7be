//! Genomics data model shared by every stage of the polisher.
//!
//! This module exposes the draft sequence, read alignment records, the
//! alignment-source abstraction the pipeline queries per region, and the file
//! adapters used by the command-line front end.

mod draft;
mod index;
pub mod io;
mod types;

pub use draft::DraftSequence;
pub use index::{AlignmentIndex, AlignmentSource};
pub use types::{
    parse_cigar, AlignOp, AlignedPair, CigarOp, CigarOpKind, MalformedAlignment, ReadAlignment,
    Strand,
};

/// Number of nucleotide symbols (A, C, G, T).
pub const NUM_BASES: usize = 4;

/// Nucleotides in index order.
pub const BASES: [u8; NUM_BASES] = [b'A', b'C', b'G', b'T'];

/// Index of a nucleotide in [`BASES`]; `None` for ambiguity codes.
#[inline]
pub fn base_index(base: u8) -> Option<usize> {
    match base {
        b'A' | b'a' => Some(0),
        b'C' | b'c' => Some(1),
        b'G' | b'g' => Some(2),
        b'T' | b't' | b'U' | b'u' => Some(3),
        _ => None,
    }
}

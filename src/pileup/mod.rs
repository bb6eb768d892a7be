//! Per-region pileups.
//!
//! A pileup lays out one column per draft coordinate of a region's span plus
//! insertion columns after any coordinate where some read inserts bases, and
//! records what each clipped read observes in every column it covers.

mod builder;
mod column;

pub use builder::{ClippedRead, Pileup, PileupBuilder};
pub use column::{Observation, PileupColumn};

//! Consensus and feature estimation.
//!
//! Per-read posteriors are left-aligned within draft homopolymers and summed
//! per pileup column in read order, then turned either into consensus calls
//! or into fixed-shape feature vectors. Both
//! encoders emit one entry per span position so the stitcher can pick the
//! owning region's entry.

mod consensus;
mod features;
mod homopolymer;
mod summary;

pub use consensus::{call_consensus, ConsensusCall};
pub use features::{
    encode_features, FeatureColumn, FeatureVector, FEATURE_FIELDS, FEATURE_VERSION, FEATURE_WIDTH,
};
pub use summary::{summarize, ColumnSummary, RegionSummary};

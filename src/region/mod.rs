//! Region partitioning and stitching.
//!
//! The draft is cut into contiguous core windows, each padded by an overlap
//! margin to form the interval a worker actually processes. After
//! estimation, every draft position takes its value from the one region whose
//! core contains it.

mod partition;
mod stitch;

pub use partition::{partition, Region};
pub use stitch::{stitch, RegionOutput, Stitched};

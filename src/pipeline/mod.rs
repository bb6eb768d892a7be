//! Region-parallel orchestration.
//!
//! The draft is partitioned, each region's pileup is built, its reads are
//! realigned and summarised on a rayon pool, and the per-region outputs are
//! stitched in draft order. Results never depend on scheduling: regions are
//! collected by index and per-column sums run in read order.

mod cancel;
mod output;
mod polisher;

pub use cancel::CancelToken;
pub use output::{PolishOutput, RunOutput, RunStats};
pub use polisher::Polisher;

use crate::config::PolishConfig;
use crate::estimator::FeatureColumn;
use crate::genomics::{AlignmentSource, DraftSequence};
use crate::PolishError;

/// Polish `draft` with the alignments in `source`.
pub fn polish<S>(
    draft: &DraftSequence,
    source: &S,
    config: &PolishConfig,
) -> Result<PolishOutput<Vec<u8>>, PolishError>
where
    S: AlignmentSource + ?Sized,
{
    Polisher::new(draft, source, config).consensus()
}

/// Feature stream of `draft` for a downstream corrector.
pub fn extract_features<S>(
    draft: &DraftSequence,
    source: &S,
    config: &PolishConfig,
) -> Result<PolishOutput<Vec<FeatureColumn>>, PolishError>
where
    S: AlignmentSource + ?Sized,
{
    Polisher::new(draft, source, config).features()
}

/// Polish or extract features, as `config.output_mode` selects.
pub fn run<S>(
    draft: &DraftSequence,
    source: &S,
    config: &PolishConfig,
) -> Result<RunOutput, PolishError>
where
    S: AlignmentSource + ?Sized,
{
    Polisher::new(draft, source, config).run()
}

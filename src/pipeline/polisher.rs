use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::config::{ConfigError, OutputMode, PolishConfig};
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::estimator::{
    call_consensus, encode_features, summarize, ConsensusCall, FeatureColumn, RegionSummary,
};
use crate::genomics::{AlignmentSource, DraftSequence};
use crate::hmm::{AlignError, BandedAligner, HmmWorkspace, ReadSegment, Realignment};
use crate::pileup::{Pileup, PileupBuilder};
use crate::pipeline::{CancelToken, PolishOutput, RunOutput, RunStats};
use crate::region::{partition, stitch, Region, RegionOutput};
use crate::PolishError;

/// Region-parallel polishing of one draft sequence.
#[derive(Debug)]
pub struct Polisher<'a, S: AlignmentSource + ?Sized> {
    draft: &'a DraftSequence,
    source: &'a S,
    config: &'a PolishConfig,
    cancel: CancelToken,
}

/// Everything one region hands back to the stitcher.
struct RegionResult<T> {
    output: RegionOutput<T>,
    diagnostics: Vec<Diagnostic>,
    stats: RunStats,
}

impl<'a, S: AlignmentSource + ?Sized> Polisher<'a, S> {
    /// Polisher over `draft` reading alignments from `source`.
    pub fn new(draft: &'a DraftSequence, source: &'a S, config: &'a PolishConfig) -> Self {
        Self {
            draft,
            source,
            config,
            cancel: CancelToken::default(),
        }
    }

    /// Use `token` to cancel the run from another thread.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token cancelling this polisher.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Polished sequence.
    pub fn consensus(&self) -> Result<PolishOutput<Vec<u8>>, PolishError> {
        let draft = self.draft;
        let (calls, diagnostics, mut stats) = self.process(
            |pileup, summary| call_consensus(pileup, summary, draft),
            |pos| ConsensusCall::uncovered(pos, draft.base_at(pos).unwrap_or(b'N')),
        )?;

        let mut sequence = Vec::with_capacity(calls.len());
        for call in &calls {
            call.extend_sequence(&mut sequence);
        }
        stats.uncovered_positions = calls.iter().filter(|call| !call.covered).count();

        Ok(PolishOutput {
            name: draft.name().clone(),
            output: sequence,
            diagnostics,
            stats,
        })
    }

    /// Feature stream: every draft coordinate once, in order, each followed
    /// by its insertion columns.
    pub fn features(&self) -> Result<PolishOutput<Vec<FeatureColumn>>, PolishError> {
        let draft = self.draft;
        let (positions, diagnostics, mut stats) = self.process(
            |pileup, summary| encode_features(pileup, summary, draft),
            |pos| vec![FeatureColumn::uncovered(pos, draft.base_at(pos).unwrap_or(b'N'))],
        )?;

        stats.uncovered_positions = positions
            .iter()
            .filter(|columns| columns.first().is_some_and(|col| !col.is_covered()))
            .count();

        Ok(PolishOutput {
            name: draft.name().clone(),
            output: positions.into_iter().flatten().collect(),
            diagnostics,
            stats,
        })
    }

    /// Output selected by the configured mode.
    pub fn run(&self) -> Result<RunOutput, PolishError> {
        match self.config.output_mode {
            OutputMode::Consensus => self.consensus().map(RunOutput::Consensus),
            OutputMode::Features => self.features().map(RunOutput::Features),
        }
    }

    /// Partition, process every region on the worker pool, and stitch.
    #[instrument(skip_all, fields(contig = %self.draft.name(), len = self.draft.len()))]
    fn process<T, E, F>(
        &self,
        encode: E,
        sentinel: F,
    ) -> Result<(Vec<T>, Vec<Diagnostic>, RunStats), PolishError>
    where
        T: Send,
        E: Fn(&Pileup<'_>, &RegionSummary) -> Vec<T> + Sync,
        F: FnMut(u32) -> T,
    {
        self.config.validate()?;
        let draft_len =
            u32::try_from(self.draft.len()).map_err(|_| ConfigError::CoordinateOverflow {
                name: "draft length",
                value: self.draft.len() as i64,
            })?;
        let regions = partition(
            draft_len,
            self.config.window_size,
            self.config.overlap_margin,
        )?;
        let mut diagnostics = Vec::new();
        let read_span = self.source.max_span();
        if regions.len() > 1 && self.config.overlap_margin < read_span {
            let diagnostic = Diagnostic::global(DiagnosticKind::MarginBelowReadSpan {
                margin: self.config.overlap_margin,
                read_span,
            });
            warn!(%diagnostic, "core calls may differ from a single-window run");
            diagnostics.push(diagnostic);
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.threads)
            .build()
            .map_err(|err| PolishError::ThreadPool(err.to_string()))?;
        let builder = PileupBuilder::new(self.config.min_mapping_quality);
        let aligner = BandedAligner::new(&self.config.hmm);

        info!(regions = regions.len(), threads = pool.current_num_threads(), "polishing");
        let results: Vec<Option<RegionResult<T>>> = pool.install(|| {
            regions
                .par_iter()
                .map(|region| {
                    if self.cancel.is_cancelled() {
                        debug!(region = region.index, "region abandoned");
                        return None;
                    }
                    Some(self.process_region(region, &builder, &aligner, &encode))
                })
                .collect()
        });

        let total = results.len();
        let completed = results.iter().filter(|result| result.is_some()).count();
        if completed < total {
            warn!(completed, total, "run cancelled");
            return Err(PolishError::Cancelled { completed, total });
        }

        let mut stats = RunStats::default();
        let mut outputs = Vec::with_capacity(total);
        for result in results.into_iter().flatten() {
            diagnostics.extend(result.diagnostics);
            stats.merge(&result.stats);
            outputs.push(result.output);
        }

        let stitched = stitch(draft_len, outputs, sentinel);
        for diagnostic in &stitched.diagnostics {
            warn!(%diagnostic, "stitching defect");
        }
        diagnostics.extend(stitched.diagnostics);

        info!(
            accepted = stats.reads_accepted,
            skipped = stats.reads_skipped,
            infeasible = stats.reads_infeasible,
            retries = stats.band_retries,
            "polishing finished"
        );
        Ok((stitched.items, diagnostics, stats))
    }

    #[instrument(skip_all, fields(region = region.index, start = region.core.start, end = region.core.end))]
    fn process_region<T, E>(
        &self,
        region: &Region,
        builder: &PileupBuilder,
        aligner: &BandedAligner,
        encode: &E,
    ) -> RegionResult<T>
    where
        E: Fn(&Pileup<'_>, &RegionSummary) -> Vec<T>,
    {
        let mut diagnostics = Vec::new();
        let alignments = self.source.overlapping(region.span.clone());
        let considered = alignments.len();
        let pileup = builder.build(region, self.draft, alignments, &mut diagnostics);
        let skipped = diagnostics.len();

        let outcomes: Vec<Result<Realignment, AlignError>> = pileup
            .reads
            .par_iter()
            .map_init(HmmWorkspace::default, |workspace, read| {
                let segment = ReadSegment::new(read, self.draft)?;
                aligner.align(&segment, workspace)
            })
            .collect();

        let mut stats = RunStats {
            regions: 1,
            reads_considered: considered,
            reads_skipped: skipped,
            ..RunStats::default()
        };
        let mut realignments = Vec::with_capacity(outcomes.len());
        for (read, outcome) in pileup.reads.iter().zip(outcomes) {
            match outcome {
                Ok(realignment) => {
                    stats.reads_accepted += 1;
                    stats.band_retries += usize::from(realignment.retried);
                    realignments.push(Some(realignment));
                }
                Err(err) => {
                    debug!(read = %read.alignment.id, error = %err, "realignment rejected");
                    stats.reads_infeasible += 1;
                    diagnostics.push(Diagnostic::for_read(
                        region.index,
                        &read.alignment.id,
                        err.into(),
                    ));
                    realignments.push(None);
                }
            }
        }

        let summary = summarize(&pileup, self.draft, &realignments);
        let positions = encode(&pileup, &summary);
        debug!(
            reads = pileup.reads.len(),
            accepted = stats.reads_accepted,
            "region done"
        );

        RegionResult {
            output: RegionOutput {
                region: region.clone(),
                positions,
            },
            diagnostics,
            stats,
        }
    }
}

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use marginpolish::genomics::io::{
    load_bam_alignments, read_fasta, write_fasta, write_feature_header, write_features,
};
use marginpolish::{
    extract_features, polish, AlignmentIndex, HmmConfig, MismatchCurve, PolishConfig, RunStats,
};
use tracing::{info, warn};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "marginpolish",
    about = "Polish a draft assembly by banded pair-HMM realignment of long reads"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write the polished draft as FASTA.
    Polish {
        #[command(flatten)]
        inputs: Inputs,
        #[command(flatten)]
        options: PolishArgs,
    },
    /// Write per-column feature vectors as TSV.
    Features {
        #[command(flatten)]
        inputs: Inputs,
        #[command(flatten)]
        options: PolishArgs,
    },
}

#[derive(Args, Debug)]
struct Inputs {
    /// Draft assembly (FASTA, one or more contigs).
    draft: PathBuf,
    /// Reads aligned to the draft (indexed BAM).
    alignments: PathBuf,
    /// Output file (stdout when omitted).
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct PolishArgs {
    /// Core window size in draft bases.
    #[arg(long, default_value_t = 50_000, allow_negative_numbers = true)]
    window: i64,
    /// Overlap margin added on both sides of each window.
    #[arg(long, default_value_t = 5_000, allow_negative_numbers = true)]
    margin: i64,
    /// Band half-width around the coarse alignment.
    #[arg(long, default_value_t = 24)]
    band_half_width: usize,
    /// Band widening factor for the single retry (1 disables the retry).
    #[arg(long, default_value_t = 2)]
    retry_multiplier: usize,
    /// Largest posterior mass tolerated on the band edge.
    #[arg(long, default_value_t = 0.05)]
    edge_mass_threshold: f64,
    /// Gap open probability.
    #[arg(long, default_value_t = 0.03)]
    gap_open: f64,
    /// Gap extension probability.
    #[arg(long, default_value_t = 0.4)]
    gap_extend: f64,
    /// Lowest per-base error probability any quality may claim.
    #[arg(long, default_value_t = 1e-4)]
    mismatch_floor: f64,
    /// Highest per-base error probability.
    #[arg(long, default_value_t = 0.3)]
    mismatch_ceiling: f64,
    /// Skip reads with a lower mapping quality.
    #[arg(long, default_value_t = 0)]
    min_mapq: u8,
    /// Worker threads (0 = all cores).
    #[arg(short, long, default_value_t = 0)]
    threads: usize,
    /// Log span timings.
    #[arg(long)]
    profile: bool,
}

impl PolishArgs {
    fn config(&self) -> Result<PolishConfig> {
        let hmm = HmmConfig {
            band_half_width: self.band_half_width,
            band_retry_multiplier: self.retry_multiplier,
            edge_mass_threshold: self.edge_mass_threshold,
            gap_open: self.gap_open,
            gap_extend: self.gap_extend,
            mismatch: MismatchCurve::Phred {
                floor: self.mismatch_floor,
                ceiling: self.mismatch_ceiling,
            },
        };
        let config = PolishConfig::default()
            .with_signed_window(self.window, self.margin)?
            .with_hmm(hmm)
            .with_min_mapping_quality(self.min_mapq)
            .with_threads(self.threads);
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Polish { inputs, options } => {
            init_logging(options.profile);
            run_polish(&inputs, &options.config()?)
        }
        Commands::Features { inputs, options } => {
            init_logging(options.profile);
            run_features(&inputs, &options.config()?)
        }
    }
}

fn init_logging(profile: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let span_events = if profile {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_span_events(span_events)
                .with_target(false),
        )
        .init();
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(File::create(path).with_context(|| {
            format!("failed to create output file {}", path.display())
        })?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    })
}

fn run_polish(inputs: &Inputs, config: &PolishConfig) -> Result<()> {
    let drafts = read_fasta(&inputs.draft)?;
    let mut out = open_output(inputs.output.as_deref())?;
    let mut total = RunStats::default();

    for draft in &drafts {
        let reads = load_bam_alignments(&inputs.alignments, draft.name())?;
        let index = AlignmentIndex::new(reads);
        let polished = polish(draft, &index, config)
            .with_context(|| format!("polishing {} failed", draft.name()))?;
        report(draft.name(), &polished.stats, polished.diagnostics.len());
        write_fasta(&mut out, draft.name(), &polished.output)?;
        total.merge(&polished.stats);
    }

    log_total(drafts.len(), &total);
    Ok(())
}

fn run_features(inputs: &Inputs, config: &PolishConfig) -> Result<()> {
    let drafts = read_fasta(&inputs.draft)?;
    let mut out = open_output(inputs.output.as_deref())?;
    write_feature_header(&mut out)?;
    let mut total = RunStats::default();

    for draft in &drafts {
        let reads = load_bam_alignments(&inputs.alignments, draft.name())?;
        let index = AlignmentIndex::new(reads);
        let features = extract_features(draft, &index, config)
            .with_context(|| format!("feature extraction for {} failed", draft.name()))?;
        report(draft.name(), &features.stats, features.diagnostics.len());
        write_features(&mut out, draft.name(), &features.output)?;
        total.merge(&features.stats);
    }

    log_total(drafts.len(), &total);
    Ok(())
}

fn report(contig: &str, stats: &RunStats, diagnostics: usize) {
    info!(
        contig,
        regions = stats.regions,
        accepted = stats.reads_accepted,
        uncovered = stats.uncovered_positions,
        diagnostics,
        "contig done"
    );
    if stats.reads_infeasible > 0 {
        warn!(contig, infeasible = stats.reads_infeasible, "reads dropped after band retry");
    }
}

fn log_total(contigs: usize, total: &RunStats) {
    info!(
        contigs,
        reads_considered = total.reads_considered,
        reads_skipped = total.reads_skipped,
        reads_accepted = total.reads_accepted,
        reads_infeasible = total.reads_infeasible,
        band_retries = total.band_retries,
        "run complete"
    );
}

//! Run configuration
//!
//! Every numeric knob of the polisher lives here. The defaults are
//! placeholders pending calibration against a sequencing technology's error
//! profile; none of them is baked into the algorithms.

use thiserror::Error;

/// Largest Phred quality the emission tables distinguish.
pub const MAX_QUALITY: u8 = 93;

/// Errors raised while validating a configuration.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    /// Window size must be strictly positive.
    #[error("window size must be > 0 (got {0})")]
    NonPositiveWindow(i64),

    /// Overlap margin must not be negative.
    #[error("overlap margin must be >= 0 (got {0})")]
    NegativeMargin(i64),

    /// A coordinate-valued parameter does not fit in draft coordinates.
    #[error("{name} = {value} exceeds the coordinate range")]
    CoordinateOverflow {
        /// Parameter name.
        name: &'static str,
        /// Offending value.
        value: i64,
    },

    /// A numeric parameter lies outside its admissible range.
    #[error("{name} = {value} outside {range}")]
    OutOfRange {
        /// Parameter name.
        name: &'static str,
        /// Offending value.
        value: f64,
        /// Human readable admissible range.
        range: &'static str,
    },

    /// Mismatch curve table is empty.
    #[error("mismatch table must contain at least one entry")]
    EmptyMismatchTable,
}

/// What a run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OutputMode {
    /// Corrected consensus sequence.
    #[default]
    Consensus,
    /// Per-column feature vectors for a learned corrector.
    Features,
}

/// Mapping from base quality to the probability that a read base is wrong.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MismatchCurve {
    /// `10^(-q/10)` clamped to `[floor, ceiling]`.
    Phred {
        /// Lowest error probability any quality may claim.
        floor: f64,
        /// Highest error probability (applied to very low qualities).
        ceiling: f64,
    },
    /// Explicit error probability per quality value; qualities past the end
    /// use the last entry.
    Table(Vec<f64>),
}

impl Default for MismatchCurve {
    fn default() -> Self {
        MismatchCurve::Phred {
            floor: 1e-4,
            ceiling: 0.3,
        }
    }
}

impl MismatchCurve {
    /// Error probability for a base reported at `quality`.
    pub fn error_probability(&self, quality: u8) -> f64 {
        match self {
            MismatchCurve::Phred { floor, ceiling } => {
                let q = quality.min(MAX_QUALITY) as f64;
                10f64.powf(-q / 10.0).clamp(*floor, *ceiling)
            }
            MismatchCurve::Table(table) => {
                let idx = (quality as usize).min(table.len().saturating_sub(1));
                table.get(idx).copied().unwrap_or(0.25)
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            MismatchCurve::Phred { floor, ceiling } => {
                check_open_closed("mismatch floor", *floor, 0.0, 0.75, "(0, 0.75]")?;
                check_open_closed("mismatch ceiling", *ceiling, 0.0, 0.75, "(0, 0.75]")?;
                if floor > ceiling {
                    return Err(ConfigError::OutOfRange {
                        name: "mismatch floor",
                        value: *floor,
                        range: "<= mismatch ceiling",
                    });
                }
                Ok(())
            }
            MismatchCurve::Table(table) => {
                if table.is_empty() {
                    return Err(ConfigError::EmptyMismatchTable);
                }
                for &p in table {
                    check_open_closed("mismatch table entry", p, 0.0, 0.75, "(0, 0.75]")?;
                }
                Ok(())
            }
        }
    }
}

/// Parameters of the banded pair-HMM.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HmmConfig {
    /// Band half-width around the coarse alignment path.
    pub band_half_width: usize,
    /// Factor applied to the half-width for the single retry (1 disables retry).
    pub band_retry_multiplier: usize,
    /// Largest per-column posterior mass allowed on band edge cells.
    pub edge_mass_threshold: f64,
    /// Probability of opening an insertion or deletion from a match.
    pub gap_open: f64,
    /// Probability of extending an open insertion or deletion.
    pub gap_extend: f64,
    /// Quality to mismatch-probability curve.
    pub mismatch: MismatchCurve,
}

impl Default for HmmConfig {
    fn default() -> Self {
        Self {
            band_half_width: 24,
            band_retry_multiplier: 2,
            edge_mass_threshold: 0.05,
            gap_open: 0.03,
            gap_extend: 0.4,
            mismatch: MismatchCurve::default(),
        }
    }
}

impl HmmConfig {
    /// Validate HMM parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.band_half_width == 0 {
            return Err(ConfigError::OutOfRange {
                name: "band half-width",
                value: 0.0,
                range: ">= 1",
            });
        }
        if self.band_retry_multiplier == 0 {
            return Err(ConfigError::OutOfRange {
                name: "band retry multiplier",
                value: 0.0,
                range: ">= 1",
            });
        }
        check_open_closed(
            "edge mass threshold",
            self.edge_mass_threshold,
            0.0,
            1.0,
            "(0, 1]",
        )?;
        // Match must keep positive mass: 1 - 2 * open > 0.
        if !(self.gap_open > 0.0 && self.gap_open < 0.5) {
            return Err(ConfigError::OutOfRange {
                name: "gap open",
                value: self.gap_open,
                range: "(0, 0.5)",
            });
        }
        if !(self.gap_extend > 0.0 && self.gap_extend < 1.0) {
            return Err(ConfigError::OutOfRange {
                name: "gap extend",
                value: self.gap_extend,
                range: "(0, 1)",
            });
        }
        self.mismatch.validate()
    }

    /// Half-width used by the retry pass.
    pub fn retry_half_width(&self) -> usize {
        self.band_half_width
            .saturating_mul(self.band_retry_multiplier)
    }
}

/// Full configuration of a polishing run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PolishConfig {
    /// Core window size in draft bases.
    pub window_size: u32,
    /// Padding added on both sides of each core window.
    pub overlap_margin: u32,
    /// Realignment model parameters.
    pub hmm: HmmConfig,
    /// Output produced by [`crate::run`].
    pub output_mode: OutputMode,
    /// Reads with a lower mapping quality are skipped.
    pub min_mapping_quality: u8,
    /// Worker threads (0 lets rayon decide).
    pub threads: usize,
}

impl Default for PolishConfig {
    fn default() -> Self {
        Self {
            window_size: 50_000,
            overlap_margin: 5_000,
            hmm: HmmConfig::default(),
            output_mode: OutputMode::Consensus,
            min_mapping_quality: 0,
            threads: 0,
        }
    }
}

impl PolishConfig {
    /// Set window size and overlap margin.
    pub fn with_window(mut self, window_size: u32, overlap_margin: u32) -> Self {
        self.window_size = window_size;
        self.overlap_margin = overlap_margin;
        self
    }

    /// Set window size and overlap margin from signed values, as supplied by
    /// callers that cannot express unsigned integers.
    pub fn with_signed_window(
        mut self,
        window_size: i64,
        overlap_margin: i64,
    ) -> Result<Self, ConfigError> {
        if window_size <= 0 {
            return Err(ConfigError::NonPositiveWindow(window_size));
        }
        if overlap_margin < 0 {
            return Err(ConfigError::NegativeMargin(overlap_margin));
        }
        self.window_size = u32::try_from(window_size).map_err(|_| {
            ConfigError::CoordinateOverflow {
                name: "window size",
                value: window_size,
            }
        })?;
        self.overlap_margin = u32::try_from(overlap_margin).map_err(|_| {
            ConfigError::CoordinateOverflow {
                name: "overlap margin",
                value: overlap_margin,
            }
        })?;
        Ok(self)
    }

    /// Replace HMM parameters.
    pub fn with_hmm(mut self, hmm: HmmConfig) -> Self {
        self.hmm = hmm;
        self
    }

    /// Set output mode.
    pub fn with_output_mode(mut self, mode: OutputMode) -> Self {
        self.output_mode = mode;
        self
    }

    /// Set worker thread count.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Set minimum mapping quality.
    pub fn with_min_mapping_quality(mut self, mapq: u8) -> Self {
        self.min_mapping_quality = mapq;
        self
    }

    /// Validate the whole configuration. Called once before any region is
    /// dispatched.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 {
            return Err(ConfigError::NonPositiveWindow(0));
        }
        self.hmm.validate()
    }
}

fn check_open_closed(
    name: &'static str,
    value: f64,
    low: f64,
    high: f64,
    range: &'static str,
) -> Result<(), ConfigError> {
    if value > low && value <= high {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { name, value, range })
    }
}

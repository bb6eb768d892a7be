//! Python bindings that expose the polisher via PyO3.
use std::sync::{Mutex, PoisonError};

use pyo3::{
    exceptions::{PyRuntimeError, PyValueError},
    prelude::*,
    types::PyModule,
    IntoPyObject,
};

use crate::config::{HmmConfig, MismatchCurve, OutputMode, PolishConfig};
use crate::estimator::{FeatureColumn, FEATURE_FIELDS, FEATURE_VERSION};
use crate::genomics::{parse_cigar, AlignmentIndex, DraftSequence, ReadAlignment, Strand};
use crate::pipeline::{CancelToken, PolishOutput, Polisher, RunOutput};
use crate::PolishError;

/// `(read_id, draft_start, cigar, sequence, qualities, is_reverse)`.
type PyAlignment = (String, u32, String, String, Vec<u8>, bool);

/// `(draft_pos, insert_rank, values)`.
type PyFeatureColumn = (u32, Option<u32>, Vec<f32>);

/// Python-facing polisher holding a validated configuration.
///
/// Every call runs under its own cancel token; `abort` cancels the calls in
/// flight and leaves the polisher usable afterwards.
#[pyclass(name = "Polisher")]
#[derive(Debug)]
pub struct PyPolisher {
    config: PolishConfig,
    in_flight: Mutex<CancelToken>,
}

#[pymethods]
impl PyPolisher {
    #[new]
    #[pyo3(signature = (
        window_size = 50_000,
        overlap_margin = 5_000,
        band_half_width = 24,
        band_retry_multiplier = 2,
        edge_mass_threshold = 0.05,
        gap_open = 0.03,
        gap_extend = 0.4,
        mismatch_floor = 1e-4,
        mismatch_ceiling = 0.3,
        mismatch_table = None,
        output_mode = "consensus",
        min_mapping_quality = 0,
        threads = 0
    ))]
    /// Create a polisher. Invalid parameters raise `ValueError`.
    ///
    /// The mismatch curve is Phred clamped to `[mismatch_floor,
    /// mismatch_ceiling]` unless `mismatch_table` gives one error
    /// probability per quality value. `output_mode` is `"consensus"` or
    /// `"features"` and selects what `run` returns.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        window_size: i64,
        overlap_margin: i64,
        band_half_width: usize,
        band_retry_multiplier: usize,
        edge_mass_threshold: f64,
        gap_open: f64,
        gap_extend: f64,
        mismatch_floor: f64,
        mismatch_ceiling: f64,
        mismatch_table: Option<Vec<f64>>,
        output_mode: &str,
        min_mapping_quality: u8,
        threads: usize,
    ) -> PyResult<Self> {
        let mismatch = match mismatch_table {
            Some(table) => MismatchCurve::Table(table),
            None => MismatchCurve::Phred {
                floor: mismatch_floor,
                ceiling: mismatch_ceiling,
            },
        };
        let hmm = HmmConfig {
            band_half_width,
            band_retry_multiplier,
            edge_mass_threshold,
            gap_open,
            gap_extend,
            mismatch,
        };
        let config = PolishConfig::default()
            .with_signed_window(window_size, overlap_margin)
            .map_err(|err| PyValueError::new_err(err.to_string()))?
            .with_hmm(hmm)
            .with_output_mode(parse_output_mode(output_mode)?)
            .with_min_mapping_quality(min_mapping_quality)
            .with_threads(threads);
        config
            .validate()
            .map_err(|err| PyValueError::new_err(err.to_string()))?;
        Ok(Self {
            config,
            in_flight: Mutex::new(CancelToken::new()),
        })
    }

    /// Polish one draft sequence.
    ///
    /// Args:
    ///     name: Draft sequence name.
    ///     draft: Draft bases.
    ///     alignments: List of `(read_id, start, cigar, sequence, qualities, is_reverse)`.
    ///
    /// Returns:
    ///     `(polished_sequence, diagnostics)` with diagnostics as strings.
    pub fn polish(
        &self,
        py: Python<'_>,
        name: String,
        draft: String,
        alignments: Vec<PyAlignment>,
    ) -> PyResult<(String, Vec<String>)> {
        let draft = DraftSequence::new(name, draft.into_bytes());
        let (index, rejected) = build_index(alignments);
        let cancel = self.start_call();
        let polished = py
            .allow_threads(|| {
                Polisher::new(&draft, &index, &self.config)
                    .with_cancel_token(cancel)
                    .consensus()
            })
            .map_err(to_py_err)?;
        Ok(consensus_result(polished, rejected))
    }

    /// Extract feature columns for one draft sequence.
    ///
    /// Returns:
    ///     `(columns, diagnostics)`: columns are `(draft_pos, insert_rank,
    ///     values)` in draft order with values following `feature_fields()`;
    ///     diagnostics are strings.
    pub fn extract_features(
        &self,
        py: Python<'_>,
        name: String,
        draft: String,
        alignments: Vec<PyAlignment>,
    ) -> PyResult<(Vec<PyFeatureColumn>, Vec<String>)> {
        let draft = DraftSequence::new(name, draft.into_bytes());
        let (index, rejected) = build_index(alignments);
        let cancel = self.start_call();
        let features = py
            .allow_threads(|| {
                Polisher::new(&draft, &index, &self.config)
                    .with_cancel_token(cancel)
                    .features()
            })
            .map_err(to_py_err)?;
        Ok(features_result(features, rejected))
    }

    /// Run the configured output mode: the result of `polish` or of
    /// `extract_features`.
    pub fn run(
        &self,
        py: Python<'_>,
        name: String,
        draft: String,
        alignments: Vec<PyAlignment>,
    ) -> PyResult<PyObject> {
        let draft = DraftSequence::new(name, draft.into_bytes());
        let (index, rejected) = build_index(alignments);
        let cancel = self.start_call();
        let output = py
            .allow_threads(|| {
                Polisher::new(&draft, &index, &self.config)
                    .with_cancel_token(cancel)
                    .run()
            })
            .map_err(to_py_err)?;

        let object = match output {
            RunOutput::Consensus(polished) => consensus_result(polished, rejected)
                .into_pyobject(py)?
                .into_any(),
            RunOutput::Features(features) => features_result(features, rejected)
                .into_pyobject(py)?
                .into_any(),
        };
        Ok(object.unbind())
    }

    /// Cancel the calls currently running on this polisher. Later calls run
    /// normally.
    pub fn abort(&self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();
    }

    /// Feature field names in vector order.
    #[staticmethod]
    pub fn feature_fields() -> Vec<&'static str> {
        FEATURE_FIELDS.to_vec()
    }

    /// Version of the feature layout.
    #[staticmethod]
    pub fn feature_version() -> u32 {
        FEATURE_VERSION
    }
}

impl PyPolisher {
    /// Token for a new call. Calls started together share one token until
    /// `abort` cancels it.
    fn start_call(&self) -> CancelToken {
        let mut current = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if current.is_cancelled() {
            *current = CancelToken::new();
        }
        current.clone()
    }
}

fn consensus_result(
    polished: PolishOutput<Vec<u8>>,
    mut diagnostics: Vec<String>,
) -> (String, Vec<String>) {
    diagnostics.extend(polished.diagnostics.iter().map(ToString::to_string));
    let sequence = String::from_utf8_lossy(&polished.output).into_owned();
    (sequence, diagnostics)
}

fn features_result(
    features: PolishOutput<Vec<FeatureColumn>>,
    mut diagnostics: Vec<String>,
) -> (Vec<PyFeatureColumn>, Vec<String>) {
    diagnostics.extend(features.diagnostics.iter().map(ToString::to_string));
    let columns = features
        .output
        .into_iter()
        .map(|column| (column.draft_pos, column.insert_rank, column.values.to_vec()))
        .collect();
    (columns, diagnostics)
}

fn parse_output_mode(mode: &str) -> PyResult<OutputMode> {
    match mode {
        "consensus" => Ok(OutputMode::Consensus),
        "features" => Ok(OutputMode::Features),
        other => Err(PyValueError::new_err(format!(
            "output_mode must be \"consensus\" or \"features\" (got {other:?})"
        ))),
    }
}

fn build_index(alignments: Vec<PyAlignment>) -> (AlignmentIndex, Vec<String>) {
    let mut reads = Vec::with_capacity(alignments.len());
    let mut rejected = Vec::new();
    for (id, start, cigar, sequence, qualities, is_reverse) in alignments {
        let strand = if is_reverse {
            Strand::Reverse
        } else {
            Strand::Forward
        };
        let parsed = parse_cigar(&cigar).and_then(|ops| {
            ReadAlignment::from_cigar(
                id.as_str(),
                strand,
                60,
                start,
                &ops,
                sequence.as_bytes(),
                &qualities,
            )
        });
        match parsed {
            Ok(read) => reads.push(read),
            Err(err) => rejected.push(format!("read {id}: {err}")),
        }
    }
    (AlignmentIndex::new(reads), rejected)
}

fn to_py_err(err: PolishError) -> PyErr {
    match err {
        PolishError::Config(err) => PyValueError::new_err(err.to_string()),
        other => PyRuntimeError::new_err(other.to_string()),
    }
}

/// Create Python module.
#[pymodule]
pub fn marginpolish_py(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyPolisher>()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alignment(id: &str, cigar: &str, sequence: &str) -> PyAlignment {
        (
            id.to_string(),
            0,
            cigar.to_string(),
            sequence.to_string(),
            vec![30; sequence.len()],
            false,
        )
    }

    #[test]
    fn abort_cancels_only_calls_in_flight() {
        let polisher = PyPolisher::new(
            8, 0, 24, 2, 0.05, 0.03, 0.4, 1e-4, 0.3, None, "features", 0, 1,
        )
        .unwrap();
        assert_eq!(polisher.config.output_mode, OutputMode::Features);

        let running = polisher.start_call();
        polisher.abort();
        assert!(running.is_cancelled());
        assert!(!polisher.start_call().is_cancelled());
    }

    #[test]
    fn mismatch_table_replaces_the_phred_curve() {
        let polisher = PyPolisher::new(
            8,
            0,
            24,
            2,
            0.05,
            0.03,
            0.4,
            1e-4,
            0.3,
            Some(vec![0.2, 0.01]),
            "consensus",
            0,
            1,
        )
        .unwrap();
        assert_eq!(
            polisher.config.hmm.mismatch,
            MismatchCurve::Table(vec![0.2, 0.01])
        );
        assert!(matches!(parse_output_mode("features"), Ok(OutputMode::Features)));
        assert!(parse_output_mode("Features").is_err());
    }

    #[test]
    fn rejected_reads_and_run_diagnostics_are_both_returned() {
        let draft = DraftSequence::new("ctg", b"ACGTACGTACGTACGT".to_vec());
        let (index, rejected) = build_index(vec![
            alignment("bad", "4Z", "ACGT"),
            alignment("good", "16M", "ACGTACGTACGTACGT"),
        ]);
        assert_eq!(index.len(), 1);

        let config = PolishConfig::default().with_window(8, 0);
        let features = Polisher::new(&draft, &index, &config).features().unwrap();
        let (columns, diagnostics) = features_result(features, rejected);

        assert_eq!(columns.len(), 16);
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics[0].starts_with("read bad:"));
        assert!(diagnostics[1].contains("overlap margin 0"));
    }
}

use crate::config::{HmmConfig, MismatchCurve, MAX_QUALITY};
use crate::genomics::base_index;
use crate::hmm::LOG_ZERO;

/// Hidden state of the pair-HMM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HmmState {
    /// Read base aligned to a draft base.
    Match,
    /// Read base with no draft counterpart.
    InsertInRead,
    /// Draft base with no read counterpart.
    DeleteInDraft,
}

impl HmmState {
    /// All states in matrix order.
    pub const ALL: [HmmState; 3] = [
        HmmState::Match,
        HmmState::InsertInRead,
        HmmState::DeleteInDraft,
    ];

    /// Position of the state in per-cell arrays.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            HmmState::Match => 0,
            HmmState::InsertInRead => 1,
            HmmState::DeleteInDraft => 2,
        }
    }
}

/// 3×3 log transition probabilities, indexed `[from][to]`.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionTable {
    log: [[f64; 3]; 3],
}

impl TransitionTable {
    /// Affine-gap transitions. Insert and delete never follow each other.
    pub fn new(gap_open: f64, gap_extend: f64) -> Self {
        let open = gap_open.ln();
        let extend = gap_extend.ln();
        let close = (1.0 - gap_extend).ln();
        let stay = (1.0 - 2.0 * gap_open).ln();
        Self {
            log: [
                [stay, open, open],
                [close, extend, LOG_ZERO],
                [close, LOG_ZERO, extend],
            ],
        }
    }

    /// Log probability of moving from `from` to `to`.
    #[inline]
    pub fn get(&self, from: HmmState, to: HmmState) -> f64 {
        self.log[from.index()][to.index()]
    }
}

/// Log emission probabilities, tabulated per base quality.
#[derive(Debug, Clone, PartialEq)]
pub struct EmissionModel {
    agree: Vec<f64>,
    disagree: Vec<f64>,
    ambiguous: f64,
}

impl EmissionModel {
    /// Tabulate emissions for every quality the curve can be asked about.
    pub fn new(curve: &MismatchCurve) -> Self {
        let qualities = 0..=MAX_QUALITY;
        let (agree, disagree) = qualities
            .map(|q| {
                let e = curve.error_probability(q);
                ((1.0 - e).ln(), (e / 3.0).ln())
            })
            .unzip();
        Self {
            agree,
            disagree,
            ambiguous: 0.25f64.ln(),
        }
    }

    /// Log probability that Match emits `read_base` over `draft_base`.
    #[inline]
    pub fn match_log(&self, read_base: u8, draft_base: u8, quality: u8) -> f64 {
        match (base_index(read_base), base_index(draft_base)) {
            (Some(r), Some(d)) => {
                let q = quality.min(MAX_QUALITY) as usize;
                if r == d {
                    self.agree[q]
                } else {
                    self.disagree[q]
                }
            }
            _ => self.ambiguous,
        }
    }

    /// Log probability that InsertInRead emits any base.
    #[inline]
    pub fn insert_log(&self) -> f64 {
        self.ambiguous
    }
}

/// Transition and emission model of the realigner.
#[derive(Debug, Clone, PartialEq)]
pub struct PairHmm {
    /// Transition probabilities.
    pub transitions: TransitionTable,
    /// Emission probabilities.
    pub emissions: EmissionModel,
}

impl PairHmm {
    /// Build the model from configuration.
    pub fn new(config: &HmmConfig) -> Self {
        Self {
            transitions: TransitionTable::new(config.gap_open, config.gap_extend),
            emissions: EmissionModel::new(&config.mismatch),
        }
    }
}

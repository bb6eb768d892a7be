use crate::hmm::{log_add, log_add3, AlignError, Band, HmmState, PairHmm, LOG_ZERO};

const M: usize = HmmState::Match.index();
const I: usize = HmmState::InsertInRead.index();
const D: usize = HmmState::DeleteInDraft.index();

/// Banded forward and backward log-probabilities.
///
/// Cells are stored column by column; column `j` holds the rows admitted by
/// the band, so memory is proportional to the band area.
#[derive(Debug, Clone, Default)]
pub struct BandedMatrix {
    band: Band,
    offsets: Vec<usize>,
    forward: Vec<[f64; 3]>,
    backward: Vec<[f64; 3]>,
    total: f64,
}

impl BandedMatrix {
    /// Lay out cells for `band`, reusing existing allocations.
    pub fn reset(&mut self, band: Band) {
        self.offsets.clear();
        let mut next = 0;
        for j in 0..band.columns() {
            self.offsets.push(next);
            next += band.rows(j).count();
        }
        self.forward.clear();
        self.forward.resize(next, [LOG_ZERO; 3]);
        self.backward.clear();
        self.backward.resize(next, [LOG_ZERO; 3]);
        self.band = band;
        self.total = LOG_ZERO;
    }

    /// Band the matrix is laid out for.
    pub fn band(&self) -> &Band {
        &self.band
    }

    /// Total log-likelihood from the last forward pass.
    pub fn total(&self) -> f64 {
        self.total
    }

    #[inline]
    fn cell(&self, j: usize, i: usize) -> Option<usize> {
        if !self.band.contains(j, i) {
            return None;
        }
        Some(self.offsets[j] + i - *self.band.rows(j).start())
    }

    #[inline]
    fn fwd(&self, j: usize, i: usize) -> [f64; 3] {
        self.cell(j, i).map_or([LOG_ZERO; 3], |c| self.forward[c])
    }

    #[inline]
    fn bwd(&self, j: usize, i: usize) -> [f64; 3] {
        self.cell(j, i).map_or([LOG_ZERO; 3], |c| self.backward[c])
    }

    /// Forward recursion. Starts in Match at `(0, 0)`.
    pub fn fill_forward(
        &mut self,
        hmm: &PairHmm,
        read: &[u8],
        qualities: &[u8],
        draft: &[u8],
    ) -> Result<f64, AlignError> {
        let t = &hmm.transitions;
        let (mm, im, dm) = (
            t.get(HmmState::Match, HmmState::Match),
            t.get(HmmState::InsertInRead, HmmState::Match),
            t.get(HmmState::DeleteInDraft, HmmState::Match),
        );
        let (mi, ii) = (
            t.get(HmmState::Match, HmmState::InsertInRead),
            t.get(HmmState::InsertInRead, HmmState::InsertInRead),
        );
        let (md, dd) = (
            t.get(HmmState::Match, HmmState::DeleteInDraft),
            t.get(HmmState::DeleteInDraft, HmmState::DeleteInDraft),
        );
        let insert = hmm.emissions.insert_log();

        for j in 0..self.band.columns() {
            for i in self.band.rows(j) {
                let mut value = [LOG_ZERO; 3];
                if j == 0 && i == 0 {
                    value[M] = 0.0;
                } else {
                    if j > 0 && i > 0 {
                        let diag = self.fwd(j - 1, i - 1);
                        let emit =
                            hmm.emissions
                                .match_log(read[i - 1], draft[j - 1], qualities[i - 1]);
                        value[M] = emit + log_add3(diag[M] + mm, diag[I] + im, diag[D] + dm);
                    }
                    if i > 0 {
                        let up = self.fwd(j, i - 1);
                        value[I] = insert + log_add(up[M] + mi, up[I] + ii);
                    }
                    if j > 0 {
                        let left = self.fwd(j - 1, i);
                        value[D] = log_add(left[M] + md, left[D] + dd);
                    }
                }
                if let Some(c) = self.cell(j, i) {
                    self.forward[c] = value;
                }
            }
        }

        let last = self.fwd(self.band.columns() - 1, read.len());
        self.total = log_add3(last[M], last[I], last[D]);
        if !self.total.is_finite() {
            return Err(AlignError::NonFinite { stage: "forward" });
        }
        Ok(self.total)
    }

    /// Backward recursion. Every state may end at `(m, n)`.
    pub fn fill_backward(
        &mut self,
        hmm: &PairHmm,
        read: &[u8],
        qualities: &[u8],
        draft: &[u8],
    ) -> Result<(), AlignError> {
        let t = &hmm.transitions;
        let insert = hmm.emissions.insert_log();
        let m = self.band.columns() - 1;
        let n = read.len();

        for j in (0..=m).rev() {
            for i in self.band.rows(j).rev() {
                let mut value = [LOG_ZERO; 3];
                if j == m && i == n {
                    value = [0.0; 3];
                } else {
                    let diag = if j < m && i < n {
                        hmm.emissions.match_log(read[i], draft[j], qualities[i])
                            + self.bwd(j + 1, i + 1)[M]
                    } else {
                        LOG_ZERO
                    };
                    let down = if i < n {
                        insert + self.bwd(j, i + 1)[I]
                    } else {
                        LOG_ZERO
                    };
                    let right = if j < m {
                        self.bwd(j + 1, i)[D]
                    } else {
                        LOG_ZERO
                    };
                    for from in HmmState::ALL {
                        value[from.index()] = log_add3(
                            t.get(from, HmmState::Match) + diag,
                            t.get(from, HmmState::InsertInRead) + down,
                            t.get(from, HmmState::DeleteInDraft) + right,
                        );
                    }
                }
                if let Some(c) = self.cell(j, i) {
                    self.backward[c] = value;
                }
            }
        }

        if self.bwd(0, 0)[M].is_nan() {
            return Err(AlignError::NonFinite { stage: "backward" });
        }
        Ok(())
    }

    /// Posterior probability of each state at `(j, i)`.
    #[inline]
    pub fn posterior(&self, j: usize, i: usize) -> [f64; 3] {
        let f = self.fwd(j, i);
        let b = self.bwd(j, i);
        [
            (f[M] + b[M] - self.total).exp(),
            (f[I] + b[I] - self.total).exp(),
            (f[D] + b[D] - self.total).exp(),
        ]
    }
}

/// Per-thread scratch space for realignment.
///
/// Buffers are cleared and reused between reads instead of being freed.
#[derive(Debug, Default)]
pub struct HmmWorkspace {
    /// DP matrix reused across reads.
    pub matrix: BandedMatrix,
    reads: usize,
}

impl HmmWorkspace {
    /// Prepare the matrix for a new band.
    pub fn prepare(&mut self, band: Band) -> &mut BandedMatrix {
        self.reads += 1;
        self.matrix.reset(band);
        &mut self.matrix
    }

    /// Number of alignments run in this workspace.
    pub fn alignments(&self) -> usize {
        self.reads
    }
}

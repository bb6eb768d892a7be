use std::ops::Range;

use crate::genomics::{base_index, NUM_BASES};
use crate::hmm::{AlignError, BandedMatrix, HmmState};

/// Posterior mass of one read at one draft column.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DraftColumnPosterior {
    /// Match mass per read base [A, C, G, T]; ambiguous bases split evenly.
    pub bases: [f64; NUM_BASES],
    /// Mass of the draft base being deleted in the read.
    pub delete: f64,
    /// Mass of read bases inserted after this column.
    pub insert: f64,
}

impl DraftColumnPosterior {
    /// Total match mass.
    pub fn match_mass(&self) -> f64 {
        self.bases.iter().sum()
    }
}

/// Inserted-base mass of one read at one insertion slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InsertionPosterior {
    /// Draft coordinate the insertion follows.
    pub anchor: u32,
    /// Rank within the insertion run.
    pub rank: u32,
    /// Mass per inserted base [A, C, G, T].
    pub bases: [f64; NUM_BASES],
}

impl InsertionPosterior {
    /// Total inserted mass.
    pub fn mass(&self) -> f64 {
        self.bases.iter().sum()
    }
}

/// Posteriors of one read over the draft window it was realigned to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadPosteriors {
    /// Draft coordinate of `columns[0]`.
    pub window_start: u32,
    /// One entry per draft coordinate of the window.
    pub columns: Vec<DraftColumnPosterior>,
    /// Insertion mass, ordered by anchor then rank.
    pub insertions: Vec<InsertionPosterior>,
}

impl ReadPosteriors {
    /// Draft interval the posteriors cover.
    pub fn window(&self) -> Range<u32> {
        self.window_start..self.window_start + self.columns.len() as u32
    }

    /// Posterior at draft coordinate `pos`.
    pub fn column(&self, pos: u32) -> Option<&DraftColumnPosterior> {
        pos.checked_sub(self.window_start)
            .and_then(|offset| self.columns.get(offset as usize))
    }

    /// Fold cell posteriors of a filled matrix onto draft columns.
    ///
    /// Returns the posteriors and the largest per-column mass on band edge
    /// cells. Insertions are ranked from the row holding the most
    /// match-or-delete mass at their anchor (smallest row on ties).
    pub(crate) fn from_matrix(
        matrix: &BandedMatrix,
        read: &[u8],
        window_start: u32,
    ) -> Result<(Self, f64), AlignError> {
        let band = matrix.band();
        let mut columns = Vec::with_capacity(band.columns().saturating_sub(1));
        let mut insertions = Vec::new();
        let mut edge_mass = 0.0f64;
        let mut cells: Vec<(usize, [f64; 3])> = Vec::new();
        let mut ranked: Vec<[f64; NUM_BASES]> = Vec::new();

        for j in 0..band.columns() {
            cells.clear();
            let mut edge = 0.0;
            for i in band.rows(j) {
                let post = matrix.posterior(j, i);
                if post.iter().any(|p| p.is_nan()) {
                    return Err(AlignError::NonFinite { stage: "posterior" });
                }
                if band.is_edge(j, i) {
                    edge += post.iter().sum::<f64>();
                }
                cells.push((i, post));
            }
            edge_mass = edge_mass.max(edge);

            // Column 0 holds only insertions before the first draft base.
            if j == 0 {
                continue;
            }

            let mut column = DraftColumnPosterior::default();
            let mut anchor_row = 0;
            let mut anchor_mass = f64::NEG_INFINITY;
            for &(i, post) in &cells {
                let m = post[HmmState::Match.index()];
                let d = post[HmmState::DeleteInDraft.index()];
                if i > 0 {
                    add_base(&mut column.bases, read[i - 1], m);
                }
                column.delete += d;
                column.insert += post[HmmState::InsertInRead.index()];
                if m + d > anchor_mass {
                    anchor_mass = m + d;
                    anchor_row = i;
                }
            }

            ranked.clear();
            for &(i, post) in &cells {
                let mass = post[HmmState::InsertInRead.index()];
                if i == 0 || mass <= 0.0 {
                    continue;
                }
                let rank = i.saturating_sub(anchor_row + 1);
                if rank >= ranked.len() {
                    ranked.resize(rank + 1, [0.0; NUM_BASES]);
                }
                add_base(&mut ranked[rank], read[i - 1], mass);
            }
            let anchor = window_start + (j - 1) as u32;
            for (rank, bases) in ranked.iter().enumerate() {
                if let Ok(rank) = u32::try_from(rank) {
                    insertions.push(InsertionPosterior {
                        anchor,
                        rank,
                        bases: *bases,
                    });
                }
            }
            columns.push(column);
        }

        Ok((
            Self {
                window_start,
                columns,
                insertions,
            },
            edge_mass,
        ))
    }
}

fn add_base(bases: &mut [f64; NUM_BASES], base: u8, mass: f64) {
    match base_index(base) {
        Some(idx) => bases[idx] += mass,
        None => bases.iter_mut().for_each(|b| *b += mass / NUM_BASES as f64),
    }
}

/// Accepted realignment of one read.
#[derive(Debug, Clone, PartialEq)]
pub struct Realignment {
    /// Folded posteriors.
    pub posteriors: ReadPosteriors,
    /// Half-width of the accepted band.
    pub half_width: usize,
    /// Whether the accepted band came from the retry.
    pub retried: bool,
    /// Edge mass of the accepted attempt.
    pub edge_mass: f64,
}

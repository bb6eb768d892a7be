use std::ops::{Range, RangeInclusive};

use crate::genomics::{AlignOp, AlignedPair};
use crate::hmm::AlignError;

/// Coarse alignment path in matrix coordinates.
///
/// Cell `(j, i)` means `j` draft bases and `i` read bases of the window have
/// been consumed. The path starts at `(0, 0)` and ends at `(m, n)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoarsePath {
    cells: Vec<(usize, usize)>,
    draft_len: usize,
    read_len: usize,
}

impl CoarsePath {
    /// Convert clipped alignment steps into a matrix path.
    pub fn from_pairs(
        pairs: &[AlignedPair],
        draft_window: &Range<u32>,
        read_window: &Range<usize>,
    ) -> Result<Self, AlignError> {
        let draft_len = draft_window.len();
        let read_len = read_window.len();
        let mut cells = Vec::with_capacity(pairs.len() + 1);
        cells.push((0, 0));

        for (step, pair) in pairs.iter().enumerate() {
            let mismatch = AlignError::PathMismatch { step };
            let j = (pair.draft_pos + 1)
                .checked_sub(draft_window.start)
                .ok_or(mismatch.clone())? as usize;
            let consumed = usize::from(pair.op != AlignOp::Delete);
            let i = (pair.read_pos as usize + consumed)
                .checked_sub(read_window.start)
                .ok_or(mismatch.clone())?;

            let (pj, pi) = cells[cells.len() - 1];
            let moved = match pair.op {
                AlignOp::Match => j == pj + 1 && i == pi + 1,
                AlignOp::Insert => j == pj && i == pi + 1,
                AlignOp::Delete => j == pj + 1 && i == pi,
            };
            if !moved || j > draft_len || i > read_len {
                return Err(mismatch);
            }
            cells.push((j, i));
        }

        if cells[cells.len() - 1] != (draft_len, read_len) {
            return Err(AlignError::PathMismatch { step: pairs.len() });
        }
        Ok(Self {
            cells,
            draft_len,
            read_len,
        })
    }

    /// Draft bases in the window (`m`).
    pub fn draft_len(&self) -> usize {
        self.draft_len
    }

    /// Read bases in the window (`n`).
    pub fn read_len(&self) -> usize {
        self.read_len
    }

    /// Path cells from `(0, 0)` to `(m, n)`.
    pub fn cells(&self) -> &[(usize, usize)] {
        &self.cells
    }
}

/// Read rows admitted for each draft column of the matrix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Band {
    lo: Vec<usize>,
    hi: Vec<usize>,
    read_len: usize,
    half_width: usize,
}

impl Band {
    /// Band of half-width `half_width` around `path`.
    ///
    /// Column `j` admits rows `[min_row(j) - w, max_row(j) + w]` clamped to
    /// the read, so every path cell lies inside the band.
    pub fn around(path: &CoarsePath, half_width: usize) -> Self {
        let columns = path.draft_len + 1;
        let mut lo = vec![usize::MAX; columns];
        let mut hi = vec![0; columns];
        for &(j, i) in &path.cells {
            lo[j] = lo[j].min(i);
            hi[j] = hi[j].max(i);
        }
        for j in 0..columns {
            lo[j] = lo[j].saturating_sub(half_width);
            hi[j] = hi[j].saturating_add(half_width).min(path.read_len);
        }
        Self {
            lo,
            hi,
            read_len: path.read_len,
            half_width,
        }
    }

    /// Number of draft columns (`m + 1`).
    pub fn columns(&self) -> usize {
        self.lo.len()
    }

    /// Half-width the band was built with.
    pub fn half_width(&self) -> usize {
        self.half_width
    }

    /// Rows admitted in column `j`.
    #[inline]
    pub fn rows(&self, j: usize) -> RangeInclusive<usize> {
        self.lo[j]..=self.hi[j]
    }

    /// Whether `(j, i)` lies inside the band.
    #[inline]
    pub fn contains(&self, j: usize, i: usize) -> bool {
        j < self.lo.len() && self.rows(j).contains(&i)
    }

    /// Whether `(j, i)` sits on a band boundary that truncates the matrix.
    /// Rows 0 and `n` are sequence boundaries, never edges.
    #[inline]
    pub fn is_edge(&self, j: usize, i: usize) -> bool {
        (i == self.lo[j] && self.lo[j] > 0) || (i == self.hi[j] && self.hi[j] < self.read_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::{parse_cigar, ReadAlignment, Strand};

    fn path_of(cigar: &str, seq: &[u8]) -> CoarsePath {
        let ops = parse_cigar(cigar).unwrap();
        let read = ReadAlignment::from_cigar("r", Strand::Forward, 60, 0, &ops, seq, &vec![30; seq.len()])
            .unwrap();
        let span = read.draft_span().unwrap();
        CoarsePath::from_pairs(&read.pairs, &span, &(0..read.len())).unwrap()
    }

    #[test]
    fn path_follows_operations() {
        let path = path_of("2M1I1M1D1M", b"ACGTA");
        assert_eq!(
            path.cells(),
            &[(0, 0), (1, 1), (2, 2), (2, 3), (3, 4), (4, 4), (5, 5)]
        );
        assert_eq!((path.draft_len(), path.read_len()), (5, 5));
    }

    #[test]
    fn band_covers_path_and_clamps() {
        let path = path_of("2M1I1M1D1M", b"ACGTA");
        let band = Band::around(&path, 1);
        for &(j, i) in path.cells() {
            assert!(band.contains(j, i));
        }
        assert_eq!(band.rows(0), 0..=1);
        assert_eq!(band.rows(2), 1..=4);
        assert_eq!(band.rows(5), 4..=5);
        assert!(!band.is_edge(0, 0));
        assert!(band.is_edge(0, 1));
        assert!(band.is_edge(2, 1));
        assert!(!band.is_edge(5, 5));
    }

    #[test]
    fn broken_path_is_rejected() {
        let pairs = vec![
            AlignedPair::new(0, 0, AlignOp::Match),
            AlignedPair::new(2, 1, AlignOp::Match),
        ];
        let err = CoarsePath::from_pairs(&pairs, &(0..3), &(0..2)).unwrap_err();
        assert_eq!(err, AlignError::PathMismatch { step: 1 });
    }
}

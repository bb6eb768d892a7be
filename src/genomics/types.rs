use std::ops::Range;
use std::sync::Arc;

use thiserror::Error;

/// Simple CIGAR operation kinds describing how a read aligns to the draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CigarOpKind {
    /// Consuming match/mismatch.
    Match,
    /// Insertion relative to the draft.
    Insertion,
    /// Deletion relative to the draft.
    Deletion,
    /// Soft clipping (sequence present in read only).
    SoftClip,
    /// Hard clipping (trimmed sequence not present in read).
    HardClip,
}

/// CIGAR operation with length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CigarOp {
    /// Operation kind.
    pub kind: CigarOpKind,
    /// Number of bases affected by the operation.
    pub len: u32,
}

impl CigarOp {
    /// Construct a new CIGAR operation.
    pub fn new(kind: CigarOpKind, len: u32) -> Self {
        Self { kind, len }
    }
}

/// Parse a SAM CIGAR string. `=`/`X` fold into matches and `N` into
/// deletions; padding is ignored.
pub fn parse_cigar(cigar: &str) -> Result<Vec<CigarOp>, MalformedAlignment> {
    let invalid = || MalformedAlignment::InvalidCigar(cigar.to_string());
    if cigar.is_empty() || cigar == "*" {
        return Err(invalid());
    }

    let mut ops = Vec::new();
    let mut len: Option<u32> = None;
    for ch in cigar.chars() {
        if let Some(digit) = ch.to_digit(10) {
            let current = len.unwrap_or(0);
            len = Some(
                current
                    .checked_mul(10)
                    .and_then(|v| v.checked_add(digit))
                    .ok_or_else(invalid)?,
            );
            continue;
        }
        let n = len.take().ok_or_else(invalid)?;
        let kind = match ch {
            'M' | '=' | 'X' => CigarOpKind::Match,
            'I' => CigarOpKind::Insertion,
            'D' | 'N' => CigarOpKind::Deletion,
            'S' => CigarOpKind::SoftClip,
            'H' => CigarOpKind::HardClip,
            'P' => continue,
            _ => return Err(invalid()),
        };
        if n > 0 {
            ops.push(CigarOp::new(kind, n));
        }
    }
    if len.is_some() {
        return Err(invalid());
    }
    Ok(ops)
}

/// Per-base alignment operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlignOp {
    /// Read base aligned to a draft base.
    Match,
    /// Read base with no draft counterpart.
    Insert,
    /// Draft base with no read counterpart.
    Delete,
}

/// One step of a coarse alignment.
///
/// For [`AlignOp::Insert`], `draft_pos` is the draft coordinate the inserted
/// base follows. For [`AlignOp::Delete`], `read_pos` is the offset of the
/// next read base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignedPair {
    /// Draft coordinate (0-based).
    pub draft_pos: u32,
    /// Read offset (0-based).
    pub read_pos: u32,
    /// Operation.
    pub op: AlignOp,
}

impl AlignedPair {
    /// Construct a new aligned pair.
    pub fn new(draft_pos: u32, read_pos: u32, op: AlignOp) -> Self {
        Self {
            draft_pos,
            read_pos,
            op,
        }
    }

    /// Whether the step consumes a draft base.
    pub fn consumes_draft(&self) -> bool {
        matches!(self.op, AlignOp::Match | AlignOp::Delete)
    }

    /// Whether the step consumes a read base.
    pub fn consumes_read(&self) -> bool {
        matches!(self.op, AlignOp::Match | AlignOp::Insert)
    }
}

/// Strand the read aligned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strand {
    /// Forward strand.
    #[default]
    Forward,
    /// Reverse-complement strand.
    Reverse,
}

/// Reasons an alignment record is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedAlignment {
    /// Record has no alignment steps.
    #[error("alignment has no steps")]
    Empty,

    /// Quality string length differs from the sequence length.
    #[error("{qualities} qualities for {sequence} bases")]
    QualityLengthMismatch {
        /// Sequence length.
        sequence: usize,
        /// Quality length.
        qualities: usize,
    },

    /// Steps do not consume exactly the read.
    #[error("alignment consumes {consumed} read bases, read has {read_len}")]
    ReadLengthMismatch {
        /// Read bases consumed by the steps.
        consumed: usize,
        /// Read length.
        read_len: usize,
    },

    /// Read offsets are not consecutive.
    #[error("step {index}: read offset {found}, expected {expected}")]
    ReadPositionOutOfOrder {
        /// Step index.
        index: usize,
        /// Expected read offset.
        expected: u32,
        /// Read offset found.
        found: u32,
    },

    /// Draft coordinates are not consecutive.
    #[error("step {index}: draft position {found}, expected {expected}")]
    DraftPositionOutOfOrder {
        /// Step index.
        index: usize,
        /// Expected draft coordinate.
        expected: u32,
        /// Draft coordinate found.
        found: u32,
    },

    /// Draft coordinate past the end of the draft.
    #[error("draft position {draft_pos} outside draft of length {draft_len}")]
    DraftOutOfBounds {
        /// Offending coordinate.
        draft_pos: u32,
        /// Draft length.
        draft_len: usize,
    },

    /// Insertion before any draft base was consumed.
    #[error("insertion precedes the first aligned draft base")]
    LeadingInsertion,

    /// CIGAR string could not be parsed.
    #[error("invalid CIGAR '{0}'")]
    InvalidCigar(String),
}

/// Long read with its coarse alignment to the draft.
#[derive(Debug, Clone)]
pub struct ReadAlignment {
    /// Read identifier.
    pub id: Arc<str>,
    /// Strand of the alignment.
    pub strand: Strand,
    /// Mapping quality (Phred-scaled).
    pub mapq: u8,
    /// Ordered alignment steps.
    pub pairs: Vec<AlignedPair>,
    /// Read sequence stored as uppercase ASCII.
    pub sequence: Arc<[u8]>,
    /// Per-base quality scores in Phred space.
    pub qualities: Arc<[u8]>,
}

impl ReadAlignment {
    /// Construct a read alignment from explicit steps.
    pub fn new(
        id: impl Into<Arc<str>>,
        strand: Strand,
        mapq: u8,
        pairs: Vec<AlignedPair>,
        sequence: impl Into<Arc<[u8]>>,
        qualities: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            id: id.into(),
            strand,
            mapq,
            pairs,
            sequence: sequence.into(),
            qualities: qualities.into(),
        }
    }

    /// Expand a CIGAR alignment starting at draft coordinate `start`.
    ///
    /// Clipped bases and insertions before the first aligned draft base are
    /// trimmed, so the stored sequence covers exactly the aligned part.
    pub fn from_cigar(
        id: impl Into<Arc<str>>,
        strand: Strand,
        mapq: u8,
        start: u32,
        cigar: &[CigarOp],
        sequence: &[u8],
        qualities: &[u8],
    ) -> Result<Self, MalformedAlignment> {
        if sequence.len() != qualities.len() {
            return Err(MalformedAlignment::QualityLengthMismatch {
                sequence: sequence.len(),
                qualities: qualities.len(),
            });
        }

        let mut pairs = Vec::new();
        let mut draft = start;
        let mut read = 0u32;
        let mut anchored = false;
        let mut first_read: Option<u32> = None;
        let mut last_read = 0u32;

        for op in cigar {
            match op.kind {
                CigarOpKind::HardClip => {}
                CigarOpKind::SoftClip => read += op.len,
                CigarOpKind::Insertion if !anchored => read += op.len,
                CigarOpKind::Insertion => {
                    first_read.get_or_insert(read);
                    for _ in 0..op.len {
                        pairs.push(AlignedPair::new(draft - 1, read, AlignOp::Insert));
                        read += 1;
                    }
                    last_read = read;
                }
                CigarOpKind::Match => {
                    first_read.get_or_insert(read);
                    for _ in 0..op.len {
                        pairs.push(AlignedPair::new(draft, read, AlignOp::Match));
                        draft += 1;
                        read += 1;
                    }
                    last_read = read;
                    anchored = true;
                }
                CigarOpKind::Deletion => {
                    for _ in 0..op.len {
                        pairs.push(AlignedPair::new(draft, read, AlignOp::Delete));
                        draft += 1;
                    }
                    anchored = true;
                }
            }
        }

        if read as usize != sequence.len() {
            return Err(MalformedAlignment::ReadLengthMismatch {
                consumed: read as usize,
                read_len: sequence.len(),
            });
        }
        let first = first_read.ok_or(MalformedAlignment::Empty)?;

        // Leading deletions point at the first aligned read base; re-base
        // every offset onto the trimmed sequence.
        for pair in &mut pairs {
            pair.read_pos = pair.read_pos.max(first) - first;
        }
        let aligned = first as usize..last_read as usize;
        let bases: Vec<u8> = sequence[aligned.clone()]
            .iter()
            .map(|b| b.to_ascii_uppercase())
            .collect();

        Ok(Self::new(
            id,
            strand,
            mapq,
            pairs,
            bases,
            qualities[aligned].to_vec(),
        ))
    }

    /// Read length.
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    /// Whether the read has no bases.
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Half-open draft interval touched by the alignment.
    pub fn draft_span(&self) -> Option<Range<u32>> {
        let first = self.pairs.first()?;
        let last = self.pairs.last()?;
        Some(first.draft_pos..last.draft_pos + 1)
    }

    /// Base at the provided read offset.
    pub fn base_at(&self, offset: usize) -> Option<u8> {
        self.sequence.get(offset).copied()
    }

    /// Quality score at the provided read offset.
    pub fn quality_at(&self, offset: usize) -> Option<u8> {
        self.qualities.get(offset).copied()
    }

    /// Check the record against a draft of `draft_len` bases.
    ///
    /// Steps must consume every read base exactly once, in order, and walk
    /// consecutive in-bounds draft coordinates.
    pub fn validate(&self, draft_len: usize) -> Result<(), MalformedAlignment> {
        if self.pairs.is_empty() {
            return Err(MalformedAlignment::Empty);
        }
        if self.qualities.len() != self.sequence.len() {
            return Err(MalformedAlignment::QualityLengthMismatch {
                sequence: self.sequence.len(),
                qualities: self.qualities.len(),
            });
        }

        let mut next_read = 0u32;
        let mut next_draft: Option<u32> = None;
        let mut last_draft: Option<u32> = None;

        for (index, pair) in self.pairs.iter().enumerate() {
            if pair.read_pos != next_read {
                return Err(MalformedAlignment::ReadPositionOutOfOrder {
                    index,
                    expected: next_read,
                    found: pair.read_pos,
                });
            }
            match pair.op {
                AlignOp::Match | AlignOp::Delete => {
                    if let Some(expected) = next_draft {
                        if pair.draft_pos != expected {
                            return Err(MalformedAlignment::DraftPositionOutOfOrder {
                                index,
                                expected,
                                found: pair.draft_pos,
                            });
                        }
                    }
                    if pair.draft_pos as usize >= draft_len {
                        return Err(MalformedAlignment::DraftOutOfBounds {
                            draft_pos: pair.draft_pos,
                            draft_len,
                        });
                    }
                    next_draft = Some(pair.draft_pos + 1);
                    last_draft = Some(pair.draft_pos);
                    if pair.op == AlignOp::Match {
                        next_read += 1;
                    }
                }
                AlignOp::Insert => {
                    let anchor = last_draft.ok_or(MalformedAlignment::LeadingInsertion)?;
                    if pair.draft_pos != anchor {
                        return Err(MalformedAlignment::DraftPositionOutOfOrder {
                            index,
                            expected: anchor,
                            found: pair.draft_pos,
                        });
                    }
                    next_read += 1;
                }
            }
        }

        if next_read as usize != self.sequence.len() {
            return Err(MalformedAlignment::ReadLengthMismatch {
                consumed: next_read as usize,
                read_len: self.sequence.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(cigar: &str, start: u32, seq: &[u8]) -> Result<ReadAlignment, MalformedAlignment> {
        let ops = parse_cigar(cigar)?;
        ReadAlignment::from_cigar(
            "r1",
            Strand::Forward,
            60,
            start,
            &ops,
            seq,
            &vec![30; seq.len()],
        )
    }

    #[test]
    fn parse_cigar_folds_equivalent_ops() {
        let ops = parse_cigar("2S3=1X2I4N").unwrap();
        assert_eq!(
            ops,
            vec![
                CigarOp::new(CigarOpKind::SoftClip, 2),
                CigarOp::new(CigarOpKind::Match, 3),
                CigarOp::new(CigarOpKind::Match, 1),
                CigarOp::new(CigarOpKind::Insertion, 2),
                CigarOp::new(CigarOpKind::Deletion, 4),
            ]
        );
        assert!(parse_cigar("3M2").is_err());
        assert!(parse_cigar("M").is_err());
        assert!(parse_cigar("*").is_err());
    }

    #[test]
    fn from_cigar_expands_steps() {
        let aln = read("3M1D4M", 10, b"ACGACGT").unwrap();
        assert_eq!(aln.pairs.len(), 8);
        assert_eq!(aln.pairs[3], AlignedPair::new(13, 3, AlignOp::Delete));
        assert_eq!(aln.pairs[4], AlignedPair::new(14, 3, AlignOp::Match));
        assert_eq!(aln.draft_span(), Some(10..18));
        assert!(aln.validate(18).is_ok());
    }

    #[test]
    fn from_cigar_trims_clips_and_leading_insertions() {
        let aln = read("2S1I3M1I2M3S", 0, b"NNTACGGTTNNN").unwrap();
        assert_eq!(aln.sequence.as_ref(), b"ACGGTT");
        assert_eq!(aln.pairs[3], AlignedPair::new(2, 3, AlignOp::Insert));
        assert_eq!(aln.pairs.first().map(|p| p.read_pos), Some(0));
        assert!(aln.validate(5).is_ok());
    }

    #[test]
    fn from_cigar_rejects_length_mismatch() {
        let err = read("5M", 0, b"ACG").unwrap_err();
        assert_eq!(
            err,
            MalformedAlignment::ReadLengthMismatch {
                consumed: 5,
                read_len: 3
            }
        );
    }

    #[test]
    fn validate_rejects_out_of_bounds_draft() {
        let aln = read("4M", 6, b"ACGT").unwrap();
        assert_eq!(
            aln.validate(8),
            Err(MalformedAlignment::DraftOutOfBounds {
                draft_pos: 8,
                draft_len: 8
            })
        );
    }

    #[test]
    fn validate_rejects_gapped_draft_walk() {
        let pairs = vec![
            AlignedPair::new(0, 0, AlignOp::Match),
            AlignedPair::new(2, 1, AlignOp::Match),
        ];
        let aln = ReadAlignment::new("r", Strand::Forward, 60, pairs, b"AC".to_vec(), vec![30; 2]);
        assert!(matches!(
            aln.validate(4),
            Err(MalformedAlignment::DraftPositionOutOfOrder { index: 1, .. })
        ));
    }

    #[test]
    fn validate_rejects_leading_insertion() {
        let pairs = vec![
            AlignedPair::new(0, 0, AlignOp::Insert),
            AlignedPair::new(0, 1, AlignOp::Match),
        ];
        let aln = ReadAlignment::new("r", Strand::Forward, 60, pairs, b"AC".to_vec(), vec![30; 2]);
        assert_eq!(aln.validate(4), Err(MalformedAlignment::LeadingInsertion));
    }

    #[test]
    fn validate_rejects_short_coverage_of_read() {
        let pairs = vec![AlignedPair::new(0, 0, AlignOp::Match)];
        let aln = ReadAlignment::new("r", Strand::Forward, 60, pairs, b"AC".to_vec(), vec![30; 2]);
        assert!(matches!(
            aln.validate(4),
            Err(MalformedAlignment::ReadLengthMismatch { consumed: 1, read_len: 2 })
        ));
    }
}

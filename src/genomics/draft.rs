use std::ops::Range;
use std::sync::Arc;

/// Immutable draft sequence being polished.
///
/// Cloning is cheap; every region shares the same backing buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftSequence {
    name: Arc<str>,
    bases: Arc<[u8]>,
}

impl DraftSequence {
    /// Wrap a draft, normalising bases to uppercase.
    pub fn new(name: impl Into<Arc<str>>, bases: impl Into<Vec<u8>>) -> Self {
        let mut bases = bases.into();
        bases.make_ascii_uppercase();
        Self {
            name: name.into(),
            bases: Arc::from(bases.into_boxed_slice()),
        }
    }

    /// Contig name.
    pub fn name(&self) -> &Arc<str> {
        &self.name
    }

    /// Number of bases.
    pub fn len(&self) -> usize {
        self.bases.len()
    }

    /// Whether the draft is empty.
    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    /// All bases.
    pub fn bases(&self) -> &[u8] {
        &self.bases
    }

    /// Base at a 0-based coordinate.
    pub fn base_at(&self, pos: u32) -> Option<u8> {
        self.bases.get(pos as usize).copied()
    }

    /// Bases of a half-open interval, clamped to the draft.
    pub fn window(&self, range: Range<u32>) -> &[u8] {
        let end = (range.end as usize).min(self.bases.len());
        let start = (range.start as usize).min(end);
        &self.bases[start..end]
    }
}

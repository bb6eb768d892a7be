use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::region::Region;

/// Per-region estimator output, one entry per span position.
#[derive(Debug, Clone)]
pub struct RegionOutput<T> {
    /// Region that produced the output.
    pub region: Region,
    /// Output for each position of `region.span`, in order.
    pub positions: Vec<T>,
}

/// Draft-ordered output after stitching.
#[derive(Debug, Clone)]
pub struct Stitched<T> {
    /// Exactly one entry per draft position.
    pub items: Vec<T>,
    /// Ownership defects found while stitching.
    pub diagnostics: Vec<Diagnostic>,
}

/// Merge region outputs into one entry per draft position.
///
/// A position takes the entry of the region whose core contains it; overlap
/// entries from neighbouring spans are discarded, never averaged. Positions
/// no core claims get `sentinel(pos)` and an `UnownedPositions` diagnostic.
/// The result does not depend on the order of `outputs`.
pub fn stitch<T, F>(draft_len: u32, mut outputs: Vec<RegionOutput<T>>, mut sentinel: F) -> Stitched<T>
where
    F: FnMut(u32) -> T,
{
    outputs.sort_by_key(|output| output.region.index);

    let mut slots: Vec<Option<T>> = (0..draft_len).map(|_| None).collect();
    let mut diagnostics = Vec::new();

    for output in outputs {
        let RegionOutput { region, positions } = output;
        for (offset, item) in positions.into_iter().enumerate() {
            let pos = region.span.start + offset as u32;
            if !region.owns(pos) || pos >= draft_len {
                continue;
            }
            let slot = &mut slots[pos as usize];
            if slot.is_some() {
                diagnostics.push(Diagnostic {
                    region: Some(region.index),
                    read: None,
                    kind: DiagnosticKind::DuplicateOwner {
                        position: pos,
                        region: region.index,
                    },
                });
                continue;
            }
            *slot = Some(item);
        }
    }

    let mut items = Vec::with_capacity(slots.len());
    let mut unowned_start: Option<u32> = None;
    for (pos, slot) in slots.into_iter().enumerate() {
        let pos = pos as u32;
        match slot {
            Some(item) => {
                if let Some(start) = unowned_start.take() {
                    diagnostics.push(Diagnostic::global(DiagnosticKind::UnownedPositions {
                        range: start..pos,
                    }));
                }
                items.push(item);
            }
            None => {
                unowned_start.get_or_insert(pos);
                items.push(sentinel(pos));
            }
        }
    }
    if let Some(start) = unowned_start {
        diagnostics.push(Diagnostic::global(DiagnosticKind::UnownedPositions {
            range: start..draft_len,
        }));
    }

    Stitched { items, diagnostics }
}

use std::ops::Range;

use crate::config::ConfigError;

/// Unit of parallel work: a core interval and its padded span.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Region {
    /// 0-based index in draft order.
    pub index: usize,
    /// Positions this region owns in the stitched output.
    pub core: Range<u32>,
    /// Positions this region processes (core padded by the margin, clamped).
    pub span: Range<u32>,
}

impl Region {
    /// Number of positions in the padded span.
    pub fn span_len(&self) -> usize {
        self.span.end.saturating_sub(self.span.start) as usize
    }

    /// Number of positions in the core.
    pub fn core_len(&self) -> usize {
        self.core.end.saturating_sub(self.core.start) as usize
    }

    /// Offset of a draft coordinate within the span.
    pub fn span_offset(&self, pos: u32) -> Option<usize> {
        self.span
            .contains(&pos)
            .then(|| (pos - self.span.start) as usize)
    }

    /// Whether the core owns `pos`.
    pub fn owns(&self, pos: u32) -> bool {
        self.core.contains(&pos)
    }
}

/// Split a draft of `draft_len` bases into windows of `window` bases padded
/// by `margin` on both sides.
///
/// Cores are `[i*window, min((i+1)*window, len))`, so they tile the draft
/// without gaps. Identical inputs always give identical regions.
pub fn partition(draft_len: u32, window: u32, margin: u32) -> Result<Vec<Region>, ConfigError> {
    if window == 0 {
        return Err(ConfigError::NonPositiveWindow(0));
    }

    let num_regions = draft_len.div_ceil(window) as usize;
    let mut regions = Vec::with_capacity(num_regions);
    for index in 0..num_regions {
        let start = index as u32 * window;
        let end = start.saturating_add(window).min(draft_len);
        regions.push(Region {
            index,
            core: start..end,
            span: start.saturating_sub(margin)..end.saturating_add(margin).min(draft_len),
        });
    }
    Ok(regions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cores_tile_the_draft() {
        let regions = partition(25, 10, 3).unwrap();
        assert_eq!(regions.len(), 3);
        assert_eq!(regions[0].core, 0..10);
        assert_eq!(regions[0].span, 0..13);
        assert_eq!(regions[1].core, 10..20);
        assert_eq!(regions[1].span, 7..23);
        assert_eq!(regions[2].core, 20..25);
        assert_eq!(regions[2].span, 17..25);
    }

    #[test]
    fn zero_window_is_a_configuration_error() {
        assert_eq!(partition(10, 0, 0), Err(ConfigError::NonPositiveWindow(0)));
    }

    #[test]
    fn empty_draft_has_no_regions() {
        assert!(partition(0, 10, 5).unwrap().is_empty());
    }

    #[test]
    fn window_larger_than_draft_yields_one_region() {
        let regions = partition(8, 100, 50).unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].core, 0..8);
        assert_eq!(regions[0].span, 0..8);
        assert_eq!(regions[0].span_offset(7), Some(7));
        assert_eq!(regions[0].span_offset(8), None);
    }
}

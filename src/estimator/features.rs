use crate::estimator::{ColumnSummary, RegionSummary};
use crate::genomics::DraftSequence;
use crate::hmm::HmmState;
use crate::pileup::Pileup;

/// Version of the feature layout. Bumped whenever [`FEATURE_FIELDS`] changes.
pub const FEATURE_VERSION: u32 = 1;

/// Number of values per feature column.
pub const FEATURE_WIDTH: usize = 14;

/// Field names in vector order.
pub const FEATURE_FIELDS: [&str; FEATURE_WIDTH] = [
    "coverage",
    "depth",
    "post_match",
    "post_insert",
    "post_delete",
    "post_a",
    "post_c",
    "post_g",
    "post_t",
    "post_gap",
    "qual_a",
    "qual_c",
    "qual_g",
    "qual_t",
];

/// Fixed-shape feature vector.
pub type FeatureVector = [f32; FEATURE_WIDTH];

/// Features of one pileup column.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeatureColumn {
    /// Draft coordinate (the anchor, for insertion columns).
    pub draft_pos: u32,
    /// Rank within the insertion run; `None` for the draft column.
    pub insert_rank: Option<u32>,
    /// Draft base; `None` for insertion columns.
    pub draft_base: Option<u8>,
    /// Values in [`FEATURE_FIELDS`] order.
    pub values: FeatureVector,
}

impl FeatureColumn {
    /// All-zero draft column.
    pub fn uncovered(draft_pos: u32, draft_base: u8) -> Self {
        Self {
            draft_pos,
            insert_rank: None,
            draft_base: Some(draft_base),
            values: [0.0; FEATURE_WIDTH],
        }
    }

    /// Value of a named field.
    pub fn get(&self, field: &str) -> Option<f32> {
        FEATURE_FIELDS
            .iter()
            .position(|name| *name == field)
            .map(|idx| self.values[idx])
    }

    /// Whether any accepted read contributed.
    pub fn is_covered(&self) -> bool {
        self.values[0] > 0.0
    }
}

/// Feature columns for every position of the pileup's span: the draft column
/// followed by its insertion columns.
pub fn encode_features(
    pileup: &Pileup<'_>,
    summary: &RegionSummary,
    draft: &DraftSequence,
) -> Vec<Vec<FeatureColumn>> {
    pileup
        .region
        .span
        .clone()
        .map(|pos| {
            let draft_base = draft.base_at(pos).unwrap_or(b'N');
            pileup
                .position_columns(pos)
                .map(|col| {
                    let column = &pileup.columns[col];
                    FeatureColumn {
                        draft_pos: pos,
                        insert_rank: column.insert_rank,
                        draft_base: (!column.is_insertion()).then_some(draft_base),
                        values: vector(&summary.columns[col]),
                    }
                })
                .collect()
        })
        .collect()
}

fn vector(summary: &ColumnSummary) -> FeatureVector {
    let mut values = [0.0f32; FEATURE_WIDTH];
    if summary.depth == 0 {
        return values;
    }
    let depth = summary.depth as f64;
    let mean = |mass: f64| (mass / depth) as f32;

    values[0] = 1.0;
    values[1] = summary.depth as f32;
    values[2] = mean(summary.states[HmmState::Match.index()]);
    values[3] = mean(summary.states[HmmState::InsertInRead.index()]);
    values[4] = mean(summary.states[HmmState::DeleteInDraft.index()]);
    for (slot, mass) in values[5..9].iter_mut().zip(summary.bases) {
        *slot = mean(mass);
    }
    values[9] = mean(summary.gap);
    values[10..14].copy_from_slice(&summary.quality);
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_names_match_width() {
        assert_eq!(FEATURE_FIELDS.len(), FEATURE_WIDTH);
        assert_eq!(FEATURE_FIELDS[0], "coverage");
        assert_eq!(FEATURE_FIELDS[FEATURE_WIDTH - 1], "qual_t");
    }

    #[test]
    fn zero_depth_vector_is_all_zero() {
        assert_eq!(vector(&ColumnSummary::default()), [0.0; FEATURE_WIDTH]);
    }

    #[test]
    fn posteriors_are_averaged_and_qualities_summed() {
        let summary = ColumnSummary {
            depth: 2,
            bases: [1.5, 0.5, 0.0, 0.0],
            gap: 0.0,
            states: [2.0, 0.0, 0.0],
            quality: [1.0, 0.25, 0.0, 0.0],
        };
        let column = FeatureColumn {
            draft_pos: 3,
            insert_rank: None,
            draft_base: Some(b'A'),
            values: vector(&summary),
        };
        assert!(column.is_covered());
        assert_eq!(column.get("depth"), Some(2.0));
        assert_eq!(column.get("post_match"), Some(1.0));
        assert_eq!(column.get("post_a"), Some(0.75));
        assert_eq!(column.get("post_c"), Some(0.25));
        assert_eq!(column.get("qual_a"), Some(1.0));
        assert_eq!(column.get("missing"), None);
    }
}

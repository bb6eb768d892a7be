mod common;

use common::{perfect_tiles, pseudo_random_bases};
use marginpolish::region::{stitch, RegionOutput};
use marginpolish::{extract_features, partition, AlignmentIndex, DraftSequence, PolishConfig};
use proptest::prelude::*;

proptest! {
    #[test]
    fn cores_tile_the_draft_exactly_once(
        len in 0u32..2_000,
        window in 1u32..300,
        margin in 0u32..200,
    ) {
        let regions = partition(len, window, margin).expect("positive window");

        let mut expected_start = 0;
        for (idx, region) in regions.iter().enumerate() {
            prop_assert_eq!(region.index, idx);
            prop_assert_eq!(region.core.start, expected_start);
            prop_assert!(region.core.end > region.core.start);
            prop_assert!(region.span.start <= region.core.start);
            prop_assert!(region.span.end >= region.core.end);
            prop_assert!(region.span.end <= len);
            expected_start = region.core.end;
        }
        prop_assert_eq!(expected_start, len);
    }

    #[test]
    fn stitching_emits_every_position_once_in_order(
        len in 0u32..500,
        window in 1u32..80,
        margin in 0u32..40,
    ) {
        let regions = partition(len, window, margin).expect("positive window");
        let outputs: Vec<_> = regions
            .iter()
            .rev()
            .map(|region| RegionOutput {
                region: region.clone(),
                positions: region.span.clone().collect::<Vec<u32>>(),
            })
            .collect();

        let stitched = stitch(len, outputs, |pos| pos + 1_000_000);
        prop_assert!(stitched.diagnostics.is_empty());
        prop_assert_eq!(stitched.items, (0..len).collect::<Vec<_>>());
    }

    #[test]
    fn feature_stream_covers_every_draft_coordinate(
        len in 1usize..60,
        seed in 1u64..1_000,
        window in 1u32..30,
        margin in 0u32..10,
    ) {
        let bases = pseudo_random_bases(len, seed);
        let draft = DraftSequence::new("prop", bases.clone());
        let index = AlignmentIndex::new(perfect_tiles(&bases, 12.min(len), 5));
        let config = PolishConfig::default().with_window(window, margin);
        let features = extract_features(&draft, &index, &config).expect("extraction succeeds");

        let draft_positions: Vec<u32> = features
            .output
            .iter()
            .filter(|column| column.insert_rank.is_none())
            .map(|column| column.draft_pos)
            .collect();
        prop_assert_eq!(draft_positions, (0..len as u32).collect::<Vec<_>>());
    }
}

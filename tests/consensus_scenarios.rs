mod common;

use common::{index_of, single_window};
use marginpolish::{polish, DraftSequence};
use test_case::test_case;

const DRAFT: &[u8] = b"ACGTACGT";
const FULL: (u32, &str, &str) = (0, "8M", "ACGTACGT");
const DELETION: (u32, &str, &str) = (0, "3M1D4M", "ACGACGT");
const INSERTION: (u32, &str, &str) = (0, "4M1I4M", "ACGTGACGT");

#[test_case(&[DELETION], "ACGACGT" ; "single deletion read")]
#[test_case(&[DELETION, DELETION, FULL], "ACGACGT" ; "deletion majority")]
#[test_case(&[DELETION, FULL, FULL], "ACGTACGT" ; "deletion minority")]
#[test_case(&[INSERTION], "ACGTGACGT" ; "single insertion read")]
#[test_case(&[INSERTION, INSERTION, FULL], "ACGTGACGT" ; "insertion majority")]
#[test_case(&[INSERTION, FULL, FULL], "ACGTACGT" ; "insertion minority")]
#[test_case(&[FULL], "ACGTACGT" ; "perfect read reproduces the draft")]
#[test_case(&[] , "ACGTACGT" ; "no reads keeps the draft")]
fn consensus_follows_read_support(reads: &[(u32, &str, &str)], expected: &str) {
    let draft = DraftSequence::new("ctg", DRAFT.to_vec());
    let index = index_of(reads);
    let polished = polish(&draft, &index, &single_window(&draft)).expect("polish succeeds");

    assert_eq!(String::from_utf8_lossy(&polished.output), expected);
    assert!(polished.diagnostics.is_empty(), "{:?}", polished.diagnostics);
}

#[test]
fn mismatch_majority_corrects_the_draft() {
    let draft = DraftSequence::new("ctg", b"ACGTTCGTAC".to_vec());
    let index = index_of(&[
        (0, "10M", "ACGTACGTAC"),
        (0, "10M", "ACGTACGTAC"),
        (0, "10M", "ACGTTCGTAC"),
    ]);
    let polished = polish(&draft, &index, &single_window(&draft)).unwrap();
    assert_eq!(polished.output, b"ACGTACGTAC");
    assert_eq!(polished.stats.reads_accepted, 3);
    assert_eq!(polished.stats.uncovered_positions, 0);
}

#[test]
fn uncovered_flanks_keep_draft_bases() {
    let draft = DraftSequence::new("ctg", b"TTTTACGTACGTTTTT".to_vec());
    let index = index_of(&[(4, "3M1D4M", "ACGACGT")]);
    let polished = polish(&draft, &index, &single_window(&draft)).unwrap();
    assert_eq!(polished.output, b"TTTTACGACGTTTTT");
    assert_eq!(polished.stats.uncovered_positions, 8);
}

const RUN_DRAFT: &[u8] = b"ACGTCAAAAGTCAG";
const RUN_FULL: (u32, &str, &str) = (0, "14M", "ACGTCAAAAGTCAG");
const RUN_DELETION: (u32, &str, &str) = (0, "8M1D5M", "ACGTCAAAGTCAG");
const RUN_INSERTION: (u32, &str, &str) = (0, "9M1I5M", "ACGTCAAAAAGTCAG");

#[test_case(&[RUN_DELETION; 5], "ACGTCAAAGTCAG" ; "unanimous homopolymer deletion")]
#[test_case(&[RUN_DELETION, RUN_FULL, RUN_DELETION, RUN_FULL, RUN_DELETION], "ACGTCAAAGTCAG" ; "homopolymer deletion majority")]
#[test_case(&[RUN_DELETION, RUN_FULL, RUN_FULL], "ACGTCAAAAGTCAG" ; "homopolymer deletion minority")]
#[test_case(&[RUN_INSERTION; 5], "ACGTCAAAAAGTCAG" ; "unanimous homopolymer insertion")]
#[test_case(&[RUN_INSERTION, RUN_FULL, RUN_INSERTION, RUN_FULL, RUN_INSERTION], "ACGTCAAAAAGTCAG" ; "homopolymer insertion majority")]
#[test_case(&[RUN_INSERTION, RUN_FULL, RUN_FULL], "ACGTCAAAAGTCAG" ; "homopolymer insertion minority")]
fn homopolymer_indels_follow_read_support(reads: &[(u32, &str, &str)], expected: &str) {
    let draft = DraftSequence::new("ctg", RUN_DRAFT.to_vec());
    let index = index_of(reads);
    let polished = polish(&draft, &index, &single_window(&draft)).expect("polish succeeds");

    assert_eq!(String::from_utf8_lossy(&polished.output), expected);
    assert_eq!(polished.stats.reads_accepted, reads.len());
}

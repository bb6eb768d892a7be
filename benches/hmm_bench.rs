//! Performance benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use marginpolish::genomics::{parse_cigar, Strand};
use marginpolish::{polish, AlignmentIndex, DraftSequence, PolishConfig, ReadAlignment};

fn synthetic_draft(len: usize) -> Vec<u8> {
    // xorshift keeps the draft reproducible without a rand dependency
    let mut state = 0x9E37_79B9_7F4A_7C15u64;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            b"ACGT"[(state % 4) as usize]
        })
        .collect()
}

fn tiled_reads(draft: &[u8], read_len: usize, step: usize) -> Vec<ReadAlignment> {
    let cigar = parse_cigar(&format!("{read_len}M")).unwrap();
    (0..draft.len().saturating_sub(read_len))
        .step_by(step)
        .map(|start| {
            let seq = &draft[start..start + read_len];
            ReadAlignment::from_cigar(
                format!("read_{start}"),
                Strand::Forward,
                60,
                start as u32,
                &cigar,
                seq,
                &vec![30; read_len],
            )
            .unwrap()
        })
        .collect()
}

fn benchmark_polish(c: &mut Criterion) {
    let bases = synthetic_draft(20_000);
    let draft = DraftSequence::new("bench", bases.clone());
    let index = AlignmentIndex::new(tiled_reads(&bases, 1_000, 100));

    let mut group = c.benchmark_group("polish");
    group.sample_size(10);
    for half_width in [8usize, 24, 64] {
        let mut config = PolishConfig::default().with_window(5_000, 500);
        config.hmm.band_half_width = half_width;
        group.bench_with_input(
            BenchmarkId::new("band_half_width", half_width),
            &config,
            |b, config| {
                b.iter(|| black_box(polish(&draft, &index, config).unwrap()));
            },
        );
    }
    group.finish();
}

criterion_group!(benches, benchmark_polish);
criterion_main!(benches);

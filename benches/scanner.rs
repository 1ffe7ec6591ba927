//! Marker scanning and archive assembly benchmarks.
//!
//! Run: cargo bench --bench scanner

use std::fmt::Write;
use std::hint::black_box;

use chatforge::archive::{ArchivePolicy, build_archive, scan_blocks};
use chatforge::chunking::create_segmenter;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

fn project_text(files: usize, lines_per_file: usize) -> String {
    let mut text = String::from("Here is the project you asked for.\n\n");
    for i in 0..files {
        let _ = writeln!(text, "=== file: src/module_{i}.rs ===");
        for line in 0..lines_per_file {
            let _ = writeln!(text, "pub fn item_{line}() -> usize {{ {line} }}");
        }
    }
    text
}

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan_blocks");
    for files in [10, 100, 1000] {
        let text = project_text(files, 40);
        group.bench_with_input(BenchmarkId::from_parameter(files), &text, |b, text| {
            b.iter(|| scan_blocks(black_box(text)));
        });
    }
    group.finish();
}

fn bench_archive(c: &mut Criterion) {
    let text = project_text(100, 40);
    let policy = ArchivePolicy::default();
    c.bench_function("build_archive/100", |b| {
        b.iter(|| build_archive(black_box(&text), &policy));
    });
}

fn bench_segment(c: &mut Criterion) {
    let text = project_text(50, 20);
    let mut group = c.benchmark_group("segment");
    for strategy in ["fixed", "grapheme"] {
        let Ok(segmenter) = create_segmenter(strategy, 30) else {
            continue;
        };
        group.bench_with_input(BenchmarkId::from_parameter(strategy), &text, |b, text| {
            b.iter(|| segmenter.segment(black_box(text)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_scan, bench_archive, bench_segment);
criterion_main!(benches);

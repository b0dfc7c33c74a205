use std::io::Write;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use flate2::Compression;
use flate2::write::GzEncoder;

use sift_core::{CarverConfig, SegmentCarver, TextDecoder};

fn stream_with_member(payload_len: usize, suffix_len: usize) -> Vec<u8> {
    let payload: Vec<u8> = (0..payload_len as u32)
        .flat_map(|i| [(b'A' + (i % 26) as u8), 0])
        .collect();
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(&payload).unwrap();

    let mut data = vec![0x10u8; 64];
    data.extend(enc.finish().unwrap());
    data.extend(std::iter::repeat_n(0xAB, suffix_len));
    data
}

fn carve_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("carve");

    for suffix in [0usize, 256, 4096] {
        let data = stream_with_member(8 * 1024, suffix);
        group.throughput(Throughput::Bytes(data.len() as u64));

        group.bench_with_input(BenchmarkId::new("backward_search", suffix), &data, |b, d| {
            let carver = SegmentCarver::new();
            b.iter(|| carver.carve(d));
        });

        group.bench_with_input(BenchmarkId::new("trailer_probe", suffix), &data, |b, d| {
            let carver =
                SegmentCarver::with_config(CarverConfig::default().with_trailer_probe(true));
            b.iter(|| carver.carve(d));
        });

        group.bench_with_input(BenchmarkId::new("header_parse", suffix), &data, |b, d| {
            let carver = SegmentCarver::new();
            b.iter(|| carver.carve_with_header(d));
        });
    }
    group.finish();
}

fn decode_benchmarks(c: &mut Criterion) {
    let data = stream_with_member(64 * 1024, 0);
    let plaintext = SegmentCarver::new()
        .carve(&data)
        .into_segment()
        .unwrap()
        .plaintext;
    let decoder = TextDecoder::new();

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(plaintext.len() as u64));
    group.bench_function("utf16le_all_alignments", |b| {
        b.iter(|| decoder.utf16le_runs_all_alignments(&plaintext));
    });
    group.bench_function("ascii_runs", |b| b.iter(|| decoder.ascii_runs(&plaintext)));
    group.finish();
}

criterion_group!(benches, carve_benchmarks, decode_benchmarks);
criterion_main!(benches);

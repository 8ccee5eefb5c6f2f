extern crate criterion;
extern crate varlzw;

use std::fs;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{rngs::StdRng, Rng, SeedableRng};
use varlzw::{Decoder, Encoder, Header};

pub fn criterion_benchmark(c: &mut Criterion, name: &str, data: &[u8]) {
    let header = Header::default().with_reset(true);
    let compressed = Encoder::new(header)
        .encode(data)
        .expect("Benchmark input does not compress");

    let mut group = c.benchmark_group(name);
    group.throughput(Throughput::Bytes(data.len() as u64));

    let id = BenchmarkId::new("compress", data.len());
    group.bench_with_input(id, data, |b, data| {
        b.iter(|| {
            let mut encoder = Encoder::new(header);
            let mut outbuf = Vec::with_capacity(data.len());
            let result = encoder.into_stream(&mut outbuf).encode_all(data);
            result.status.expect("Error");
            black_box(&outbuf);
        })
    });

    let id = BenchmarkId::new("expand", data.len());
    group.bench_with_input(id, &compressed, |b, compressed| {
        b.iter(|| {
            let mut decoder = Decoder::new();
            let mut outbuf = Vec::with_capacity(data.len());
            let result = decoder
                .into_stream(&mut outbuf)
                .decode_all(compressed.as_slice());
            result.status.expect("Error");
            black_box(&outbuf);
        })
    });
    group.finish();
}

pub fn bench_toml(c: &mut Criterion) {
    let data = fs::read("Cargo.toml").expect("Benchmark input not found");
    criterion_benchmark(c, "toml", &data);
}

pub fn bench_lib(c: &mut Criterion) {
    let data = fs::read("src/encode.rs").expect("Benchmark input not found");
    // Repeat so the code size reaches its limit.
    let data = data.repeat(16);
    criterion_benchmark(c, "source", &data);
}

pub fn bench_random(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0x1f2e_3d4c);
    // Few symbols keep the data compressible but the dictionary busy.
    let data: Vec<u8> = (0..1 << 20).map(|_| rng.gen_range(0..16u8)).collect();
    criterion_benchmark(c, "random", &data);
}

criterion_group!(benches, bench_toml, bench_lib, bench_random);
criterion_main!(benches);

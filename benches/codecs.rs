use base64::engine::general_purpose;
use base64::Engine as _;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use subtle_codecs::{base64 as ct_base64, hex as ct_hex};

const LEN: usize = 4096;

fn input() -> Vec<u8> {
    (0..LEN as u32).map(|i| (i * 2654435761) as u8).collect()
}

fn bench_hex(c: &mut Criterion) {
    let src = input();
    let mut enc = vec![0u8; ct_hex::encoded_len(src.len())];
    let mut dec = vec![0u8; src.len()];

    let mut g = c.benchmark_group("hex");
    g.throughput(Throughput::Bytes(src.len() as u64));

    g.bench_function("subtle/encode", |b| {
        b.iter(|| ct_hex::encode(&mut enc, black_box(&src)))
    });

    g.bench_function("hex-crate/encode", |b| {
        b.iter(|| black_box(hex::encode(black_box(&src))))
    });

    ct_hex::encode(&mut enc, &src);

    g.bench_function("subtle/decode", |b| {
        b.iter(|| ct_hex::decode(&mut dec, black_box(&enc)).unwrap())
    });

    g.bench_function("hex-crate/decode", |b| {
        b.iter(|| black_box(hex::decode(black_box(&enc)).unwrap()))
    });
}

fn bench_base64(c: &mut Criterion) {
    let src = input();
    let mut enc = vec![0u8; ct_base64::STANDARD.encoded_len(src.len())];
    let mut dec = vec![0u8; src.len() + 3];

    let mut g = c.benchmark_group("base64");
    g.throughput(Throughput::Bytes(src.len() as u64));

    g.bench_function("subtle/encode", |b| {
        b.iter(|| ct_base64::STANDARD.encode(&mut enc, black_box(&src)))
    });

    g.bench_function("base64-crate/encode", |b| {
        b.iter(|| black_box(general_purpose::STANDARD.encode(black_box(&src))))
    });

    ct_base64::STANDARD.encode(&mut enc, &src);

    g.bench_function("subtle/decode", |b| {
        b.iter(|| ct_base64::STANDARD.decode(&mut dec, black_box(&enc)).unwrap())
    });

    g.bench_function("base64-crate/decode", |b| {
        b.iter(|| black_box(general_purpose::STANDARD.decode(black_box(&enc)).unwrap()))
    });
}

criterion_group!(benches, bench_hex, bench_base64);
criterion_main!(benches);

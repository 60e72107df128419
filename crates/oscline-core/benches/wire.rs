//! Wire format benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use oscline_core::{tag_word, AddressTable, OscParser, OscWriter};

fn sample_message() -> Vec<u8> {
    let mut writer = OscWriter::new();
    writer.write_address("/avatar/parameters/VelocityX").unwrap();
    writer.write_tags("fis").unwrap();
    writer.write_float(0.5).unwrap();
    writer.write_int(42).unwrap();
    writer.write_string("walking").unwrap();
    writer.as_bytes().to_vec()
}

fn parse_benchmark(c: &mut Criterion) {
    let bytes = sample_message();
    let mut parser = OscParser::new();

    c.bench_function("parse_message", |b| {
        b.iter(|| black_box(parser.parse(black_box(&bytes), 0).unwrap()))
    });
}

fn read_benchmark(c: &mut Criterion) {
    let bytes = sample_message();
    let mut parser = OscParser::new();
    parser.parse(&bytes, 0).unwrap();

    c.bench_function("read_typed_elements", |b| {
        b.iter(|| {
            let values = parser.values(&bytes);
            black_box(values.read_float(0).unwrap());
            black_box(values.read_int(1).unwrap());
            black_box(values.read_str(2).unwrap());
        })
    });
}

fn encode_benchmark(c: &mut Criterion) {
    let mut writer = OscWriter::new();

    c.bench_function("encode_single_float", |b| {
        b.iter(|| {
            writer
                .write_address_and_tags(black_box("/synth/1/freq"), tag_word::FLOAT32)
                .unwrap();
            writer.write_float(black_box(440.0)).unwrap();
            black_box(writer.len())
        })
    });
}

fn lookup_benchmark(c: &mut Criterion) {
    let mut table = AddressTable::new();
    for i in 0..64 {
        table.insert(&format!("/mixer/ch/{}/gain", i), i);
    }
    let bytes = sample_message();
    let probe = b"/mixer/ch/31/gain";

    c.bench_function("table_lookup_bytes", |b| {
        b.iter(|| black_box(table.get_bytes(black_box(probe))))
    });

    c.bench_function("table_lookup_miss", |b| {
        b.iter(|| black_box(table.get_bytes(black_box(&bytes[..27]))))
    });
}

criterion_group!(
    benches,
    parse_benchmark,
    read_benchmark,
    encode_benchmark,
    lookup_benchmark
);
criterion_main!(benches);

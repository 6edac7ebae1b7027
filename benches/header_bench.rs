use criterion::{black_box, criterion_group, criterion_main, Criterion};
use multistream::codec::{Codec, GzipCodec};
use multistream::flags::{ItemFlags, TypeAndFlags};
use multistream::{ContainerReader, ContainerWriter, ItemHeader};
use std::io::Cursor;

fn bench_header_codec(c: &mut Criterion) {
    let tf = TypeAndFlags::pack(3, ItemFlags::GZIPPED).unwrap();
    let v1 = ItemHeader::new(4096, 1 << 20, tf);
    let v2 = ItemHeader::new(4096, 1 << 40, tf);
    let v1_bytes = v1.encode().unwrap();
    let v2_bytes = v2.encode().unwrap();

    c.bench_function("header_encode_v1", |b| b.iter(|| black_box(&v1).encode().unwrap()));
    c.bench_function("header_encode_v2", |b| b.iter(|| black_box(&v2).encode().unwrap()));
    c.bench_function("header_decode_v1", |b| b.iter(|| ItemHeader::decode(black_box(&v1_bytes)).unwrap()));
    c.bench_function("header_decode_v2", |b| b.iter(|| ItemHeader::decode(black_box(&v2_bytes)).unwrap()));
}

fn bench_gzip(c: &mut Criterion) {
    let data = vec![0u8; 1024 * 1024];
    c.bench_function("gzip_compress_1mb", |b| b.iter(|| GzipCodec.compress(black_box(&data), 6)));
}

fn bench_pack_and_read(c: &mut Criterion) {
    let data = vec![42u8; 1024 * 1024];

    for (name, flags) in [
        ("pack_1mb_plain", ItemFlags::empty()),
        ("pack_1mb_gzip", ItemFlags::GZIPPED),
        ("pack_1mb_gzip_assured", ItemFlags::GZIPPED | ItemFlags::ASSURED),
    ] {
        c.bench_function(name, |b| {
            b.iter(|| {
                let mut writer = ContainerWriter::new(Cursor::new(Vec::new())).unwrap();
                writer.append(1, flags, black_box(&data)).unwrap();
                writer.finalize().unwrap();
            })
        });
    }

    let mut writer = ContainerWriter::new(Cursor::new(Vec::new())).unwrap();
    writer.append(1, ItemFlags::GZIPPED | ItemFlags::ASSURED, &data).unwrap();
    writer.finalize().unwrap();
    let packed = writer.into_inner().into_inner();

    c.bench_function("read_1mb_gzip_assured", |b| {
        b.iter(|| {
            let mut reader = ContainerReader::open(Cursor::new(black_box(&packed[..]))).unwrap();
            reader.read_item(0).unwrap()
        })
    });
}

criterion_group!(benches, bench_header_codec, bench_gzip, bench_pack_and_read);
criterion_main!(benches);

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
// criterion_group!/criterion_main! expand to undocumented items that cannot
// carry #[allow] (attributes on macro invocations are ignored). Crate-level
// allow is required for benchmark binaries.
#![allow(missing_docs)]
//! Benchmark: unmarshal throughput for flat and nested documents.
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use runnel_doc::Document;
use runnel_dry_tests::meta_uuid_pointer;

/// Object with `n` members, each a small record.
fn flat_document(n: usize) -> Vec<u8> {
    let members: Vec<String> = (0..n)
        .map(|i| format!(r#""field{i}":{{"id":{i},"name":"item-{i}","tags":["a","b\n"]}}"#))
        .collect();
    format!("{{{}}}", members.join(",")).into_bytes()
}

fn bench_unmarshal(c: &mut Criterion) {
    let mut group = c.benchmark_group("unmarshal");
    for &n in &[10usize, 100, 1_000] {
        let bytes = flat_document(n);
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &bytes, |b, bytes| {
            let mut doc = Document::new(meta_uuid_pointer());
            b.iter(|| {
                doc.unmarshal(criterion::black_box(bytes)).unwrap();
                criterion::black_box(doc.is_empty());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_unmarshal);
criterion_main!(benches);

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
// criterion_group!/criterion_main! expand to undocumented items that cannot
// carry #[allow] (attributes on macro invocations are ignored). Crate-level
// allow is required for benchmark binaries.
#![allow(missing_docs)]
//! Benchmark: key fingerprinting through a compiled collection.
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use runnel_doc::{Collection, CollectionConfig, Document};
use runnel_dry_tests::{fixture_uuid, DocumentBuilder};

fn bench_key_hash(c: &mut Criterion) {
    let config = CollectionConfig::from_json_slice(
        br#"{"uuid_ptr":"/_meta/uuid","key_ptrs":["/tenant","/region","/seq"]}"#,
    )
    .unwrap();
    let collection = Collection::compile(&config).unwrap();
    let doc = collection
        .parse_document(br#"{"tenant":"acme","region":"eu-west","seq":42,"body":{"k":[1,2,3]}}"#)
        .unwrap();

    c.bench_function("key_hash", |b| {
        b.iter(|| criterion::black_box(collection.key_hash(&doc)));
    });

    c.bench_function("set_identifier", |b| {
        b.iter_batched(
            || doc.clone(),
            |mut doc: Document| {
                doc.set_identifier(fixture_uuid(1)).unwrap();
                criterion::black_box(doc);
            },
            BatchSize::SmallInput,
        );
    });

    let source = DocumentBuilder::meta().uuid(fixture_uuid(2)).build().unwrap();
    c.bench_function("new_acknowledgement", |b| {
        b.iter(|| criterion::black_box(collection.new_acknowledgement(&source).unwrap()));
    });
}

criterion_group!(benches, bench_key_hash);
criterion_main!(benches);

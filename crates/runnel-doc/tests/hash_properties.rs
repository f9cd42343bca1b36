// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
use proptest::prelude::*;
use runnel_doc::{hash_values, BufferPool, Document, Extractor, Pointer, TypedValue, EMPTY_HASH};
use runnel_dry_tests::{json_document, meta_uuid_pointer, pointer};

fn extractor(pointers: &[&str]) -> Extractor {
    Extractor::new(pointers.iter().map(|p| Pointer::compile(p).unwrap()).collect())
}

fn doc(text: &str) -> Document {
    Document::from_template(meta_uuid_pointer(), text.as_bytes()).unwrap()
}

#[test]
fn empty_key_hashes_to_sentinel() {
    let pool = BufferPool::new();
    let none = Extractor::new(Vec::new());
    assert_eq!(none.hash_fields(&doc(r#"{"a":1}"#), &pool), EMPTY_HASH);
    assert_eq!(hash_values(Vec::<TypedValue<'_>>::new()), 0);
}

#[test]
fn numeric_types_are_not_normalized() {
    let pool = BufferPool::new();
    let ex = extractor(&["/n"]);
    let one = ex.hash_fields(&doc(r#"{"n":1}"#), &pool);
    let one_float = ex.hash_fields(&doc(r#"{"n":1.0}"#), &pool);
    let one_string = ex.hash_fields(&doc(r#"{"n":"1"}"#), &pool);
    assert_ne!(one, one_float);
    assert_ne!(one, one_string);
    assert_ne!(one_float, one_string);
}

#[test]
fn negative_zero_and_zero_hash_differently() {
    let pool = BufferPool::new();
    let ex = extractor(&["/z"]);
    let negative = ex.hash_fields(&doc(r#"{"z":-0}"#), &pool);
    assert_ne!(negative, ex.hash_fields(&doc(r#"{"z":0}"#), &pool));
    assert_eq!(negative, ex.hash_fields(&doc(r#"{"z":-0.0}"#), &pool));
}

#[test]
fn absent_and_null_hash_differently() {
    let pool = BufferPool::new();
    let ex = extractor(&["/k"]);
    assert_ne!(
        ex.hash_fields(&doc(r#"{"k":null}"#), &pool),
        ex.hash_fields(&doc("{}"), &pool)
    );
}

#[test]
fn string_hash_ignores_escape_spelling() {
    let pool = BufferPool::new();
    let ex = extractor(&["/s"]);
    assert_eq!(
        ex.hash_fields(&doc(r#"{"s":"a/b"}"#), &pool),
        ex.hash_fields(&doc(r#"{"s":"a\/b"}"#), &pool)
    );
}

#[test]
fn swapping_pointer_order_changes_hash() {
    let pool = BufferPool::new();
    let d = doc(r#"{"a":"x","b":"y"}"#);
    assert_ne!(
        extractor(&["/a", "/b"]).hash_fields(&d, &pool),
        extractor(&["/b", "/a"]).hash_fields(&d, &pool)
    );
}

proptest! {
    #[test]
    fn hash_is_deterministic(
        value in json_document(),
        ptrs in prop::collection::vec(pointer(), 0..6),
    ) {
        let bytes = serde_json::to_vec(&value).unwrap();
        let first = Document::from_template(meta_uuid_pointer(), &bytes).unwrap();
        let second = Document::from_template(meta_uuid_pointer(), &first.to_vec()).unwrap();
        let ex = Extractor::new(ptrs);
        let pool = BufferPool::with_limits(4, 4);

        let expected = ex.hash_fields(&first, &pool);
        prop_assert_eq!(ex.hash_fields(&first, &pool), expected);
        prop_assert_eq!(ex.hash_fields(&second, &pool), expected);

        let mut scratch = Vec::new();
        prop_assert_eq!(hash_values(ex.extract(&first, &mut scratch)), expected);
    }
}

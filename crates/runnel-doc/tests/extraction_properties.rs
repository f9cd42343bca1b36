// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
use proptest::prelude::*;
use runnel_doc::{BufferPool, Document, Extractor, Pointer, TypedValue};
use runnel_dry_tests::{json_document, meta_uuid_pointer, pointer, raw_document};
use serde_json::Value;

// Extraction is checked against serde_json's own RFC 6901 resolution. Both
// models keep the last of duplicate members and read `-0` as a float, so they
// agree exactly on every document these strategies produce.

fn parse(value: &Value) -> Document {
    let bytes = serde_json::to_vec(value).unwrap();
    Document::from_template(meta_uuid_pointer(), &bytes).unwrap()
}

/// Subtrees of a document written by `serde_json::to_vec` are their own
/// encoding, byte for byte.
fn encoded_same(raw: &[u8], expected: &Value) -> bool {
    serde_json::to_vec(expected).is_ok_and(|encoded| encoded == raw)
}

/// Hand-spelled subtrees only hold exactly representable numbers, so
/// reading them back is lossless.
fn reparsed_same(raw: &[u8], expected: &Value) -> bool {
    serde_json::from_slice::<Value>(raw).ok().as_ref() == Some(expected)
}

fn agrees(
    actual: &TypedValue<'_>,
    expected: Option<&Value>,
    same_container: fn(&[u8], &Value) -> bool,
) -> bool {
    match (actual, expected) {
        (TypedValue::Absent, None) => true,
        (TypedValue::Null, Some(Value::Null)) => true,
        (TypedValue::Bool(a), Some(Value::Bool(b))) => a == b,
        (TypedValue::Unsigned(a), Some(Value::Number(n))) => n.as_u64() == Some(*a),
        (TypedValue::Signed(a), Some(Value::Number(n))) => n.as_u64().is_none() && n.as_i64() == Some(*a),
        (TypedValue::Float(a), Some(Value::Number(n))) => {
            n.is_f64() && n.as_f64().map(f64::to_bits) == Some(a.to_bits())
        }
        (TypedValue::String(a), Some(Value::String(b))) => *a == b.as_bytes(),
        (TypedValue::Object(raw), Some(v @ Value::Object(_)))
        | (TypedValue::Array(raw), Some(v @ Value::Array(_))) => same_container(raw, v),
        _ => false,
    }
}

proptest! {
    #[test]
    fn single_pointer_matches_reference(value in json_document(), ptr in pointer()) {
        let doc = parse(&value);
        let text = ptr.to_string();
        let extractor = Extractor::new(vec![ptr]);
        let mut scratch = Vec::new();
        let got = extractor.extract(&doc, &mut scratch);
        prop_assert_eq!(got.len(), 1);
        prop_assert!(
            agrees(&got[0], value.pointer(&text), encoded_same),
            "{} in {} gave {:?}", text, value, got[0]
        );
    }

    #[test]
    fn results_follow_pointer_order(
        value in json_document(),
        ptrs in prop::collection::vec(pointer(), 1..8),
    ) {
        let doc = parse(&value);
        let texts: Vec<String> = ptrs.iter().map(ToString::to_string).collect();
        let extractor = Extractor::new(ptrs);
        let mut scratch = Vec::new();
        let got = extractor.extract(&doc, &mut scratch);
        prop_assert_eq!(got.len(), texts.len());
        for (value_at, text) in got.iter().zip(&texts) {
            prop_assert!(
                agrees(value_at, value.pointer(text), encoded_same),
                "{} gave {:?}", text, value_at
            );
        }
    }

    #[test]
    fn wire_spellings_match_reference(
        text in raw_document(),
        ptrs in prop::collection::vec(pointer(), 1..8),
    ) {
        let value: Value = serde_json::from_str(&text).unwrap();
        let doc = Document::from_template(meta_uuid_pointer(), text.as_bytes()).unwrap();
        let texts: Vec<String> = ptrs.iter().map(ToString::to_string).collect();
        let extractor = Extractor::new(ptrs);
        let mut scratch = Vec::new();
        let got = extractor.extract(&doc, &mut scratch);
        for (value_at, ptr) in got.iter().zip(&texts) {
            prop_assert!(
                agrees(value_at, value.pointer(ptr), reparsed_same),
                "{} in {} gave {:?}", ptr, text, value_at
            );
        }
    }

    #[test]
    fn growth_from_empty_buffer_matches_roomy_buffer(
        value in json_document(),
        ptrs in prop::collection::vec(pointer(), 0..6),
    ) {
        let doc = parse(&value);
        let extractor = Extractor::new(ptrs);
        let mut empty = Vec::new();
        let mut roomy = vec![0u8; 1 << 16];
        prop_assert_eq!(extractor.extract(&doc, &mut empty), extractor.extract(&doc, &mut roomy));

        let pool = BufferPool::with_limits(1, 2);
        let pooled = extractor.extract_pooled(&doc, &pool);
        let direct = extractor.extract(&doc, &mut roomy);
        prop_assert_eq!(pooled.iter().collect::<Vec<_>>(), direct);
    }

    #[test]
    fn remarshal_preserves_extraction(
        value in json_document(),
        ptrs in prop::collection::vec(pointer(), 0..6),
    ) {
        let pretty = serde_json::to_vec_pretty(&value).unwrap();
        let doc = Document::from_template(meta_uuid_pointer(), &pretty).unwrap();
        prop_assert_eq!(doc.to_vec(), pretty.clone());

        let mut again = Document::new(Pointer::root());
        again.unmarshal(&doc.to_vec()).unwrap();
        prop_assert_eq!(again.to_vec(), pretty);

        let extractor = Extractor::new(ptrs);
        let (mut a, mut b) = (Vec::new(), Vec::new());
        prop_assert_eq!(extractor.extract(&doc, &mut a), extractor.extract(&again, &mut b));
    }
}

#[test]
fn negative_zero_stays_a_float() {
    let doc = Document::from_template(meta_uuid_pointer(), br#"{"z":-0,"p":0}"#).unwrap();
    let extractor = Extractor::new(vec![
        Pointer::compile("/z").unwrap(),
        Pointer::compile("/p").unwrap(),
    ]);
    let mut scratch = Vec::new();
    let got = extractor.extract(&doc, &mut scratch);
    assert!(matches!(got[0], TypedValue::Float(z) if z == 0.0 && z.is_sign_negative()));
    assert_eq!(got[1], TypedValue::Unsigned(0));
    assert!(serde_json::from_str::<Value>("-0").unwrap().is_f64());
}

#[test]
fn absent_and_null_are_distinct() {
    let doc = parse(&serde_json::json!({"n": null, "arr": [null]}));
    let extractor = Extractor::new(
        ["/n", "/missing", "/arr/0", "/arr/1", "/n/deeper"]
            .iter()
            .map(|p| Pointer::compile(p).unwrap())
            .collect(),
    );
    let mut scratch = Vec::new();
    assert_eq!(
        extractor.extract(&doc, &mut scratch),
        vec![
            TypedValue::Null,
            TypedValue::Absent,
            TypedValue::Null,
            TypedValue::Absent,
            TypedValue::Absent,
        ]
    );
}

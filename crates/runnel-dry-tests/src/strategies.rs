// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! proptest strategies for JSON documents and pointers.
//!
//! Keys come from a small alphabet (including ones that need pointer
//! escaping and ones that look like array indices) so generated pointers
//! hit generated documents often.
//!
//! The `json_*` strategies produce `serde_json` values, which can only be
//! encoded one way. The `raw_*` strategies produce document text directly:
//! escaped and unescaped spellings of the same key, duplicate members, and
//! number literals such as `-0`, `1E2` or integers past `u64`.

use proptest::prelude::*;
use runnel_doc::Pointer;
use serde_json::{Map, Value};

/// Object member names.
pub fn json_key() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("a".to_owned()),
        Just("b".to_owned()),
        Just("0".to_owned()),
        Just("1".to_owned()),
        Just("-".to_owned()),
        Just("a/b".to_owned()),
        Just("m~n".to_owned()),
        "[a-z]{0,3}",
    ]
}

/// Scalars of every JSON type. Floats are finite.
pub fn json_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<u64>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        (-1.0e9f64..1.0e9).prop_map(Value::from),
        "\\PC{0,8}".prop_map(Value::from),
    ]
}

/// Arbitrary JSON up to four levels deep.
pub fn json_value() -> impl Strategy<Value = Value> {
    json_leaf().prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map(json_key(), inner, 0..4)
                .prop_map(|members| Value::Object(members.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

/// A top-level object.
pub fn json_document() -> impl Strategy<Value = Value> {
    prop::collection::btree_map(json_key(), json_value(), 0..6)
        .prop_map(|members| Value::Object(members.into_iter().collect::<Map<_, _>>()))
}

/// Pointers of up to three tokens over [`json_key`].
pub fn pointer() -> impl Strategy<Value = Pointer> {
    prop::collection::vec(json_key(), 0..4).prop_filter_map("pointer compiles", |keys| {
        let text: String = keys
            .iter()
            .map(|key| format!("/{}", key.replace('~', "~0").replace('/', "~1")))
            .collect();
        Pointer::compile(&text).ok()
    })
}

/// Member names as written on the wire, quotes included. Several spellings
/// decode to the same name, and the alphabet is small enough that objects
/// often repeat a member.
pub fn raw_key() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        r#""a""#,
        r#""\u0061""#,
        r#""b""#,
        r#""0""#,
        r#""\u0030""#,
        r#""1""#,
        r#""-""#,
        r#""a/b""#,
        r#""a\/b""#,
        r#""m~n""#,
    ])
    .prop_map(str::to_owned)
}

/// Scalar literals, including spellings that `serde_json` values never
/// produce. Every number is exactly representable, so text and value
/// models agree.
pub fn raw_leaf() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "null",
        "true",
        "false",
        "0",
        "-0",
        "-0.0",
        "-7",
        "1E2",
        "2.5e-1",
        "18446744073709551615",
        "100000000000000000000",
        "-9223372036854775808",
        r#""x""#,
        r#""\u0041\n""#,
        r#""\ud83d\ude00""#,
    ])
    .prop_map(str::to_owned)
}

fn raw_object(value: impl Strategy<Value = String>) -> impl Strategy<Value = String> {
    prop::collection::vec((raw_key(), value), 0..5).prop_map(|members| {
        let members: Vec<String> = members.iter().map(|(key, value)| format!("{key}:{value}")).collect();
        format!("{{{}}}", members.join(", "))
    })
}

/// Document text up to three levels deep.
pub fn raw_value() -> impl Strategy<Value = String> {
    raw_leaf().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(|items| format!("[{}]", items.join(","))),
            raw_object(inner),
        ]
    })
}

/// A top-level object as text.
pub fn raw_document() -> impl Strategy<Value = String> {
    raw_object(raw_value())
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Deterministic 64-bit fingerprints over extracted values.
//!
//! The fingerprint is order- and type-sensitive: `Unsigned(1)` and
//! `Float(1.0)` hash differently, as do `Absent` and `Null`. Numbers are not
//! normalized; callers that want `1` and `1.0` to collide must canonicalize
//! before hashing.

use crate::value::TypedValue;

/// Domain separation prefix absorbed before any value.
const DOMAIN: &[u8] = b"runnel:fields:v1\0";

/// Fingerprint of an empty value sequence.
pub const EMPTY_HASH: u64 = 0;

const TAG_ABSENT: u8 = 0;
const TAG_NULL: u8 = 1;
const TAG_BOOL: u8 = 2;
const TAG_UNSIGNED: u8 = 3;
const TAG_SIGNED: u8 = 4;
const TAG_FLOAT: u8 = 5;
const TAG_STRING: u8 = 6;
const TAG_OBJECT: u8 = 7;
const TAG_ARRAY: u8 = 8;

/// Combine `values` into one fingerprint.
///
/// Returns [`EMPTY_HASH`] for an empty sequence. Otherwise the result is the
/// first eight bytes (little-endian) of a BLAKE3 digest over a type tag and
/// the content of each value in order. Variable-length content is length
/// prefixed so adjacent values never run together.
pub fn hash_values<'a, I>(values: I) -> u64
where
    I: IntoIterator<Item = TypedValue<'a>>,
{
    let mut hasher = blake3::Hasher::new();
    hasher.update(DOMAIN);
    let mut any = false;
    for value in values {
        any = true;
        absorb(&mut hasher, value);
    }
    if !any {
        return EMPTY_HASH;
    }
    let digest = hasher.finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(head)
}

fn absorb(hasher: &mut blake3::Hasher, value: TypedValue<'_>) {
    match value {
        TypedValue::Absent => {
            hasher.update(&[TAG_ABSENT]);
        }
        TypedValue::Null => {
            hasher.update(&[TAG_NULL]);
        }
        TypedValue::Bool(b) => {
            hasher.update(&[TAG_BOOL, u8::from(b)]);
        }
        TypedValue::Unsigned(n) => {
            hasher.update(&[TAG_UNSIGNED]);
            hasher.update(&n.to_le_bytes());
        }
        TypedValue::Signed(n) => {
            hasher.update(&[TAG_SIGNED]);
            hasher.update(&n.to_le_bytes());
        }
        TypedValue::Float(f) => {
            hasher.update(&[TAG_FLOAT]);
            hasher.update(&f.to_bits().to_le_bytes());
        }
        TypedValue::String(bytes) => absorb_bytes(hasher, TAG_STRING, bytes),
        TypedValue::Object(bytes) => absorb_bytes(hasher, TAG_OBJECT, bytes),
        TypedValue::Array(bytes) => absorb_bytes(hasher, TAG_ARRAY, bytes),
    }
}

fn absorb_bytes(hasher: &mut blake3::Hasher, tag: u8, bytes: &[u8]) {
    hasher.update(&[tag]);
    hasher.update(&(bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Typed extraction results.

/// The value found at one pointer location.
///
/// Variable-length variants borrow from the scratch buffer the extraction
/// wrote into. `Absent` (no such location) and `Null` (the location holds JSON
/// `null`) are never conflated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TypedValue<'a> {
    /// The pointer resolved to no location.
    Absent,
    /// JSON `null`.
    Null,
    /// JSON `true` / `false`.
    Bool(bool),
    /// Non-negative integer that fits `u64`.
    Unsigned(u64),
    /// Negative integer that fits `i64`.
    Signed(i64),
    /// Any other number.
    Float(f64),
    /// String contents with escapes decoded (always valid UTF-8).
    String(&'a [u8]),
    /// The object exactly as encoded in the document.
    Object(&'a [u8]),
    /// The array exactly as encoded in the document.
    Array(&'a [u8]),
}

impl<'a> TypedValue<'a> {
    /// Returns `true` for [`TypedValue::Absent`].
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// String contents as `&str`, if this is a string.
    pub fn as_str(&self) -> Option<&'a str> {
        match self {
            Self::String(bytes) => std::str::from_utf8(bytes).ok(),
            _ => None,
        }
    }

    /// Encoded bytes of an object or array.
    pub fn as_raw(&self) -> Option<&'a [u8]> {
        match self {
            Self::Object(bytes) | Self::Array(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Short type name, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Unsigned(_) | Self::Signed(_) => "integer",
            Self::Float(_) => "number",
            Self::String(_) => "string",
            Self::Object(_) => "object",
            Self::Array(_) => "array",
        }
    }
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Compiled RFC 6901 JSON Pointers.
//!
//! A [`Pointer`] is parsed once (typically while loading a collection config)
//! and then evaluated against many documents. Equality and hashing are defined
//! over the compiled token sequence, so `/a~1b` and a pointer built from the
//! same tokens compare equal regardless of how they were spelled.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Why a pointer failed to compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedReason {
    /// A non-empty pointer must begin with `/`.
    MissingLeadingSlash,
    /// `~` must be followed by `0` or `1`.
    InvalidEscape,
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingLeadingSlash => f.write_str("missing leading '/'"),
            Self::InvalidEscape => f.write_str("'~' must be followed by '0' or '1'"),
        }
    }
}

/// Errors produced by [`Pointer::compile`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PointerError {
    /// The text is not valid JSON Pointer syntax.
    #[error("malformed JSON pointer {pointer:?}: {reason} at byte {offset}")]
    Malformed {
        /// Source text that failed to compile.
        pointer: String,
        /// Byte offset of the offending character.
        offset: usize,
        /// What was wrong.
        reason: MalformedReason,
    },
}

/// One reference token of a compiled pointer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Token {
    /// Object member name (unescaped).
    Property(String),
    /// Array index. Also matches an object member spelled as the same decimal.
    Index(usize),
    /// The `-` token: one past the last array element.
    NextIndex,
}

impl Token {
    fn classify(raw: String) -> Self {
        if raw == "-" {
            return Self::NextIndex;
        }
        let bytes = raw.as_bytes();
        let canonical_digits = !bytes.is_empty()
            && bytes.iter().all(u8::is_ascii_digit)
            && (bytes.len() == 1 || bytes[0] != b'0');
        if canonical_digits {
            if let Ok(index) = raw.parse::<usize>() {
                return Self::Index(index);
            }
        }
        Self::Property(raw)
    }

    /// The object member name this token matches.
    pub fn property_name(&self) -> std::borrow::Cow<'_, str> {
        match self {
            Self::Property(name) => std::borrow::Cow::Borrowed(name),
            Self::Index(index) => std::borrow::Cow::Owned(index.to_string()),
            Self::NextIndex => std::borrow::Cow::Borrowed("-"),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Property(name) => {
                for ch in name.chars() {
                    match ch {
                        '~' => f.write_str("~0")?,
                        '/' => f.write_str("~1")?,
                        _ => write!(f, "{ch}")?,
                    }
                }
                Ok(())
            }
            Self::Index(index) => write!(f, "{index}"),
            Self::NextIndex => f.write_str("-"),
        }
    }
}

/// A compiled JSON Pointer.
///
/// Immutable once compiled, `Send + Sync`, and cheap to evaluate; hold it for
/// the lifetime of the pipeline that uses it.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pointer {
    tokens: Vec<Token>,
}

impl Pointer {
    /// The root pointer (`""`).
    pub fn root() -> Self {
        Self::default()
    }

    /// Compile RFC 6901 text into a pointer.
    ///
    /// The empty string addresses the document root. Any other pointer must
    /// start with `/`; within tokens `~0` decodes to `~` and `~1` to `/`.
    pub fn compile(text: &str) -> Result<Self, PointerError> {
        if text.is_empty() {
            return Ok(Self::root());
        }
        let malformed = |offset: usize, reason: MalformedReason| PointerError::Malformed {
            pointer: text.to_owned(),
            offset,
            reason,
        };
        let Some(rest) = text.strip_prefix('/') else {
            return Err(malformed(0, MalformedReason::MissingLeadingSlash));
        };

        let mut tokens = Vec::new();
        let mut offset = 1;
        for raw in rest.split('/') {
            let mut token = String::with_capacity(raw.len());
            let mut chars = raw.char_indices();
            while let Some((at, ch)) = chars.next() {
                if ch != '~' {
                    token.push(ch);
                    continue;
                }
                match chars.next() {
                    Some((_, '0')) => token.push('~'),
                    Some((_, '1')) => token.push('/'),
                    _ => return Err(malformed(offset + at, MalformedReason::InvalidEscape)),
                }
            }
            tokens.push(Token::classify(token));
            offset += raw.len() + 1;
        }
        Ok(Self { tokens })
    }

    /// Build a pointer directly from tokens.
    ///
    /// Property tokens are reclassified the way [`compile`](Pointer::compile)
    /// would read them, so `Property("5")` becomes `Index(5)` and `"-"`
    /// becomes `NextIndex`.
    pub fn from_tokens(tokens: Vec<Token>) -> Self {
        let tokens = tokens
            .into_iter()
            .map(|token| match token {
                Token::Property(name) => Token::classify(name),
                other => other,
            })
            .collect();
        Self { tokens }
    }

    /// The compiled reference tokens, outermost first.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Returns `true` for the root pointer.
    pub fn is_root(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Number of reference tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Alias of [`is_root`](Pointer::is_root) for collection-style callers.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            write!(f, "/{token}")?;
        }
        Ok(())
    }
}

impl FromStr for Pointer {
    type Err = PointerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::compile(s)
    }
}

impl TryFrom<&str> for Pointer {
    type Error = PointerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::compile(value)
    }
}

impl serde::Serialize for Pointer {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for Pointer {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let text = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        Self::compile(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn prop(name: &str) -> Token {
        Token::Property(name.to_owned())
    }

    #[test]
    fn empty_text_is_root() {
        let ptr = Pointer::compile("").unwrap();
        assert!(ptr.is_root());
        assert_eq!(ptr.to_string(), "");
    }

    #[test]
    fn tokens_are_classified() {
        let ptr = Pointer::compile("/a/0/-/01/18446744073709551616/").unwrap();
        assert_eq!(
            ptr.tokens(),
            &[
                prop("a"),
                Token::Index(0),
                Token::NextIndex,
                prop("01"),
                prop("18446744073709551616"),
                prop(""),
            ]
        );
    }

    #[test]
    fn escapes_are_decoded_in_order() {
        // `~01` is `~` followed by `1`, never `/`.
        let ptr = Pointer::compile("/a~1b/m~0n/~01").unwrap();
        assert_eq!(ptr.tokens(), &[prop("a/b"), prop("m~n"), prop("~1")]);
        assert_eq!(ptr.to_string(), "/a~1b/m~0n/~01");
    }

    #[test]
    fn missing_leading_slash_is_malformed() {
        let err = Pointer::compile("a/b").unwrap_err();
        assert_eq!(
            err,
            PointerError::Malformed {
                pointer: "a/b".into(),
                offset: 0,
                reason: MalformedReason::MissingLeadingSlash,
            }
        );
    }

    #[test]
    fn bad_escape_reports_offset() {
        let err = Pointer::compile("/ok/b~2").unwrap_err();
        let PointerError::Malformed { offset, reason, .. } = err;
        assert_eq!(offset, 5);
        assert_eq!(reason, MalformedReason::InvalidEscape);

        assert!(Pointer::compile("/trailing~").is_err());
    }

    #[test]
    fn equality_is_over_tokens() {
        let a = Pointer::compile("/x/1").unwrap();
        let b = Pointer::from_tokens(vec![prop("x"), Token::Index(1)]);
        assert_eq!(a, b);
    }

    #[test]
    fn built_pointers_classify_like_compiled_ones() {
        let built = Pointer::from_tokens(vec![prop("5"), prop("-"), prop("05"), Token::Index(2)]);
        assert_eq!(built, Pointer::compile("/5/-/05/2").unwrap());
        assert_eq!(
            built.tokens(),
            &[Token::Index(5), Token::NextIndex, prop("05"), Token::Index(2)]
        );
    }

    #[test]
    fn index_tokens_name_object_members() {
        assert_eq!(Token::Index(12).property_name(), "12");
        assert_eq!(Token::NextIndex.property_name(), "-");
    }

    #[test]
    fn serde_uses_pointer_text() {
        let ptr: Pointer = serde_json::from_str(r#""/_meta/uuid""#).unwrap();
        assert_eq!(ptr.len(), 2);
        assert_eq!(serde_json::to_string(&ptr).unwrap(), r#""/_meta/uuid""#);
        assert!(serde_json::from_str::<Pointer>(r#""nope""#).is_err());
    }
}

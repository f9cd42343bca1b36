// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Span-recording JSON parser.
//!
//! Parsing produces a [`Tree`]: a flat, pre-order arena of [`Node`]s that
//! record *where* each value lives in the backing bytes rather than copying
//! it. Containers know their child count and every node knows the arena index
//! one past its subtree, so siblings are reached by skipping, never by
//! re-scanning bytes.
//!
//! The grammar is strict RFC 8259 (no comments, no trailing commas, no NaN).
//! Input must be UTF-8. Lone surrogate escapes are rejected so that every
//! decoded string is valid UTF-8.

use thiserror::Error;

/// Maximum container nesting depth, matching serde_json's recursion limit.
pub const MAX_DEPTH: usize = 128;

/// What went wrong while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    /// Input ended in the middle of a value.
    #[error("EOF while parsing a value")]
    Eof,
    /// A value was expected but something else was found.
    #[error("expected value")]
    ExpectedValue,
    /// Object member names must be strings.
    #[error("key must be a string")]
    KeyMustBeString,
    /// Missing `:` after an object member name.
    #[error("expected ':'")]
    ExpectedColon,
    /// Missing `,` or `}` after an object member.
    #[error("expected ',' or '}}'")]
    ExpectedObjectCommaOrEnd,
    /// Missing `,` or `]` after an array element.
    #[error("expected ',' or ']'")]
    ExpectedArrayCommaOrEnd,
    /// Malformed number literal.
    #[error("invalid number")]
    InvalidNumber,
    /// Unknown or truncated escape sequence.
    #[error("invalid escape")]
    InvalidEscape,
    /// A `\u` escape produced an unpaired UTF-16 surrogate.
    #[error("lone surrogate in unicode escape")]
    LoneSurrogate,
    /// Unescaped control character inside a string.
    #[error("control character in string")]
    ControlCharacter,
    /// Non-whitespace bytes after the top-level value.
    #[error("trailing characters")]
    TrailingCharacters,
    /// Nesting deeper than [`MAX_DEPTH`].
    #[error("recursion limit exceeded")]
    RecursionLimitExceeded,
    /// Input is not valid UTF-8.
    #[error("invalid UTF-8")]
    InvalidUtf8,
    /// Input exceeds the 4 GiB span limit.
    #[error("document too large")]
    TooLarge,
}

/// A JSON syntax error with the byte offset where it was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{kind} at byte {offset}")]
pub struct ParseError {
    /// Error category.
    pub kind: ParseErrorKind,
    /// Byte offset into the input.
    pub offset: usize,
}

/// Value kind of a parsed node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Kind {
    Null,
    Bool(bool),
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    /// `escaped` is set when the raw contents contain a backslash.
    String { escaped: bool },
    Object,
    Array,
}

/// One value in the arena.
///
/// `begin..end` spans the encoded value (quotes and brackets included).
/// Object members additionally carry their raw key contents (quotes
/// excluded).
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Node {
    pub(crate) kind: Kind,
    pub(crate) begin: u32,
    pub(crate) end: u32,
    pub(crate) key_begin: u32,
    pub(crate) key_end: u32,
    pub(crate) key_escaped: bool,
    /// Arena index one past this node's subtree.
    pub(crate) skip: u32,
    /// Child count for containers, zero otherwise.
    pub(crate) len: u32,
}

impl Node {
    pub(crate) fn span(&self) -> std::ops::Range<usize> {
        self.begin as usize..self.end as usize
    }

    /// Raw string contents without the surrounding quotes.
    pub(crate) fn string_contents(&self) -> std::ops::Range<usize> {
        self.begin as usize + 1..self.end as usize - 1
    }

    pub(crate) fn key(&self) -> std::ops::Range<usize> {
        self.key_begin as usize..self.key_end as usize
    }
}

/// Pre-order arena of parsed nodes. Index 0 is the root when present.
#[derive(Debug, Clone, Default)]
pub(crate) struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
    }

    pub(crate) fn root(&self) -> Option<usize> {
        if self.nodes.is_empty() {
            None
        } else {
            Some(0)
        }
    }

    pub(crate) fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    /// Iterate the arena indices of a container's direct children.
    pub(crate) fn children(&self, index: usize) -> Children<'_> {
        let node = &self.nodes[index];
        Children {
            tree: self,
            next: index + 1,
            remaining: node.len as usize,
        }
    }

    /// Parse `input`, replacing the current contents. On error the tree is
    /// left empty.
    pub(crate) fn parse(&mut self, input: &[u8]) -> Result<(), ParseError> {
        self.nodes.clear();
        let result = parse_into(input, &mut self.nodes);
        if result.is_err() {
            self.nodes.clear();
        }
        result
    }
}

pub(crate) struct Children<'t> {
    tree: &'t Tree,
    next: usize,
    remaining: usize,
}

impl Iterator for Children<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        let current = self.next;
        self.next = self.tree.nodes[current].skip as usize;
        self.remaining -= 1;
        Some(current)
    }
}

fn parse_into(input: &[u8], nodes: &mut Vec<Node>) -> Result<(), ParseError> {
    if u32::try_from(input.len()).is_err() {
        return Err(ParseError {
            kind: ParseErrorKind::TooLarge,
            offset: 0,
        });
    }
    if let Err(err) = std::str::from_utf8(input) {
        return Err(ParseError {
            kind: ParseErrorKind::InvalidUtf8,
            offset: err.valid_up_to(),
        });
    }
    let mut parser = Parser {
        input,
        pos: 0,
        nodes,
    };
    parser.skip_ws();
    parser.value(NO_KEY, 0)?;
    parser.skip_ws();
    if parser.pos != input.len() {
        return Err(parser.error(ParseErrorKind::TrailingCharacters));
    }
    Ok(())
}

#[derive(Clone, Copy)]
struct KeySpan {
    begin: u32,
    end: u32,
    escaped: bool,
}

const NO_KEY: KeySpan = KeySpan {
    begin: 0,
    end: 0,
    escaped: false,
};

struct Parser<'a, 'n> {
    input: &'a [u8],
    pos: usize,
    nodes: &'n mut Vec<Node>,
}

// Offsets are bounded by the input length, which `parse_into` checked fits u32.
#[allow(clippy::cast_possible_truncation)]
const fn offset32(pos: usize) -> u32 {
    pos as u32
}

#[allow(clippy::cast_possible_truncation)]
const fn index32(index: usize) -> u32 {
    index as u32
}

impl Parser<'_, '_> {
    fn error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError {
            kind,
            offset: self.pos,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.peek() {
            self.pos += 1;
        }
    }

    fn push(&mut self, kind: Kind, begin: usize, key: KeySpan) -> usize {
        let index = self.nodes.len();
        self.nodes.push(Node {
            kind,
            begin: offset32(begin),
            end: offset32(begin),
            key_begin: key.begin,
            key_end: key.end,
            key_escaped: key.escaped,
            skip: index32(index + 1),
            len: 0,
        });
        index
    }

    fn finish(&mut self, index: usize, len: usize) {
        let skip = index32(self.nodes.len());
        let end = offset32(self.pos);
        let node = &mut self.nodes[index];
        node.end = end;
        node.skip = skip;
        node.len = index32(len);
    }

    fn literal(&mut self, text: &[u8], kind: Kind, key: KeySpan) -> Result<(), ParseError> {
        let begin = self.pos;
        if self.input.len() - begin < text.len() {
            self.pos = self.input.len();
            return Err(self.error(ParseErrorKind::Eof));
        }
        if &self.input[begin..begin + text.len()] != text {
            return Err(self.error(ParseErrorKind::ExpectedValue));
        }
        self.pos += text.len();
        let index = self.push(kind, begin, key);
        self.finish(index, 0);
        Ok(())
    }

    fn value(&mut self, key: KeySpan, depth: usize) -> Result<(), ParseError> {
        match self.peek() {
            None => Err(self.error(ParseErrorKind::Eof)),
            Some(b'n') => self.literal(b"null", Kind::Null, key),
            Some(b't') => self.literal(b"true", Kind::Bool(true), key),
            Some(b'f') => self.literal(b"false", Kind::Bool(false), key),
            Some(b'"') => {
                let begin = self.pos;
                let escaped = self.string()?;
                let index = self.push(Kind::String { escaped }, begin, key);
                self.finish(index, 0);
                Ok(())
            }
            Some(b'-' | b'0'..=b'9') => self.number(key),
            Some(b'{') => self.object(key, depth + 1),
            Some(b'[') => self.array(key, depth + 1),
            Some(_) => Err(self.error(ParseErrorKind::ExpectedValue)),
        }
    }

    /// Scan a string starting at its opening quote, leaving `pos` past the
    /// closing quote. Returns whether any escape was seen.
    fn string(&mut self) -> Result<bool, ParseError> {
        self.pos += 1;
        let mut escaped = false;
        loop {
            let Some(byte) = self.peek() else {
                return Err(self.error(ParseErrorKind::Eof));
            };
            match byte {
                b'"' => {
                    self.pos += 1;
                    return Ok(escaped);
                }
                b'\\' => {
                    escaped = true;
                    self.escape()?;
                }
                0x00..=0x1f => return Err(self.error(ParseErrorKind::ControlCharacter)),
                _ => self.pos += 1,
            }
        }
    }

    fn escape(&mut self) -> Result<(), ParseError> {
        self.pos += 1;
        match self.peek() {
            None => Err(self.error(ParseErrorKind::Eof)),
            Some(b'"' | b'\\' | b'/' | b'b' | b'f' | b'n' | b'r' | b't') => {
                self.pos += 1;
                Ok(())
            }
            Some(b'u') => {
                let at = self.pos - 1;
                self.pos += 1;
                let unit = self.hex4()?;
                match unit {
                    0xD800..=0xDBFF => {
                        if self.input.get(self.pos..self.pos + 2) != Some(b"\\u") {
                            self.pos = at;
                            return Err(self.error(ParseErrorKind::LoneSurrogate));
                        }
                        self.pos += 2;
                        let low = self.hex4()?;
                        if !(0xDC00..=0xDFFF).contains(&low) {
                            self.pos = at;
                            return Err(self.error(ParseErrorKind::LoneSurrogate));
                        }
                        Ok(())
                    }
                    0xDC00..=0xDFFF => {
                        self.pos = at;
                        Err(self.error(ParseErrorKind::LoneSurrogate))
                    }
                    _ => Ok(()),
                }
            }
            Some(_) => Err(self.error(ParseErrorKind::InvalidEscape)),
        }
    }

    fn hex4(&mut self) -> Result<u16, ParseError> {
        let mut unit = 0u16;
        for _ in 0..4 {
            let Some(byte) = self.peek() else {
                return Err(self.error(ParseErrorKind::Eof));
            };
            let digit = hex_value(byte).ok_or_else(|| self.error(ParseErrorKind::InvalidEscape))?;
            unit = (unit << 4) | digit;
            self.pos += 1;
        }
        Ok(unit)
    }

    fn digits(&mut self) -> usize {
        let start = self.pos;
        while let Some(b'0'..=b'9') = self.peek() {
            self.pos += 1;
        }
        self.pos - start
    }

    fn number(&mut self, key: KeySpan) -> Result<(), ParseError> {
        let begin = self.pos;
        let negative = self.peek() == Some(b'-');
        if negative {
            self.pos += 1;
        }
        match self.peek() {
            Some(b'0') => self.pos += 1,
            Some(b'1'..=b'9') => {
                self.digits();
            }
            None => return Err(self.error(ParseErrorKind::Eof)),
            Some(_) => return Err(self.error(ParseErrorKind::InvalidNumber)),
        }
        let mut integral = true;
        if self.peek() == Some(b'.') {
            integral = false;
            self.pos += 1;
            if self.digits() == 0 {
                return Err(self.number_error());
            }
        }
        if let Some(b'e' | b'E') = self.peek() {
            integral = false;
            self.pos += 1;
            if let Some(b'+' | b'-') = self.peek() {
                self.pos += 1;
            }
            if self.digits() == 0 {
                return Err(self.number_error());
            }
        }

        let text = &self.input[begin..self.pos];
        let kind = classify_number(text, negative, integral)
            .ok_or_else(|| ParseError {
                kind: ParseErrorKind::InvalidNumber,
                offset: begin,
            })?;
        let index = self.push(kind, begin, key);
        self.finish(index, 0);
        Ok(())
    }

    fn number_error(&self) -> ParseError {
        if self.pos == self.input.len() {
            self.error(ParseErrorKind::Eof)
        } else {
            self.error(ParseErrorKind::InvalidNumber)
        }
    }

    fn object(&mut self, key: KeySpan, depth: usize) -> Result<(), ParseError> {
        if depth > MAX_DEPTH {
            return Err(self.error(ParseErrorKind::RecursionLimitExceeded));
        }
        let index = self.push(Kind::Object, self.pos, key);
        self.pos += 1;
        self.skip_ws();
        let mut len = 0usize;
        if self.peek() == Some(b'}') {
            self.pos += 1;
            self.finish(index, len);
            return Ok(());
        }
        loop {
            match self.peek() {
                Some(b'"') => {}
                None => return Err(self.error(ParseErrorKind::Eof)),
                Some(_) => return Err(self.error(ParseErrorKind::KeyMustBeString)),
            }
            let key_begin = self.pos + 1;
            let escaped = self.string()?;
            let member_key = KeySpan {
                begin: offset32(key_begin),
                end: offset32(self.pos - 1),
                escaped,
            };
            self.skip_ws();
            match self.peek() {
                Some(b':') => self.pos += 1,
                None => return Err(self.error(ParseErrorKind::Eof)),
                Some(_) => return Err(self.error(ParseErrorKind::ExpectedColon)),
            }
            self.skip_ws();
            self.value(member_key, depth)?;
            len += 1;
            self.skip_ws();
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                    self.skip_ws();
                }
                Some(b'}') => {
                    self.pos += 1;
                    self.finish(index, len);
                    return Ok(());
                }
                None => return Err(self.error(ParseErrorKind::Eof)),
                Some(_) => return Err(self.error(ParseErrorKind::ExpectedObjectCommaOrEnd)),
            }
        }
    }

    fn array(&mut self, key: KeySpan, depth: usize) -> Result<(), ParseError> {
        if depth > MAX_DEPTH {
            return Err(self.error(ParseErrorKind::RecursionLimitExceeded));
        }
        let index = self.push(Kind::Array, self.pos, key);
        self.pos += 1;
        self.skip_ws();
        let mut len = 0usize;
        if self.peek() == Some(b']') {
            self.pos += 1;
            self.finish(index, len);
            return Ok(());
        }
        loop {
            self.value(NO_KEY, depth)?;
            len += 1;
            self.skip_ws();
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                    self.skip_ws();
                }
                Some(b']') => {
                    self.pos += 1;
                    self.finish(index, len);
                    return Ok(());
                }
                None => return Err(self.error(ParseErrorKind::Eof)),
                Some(_) => return Err(self.error(ParseErrorKind::ExpectedArrayCommaOrEnd)),
            }
        }
    }
}

fn hex_value(byte: u8) -> Option<u16> {
    match byte {
        b'0'..=b'9' => Some(u16::from(byte - b'0')),
        b'a'..=b'f' => Some(u16::from(byte - b'a' + 10)),
        b'A'..=b'F' => Some(u16::from(byte - b'A' + 10)),
        _ => None,
    }
}

/// Classify a syntactically valid number literal the way serde_json's `Value`
/// does: non-negative integers that fit are unsigned, negative ones that fit
/// are signed, everything else (`-0` included) is a float.
fn classify_number(text: &[u8], negative: bool, integral: bool) -> Option<Kind> {
    let text = std::str::from_utf8(text).ok()?;
    if integral {
        if negative {
            if let Ok(value) = text.parse::<i64>() {
                return Some(if value == 0 {
                    Kind::Float(-0.0)
                } else {
                    Kind::Signed(value)
                });
            }
        } else if let Ok(value) = text.parse::<u64>() {
            return Some(Kind::Unsigned(value));
        }
    }
    let value = text.parse::<f64>().ok()?;
    value.is_finite().then_some(Kind::Float(value))
}

/// Destination for decoded string bytes.
pub(crate) trait Sink {
    fn put(&mut self, bytes: &[u8]);
}

impl Sink for Vec<u8> {
    fn put(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
}

/// Decode the raw contents of a string the parser already validated.
///
/// Unescaped runs are forwarded in one call; each escape is decoded to its
/// UTF-8 encoding.
pub(crate) fn decode_string<S: Sink>(raw: &[u8], sink: &mut S) {
    let mut run_start = 0;
    let mut pos = 0;
    while pos < raw.len() {
        if raw[pos] != b'\\' {
            pos += 1;
            continue;
        }
        sink.put(&raw[run_start..pos]);
        let (ch, consumed) = decode_escape(&raw[pos..]);
        let mut utf8 = [0u8; 4];
        sink.put(ch.encode_utf8(&mut utf8).as_bytes());
        pos += consumed;
        run_start = pos;
    }
    sink.put(&raw[run_start..]);
}

/// Decode one escape at the start of `raw`, returning the character and the
/// number of bytes consumed. Input was validated by the parser, so anything
/// unexpected decodes to U+FFFD rather than failing.
fn decode_escape(raw: &[u8]) -> (char, usize) {
    let simple = match raw.get(1) {
        Some(b'"') => '"',
        Some(b'\\') => '\\',
        Some(b'/') => '/',
        Some(b'b') => '\u{8}',
        Some(b'f') => '\u{c}',
        Some(b'n') => '\n',
        Some(b'r') => '\r',
        Some(b't') => '\t',
        Some(b'u') => return decode_unicode_escape(raw),
        _ => return (char::REPLACEMENT_CHARACTER, raw.len().min(2)),
    };
    (simple, 2)
}

fn decode_unicode_escape(raw: &[u8]) -> (char, usize) {
    let unit = |at: usize| -> Option<u16> {
        let digits = raw.get(at..at + 4)?;
        digits
            .iter()
            .try_fold(0u16, |acc, &b| Some((acc << 4) | hex_value(b)?))
    };
    let Some(high) = unit(2) else {
        return (char::REPLACEMENT_CHARACTER, raw.len());
    };
    if (0xD800..=0xDBFF).contains(&high) {
        if let Some(low) = unit(8) {
            let code = 0x1_0000 + ((u32::from(high) - 0xD800) << 10) + (u32::from(low) - 0xDC00);
            return (char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER), 12);
        }
        return (char::REPLACEMENT_CHARACTER, 6);
    }
    (
        char::from_u32(u32::from(high)).unwrap_or(char::REPLACEMENT_CHARACTER),
        6,
    )
}

/// Compare raw string contents against expected decoded bytes without
/// allocating.
pub(crate) fn raw_string_eq(raw: &[u8], escaped: bool, expected: &[u8]) -> bool {
    if !escaped {
        return raw == expected;
    }
    let mut matcher = Matcher {
        expected,
        pos: 0,
        equal: true,
    };
    decode_string(raw, &mut matcher);
    matcher.equal && matcher.pos == expected.len()
}

struct Matcher<'e> {
    expected: &'e [u8],
    pos: usize,
    equal: bool,
}

impl Sink for Matcher<'_> {
    fn put(&mut self, bytes: &[u8]) {
        if !self.equal {
            return;
        }
        let end = self.pos + bytes.len();
        if self.expected.get(self.pos..end) == Some(bytes) {
            self.pos = end;
        } else {
            self.equal = false;
        }
    }
}

/// Append `text` as a quoted JSON string.
pub(crate) fn encode_string(text: &str, out: &mut Vec<u8>) {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    out.push(b'"');
    let bytes = text.as_bytes();
    let mut run_start = 0;
    for (pos, &byte) in bytes.iter().enumerate() {
        let escape: &[u8] = match byte {
            b'"' => b"\\\"",
            b'\\' => b"\\\\",
            b'\n' => b"\\n",
            b'\r' => b"\\r",
            b'\t' => b"\\t",
            0x08 => b"\\b",
            0x0c => b"\\f",
            0x00..=0x1f => {
                out.extend_from_slice(&bytes[run_start..pos]);
                out.extend_from_slice(b"\\u00");
                out.push(HEX[usize::from(byte >> 4)]);
                out.push(HEX[usize::from(byte & 0xf)]);
                run_start = pos + 1;
                continue;
            }
            _ => continue,
        };
        out.extend_from_slice(&bytes[run_start..pos]);
        out.extend_from_slice(escape);
        run_start = pos + 1;
    }
    out.extend_from_slice(&bytes[run_start..]);
    out.push(b'"');
}

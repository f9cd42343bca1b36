// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Parsed documents and the reserved identifier field.
//!
//! A [`Document`] keeps the exact wire bytes it was unmarshalled from next to
//! a span index over them. Reads resolve against the index; the only write,
//! [`Document::set_identifier`], splices new bytes in and leaves every
//! untouched region byte-for-byte intact.

use std::io;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::parse::{encode_string, raw_string_eq, Kind, ParseError, Tree};
use crate::pointer::{Pointer, Token};
use crate::pool::BufferPool;

/// Encoding of a document with no root value.
const NULL: &[u8] = b"null";

/// Most `null`s an identifier write pads a single array with.
pub const MAX_PADDING: usize = 1024;

/// Errors reading or writing the identifier field.
#[derive(Debug, Error)]
pub enum IdentifierError {
    /// Nothing exists at the identifier location.
    #[error("no identifier at {pointer}")]
    Missing {
        /// Identifier pointer text.
        pointer: String,
    },
    /// The location holds something other than a string.
    #[error("identifier at {pointer} is a {found}, not a string")]
    NotAString {
        /// Identifier pointer text.
        pointer: String,
        /// JSON type actually found.
        found: &'static str,
    },
    /// The string is not a UUID.
    #[error("identifier at {pointer} is not a UUID: {source}")]
    Invalid {
        /// Identifier pointer text.
        pointer: String,
        /// Underlying parse failure.
        #[source]
        source: uuid::Error,
    },
    /// The location cannot be created: the path runs through a non-null
    /// scalar, names a property inside an array, or needs more than
    /// [`MAX_PADDING`] `null`s to reach an index.
    #[error("identifier location {pointer} is unreachable in this document")]
    Unreachable {
        /// Identifier pointer text.
        pointer: String,
    },
    /// Rewritten bytes failed to re-parse. Indicates a bug in the splice.
    #[error("identifier write at {pointer} produced invalid JSON: {source}")]
    Rewrite {
        /// Identifier pointer text.
        pointer: String,
        /// Parse failure of the rewritten document.
        #[source]
        source: ParseError,
    },
}

/// A JSON document plus its reserved identifier location.
#[derive(Debug, Clone)]
pub struct Document {
    identifier: Arc<Pointer>,
    bytes: Vec<u8>,
    tree: Tree,
}

/// Result of walking a pointer as far as the document allows.
struct Walk {
    /// Deepest node reached; `None` for an empty document.
    node: Option<usize>,
    /// Tokens consumed to reach `node`.
    depth: usize,
}

impl Document {
    /// Create an empty document. It marshals as `null` and has no identifier.
    pub fn new(identifier: impl Into<Arc<Pointer>>) -> Self {
        Self {
            identifier: identifier.into(),
            bytes: Vec::new(),
            tree: Tree::default(),
        }
    }

    /// Create a document and unmarshal `bytes` into it.
    pub fn from_template(
        identifier: impl Into<Arc<Pointer>>,
        bytes: &[u8],
    ) -> Result<Self, ParseError> {
        let mut doc = Self::new(identifier);
        doc.unmarshal(bytes)?;
        Ok(doc)
    }

    /// Pointer to the reserved identifier location.
    pub fn identifier_pointer(&self) -> &Pointer {
        &self.identifier
    }

    /// Returns `true` when the document holds no value.
    pub fn is_empty(&self) -> bool {
        self.tree.root().is_none()
    }

    pub(crate) fn tree(&self) -> &Tree {
        &self.tree
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Replace the contents with the JSON text in `bytes`.
    ///
    /// On failure the document is left empty.
    pub fn unmarshal(&mut self, bytes: &[u8]) -> Result<(), ParseError> {
        self.bytes.clear();
        self.bytes.extend_from_slice(bytes);
        let parsed = self.tree.parse(&self.bytes);
        if parsed.is_err() {
            self.bytes.clear();
        }
        parsed
    }

    /// Encoded root value, or `null` for an empty document.
    pub fn as_bytes(&self) -> &[u8] {
        match self.tree.root() {
            Some(root) => &self.bytes[self.tree.node(root).span()],
            None => NULL,
        }
    }

    /// Write the encoding into `buf` if it fits. Always returns the number
    /// of bytes the encoding needs; a larger return than `buf.len()` means
    /// nothing was written.
    pub fn marshal_into(&self, buf: &mut [u8]) -> usize {
        let encoded = self.as_bytes();
        if let Some(dst) = buf.get_mut(..encoded.len()) {
            dst.copy_from_slice(encoded);
        }
        encoded.len()
    }

    /// Marshal through a pooled scratch buffer and write the result to
    /// `writer` in one call. Returns the number of bytes written.
    pub fn marshal_to<W: io::Write>(&self, writer: &mut W, pool: &BufferPool) -> io::Result<usize> {
        let mut buf = pool.acquire();
        loop {
            let needed = self.marshal_into(buf.as_mut_slice());
            if needed <= buf.len() {
                writer.write_all(&buf[..needed])?;
                return Ok(needed);
            }
            debug!(needed, capacity = buf.len(), "growing marshal buffer");
            buf.grow(needed);
        }
    }

    /// Encoding as an owned vector.
    pub fn to_vec(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    /// Member of object `object` named `name`. The last occurrence wins.
    fn member(&self, object: usize, name: &[u8]) -> Option<usize> {
        self.tree
            .children(object)
            .filter(|&child| {
                let node = self.tree.node(child);
                raw_string_eq(&self.bytes[node.key()], node.key_escaped, name)
            })
            .last()
    }

    /// Child of `node` addressed by `token`, if it exists.
    fn step(&self, node: usize, token: &Token) -> Option<usize> {
        match (self.tree.node(node).kind, token) {
            (Kind::Object, token) => self.member(node, token.property_name().as_bytes()),
            (Kind::Array, Token::Index(index)) => self.tree.children(node).nth(*index),
            _ => None,
        }
    }

    fn walk(&self, pointer: &Pointer) -> Walk {
        let Some(mut node) = self.tree.root() else {
            return Walk {
                node: None,
                depth: 0,
            };
        };
        let mut depth = 0;
        for token in pointer.tokens() {
            match self.step(node, token) {
                Some(child) => {
                    node = child;
                    depth += 1;
                }
                None => break,
            }
        }
        Walk {
            node: Some(node),
            depth,
        }
    }

    /// Read the identifier.
    pub fn get_identifier(&self) -> Result<Uuid, IdentifierError> {
        let pointer = &self.identifier;
        let walk = self.walk(pointer);
        let Some(index) = walk.node.filter(|_| walk.depth == pointer.len()) else {
            return Err(IdentifierError::Missing {
                pointer: pointer.to_string(),
            });
        };
        let node = self.tree.node(index);
        let Kind::String { escaped } = node.kind else {
            return Err(IdentifierError::NotAString {
                pointer: pointer.to_string(),
                found: kind_name(node.kind),
            });
        };
        let raw = &self.bytes[node.string_contents()];
        let parsed = if escaped {
            let mut decoded = Vec::with_capacity(raw.len());
            crate::parse::decode_string(raw, &mut decoded);
            Uuid::try_parse_ascii(&decoded)
        } else {
            Uuid::try_parse_ascii(raw)
        };
        parsed.map_err(|source| IdentifierError::Invalid {
            pointer: pointer.to_string(),
            source,
        })
    }

    /// Write the identifier as a lowercase hyphenated string, creating any
    /// missing structure along the way.
    ///
    /// Missing members are appended to the deepest existing object; a `null`
    /// (or an empty document) becomes a fresh object or array depending on
    /// the next token; array indices past the end pad with `null`, up to
    /// [`MAX_PADDING`] of them per array.
    pub fn set_identifier(&mut self, uuid: Uuid) -> Result<(), IdentifierError> {
        let pointer = Arc::clone(&self.identifier);
        let tokens = pointer.tokens();
        let unreachable = || IdentifierError::Unreachable {
            pointer: pointer.to_string(),
        };

        let mut text = [0u8; uuid::fmt::Hyphenated::LENGTH];
        let value = uuid.hyphenated().encode_lower(&mut text);
        let mut leaf = Vec::with_capacity(value.len() + 2);
        encode_string(value, &mut leaf);

        let walk = self.walk(&pointer);
        let (range, insert) = match walk.node {
            None => {
                if !padding_fits(tokens) {
                    return Err(unreachable());
                }
                let mut insert = Vec::new();
                build(tokens, &leaf, &mut insert);
                (0..self.bytes.len(), insert)
            }
            Some(index) => {
                let node = *self.tree.node(index);
                let rest = &tokens[walk.depth..];
                match (node.kind, rest.split_first()) {
                    (_, None) => (node.span(), leaf),
                    (Kind::Null, Some(_)) => {
                        if !padding_fits(rest) {
                            return Err(unreachable());
                        }
                        let mut insert = Vec::new();
                        build(rest, &leaf, &mut insert);
                        (node.span(), insert)
                    }
                    (Kind::Object, Some((token, deeper))) => {
                        if !padding_fits(deeper) {
                            return Err(unreachable());
                        }
                        let mut insert = Vec::new();
                        if node.len > 0 {
                            insert.push(b',');
                        }
                        encode_string(&token.property_name(), &mut insert);
                        insert.push(b':');
                        build(deeper, &leaf, &mut insert);
                        let close = node.end as usize - 1;
                        (close..close, insert)
                    }
                    (Kind::Array, Some((token, deeper))) => {
                        let padding = match token {
                            Token::Index(index) => index.saturating_sub(node.len as usize),
                            Token::NextIndex => 0,
                            Token::Property(_) => return Err(unreachable()),
                        };
                        if padding > MAX_PADDING || !padding_fits(deeper) {
                            return Err(unreachable());
                        }
                        let mut insert = Vec::new();
                        let mut first = node.len == 0;
                        for _ in 0..padding {
                            if !first {
                                insert.push(b',');
                            }
                            insert.extend_from_slice(NULL);
                            first = false;
                        }
                        if !first {
                            insert.push(b',');
                        }
                        build(deeper, &leaf, &mut insert);
                        let close = node.end as usize - 1;
                        (close..close, insert)
                    }
                    _ => return Err(unreachable()),
                }
            }
        };

        let mut rewritten = Vec::with_capacity(self.bytes.len() + insert.len());
        rewritten.extend_from_slice(&self.bytes[..range.start]);
        rewritten.extend_from_slice(&insert);
        rewritten.extend_from_slice(&self.bytes[range.end..]);

        let mut tree = Tree::default();
        tree.parse(&rewritten)
            .map_err(|source| IdentifierError::Rewrite {
                pointer: pointer.to_string(),
                source,
            })?;
        self.bytes = rewritten;
        self.tree = tree;
        Ok(())
    }

    /// A new document holding only this document's identifier.
    pub fn new_acknowledgement(&self) -> Result<Document, IdentifierError> {
        let uuid = self.get_identifier()?;
        let mut ack = Document::new(Arc::clone(&self.identifier));
        ack.set_identifier(uuid)?;
        Ok(ack)
    }

    /// A copy of `template` with this document's identifier written into it.
    pub fn new_acknowledgement_from(&self, template: &Document) -> Result<Document, IdentifierError> {
        let uuid = self.get_identifier()?;
        let mut ack = Document {
            identifier: Arc::clone(&self.identifier),
            bytes: template.bytes.clone(),
            tree: template.tree.clone(),
        };
        ack.set_identifier(uuid)?;
        Ok(ack)
    }
}

/// Whether [`build`] stays within [`MAX_PADDING`] for `tokens`.
fn padding_fits(tokens: &[Token]) -> bool {
    tokens
        .iter()
        .all(|token| !matches!(token, Token::Index(index) if *index > MAX_PADDING))
}

/// Encode fresh structure holding `leaf` at `tokens`.
fn build(tokens: &[Token], leaf: &[u8], out: &mut Vec<u8>) {
    let Some((token, rest)) = tokens.split_first() else {
        out.extend_from_slice(leaf);
        return;
    };
    match token {
        Token::Property(name) => {
            out.push(b'{');
            encode_string(name, out);
            out.push(b':');
            build(rest, leaf, out);
            out.push(b'}');
        }
        Token::Index(index) => {
            out.push(b'[');
            for _ in 0..*index {
                out.extend_from_slice(NULL);
                out.push(b',');
            }
            build(rest, leaf, out);
            out.push(b']');
        }
        Token::NextIndex => {
            out.push(b'[');
            build(rest, leaf, out);
            out.push(b']');
        }
    }
}

fn kind_name(kind: Kind) -> &'static str {
    match kind {
        Kind::Null => "null",
        Kind::Bool(_) => "boolean",
        Kind::Unsigned(_) | Kind::Signed(_) | Kind::Float(_) => "number",
        Kind::String { .. } => "string",
        Kind::Object => "object",
        Kind::Array => "array",
    }
}

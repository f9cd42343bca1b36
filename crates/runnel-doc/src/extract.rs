// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Multi-pointer extraction.
//!
//! An [`Extractor`] compiles an ordered pointer list into a prefix trie so
//! pointers sharing a prefix share the walk to it. Every pointer is resolved
//! in one traversal of the document.
//!
//! Variable-length results (strings, objects, arrays) are copied into a
//! caller-supplied scratch buffer. [`Extractor::extract_fields`] is a single
//! attempt that writes nothing unless everything fits and reports how much
//! room it needed;
//! [`Extractor::extract`] and [`Extractor::extract_pooled`] wrap it in the
//! grow-and-retry loop.

use tracing::debug;

use crate::document::Document;
use crate::hash::hash_values;
use crate::parse::{decode_string, Kind, Node, Sink, Tree};
use crate::pointer::{Pointer, Token};
use crate::pool::{grow_to, BufferPool, PooledBuffer};
use crate::value::TypedValue;

/// Byte range of a variable-length result inside the scratch buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// First byte.
    pub begin: usize,
    /// One past the last byte.
    pub end: usize,
}

/// Fixed-size record of one extraction result.
///
/// Variable-length payloads are stored as [`Span`]s into the scratch buffer
/// the extraction wrote; [`Field::resolve`] turns a record back into a
/// [`TypedValue`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Field {
    /// No such location.
    #[default]
    Absent,
    /// JSON `null`.
    Null,
    /// Boolean.
    Bool(bool),
    /// Non-negative integer.
    Unsigned(u64),
    /// Negative integer.
    Signed(i64),
    /// Any other number.
    Float(f64),
    /// Decoded string contents.
    String(Span),
    /// Encoded object.
    Object(Span),
    /// Encoded array.
    Array(Span),
}

impl Field {
    /// View this record against the scratch buffer it was extracted into.
    ///
    /// # Panics
    /// If a span lies outside `scratch`, i.e. the extraction reported a
    /// larger size than `scratch` holds.
    pub fn resolve<'b>(&self, scratch: &'b [u8]) -> TypedValue<'b> {
        let bytes = |span: &Span| &scratch[span.begin..span.end];
        match self {
            Self::Absent => TypedValue::Absent,
            Self::Null => TypedValue::Null,
            Self::Bool(b) => TypedValue::Bool(*b),
            Self::Unsigned(n) => TypedValue::Unsigned(*n),
            Self::Signed(n) => TypedValue::Signed(*n),
            Self::Float(f) => TypedValue::Float(*f),
            Self::String(span) => TypedValue::String(bytes(span)),
            Self::Object(span) => TypedValue::Object(bytes(span)),
            Self::Array(span) => TypedValue::Array(bytes(span)),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct TrieNode {
    /// Member-name edges sorted by name. `Index` tokens appear here too,
    /// under their decimal text.
    properties: Vec<(String, usize)>,
    /// Array-index edges sorted by index.
    indices: Vec<(usize, usize)>,
    /// Output slots whose pointer ends here.
    terminals: Vec<usize>,
    /// Every output slot at or below this node.
    slots: Vec<usize>,
}

/// Compiled set of pointers resolved together.
#[derive(Debug, Clone)]
pub struct Extractor {
    pointers: Vec<Pointer>,
    trie: Vec<TrieNode>,
}

impl Extractor {
    /// Compile `pointers`. Results are reported in this order; duplicates
    /// each get their own result.
    pub fn new(pointers: Vec<Pointer>) -> Self {
        let mut edges: Vec<Vec<(Token, usize)>> = vec![Vec::new()];
        let mut trie = vec![TrieNode::default()];
        for (slot, pointer) in pointers.iter().enumerate() {
            let mut at = 0;
            trie[at].slots.push(slot);
            for token in pointer.tokens() {
                let existing = edges[at].iter().find(|(t, _)| t == token).map(|&(_, n)| n);
                at = match existing {
                    Some(next) => next,
                    None => {
                        let next = trie.len();
                        trie.push(TrieNode::default());
                        edges.push(Vec::new());
                        edges[at].push((token.clone(), next));
                        next
                    }
                };
                trie[at].slots.push(slot);
            }
            trie[at].terminals.push(slot);
        }

        for (node, out) in trie.iter_mut().zip(edges) {
            for (token, next) in out {
                if let Token::Index(index) = token {
                    node.indices.push((index, next));
                }
                node.properties.push((token.property_name().into_owned(), next));
            }
            node.properties.sort_by(|a, b| a.0.cmp(&b.0));
            node.indices.sort_unstable();
        }
        Self { pointers, trie }
    }

    /// The compiled pointers, in result order.
    pub fn pointers(&self) -> &[Pointer] {
        &self.pointers
    }

    /// Number of results each extraction produces.
    pub fn len(&self) -> usize {
        self.pointers.len()
    }

    /// Returns `true` if there are no pointers.
    pub fn is_empty(&self) -> bool {
        self.pointers.is_empty()
    }

    /// One extraction attempt.
    ///
    /// Fills `fields` (one per pointer) and copies variable-length payloads
    /// into `scratch`. Returns the number of scratch bytes the payloads
    /// need. If that exceeds `scratch.len()`, `scratch` is left untouched
    /// and the spans in `fields` must not be resolved; grow the buffer and
    /// try again.
    ///
    /// Only the payloads of final results are counted: a value shadowed by
    /// a later duplicate key takes no room.
    ///
    /// # Panics
    /// If `fields.len()` differs from [`len`](Extractor::len).
    pub fn extract_fields(&self, doc: &Document, fields: &mut [Field], scratch: &mut [u8]) -> usize {
        assert_eq!(
            fields.len(),
            self.pointers.len(),
            "one field slot per pointer"
        );
        fields.fill(Field::Absent);
        let Some(root) = doc.tree().root() else {
            return 0;
        };
        if self.pointers.is_empty() {
            return 0;
        }
        let (tree, bytes) = (doc.tree(), doc.bytes());
        let mut found = vec![None; self.pointers.len()];
        Pass {
            trie: &self.trie,
            tree,
            doc: bytes,
            found: &mut found,
            key: Vec::new(),
        }
        .visit(0, root);

        // Lay out payloads first; duplicate pointers share one copy.
        let mut needed = 0;
        for (slot, at) in found.iter().enumerate() {
            let Some(index) = *at else { continue };
            fields[slot] = match found[..slot].iter().position(|earlier| *earlier == *at) {
                Some(earlier) => fields[earlier],
                None => layout(tree.node(index), bytes, &mut needed),
            };
        }
        if needed > scratch.len() {
            return needed;
        }
        for (slot, at) in found.iter().enumerate() {
            let Some(index) = *at else { continue };
            if found[..slot].contains(at) {
                continue;
            }
            if let Field::String(span) | Field::Object(span) | Field::Array(span) = fields[slot] {
                copy_payload(tree.node(index), bytes, &mut scratch[span.begin..span.end]);
            }
        }
        needed
    }

    /// Extract into a caller-owned buffer, growing it until everything fits.
    ///
    /// The buffer's length is its usable capacity. On overflow it is resized
    /// to the next power of two at or above the reported size and the
    /// attempt is repeated.
    pub fn extract<'b>(&self, doc: &Document, scratch: &'b mut Vec<u8>) -> Vec<TypedValue<'b>> {
        let mut fields = vec![Field::Absent; self.pointers.len()];
        loop {
            let needed = self.extract_fields(doc, &mut fields, scratch);
            if needed <= scratch.len() {
                break;
            }
            let grown = grow_to(needed);
            debug!(needed, grown, "growing extraction buffer");
            scratch.clear();
            scratch.resize(grown, 0);
        }
        let scratch: &'b [u8] = scratch;
        fields.iter().map(|field| field.resolve(scratch)).collect()
    }

    /// Extract into a buffer drawn from `pool`. The buffer returns to the
    /// pool when the [`Extracted`] is dropped.
    pub fn extract_pooled<'p>(&self, doc: &Document, pool: &'p BufferPool) -> Extracted<'p> {
        let mut buf = pool.acquire();
        let mut fields = vec![Field::Absent; self.pointers.len()];
        loop {
            let needed = self.extract_fields(doc, &mut fields, buf.as_mut_slice());
            if needed <= buf.len() {
                break;
            }
            debug!(needed, capacity = buf.len(), "growing pooled extraction buffer");
            buf.grow(needed);
        }
        Extracted { buf, fields }
    }

    /// Fingerprint of the values at every pointer, in order.
    pub fn hash_fields(&self, doc: &Document, pool: &BufferPool) -> u64 {
        self.extract_pooled(doc, pool).hash()
    }
}

/// Results of [`Extractor::extract_pooled`], owning their scratch buffer.
#[derive(Debug)]
pub struct Extracted<'p> {
    buf: PooledBuffer<'p>,
    fields: Vec<Field>,
}

impl Extracted<'_> {
    /// Number of results.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if there are no results.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Result `index`, in pointer order.
    pub fn get(&self, index: usize) -> Option<TypedValue<'_>> {
        self.fields.get(index).map(|field| field.resolve(&self.buf))
    }

    /// All results in pointer order.
    pub fn iter(&self) -> impl Iterator<Item = TypedValue<'_>> + '_ {
        self.fields.iter().map(|field| field.resolve(&self.buf))
    }

    /// Fingerprint of all results. See [`hash_values`].
    pub fn hash(&self) -> u64 {
        hash_values(self.iter())
    }
}

/// Sink that only measures.
struct Counter(usize);

impl Sink for Counter {
    fn put(&mut self, bytes: &[u8]) {
        self.0 += bytes.len();
    }
}

/// Sink over a slice already sized to hold everything put into it.
struct Filler<'b> {
    buf: &'b mut [u8],
    at: usize,
}

impl Sink for Filler<'_> {
    fn put(&mut self, bytes: &[u8]) {
        let end = self.at + bytes.len();
        if let Some(dst) = self.buf.get_mut(self.at..end) {
            dst.copy_from_slice(bytes);
        }
        self.at = end;
    }
}

/// Field for `node`, reserving room for its payload at `*needed`.
fn layout(node: &Node, doc: &[u8], needed: &mut usize) -> Field {
    let begin = *needed;
    let len = match node.kind {
        Kind::Null => return Field::Null,
        Kind::Bool(b) => return Field::Bool(b),
        Kind::Unsigned(n) => return Field::Unsigned(n),
        Kind::Signed(n) => return Field::Signed(n),
        Kind::Float(f) => return Field::Float(f),
        Kind::String { escaped: true } => {
            let mut counter = Counter(0);
            decode_string(&doc[node.string_contents()], &mut counter);
            counter.0
        }
        Kind::String { escaped: false } => node.string_contents().len(),
        Kind::Object | Kind::Array => node.span().len(),
    };
    *needed += len;
    let span = Span {
        begin,
        end: *needed,
    };
    match node.kind {
        Kind::Object => Field::Object(span),
        Kind::Array => Field::Array(span),
        _ => Field::String(span),
    }
}

/// Write `node`'s payload into `dst`, which [`layout`] sized for it.
fn copy_payload(node: &Node, doc: &[u8], dst: &mut [u8]) {
    let mut out = Filler { buf: dst, at: 0 };
    match node.kind {
        Kind::String { escaped: true } => decode_string(&doc[node.string_contents()], &mut out),
        Kind::String { escaped: false } => out.put(&doc[node.string_contents()]),
        Kind::Object | Kind::Array => out.put(&doc[node.span()]),
        _ => {}
    }
}

/// One traversal resolving every pointer to an arena index.
struct Pass<'a> {
    trie: &'a [TrieNode],
    tree: &'a Tree,
    doc: &'a [u8],
    found: &'a mut [Option<usize>],
    /// Decoded form of the current member key, when it had escapes.
    key: Vec<u8>,
}

impl Pass<'_> {
    fn visit(&mut self, at: usize, index: usize) {
        let (tries, tree, doc) = (self.trie, self.tree, self.doc);
        let trie = &tries[at];
        for &slot in &trie.terminals {
            self.found[slot] = Some(index);
        }
        match tree.node(index).kind {
            Kind::Object if !trie.properties.is_empty() => {
                for child in tree.children(index) {
                    let member = tree.node(child);
                    let raw = &doc[member.key()];
                    let name = if member.key_escaped {
                        self.key.clear();
                        decode_string(raw, &mut self.key);
                        self.key.as_slice()
                    } else {
                        raw
                    };
                    let Ok(pos) = trie
                        .properties
                        .binary_search_by(|(edge, _)| edge.as_bytes().cmp(name))
                    else {
                        continue;
                    };
                    let next = trie.properties[pos].1;
                    // A later duplicate key replaces everything an earlier one set.
                    for &slot in &tries[next].slots {
                        self.found[slot] = None;
                    }
                    self.visit(next, child);
                }
            }
            Kind::Array if !trie.indices.is_empty() => {
                let last = trie.indices[trie.indices.len() - 1].0;
                for (position, child) in tree.children(index).enumerate() {
                    if position > last {
                        break;
                    }
                    if let Ok(pos) = trie.indices.binary_search_by_key(&position, |&(i, _)| i) {
                        self.visit(trie.indices[pos].1, child);
                    }
                }
            }
            _ => {}
        }
    }
}

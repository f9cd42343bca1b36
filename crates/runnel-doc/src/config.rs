// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Collection configuration and its compiled runtime form.

use std::io;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::document::{Document, IdentifierError};
use crate::extract::{Extracted, Extractor};
use crate::parse::ParseError;
use crate::pointer::Pointer;
use crate::pool::{BufferPool, DEFAULT_BUFFER_CAPACITY, DEFAULT_MAX_RETAINED};

/// Error type for loading and compiling collection configs.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config (or its ack template) failed to (de)serialize.
    #[error("config json: {0}")]
    Json(#[from] serde_json::Error),
    /// The ack template did not parse as a document.
    #[error("ack template: {0}")]
    Template(#[from] ParseError),
}

/// Declarative description of one stream of documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectionConfig {
    /// Location of each document's UUID.
    pub uuid_ptr: Pointer,
    /// Pointers whose values form the document key, in order.
    #[serde(default)]
    pub key_ptrs: Vec<Pointer>,
    /// Document that acknowledgements start from. When unset,
    /// acknowledgements hold only the UUID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack_json_template: Option<serde_json::Value>,
    /// Size of freshly allocated scratch buffers.
    #[serde(default = "default_scratch_capacity")]
    pub scratch_capacity: usize,
    /// Idle scratch buffers kept for reuse.
    #[serde(default = "default_max_pooled_buffers")]
    pub max_pooled_buffers: usize,
}

fn default_scratch_capacity() -> usize {
    DEFAULT_BUFFER_CAPACITY
}

fn default_max_pooled_buffers() -> usize {
    DEFAULT_MAX_RETAINED
}

impl CollectionConfig {
    /// Config with the given UUID pointer and defaults elsewhere.
    pub fn new(uuid_ptr: Pointer) -> Self {
        Self {
            uuid_ptr,
            key_ptrs: Vec::new(),
            ack_json_template: None,
            scratch_capacity: default_scratch_capacity(),
            max_pooled_buffers: default_max_pooled_buffers(),
        }
    }

    /// Deserialize from JSON.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, ConfigError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Compiled [`CollectionConfig`]: shared pointers, key extractor, ack
/// template and scratch pool. Immutable and shareable across threads.
#[derive(Debug)]
pub struct Collection {
    uuid_ptr: Arc<Pointer>,
    key: Extractor,
    ack_template: Option<Document>,
    pool: BufferPool,
}

impl Collection {
    /// Compile `config`.
    pub fn compile(config: &CollectionConfig) -> Result<Self, ConfigError> {
        let uuid_ptr = Arc::new(config.uuid_ptr.clone());
        let ack_template = match &config.ack_json_template {
            Some(value) => {
                let bytes = serde_json::to_vec(value)?;
                Some(Document::from_template(Arc::clone(&uuid_ptr), &bytes)?)
            }
            None => None,
        };
        debug!(
            uuid_ptr = %config.uuid_ptr,
            key_ptrs = config.key_ptrs.len(),
            ack_template = ack_template.is_some(),
            "compiled collection"
        );
        Ok(Self {
            uuid_ptr,
            key: Extractor::new(config.key_ptrs.clone()),
            ack_template,
            pool: BufferPool::with_limits(config.scratch_capacity, config.max_pooled_buffers),
        })
    }

    /// Location of each document's UUID.
    pub fn identifier_pointer(&self) -> &Pointer {
        &self.uuid_ptr
    }

    /// Extractor over the key pointers.
    pub fn key(&self) -> &Extractor {
        &self.key
    }

    /// Scratch pool used by this collection's operations.
    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    /// An empty document of this collection.
    pub fn new_document(&self) -> Document {
        Document::new(Arc::clone(&self.uuid_ptr))
    }

    /// Parse wire bytes into a document of this collection.
    pub fn parse_document(&self, bytes: &[u8]) -> Result<Document, ParseError> {
        Document::from_template(Arc::clone(&self.uuid_ptr), bytes)
    }

    /// Key values of `doc`, in key pointer order.
    pub fn extract_key(&self, doc: &Document) -> Extracted<'_> {
        self.key.extract_pooled(doc, &self.pool)
    }

    /// Fingerprint of `doc`'s key.
    pub fn key_hash(&self, doc: &Document) -> u64 {
        self.key.hash_fields(doc, &self.pool)
    }

    /// Acknowledgement for `doc`, built from the ack template when one is
    /// configured.
    pub fn new_acknowledgement(&self, doc: &Document) -> Result<Document, IdentifierError> {
        match &self.ack_template {
            Some(template) => doc.new_acknowledgement_from(template),
            None => doc.new_acknowledgement(),
        }
    }

    /// Write `doc` to `writer` through this collection's pool.
    pub fn marshal_to<W: io::Write>(&self, doc: &Document, writer: &mut W) -> io::Result<usize> {
        doc.marshal_to(writer, &self.pool)
    }
}

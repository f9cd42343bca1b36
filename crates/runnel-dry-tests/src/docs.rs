// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Document builders.
//!
//! Fixtures are written as `serde_json` values (usually via `json!`) and
//! encoded into [`Document`]s, so tests can compare results semantically.

use runnel_doc::{Document, IdentifierError, ParseError, Pointer, Token, Uuid};
use serde_json::Value;
use thiserror::Error;

/// Failure building a fixture document.
#[derive(Debug, Error)]
pub enum FixtureError {
    /// The value could not be encoded.
    #[error("encode: {0}")]
    Encode(#[from] serde_json::Error),
    /// The encoded value did not parse.
    #[error("parse: {0}")]
    Parse(#[from] ParseError),
    /// The identifier could not be written.
    #[error("identifier: {0}")]
    Identifier(#[from] IdentifierError),
}

/// The conventional `/_meta/uuid` identifier pointer.
pub fn meta_uuid_pointer() -> Pointer {
    Pointer::from_tokens(vec![
        Token::Property("_meta".to_owned()),
        Token::Property("uuid".to_owned()),
    ])
}

/// Builder for fixture documents.
///
/// # Example
///
/// ```
/// use runnel_dry_tests::{DocumentBuilder, FIXTURE_UUID};
///
/// let doc = DocumentBuilder::meta()
///     .body(serde_json::json!({"a": {"b": 1}}))
///     .uuid(FIXTURE_UUID)
///     .build()
///     .unwrap();
/// assert_eq!(doc.get_identifier().unwrap(), FIXTURE_UUID);
/// ```
#[derive(Debug, Clone)]
pub struct DocumentBuilder {
    uuid_ptr: Pointer,
    body: Value,
    uuid: Option<Uuid>,
}

impl DocumentBuilder {
    /// Builder for documents whose identifier lives at `uuid_ptr`. The body
    /// starts as an empty object.
    pub fn new(uuid_ptr: Pointer) -> Self {
        Self {
            uuid_ptr,
            body: Value::Object(serde_json::Map::new()),
            uuid: None,
        }
    }

    /// Builder using [`meta_uuid_pointer`].
    pub fn meta() -> Self {
        Self::new(meta_uuid_pointer())
    }

    /// Replace the body.
    pub fn body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    /// Stamp the built document with `uuid`.
    pub fn uuid(mut self, uuid: Uuid) -> Self {
        self.uuid = Some(uuid);
        self
    }

    /// Encode the body and parse it into a document.
    pub fn build(self) -> Result<Document, FixtureError> {
        let bytes = serde_json::to_vec(&self.body)?;
        let mut doc = Document::from_template(self.uuid_ptr, &bytes)?;
        if let Some(uuid) = self.uuid {
            doc.set_identifier(uuid)?;
        }
        Ok(doc)
    }
}

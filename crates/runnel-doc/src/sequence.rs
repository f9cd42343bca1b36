// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Sequencing seam between documents and the transport.
//!
//! The transport (a journal-based log) sequences messages by their UUID and
//! asks each message type for acknowledgements. [`Message`] is the whole of
//! that contract; [`Document`] implements it. The UUID's 16 bytes are carried
//! verbatim; only text conversion happens here.

use std::fmt;

use uuid::Uuid;

use crate::document::{Document, IdentifierError};

/// Opaque name of the journal (log partition) a message travels on.
///
/// Passed through to acknowledgement construction and never interpreted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Journal(String);

impl Journal {
    /// Wrap a journal name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The journal name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Journal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Journal {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Journal {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// A message the transport can sequence and acknowledge.
pub trait Message: Sized + Send {
    /// Failure reading or writing the identifier.
    type Error: std::error::Error + Send + Sync + 'static;

    /// The message's sequencing UUID.
    fn uuid(&self) -> Result<Uuid, Self::Error>;

    /// Stamp the message with `uuid`.
    fn set_uuid(&mut self, uuid: Uuid) -> Result<(), Self::Error>;

    /// A new acknowledgement message for this message, destined for
    /// `journal`.
    fn new_acknowledgement(&self, journal: &Journal) -> Result<Self, Self::Error>;
}

impl Message for Document {
    type Error = IdentifierError;

    fn uuid(&self) -> Result<Uuid, IdentifierError> {
        self.get_identifier()
    }

    fn set_uuid(&mut self, uuid: Uuid) -> Result<(), IdentifierError> {
        self.set_identifier(uuid)
    }

    fn new_acknowledgement(&self, _journal: &Journal) -> Result<Self, IdentifierError> {
        Document::new_acknowledgement(self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::pointer::Pointer;

    fn stamp<M: Message>(message: &mut M, uuid: Uuid) -> M {
        message.set_uuid(uuid).unwrap();
        message.new_acknowledgement(&Journal::new("a/journal")).unwrap()
    }

    #[test]
    fn document_sequences_through_the_trait() {
        let uuid = Uuid::from_bytes([
            0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd,
            0xee, 0xff,
        ]);
        let mut doc = Document::from_template(
            Pointer::compile("/_meta/uuid").unwrap(),
            br#"{"v":1}"#,
        )
        .unwrap();
        let ack = stamp(&mut doc, uuid);
        assert_eq!(Message::uuid(&doc).unwrap(), uuid);
        assert_eq!(Message::uuid(&ack).unwrap().as_bytes(), uuid.as_bytes());
        assert_eq!(
            ack.to_vec(),
            br#"{"_meta":{"uuid":"00112233-4455-6677-8899-aabbccddeeff"}}"#
        );
    }

    #[test]
    fn journal_is_opaque_text() {
        let journal = Journal::from("acmeCo/anvils/pivot=00");
        assert_eq!(journal.as_str(), "acmeCo/anvils/pivot=00");
        assert_eq!(journal.to_string(), journal.as_str());
        assert_eq!(journal, Journal::new(String::from(journal.as_str())));
    }
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Document core for a streaming JSON pipeline.
//!
//! `runnel-doc` holds each message as its original wire bytes plus a span
//! index, and answers the questions a pipeline stage asks of it:
//!
//! - where is the value at this JSON Pointer ([`Pointer`], [`Extractor`]);
//! - what is the 64-bit fingerprint of these key values ([`hash_values`]);
//! - what is this message's sequencing UUID, and what acknowledges it
//!   ([`Document::get_identifier`], [`Message`]);
//! - what bytes go back on the wire ([`Document::marshal_into`]).
//!
//! # Scratch buffers
//!
//! Operations that produce variable-length output write into a caller-owned
//! buffer and report how many bytes they needed. The convenience wrappers
//! retry with a larger buffer (next power of two) until the output fits.
//! Buffers can come from an injected [`BufferPool`]; a [`Collection`] owns one.
//!
//! # Determinism
//!
//! Extraction results follow pointer order and [`hash_values`] is stable across
//! processes. Duplicate object keys resolve to their last occurrence.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::module_name_repetitions,
    clippy::use_self
)]

mod config;
mod document;
mod extract;
mod hash;
mod parse;
mod pointer;
mod pool;
mod sequence;
mod value;

pub use config::{Collection, CollectionConfig, ConfigError};
pub use document::{Document, IdentifierError, MAX_PADDING};
pub use extract::{Extracted, Extractor, Field, Span};
pub use hash::{hash_values, EMPTY_HASH};
pub use parse::{ParseError, ParseErrorKind, MAX_DEPTH};
pub use pointer::{MalformedReason, Pointer, PointerError, Token};
pub use pool::{grow_to, BufferPool, PooledBuffer, DEFAULT_BUFFER_CAPACITY, DEFAULT_MAX_RETAINED};
pub use sequence::{Journal, Message};
pub use uuid::Uuid;
pub use value::TypedValue;

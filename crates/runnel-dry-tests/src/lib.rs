// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared fixtures for runnel crates.
#![forbid(unsafe_code)]
//!
//! # Modules
//!
//! - [`ids`] - Fixture UUIDs with recognizable bit patterns
//! - [`docs`] - Document builders over `serde_json` values
//! - [`strategies`] - proptest strategies for JSON values, document text and pointers

pub mod docs;
pub mod ids;
pub mod strategies;

pub use docs::{meta_uuid_pointer, DocumentBuilder, FixtureError};
pub use ids::{fixture_uuid, FIXTURE_UUID};
pub use strategies::{
    json_document, json_key, json_leaf, json_value, pointer, raw_document, raw_key, raw_leaf,
    raw_value,
};

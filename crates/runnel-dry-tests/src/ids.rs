// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Fixture UUIDs.

use runnel_doc::Uuid;

/// Default fixture identifier.
pub const FIXTURE_UUID: Uuid = Uuid::from_u128(0x0f1e2d3c_4b5a_6978_8796_a5b4c3d2e1f0);

const FIXTURE_HIGH: u64 = 0x5eed_0000_0000_4000;

/// Distinct identifier number `seq`. The high half is fixed so fixtures are
/// easy to spot in failure output.
pub const fn fixture_uuid(seq: u64) -> Uuid {
    Uuid::from_u64_pair(FIXTURE_HIGH, 0x8000_0000_0000_0000 | seq)
}

//! # voterlink-types
//!
//! Shared domain types used across the voterlink workspace.
//! Field names serialize in camelCase so the JSON shape matches what the
//! web frontend reads, and every exported type has a TypeScript binding.

pub mod events;
pub mod user;
pub mod voter;

pub use user::PlatformUser;
pub use voter::{
    Address, Demographics, Gender, NewVoter, RegistrationStatus, VoterPatch, VoterRecord,
};

/// Locally-assigned record identifier.
pub type RecordId = i64;

/// Identifier of a user on the hosting messaging platform.
pub type PlatformUserId = i64;

/// Unix epoch milliseconds.
pub type Millis = u64;

/// Error returned when a stored enum tag is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

//! Voter registry structures.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Millis, PlatformUserId, RecordId, UnknownVariant};

/// Registration state of a voter.
///
/// Only [`RegistrationStatus::Verified`] voters may be surveyed. No
/// transition rules are enforced between the other states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Registered,
    Pending,
    Verified,
    Inactive,
}

impl RegistrationStatus {
    pub const ALL: [RegistrationStatus; 4] = [
        RegistrationStatus::Registered,
        RegistrationStatus::Pending,
        RegistrationStatus::Verified,
        RegistrationStatus::Inactive,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RegistrationStatus::Registered => "registered",
            RegistrationStatus::Pending => "pending",
            RegistrationStatus::Verified => "verified",
            RegistrationStatus::Inactive => "inactive",
        }
    }

    /// Whether a survey may be started for a voter in this state.
    pub fn allows_survey(self) -> bool {
        self == RegistrationStatus::Verified
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegistrationStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RegistrationStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "registration status",
                value: s.to_string(),
            })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "kebab-case")]
pub enum Gender {
    Male,
    Female,
    Other,
    PreferNotToSay,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
            Gender::PreferNotToSay => "prefer-not-to-say",
        }
    }
}

impl FromStr for Gender {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            "prefer-not-to-say" => Ok(Gender::PreferNotToSay),
            _ => Err(UnknownVariant {
                kind: "gender",
                value: s.to_string(),
            }),
        }
    }
}

/// Postal address of a voter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    pub ward: String,
    pub district: String,
    pub constituency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pincode: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Demographics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education: Option<String>,
}

impl Demographics {
    pub fn is_empty(&self) -> bool {
        self == &Demographics::default()
    }
}

/// A voter as held in a constituency store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct VoterRecord {
    #[ts(type = "number")]
    pub id: RecordId,
    /// Externally-issued voter identifier, unique per constituency.
    pub voter_id: String,
    pub first_name: String,
    pub last_name: String,
    /// Always `full_name(first_name, last_name)`.
    pub full_name: String,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub address: Address,
    pub demographics: Option<Demographics>,
    pub registration_status: RegistrationStatus,
    #[ts(type = "number | null")]
    pub telegram_user_id: Option<PlatformUserId>,
    #[ts(type = "number")]
    pub created_at: Millis,
    #[ts(type = "number")]
    pub updated_at: Millis,
    pub synced: bool,
    #[ts(type = "number | null")]
    pub last_synced_at: Option<Millis>,
}

impl VoterRecord {
    pub fn can_start_survey(&self) -> bool {
        self.registration_status.allows_survey()
    }
}

/// Payload for adding a voter. The store assigns id, derived name,
/// timestamps and the sync flag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewVoter {
    pub voter_id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub address: Address,
    #[serde(default)]
    pub demographics: Option<Demographics>,
    pub registration_status: RegistrationStatus,
    #[serde(default)]
    #[ts(type = "number | null")]
    pub telegram_user_id: Option<PlatformUserId>,
}

impl NewVoter {
    /// Minimal voter in the given ward/district; other fields empty.
    pub fn new(
        voter_id: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        address: Address,
        registration_status: RegistrationStatus,
    ) -> Self {
        Self {
            voter_id: voter_id.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            phone_number: None,
            email: None,
            address,
            demographics: None,
            registration_status,
            telegram_user_id: None,
        }
    }
}

/// Partial update. `None` leaves the stored value untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct VoterPatch {
    #[serde(default)]
    pub voter_id: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub demographics: Option<Demographics>,
    #[serde(default)]
    pub registration_status: Option<RegistrationStatus>,
    #[serde(default)]
    #[ts(type = "number | null")]
    pub telegram_user_id: Option<PlatformUserId>,
}

impl VoterPatch {
    pub fn touches_name(&self) -> bool {
        self.first_name.is_some() || self.last_name.is_some()
    }
}

/// Display name derived from first and last name.
pub fn full_name(first_name: &str, last_name: &str) -> String {
    format!("{first_name} {last_name}").trim().to_string()
}

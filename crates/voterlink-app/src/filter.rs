//! In-memory filtering for list views.
//!
//! Meant for the few hundred records a field agent carries; there is no
//! pagination or indexing.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use voterlink_types::{RegistrationStatus, VoterRecord};

/// Criteria from the list view. Blank strings and `None` are inactive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoterFilter {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub ward: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub status: Option<RegistrationStatus>,
}

impl VoterFilter {
    pub fn query(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn status(status: RegistrationStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Whether any criterion is active.
    pub fn is_active(&self) -> bool {
        !self.query.trim().is_empty()
            || active(&self.ward).is_some()
            || active(&self.district).is_some()
            || self.status.is_some()
    }

    /// True when `voter` satisfies every active criterion.
    pub fn matches(&self, voter: &VoterRecord) -> bool {
        let query = self.query.trim();
        if !query.is_empty() && !text_matches(voter, &query.to_lowercase()) {
            return false;
        }
        if let Some(ward) = active(&self.ward) {
            if voter.address.ward != ward {
                return false;
            }
        }
        if let Some(district) = active(&self.district) {
            if voter.address.district != district {
                return false;
            }
        }
        if let Some(status) = self.status {
            if voter.registration_status != status {
                return false;
            }
        }
        true
    }

    /// Matching voters in their original order.
    pub fn apply(&self, voters: &[VoterRecord]) -> Vec<VoterRecord> {
        voters.iter().filter(|v| self.matches(v)).cloned().collect()
    }
}

fn active(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// `needle` must already be lowercase.
fn text_matches(voter: &VoterRecord, needle: &str) -> bool {
    let fields = [
        Some(voter.full_name.as_str()),
        Some(voter.first_name.as_str()),
        Some(voter.last_name.as_str()),
        Some(voter.voter_id.as_str()),
        voter.phone_number.as_deref(),
    ];
    fields
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(needle))
}

/// Sorted, de-duplicated ward names for a picker.
pub fn distinct_wards(voters: &[VoterRecord]) -> Vec<String> {
    voters
        .iter()
        .map(|v| v.address.ward.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Sorted, de-duplicated district names for a picker.
pub fn distinct_districts(voters: &[VoterRecord]) -> Vec<String> {
    voters
        .iter()
        .map(|v| v.address.district.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Per-status totals for the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub total: usize,
    pub registered: usize,
    pub pending: usize,
    pub verified: usize,
    pub inactive: usize,
    pub unsynced: usize,
}

impl StatusCounts {
    pub fn tally(voters: &[VoterRecord]) -> Self {
        let mut counts = Self::default();
        for voter in voters {
            counts.total += 1;
            match voter.registration_status {
                RegistrationStatus::Registered => counts.registered += 1,
                RegistrationStatus::Pending => counts.pending += 1,
                RegistrationStatus::Verified => counts.verified += 1,
                RegistrationStatus::Inactive => counts.inactive += 1,
            }
            if !voter.synced {
                counts.unsynced += 1;
            }
        }
        counts
    }
}

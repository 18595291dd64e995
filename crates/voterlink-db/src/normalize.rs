//! Write-path normalization.
//!
//! Every insert and update goes through one of these two functions before
//! touching SQL. They own the derived fields: `full_name`, the timestamps and
//! the sync flag.

use voterlink_types::voter::full_name;
use voterlink_types::{Demographics, NewVoter, VoterPatch, VoterRecord};

/// Build the record to insert. `id` is left at 0 for the store to assign.
pub fn prepare_new(new: NewVoter, now: u64) -> VoterRecord {
    let full_name = full_name(&new.first_name, &new.last_name);
    VoterRecord {
        id: 0,
        voter_id: new.voter_id,
        first_name: new.first_name,
        last_name: new.last_name,
        full_name,
        phone_number: new.phone_number,
        email: new.email,
        address: new.address,
        demographics: collapse_demographics(new.demographics),
        registration_status: new.registration_status,
        telegram_user_id: new.telegram_user_id,
        created_at: now,
        updated_at: now,
        synced: false,
        last_synced_at: None,
    }
}

/// Merge `patch` into `current`.
///
/// `updated_at` is strictly greater than the previous value even when the
/// clock has not moved since the last write.
pub fn apply_patch(current: VoterRecord, patch: VoterPatch, now: u64) -> VoterRecord {
    let mut next = current;
    let previous_update = next.updated_at;

    if let Some(voter_id) = patch.voter_id {
        next.voter_id = voter_id;
    }
    if let Some(first_name) = patch.first_name {
        next.first_name = first_name;
    }
    if let Some(last_name) = patch.last_name {
        next.last_name = last_name;
    }
    if let Some(phone_number) = patch.phone_number {
        next.phone_number = Some(phone_number);
    }
    if let Some(email) = patch.email {
        next.email = Some(email);
    }
    if let Some(address) = patch.address {
        next.address = address;
    }
    if let Some(demographics) = patch.demographics {
        next.demographics = collapse_demographics(Some(demographics));
    }
    if let Some(status) = patch.registration_status {
        next.registration_status = status;
    }
    if let Some(user_id) = patch.telegram_user_id {
        next.telegram_user_id = Some(user_id);
    }

    next.full_name = full_name(&next.first_name, &next.last_name);
    next.updated_at = now.max(previous_update + 1);
    next.synced = false;
    next
}

/// An all-empty demographics block is stored as absent.
fn collapse_demographics(demographics: Option<Demographics>) -> Option<Demographics> {
    demographics.filter(|d| !d.is_empty())
}

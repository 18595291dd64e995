//! Typed record operations over the shared store handle.
//!
//! Each call locks the store for the duration of one operation. Failures are
//! logged here and handed back to the caller unchanged.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::warn;

use voterlink_db::{DbError, VoterStore};
use voterlink_types::{NewVoter, RegistrationStatus, VoterPatch, VoterRecord};

type Result<T> = std::result::Result<T, DbError>;

/// Shared handle to one constituency store.
pub type Db = Arc<Mutex<VoterStore>>;

/// Wrap an open store in a shared handle.
pub fn shared(store: VoterStore) -> Db {
    Arc::new(Mutex::new(store))
}

/// Field to query the store by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Name(String),
    Ward(String),
    District(String),
    Status(RegistrationStatus),
}

/// Add a voter. New records always start unsynced.
pub async fn add(db: &Db, voter: NewVoter) -> Result<VoterRecord> {
    let voter_id = voter.voter_id.clone();
    db.lock()
        .await
        .insert(voter)
        .inspect_err(|e| warn!(voter_id = %voter_id, error = %e, "add voter failed"))
}

pub async fn add_many(db: &Db, voters: Vec<NewVoter>) -> Result<Vec<i64>> {
    let count = voters.len();
    db.lock()
        .await
        .bulk_insert(voters)
        .inspect_err(|e| warn!(count, error = %e, "bulk add failed"))
}

pub async fn update(db: &Db, id: i64, patch: VoterPatch) -> Result<VoterRecord> {
    db.lock()
        .await
        .update(id, patch)
        .inspect_err(|e| warn!(id, error = %e, "update voter failed"))
}

pub async fn remove(db: &Db, id: i64) -> Result<bool> {
    db.lock()
        .await
        .delete(id)
        .inspect_err(|e| warn!(id, error = %e, "delete voter failed"))
}

pub async fn get(db: &Db, id: i64) -> Result<Option<VoterRecord>> {
    db.lock()
        .await
        .get(id)
        .inspect_err(|e| warn!(id, error = %e, "get voter failed"))
}

pub async fn get_by_voter_id(db: &Db, voter_id: &str) -> Result<Option<VoterRecord>> {
    db.lock()
        .await
        .get_by_voter_id(voter_id)
        .inspect_err(|e| warn!(voter_id, error = %e, "lookup by voter id failed"))
}

pub async fn get_by_telegram_user(db: &Db, user_id: i64) -> Result<Option<VoterRecord>> {
    db.lock()
        .await
        .get_by_telegram_user(user_id)
        .inspect_err(|e| warn!(user_id, error = %e, "lookup by platform user failed"))
}

pub async fn list_all(db: &Db) -> Result<Vec<VoterRecord>> {
    db.lock()
        .await
        .list()
        .inspect_err(|e| warn!(error = %e, "list voters failed"))
}

pub async fn search(db: &Db, query: &Query) -> Result<Vec<VoterRecord>> {
    let store = db.lock().await;
    let result = match query {
        Query::Name(needle) => store.search_name(needle),
        Query::Ward(ward) => store.by_ward(ward),
        Query::District(district) => store.by_district(district),
        Query::Status(status) => store.by_status(*status),
    };
    result.inspect_err(|e| warn!(?query, error = %e, "voter search failed"))
}

pub async fn list_unsynced(db: &Db) -> Result<Vec<VoterRecord>> {
    db.lock()
        .await
        .list_unsynced()
        .inspect_err(|e| warn!(error = %e, "list unsynced failed"))
}

pub async fn mark_synced(db: &Db, id: i64) -> Result<()> {
    db.lock()
        .await
        .mark_synced(id)
        .inspect_err(|e| warn!(id, error = %e, "mark synced failed"))
}

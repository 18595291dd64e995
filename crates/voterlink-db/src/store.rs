//! Per-constituency voter store.
//!
//! A [`VoterStore`] is the explicit context every record operation runs
//! against. Nothing is global: several constituencies can be open at once,
//! each with its own connection.

use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tracing::{debug, info, warn};

use voterlink_types::{NewVoter, PlatformUser, RegistrationStatus, VoterPatch, VoterRecord};

use crate::queries::{settings, voters};
use crate::{fixtures, normalize, now_millis, DbError, Result};

const CACHED_USER_KEY: &str = "cached_user";

/// How a store came to be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    /// Existing or fresh store opened normally.
    Opened,
    /// The store could not be opened; it was deleted, recreated and
    /// seeded with `seeded` fixture records.
    Recovered { seeded: usize },
}

pub struct VoterStore {
    conn: Connection,
    constituency: String,
}

impl VoterStore {
    /// Database file for a constituency under `data_dir`.
    pub fn path_for(data_dir: &Path, constituency: &str) -> PathBuf {
        let slug: String = constituency
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        data_dir.join(format!("{slug}.db"))
    }

    /// Open (or create) the store file. Reopening is a no-op on the data.
    pub fn open(path: &Path, constituency: &str) -> Result<Self> {
        let conn = crate::open(path)?;
        Self::with_connection(conn, constituency)
    }

    /// Open an in-memory store (for testing).
    pub fn open_memory(constituency: &str) -> Result<Self> {
        let conn = crate::open_memory()?;
        Self::with_connection(conn, constituency)
    }

    /// Open the store, recreating it from fixtures if it cannot be opened.
    ///
    /// Recovery is destructive: the database file and its WAL/SHM side
    /// files are deleted before the store is recreated.
    pub fn open_or_recover(path: &Path, constituency: &str) -> Result<(Self, OpenOutcome)> {
        match Self::open(path, constituency) {
            Ok(store) => Ok((store, OpenOutcome::Opened)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "store open failed, recreating");
                remove_store_files(path)?;
                let mut store = Self::open(path, constituency)?;
                let seeded = store.seed_fixtures()?;
                info!(constituency, seeded, "store recreated from fixtures");
                Ok((store, OpenOutcome::Recovered { seeded }))
            }
        }
    }

    fn with_connection(conn: Connection, constituency: &str) -> Result<Self> {
        let stored = settings::get(&conn, "constituency").unwrap_or_default();
        if stored.is_empty() {
            settings::set(&conn, "constituency", constituency)?;
        } else if stored != constituency {
            warn!(
                stored = %stored,
                requested = constituency,
                "store opened under a different constituency id"
            );
        }
        Ok(Self {
            conn,
            constituency: constituency.to_string(),
        })
    }

    pub fn constituency(&self) -> &str {
        &self.constituency
    }

    /// Raw connection, for queries not covered here.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Insert a voter and return the stored record.
    pub fn insert(&self, new: NewVoter) -> Result<VoterRecord> {
        let mut record = normalize::prepare_new(new, now_millis());
        record.id = voters::insert(&self.conn, &record)?;
        debug!(id = record.id, voter_id = %record.voter_id, "voter inserted");
        Ok(record)
    }

    /// Insert many voters in one transaction. Either all are stored or none.
    pub fn bulk_insert(&mut self, batch: Vec<NewVoter>) -> Result<Vec<i64>> {
        let now = now_millis();
        let tx = self.conn.transaction()?;
        let mut ids = Vec::with_capacity(batch.len());
        for new in batch {
            let record = normalize::prepare_new(new, now);
            ids.push(voters::insert(&tx, &record)?);
        }
        tx.commit()?;
        debug!(count = ids.len(), "voters bulk inserted");
        Ok(ids)
    }

    pub fn get(&self, id: i64) -> Result<Option<VoterRecord>> {
        voters::get(&self.conn, id)
    }

    pub fn get_by_voter_id(&self, voter_id: &str) -> Result<Option<VoterRecord>> {
        voters::get_by_voter_id(&self.conn, voter_id)
    }

    pub fn get_by_telegram_user(&self, user_id: i64) -> Result<Option<VoterRecord>> {
        voters::get_by_telegram_user(&self.conn, user_id)
    }

    /// Merge `patch` into voter `id` and return the updated record.
    pub fn update(&self, id: i64, patch: VoterPatch) -> Result<VoterRecord> {
        let current = voters::get(&self.conn, id)?
            .ok_or_else(|| DbError::NotFound(format!("voter #{id}")))?;
        let next = normalize::apply_patch(current, patch, now_millis());
        voters::replace(&self.conn, &next)?;
        debug!(id, "voter updated");
        Ok(next)
    }

    pub fn delete(&self, id: i64) -> Result<bool> {
        voters::delete(&self.conn, id)
    }

    pub fn list(&self) -> Result<Vec<VoterRecord>> {
        voters::list(&self.conn)
    }

    pub fn count(&self) -> Result<u64> {
        voters::count(&self.conn)
    }

    pub fn by_status(&self, status: RegistrationStatus) -> Result<Vec<VoterRecord>> {
        voters::list_by_status(&self.conn, status)
    }

    pub fn by_ward(&self, ward: &str) -> Result<Vec<VoterRecord>> {
        voters::list_by_ward(&self.conn, ward)
    }

    pub fn by_district(&self, district: &str) -> Result<Vec<VoterRecord>> {
        voters::list_by_district(&self.conn, district)
    }

    pub fn search_name(&self, needle: &str) -> Result<Vec<VoterRecord>> {
        voters::search_name(&self.conn, needle)
    }

    pub fn list_unsynced(&self) -> Result<Vec<VoterRecord>> {
        voters::list_unsynced(&self.conn)
    }

    /// Flag voter `id` as synced. Repeating this only moves `last_synced_at`.
    pub fn mark_synced(&self, id: i64) -> Result<()> {
        let now = now_millis();
        voters::mark_synced(&self.conn, id, now)?;
        settings::set(&self.conn, "last_sync_at", &now.to_string())
    }

    /// Time of the most recent mark-synced, if any.
    pub fn last_sync_at(&self) -> Result<Option<u64>> {
        let at = settings::get_u64(&self.conn, "last_sync_at", 0)?;
        Ok((at > 0).then_some(at))
    }

    /// Raw settings value; a missing key is `DbError::NotFound`.
    pub fn get_setting(&self, key: &str) -> Result<String> {
        settings::get(&self.conn, key)
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        settings::set(&self.conn, key, value)
    }

    /// Offline copy of the last platform user seen.
    pub fn cached_user(&self) -> Result<Option<PlatformUser>> {
        settings::get_json(&self.conn, CACHED_USER_KEY)
    }

    pub fn set_cached_user(&self, user: &PlatformUser) -> Result<()> {
        settings::set_json(&self.conn, CACHED_USER_KEY, user)
    }

    /// Load the fixture set, skipping voter ids already present.
    pub fn seed_fixtures(&mut self) -> Result<usize> {
        let mut fresh = Vec::new();
        for voter in fixtures::sample_voters(&self.constituency) {
            if self.get_by_voter_id(&voter.voter_id)?.is_none() {
                fresh.push(voter);
            }
        }
        let seeded = self.bulk_insert(fresh)?.len();
        settings::set(&self.conn, "fixtures_seeded", "true")?;
        Ok(seeded)
    }

    pub fn fixtures_seeded(&self) -> Result<bool> {
        settings::get_bool(&self.conn, "fixtures_seeded", false)
    }
}

fn remove_store_files(path: &Path) -> Result<()> {
    let base = path.as_os_str().to_os_string();
    for suffix in ["", "-wal", "-shm"] {
        let mut candidate = base.clone();
        candidate.push(suffix);
        match std::fs::remove_file(&candidate) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(DbError::Io(e)),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use voterlink_types::Address;

    fn address(ward: &str) -> Address {
        Address {
            ward: ward.into(),
            district: "Central".into(),
            constituency: "C-01".into(),
            ..Default::default()
        }
    }

    fn john() -> NewVoter {
        NewVoter::new("VTR001", "John", "Doe", address("Ward 1"), RegistrationStatus::Registered)
    }

    fn jane() -> NewVoter {
        NewVoter::new("VTR002", "Jane", "Smith", address("Ward 2"), RegistrationStatus::Verified)
    }

    #[test]
    fn test_insert_defaults() {
        let store = VoterStore::open_memory("C-01").expect("open");
        let record = store.insert(john()).expect("insert");
        assert!(record.id > 0);
        assert_eq!(record.full_name, "John Doe");
        assert!(!record.synced);
        assert_eq!(record.created_at, record.updated_at);
        assert_eq!(store.get(record.id).expect("get"), Some(record));
    }

    #[test]
    fn test_update_renames_and_resets_sync() {
        let store = VoterStore::open_memory("C-01").expect("open");
        let record = store.insert(john()).expect("insert");
        store.mark_synced(record.id).expect("sync");

        let patch = VoterPatch {
            last_name: Some("Roe".into()),
            ..Default::default()
        };
        let updated = store.update(record.id, patch).expect("update");
        assert_eq!(updated.full_name, "John Roe");
        assert!(!updated.synced);
        assert!(updated.updated_at > record.updated_at);
        assert_eq!(store.get(record.id).expect("get"), Some(updated));
    }

    #[test]
    fn test_update_missing() {
        let store = VoterStore::open_memory("C-01").expect("open");
        let result = store.update(9, VoterPatch::default());
        assert!(matches!(result, Err(DbError::NotFound(_))));
    }

    #[test]
    fn test_update_to_taken_voter_id_rejected() {
        let store = VoterStore::open_memory("C-01").expect("open");
        store.insert(john()).expect("insert");
        let jane = store.insert(jane()).expect("insert");
        let patch = VoterPatch {
            voter_id: Some("VTR001".into()),
            ..Default::default()
        };
        assert!(matches!(store.update(jane.id, patch), Err(DbError::Constraint(_))));
    }

    #[test]
    fn test_bulk_insert_is_atomic() {
        let mut store = VoterStore::open_memory("C-01").expect("open");
        let ids = store.bulk_insert(vec![john(), jane()]).expect("bulk");
        assert_eq!(ids.len(), 2);

        let dup = NewVoter::new("VTR003", "A", "B", address("Ward 3"), RegistrationStatus::Pending);
        let result = store.bulk_insert(vec![dup, john()]);
        assert!(matches!(result, Err(DbError::Constraint(_))));
        assert_eq!(store.count().expect("count"), 2);
        assert!(store.get_by_voter_id("VTR003").expect("get").is_none());
    }

    #[test]
    fn test_mark_synced_idempotent() {
        let store = VoterStore::open_memory("C-01").expect("open");
        let record = store.insert(john()).expect("insert");
        store.mark_synced(record.id).expect("first");
        let once = store.get(record.id).expect("get").expect("present");
        store.mark_synced(record.id).expect("second");
        let twice = store.get(record.id).expect("get").expect("present");

        assert!(twice.synced);
        assert!(twice.last_synced_at >= once.last_synced_at);
        assert_eq!(
            VoterRecord {
                last_synced_at: None,
                ..twice
            },
            VoterRecord {
                last_synced_at: None,
                ..once
            }
        );
        assert!(store.last_sync_at().expect("last sync").is_some());
    }

    #[test]
    fn test_stores_are_isolated() {
        let north = VoterStore::open_memory("North").expect("open");
        let south = VoterStore::open_memory("South").expect("open");
        north.insert(john()).expect("insert");
        south.insert(john()).expect("same voter id in another constituency");
        assert_eq!(north.count().expect("count"), 1);
        assert_eq!(south.count().expect("count"), 1);
        assert_eq!(south.constituency(), "South");
    }

    #[test]
    fn test_cached_user() {
        let store = VoterStore::open_memory("C-01").expect("open");
        assert_eq!(store.cached_user().expect("get"), None);
        let user = PlatformUser {
            id: 7,
            first_name: "Asha".into(),
            last_name: None,
            username: Some("asha".into()),
            photo_url: None,
        };
        store.set_cached_user(&user).expect("set");
        assert_eq!(store.cached_user().expect("get"), Some(user));
    }

    #[test]
    fn test_settings_passthrough() {
        let store = VoterStore::open_memory("C-01").expect("open");
        assert_eq!(store.get_setting("constituency").expect("get"), "C-01");
        store.set_setting("theme", "dark").expect("set");
        assert_eq!(store.get_setting("theme").expect("get"), "dark");
        assert!(matches!(store.get_setting("nope"), Err(DbError::NotFound(_))));
    }

    #[test]
    fn test_path_for_sanitizes() {
        let path = VoterStore::path_for(Path::new("/data"), "Bangalore South/26");
        assert_eq!(path, PathBuf::from("/data/Bangalore_South_26.db"));
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = VoterStore::path_for(dir.path(), "C-01");
        {
            let store = VoterStore::open(&path, "C-01").expect("open");
            store.insert(john()).expect("insert");
        }
        let (store, outcome) = VoterStore::open_or_recover(&path, "C-01").expect("reopen");
        assert_eq!(outcome, OpenOutcome::Opened);
        assert_eq!(store.count().expect("count"), 1);
    }

    #[test]
    fn test_corrupt_store_is_recreated_from_fixtures() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = VoterStore::path_for(dir.path(), "C-01");
        std::fs::write(&path, vec![b'x'; 4096]).expect("write garbage");

        let (store, outcome) = VoterStore::open_or_recover(&path, "C-01").expect("recover");
        let expected = fixtures::sample_voters("C-01").len();
        assert_eq!(outcome, OpenOutcome::Recovered { seeded: expected });
        assert_eq!(store.count().expect("count") as usize, expected);
        assert!(store.fixtures_seeded().expect("flag"));
    }

    #[test]
    fn test_seed_fixtures_skips_existing() {
        let mut store = VoterStore::open_memory("C-01").expect("open");
        store.insert(john()).expect("insert");
        let seeded = store.seed_fixtures().expect("seed");
        assert_eq!(seeded, fixtures::sample_voters("C-01").len() - 1);
    }
}

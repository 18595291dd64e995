//! Application state container.
//!
//! Caches the loaded voter list, the platform user, the connectivity flag
//! and a pointer to the voter currently open in a detail view. Mutations go
//! through [`crate::records`] and are followed by a full reload of the list.

use std::sync::{Arc, Weak};

use serde::Serialize;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use voterlink_db::DbError;
use voterlink_types::{NewVoter, PlatformUser, RegistrationStatus, VoterPatch, VoterRecord};

use crate::config::SyncConfig;
use crate::events::{EventBus, EventCategory, EventFilter, EventType};
use crate::filter::{StatusCounts, VoterFilter};
use crate::identity::IdentitySource;
use crate::records::{self, Db};
use crate::sync::{self, SyncReport};

/// Errors surfaced by state actions.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("voter #{0} not found")]
    UnknownVoter(i64),

    #[error("voter {voter_id} is {status}; only verified voters can be surveyed")]
    SurveyNotAllowed {
        voter_id: String,
        status: RegistrationStatus,
    },
}

pub type Result<T> = std::result::Result<T, StateError>;

/// Point-in-time copy of everything a view renders from.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub online: bool,
    pub current_user: Option<PlatformUser>,
    pub current_voter: Option<VoterRecord>,
    pub voters: Vec<VoterRecord>,
    pub loading: bool,
}

pub struct AppState {
    db: Db,
    sync: SyncConfig,
    event_bus: EventBus,
    inner: RwLock<StateSnapshot>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl AppState {
    pub fn new(db: Db, event_bus: EventBus, sync: SyncConfig) -> Arc<Self> {
        Arc::new(Self {
            db,
            sync,
            event_bus,
            inner: RwLock::new(StateSnapshot::default()),
            listener: Mutex::new(None),
        })
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Read the platform user, load the voter list and start listening for
    /// connectivity changes.
    ///
    /// Never fails: a missing user falls back to the cached copy, and a
    /// failed load leaves the list empty.
    pub async fn initialize(self: &Arc<Self>, identity: &dyn IdentitySource, online: bool) {
        self.inner.write().await.online = online;

        let user = self.resolve_user(identity).await;
        match &user {
            Some(u) => info!(user_id = u.id, "platform user resolved"),
            None => info!("no platform user available"),
        }
        self.inner.write().await.current_user = user;

        self.load_all().await;
        self.listen_for_connectivity().await;
    }

    async fn resolve_user(&self, identity: &dyn IdentitySource) -> Option<PlatformUser> {
        let store = self.db.lock().await;
        match identity.current_user() {
            Some(user) => {
                if let Err(e) = store.set_cached_user(&user) {
                    warn!(error = %e, "could not cache platform user");
                }
                Some(user)
            }
            None => store
                .cached_user()
                .inspect_err(|e| warn!(error = %e, "could not read cached platform user"))
                .ok()
                .flatten(),
        }
    }

    async fn listen_for_connectivity(self: &Arc<Self>) {
        let mut rx = self.event_bus.subscribe();
        let filter = EventFilter::only(&[EventCategory::Connectivity]);
        let state: Weak<Self> = Arc::downgrade(self);

        let handle = tokio::spawn(async move {
            loop {
                let event = match rx.recv().await {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "connectivity listener lagged");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                if !filter.matches(&event) {
                    continue;
                }
                let Some(state) = state.upgrade() else {
                    break;
                };
                match event.event_type {
                    EventType::Online => state.set_online(true).await,
                    EventType::Offline => state.set_online(false).await,
                    _ => {}
                }
            }
        });

        if let Some(previous) = self.listener.lock().await.replace(handle) {
            previous.abort();
        }
    }

    /// Stop the connectivity listener.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.listener.lock().await.take() {
            handle.abort();
        }
    }

    /// Record a connectivity change. Coming online only logs the intent to
    /// sync unless `auto_sync_on_reconnect` is set.
    pub async fn set_online(&self, online: bool) {
        let changed = {
            let mut inner = self.inner.write().await;
            let changed = inner.online != online;
            inner.online = online;
            changed
        };
        if !changed {
            return;
        }

        self.event_bus
            .emit_now(EventType::ConnectivityChanged, serde_json::json!({ "online": online }));

        if online {
            info!("connection restored, local changes pending sync");
            if self.sync.auto_sync_on_reconnect {
                self.sync_now().await;
            }
        } else {
            info!("connection lost, working offline");
        }
    }

    /// Replace the cached list with the store contents. On failure the
    /// previous list is kept. Returns the number of cached voters.
    pub async fn load_all(&self) -> usize {
        self.inner.write().await.loading = true;

        let loaded = records::list_all(&self.db).await;

        let mut inner = self.inner.write().await;
        inner.loading = false;
        match loaded {
            Ok(voters) => {
                inner.voters = voters;
                let count = inner.voters.len();
                drop(inner);
                debug!(count, "voters loaded");
                self.event_bus
                    .emit_now(EventType::VotersLoaded, serde_json::json!({ "count": count }));
                count
            }
            Err(_) => inner.voters.len(),
        }
    }

    pub async fn add(&self, voter: NewVoter) -> Result<VoterRecord> {
        let record = records::add(&self.db, voter).await?;
        self.load_all().await;
        self.refresh_current(&record).await;
        self.event_bus.emit_now(
            EventType::VoterAdded,
            serde_json::json!({ "id": record.id, "voterId": record.voter_id }),
        );
        Ok(record)
    }

    pub async fn update(&self, id: i64, patch: VoterPatch) -> Result<VoterRecord> {
        let record = records::update(&self.db, id, patch).await?;
        self.load_all().await;
        self.refresh_current(&record).await;
        self.event_bus.emit_now(
            EventType::VoterUpdated,
            serde_json::json!({ "id": record.id, "voterId": record.voter_id }),
        );
        Ok(record)
    }

    pub async fn remove(&self, id: i64) -> Result<bool> {
        let removed = records::remove(&self.db, id).await?;
        if removed {
            self.load_all().await;
            let cleared = {
                let mut inner = self.inner.write().await;
                let matches = inner.current_voter.as_ref().is_some_and(|v| v.id == id);
                if matches {
                    inner.current_voter = None;
                }
                matches
            };
            if cleared {
                self.emit_current(None);
            }
            self.event_bus
                .emit_now(EventType::VoterDeleted, serde_json::json!({ "id": id }));
        }
        Ok(removed)
    }

    /// Point the current voter at the record linked to `user_id`, or clear
    /// it when none is linked.
    pub async fn current_by_linked_user(&self, user_id: i64) -> Result<Option<VoterRecord>> {
        let found = records::get_by_telegram_user(&self.db, user_id).await?;
        self.set_current(found.clone()).await;
        Ok(found)
    }

    /// Same as [`Self::current_by_linked_user`] for the signed-in user.
    pub async fn current_for_platform_user(&self) -> Result<Option<VoterRecord>> {
        let user_id = self.inner.read().await.current_user.as_ref().map(|u| u.id);
        match user_id {
            Some(id) => self.current_by_linked_user(id).await,
            None => Ok(None),
        }
    }

    /// Open voter `id` in the detail view.
    pub async fn select(&self, id: i64) -> Result<VoterRecord> {
        let record = records::get(&self.db, id)
            .await?
            .ok_or(StateError::UnknownVoter(id))?;
        self.set_current(Some(record.clone())).await;
        Ok(record)
    }

    /// Select voter `id` for a survey. Only verified voters qualify.
    pub async fn start_survey(&self, id: i64) -> Result<VoterRecord> {
        let record = records::get(&self.db, id)
            .await?
            .ok_or(StateError::UnknownVoter(id))?;
        if !record.can_start_survey() {
            return Err(StateError::SurveyNotAllowed {
                voter_id: record.voter_id,
                status: record.registration_status,
            });
        }
        info!(id, voter_id = %record.voter_id, "survey started");
        self.set_current(Some(record.clone())).await;
        Ok(record)
    }

    /// Run the sync stub with the current connectivity flag.
    pub async fn sync_now(&self) -> SyncReport {
        let online = self.inner.read().await.online;
        let report = sync::sync_unsynced(&self.db, online).await;
        if report.synced > 0 {
            self.load_all().await;
            let current_id = self.inner.read().await.current_voter.as_ref().map(|v| v.id);
            if let Some(id) = current_id {
                if let Ok(Some(record)) = records::get(&self.db, id).await {
                    self.refresh_current(&record).await;
                }
            }
        }
        self.event_bus.emit_now(
            EventType::SyncCompleted,
            serde_json::to_value(report).unwrap_or_default(),
        );
        report
    }

    pub async fn snapshot(&self) -> StateSnapshot {
        self.inner.read().await.clone()
    }

    pub async fn is_online(&self) -> bool {
        self.inner.read().await.online
    }

    /// Cached voters matching `filter`.
    pub async fn filtered(&self, filter: &VoterFilter) -> Vec<VoterRecord> {
        filter.apply(&self.inner.read().await.voters)
    }

    pub async fn status_counts(&self) -> StatusCounts {
        StatusCounts::tally(&self.inner.read().await.voters)
    }

    async fn set_current(&self, voter: Option<VoterRecord>) {
        let id = voter.as_ref().map(|v| v.id);
        self.inner.write().await.current_voter = voter;
        self.emit_current(id);
    }

    /// Swap in `record` if it is the current voter.
    async fn refresh_current(&self, record: &VoterRecord) {
        let refreshed = {
            let mut inner = self.inner.write().await;
            let is_current = inner
                .current_voter
                .as_ref()
                .is_some_and(|current| current.id == record.id);
            if is_current {
                inner.current_voter = Some(record.clone());
            }
            is_current
        };
        if refreshed {
            self.emit_current(Some(record.id));
        }
    }

    fn emit_current(&self, id: Option<i64>) {
        self.event_bus
            .emit_now(EventType::CurrentVoterChanged, serde_json::json!({ "id": id }));
    }
}

impl Drop for AppState {
    fn drop(&mut self) {
        if let Some(handle) = self.listener.get_mut().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::HostIdentity;
    use crate::records::shared;
    use voterlink_db::fixtures;
    use voterlink_db::store::OpenOutcome;
    use voterlink_db::VoterStore;
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
        let mut voter = NewVoter::new(
            "VTR001",
            "John",
            "Doe",
            address("Ward 1"),
            RegistrationStatus::Registered,
        );
        voter.telegram_user_id = Some(1001);
        voter
    }

    fn jane() -> NewVoter {
        NewVoter::new("VTR002", "Jane", "Smith", address("Ward 2"), RegistrationStatus::Verified)
    }

    fn user() -> PlatformUser {
        PlatformUser {
            id: 1001,
            first_name: "John".into(),
            last_name: Some("Doe".into()),
            username: None,
            photo_url: None,
        }
    }

    fn app() -> Arc<AppState> {
        let db = shared(VoterStore::open_memory("C-01").expect("open"));
        AppState::new(db, EventBus::default(), SyncConfig::default())
    }

    #[tokio::test]
    async fn test_initialize_loads_and_caches_user() {
        let state = app();
        records::add(state.db(), jane()).await.expect("seed");

        state.initialize(&HostIdentity(Some(user())), true).await;
        let snapshot = state.snapshot().await;
        assert!(snapshot.online);
        assert!(!snapshot.loading);
        assert_eq!(snapshot.voters.len(), 1);
        assert_eq!(snapshot.current_user, Some(user()));

        let cached = state.db().lock().await.cached_user().expect("cached");
        assert_eq!(cached, Some(user()));
        state.shutdown().await;
    }

    #[tokio::test]
    async fn test_initialize_falls_back_to_cached_user() {
        let state = app();
        state.db().lock().await.set_cached_user(&user()).expect("cache");

        state.initialize(&HostIdentity::absent(), false).await;
        assert_eq!(state.snapshot().await.current_user, Some(user()));
        state.shutdown().await;
    }

    #[tokio::test]
    async fn test_initialize_without_any_user() {
        let state = app();
        state.initialize(&HostIdentity::absent(), false).await;
        assert_eq!(state.snapshot().await.current_user, None);
        state.shutdown().await;
    }

    #[tokio::test]
    async fn test_add_and_update_refresh_list_and_current() {
        let state = app();
        let added = state.add(john()).await.expect("add");
        assert_eq!(state.snapshot().await.voters, vec![added.clone()]);

        state.current_by_linked_user(1001).await.expect("lookup");
        let patch = VoterPatch {
            last_name: Some("Roe".into()),
            ..Default::default()
        };
        let updated = state.update(added.id, patch).await.expect("update");

        let snapshot = state.snapshot().await;
        assert_eq!(updated.full_name, "John Roe");
        assert!(!updated.synced);
        assert_eq!(snapshot.voters[0].full_name, "John Roe");
        assert_eq!(snapshot.current_voter, Some(updated));
    }

    #[tokio::test]
    async fn test_update_leaves_other_current_voter() {
        let state = app();
        let john = state.add(john()).await.expect("add");
        let jane = state.add(jane()).await.expect("add");
        state.select(jane.id).await.expect("select");

        let patch = VoterPatch {
            first_name: Some("Jon".into()),
            ..Default::default()
        };
        state.update(john.id, patch).await.expect("update");
        assert_eq!(state.snapshot().await.current_voter, Some(jane));
    }

    #[tokio::test]
    async fn test_duplicate_add_surfaces_error_and_keeps_list() {
        let state = app();
        state.add(john()).await.expect("add");
        let result = state.add(john()).await;
        assert!(matches!(result, Err(StateError::Db(DbError::Constraint(_)))));
        assert_eq!(state.snapshot().await.voters.len(), 1);
    }

    #[tokio::test]
    async fn test_linked_user_miss_clears_current() {
        let state = app();
        let john = state.add(john()).await.expect("add");
        state.select(john.id).await.expect("select");

        let found = state.current_by_linked_user(4242).await.expect("lookup");
        assert!(found.is_none());
        assert!(state.snapshot().await.current_voter.is_none());
    }

    #[tokio::test]
    async fn test_current_for_platform_user() {
        let state = app();
        let john = state.add(john()).await.expect("add");
        state.initialize(&HostIdentity(Some(user())), false).await;

        let found = state.current_for_platform_user().await.expect("lookup");
        assert_eq!(found.map(|v| v.id), Some(john.id));
        state.shutdown().await;
    }

    #[tokio::test]
    async fn test_survey_requires_verified() {
        let state = app();
        let john = state.add(john()).await.expect("add");
        let jane = state.add(jane()).await.expect("add");

        let refused = state.start_survey(john.id).await;
        assert!(matches!(
            refused,
            Err(StateError::SurveyNotAllowed {
                status: RegistrationStatus::Registered,
                ..
            })
        ));

        let started = state.start_survey(jane.id).await.expect("survey");
        assert_eq!(state.snapshot().await.current_voter, Some(started));

        assert!(matches!(state.start_survey(999).await, Err(StateError::UnknownVoter(999))));
    }

    #[tokio::test]
    async fn test_remove_clears_current() {
        let state = app();
        let john = state.add(john()).await.expect("add");
        state.select(john.id).await.expect("select");

        assert!(state.remove(john.id).await.expect("remove"));
        let snapshot = state.snapshot().await;
        assert!(snapshot.voters.is_empty());
        assert!(snapshot.current_voter.is_none());
        assert!(!state.remove(john.id).await.expect("remove again"));
    }

    #[tokio::test]
    async fn test_sync_now_respects_connectivity() {
        let state = app();
        state.add(john()).await.expect("add");

        assert_eq!(state.sync_now().await.synced, 0);

        state.set_online(true).await;
        let report = state.sync_now().await;
        assert_eq!(report.synced, 1);
        assert!(state.snapshot().await.voters[0].synced);
    }

    #[tokio::test]
    async fn test_connectivity_events_toggle_flag() {
        let state = app();
        state.initialize(&HostIdentity::absent(), false).await;
        let mut rx = state.event_bus().subscribe();

        state.event_bus().emit_now(EventType::Online, serde_json::json!({}));
        loop {
            let event = rx.recv().await.expect("event");
            if event.event_type == EventType::ConnectivityChanged {
                assert_eq!(event.payload["online"], true);
                break;
            }
        }
        assert!(state.is_online().await);

        // Going online does not sync by default.
        state.add(jane()).await.expect("add");
        assert!(!state.snapshot().await.voters[0].synced);
        state.shutdown().await;
    }

    #[tokio::test]
    async fn test_auto_sync_on_reconnect() {
        let db = shared(VoterStore::open_memory("C-01").expect("open"));
        let state = AppState::new(
            db,
            EventBus::default(),
            SyncConfig {
                auto_sync_on_reconnect: true,
            },
        );
        state.add(jane()).await.expect("add");

        state.set_online(true).await;
        assert!(state.snapshot().await.voters[0].synced);
    }

    #[tokio::test]
    async fn test_filtered_and_counts() {
        let state = app();
        state.add(john()).await.expect("add");
        state.add(jane()).await.expect("add");

        let verified = state.filtered(&VoterFilter::status(RegistrationStatus::Verified)).await;
        assert_eq!(verified.len(), 1);
        assert_eq!(verified[0].voter_id, "VTR002");

        let counts = state.status_counts().await;
        assert_eq!(counts.total, 2);
        assert_eq!(counts.unsynced, 2);
    }

    #[tokio::test]
    async fn test_dropping_state_stops_listener() {
        let bus = EventBus::default();
        let db = shared(VoterStore::open_memory("C-01").expect("open"));
        let state = AppState::new(db, bus.clone(), SyncConfig::default());
        state.initialize(&HostIdentity::absent(), false).await;

        let weak = Arc::downgrade(&state);
        drop(state);
        assert!(weak.upgrade().is_none());

        // The host may keep emitting on its own handle to the bus.
        bus.emit_now(EventType::Online, serde_json::json!({}));
        tokio::task::yield_now().await;
        assert!(weak.upgrade().is_none());
    }

    #[tokio::test]
    async fn test_file_backed_state_survives_recovery_and_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = VoterStore::path_for(dir.path(), "C-01");
        std::fs::write(&path, b"not a database").expect("write corrupt file");
        let seeded = fixtures::sample_voters("C-01").len();

        {
            let (store, outcome) = VoterStore::open_or_recover(&path, "C-01").expect("recover");
            assert_eq!(outcome, OpenOutcome::Recovered { seeded });
            let state = AppState::new(shared(store), EventBus::default(), SyncConfig::default());
            state.initialize(&HostIdentity::absent(), true).await;
            assert_eq!(state.snapshot().await.voters.len(), seeded);
            let walk_in = NewVoter::new(
                "VTR100",
                "Meera",
                "Nair",
                address("Ward 3"),
                RegistrationStatus::Pending,
            );
            state.add(walk_in).await.expect("add");
            state.shutdown().await;
        }

        let (store, outcome) = VoterStore::open_or_recover(&path, "C-01").expect("reopen");
        assert_eq!(outcome, OpenOutcome::Opened);
        let state = AppState::new(shared(store), EventBus::default(), SyncConfig::default());
        assert_eq!(state.load_all().await, seeded + 1);
    }
}

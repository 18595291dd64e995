//! Remote sync placeholder.
//!
//! There is no transport yet: "syncing" flags every pending record as synced
//! locally. Conflict handling, auth and the wire format are undecided.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::records::Db;

/// Outcome of one sync pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Unsynced records found at the start of the pass.
    pub pending: usize,
    pub synced: usize,
    pub failed: usize,
}

/// Mark every unsynced record as synced. Offline is a no-op.
///
/// A record that fails is logged and skipped; the pass continues.
pub async fn sync_unsynced(db: &Db, online: bool) -> SyncReport {
    let mut report = SyncReport::default();
    if !online {
        debug!("offline, skipping sync");
        return report;
    }

    let store = db.lock().await;
    let pending = match store.list_unsynced() {
        Ok(pending) => pending,
        Err(e) => {
            warn!(error = %e, "could not list unsynced voters");
            return report;
        }
    };
    report.pending = pending.len();

    for voter in pending {
        match store.mark_synced(voter.id) {
            Ok(()) => report.synced += 1,
            Err(e) => {
                warn!(
                    id = voter.id,
                    voter_id = %voter.voter_id,
                    error = %e,
                    "sync failed for voter"
                );
                report.failed += 1;
            }
        }
    }

    info!(
        pending = report.pending,
        synced = report.synced,
        failed = report.failed,
        "sync pass finished"
    );
    report
}

//! voterlink: opens the configured constituency store and keeps the state
//! container alive until interrupted.
//!
//! The host platform user is read from `VOTERLINK_PLATFORM_USER` as JSON.

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use voterlink_app::identity::HostIdentity;
use voterlink_app::records;
use voterlink_app::{AppConfig, AppState, EventBus};
use voterlink_db::store::OpenOutcome;
use voterlink_db::VoterStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config
    let config = AppConfig::load()?;

    // 2. Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("voterlink={}", config.advanced.log_level).parse()?),
        )
        .init();

    info!("voterlink starting");

    let data_dir = config.data_dir();
    std::fs::create_dir_all(&data_dir)?;

    // 3. Open the constituency store
    let constituency = config.storage.constituency.as_str();
    let path = VoterStore::path_for(&data_dir, constituency);
    let (mut store, outcome) = VoterStore::open_or_recover(&path, constituency)?;
    if let OpenOutcome::Recovered { seeded } = outcome {
        warn!(seeded, "store was unreadable and has been rebuilt from sample data");
    }
    if config.storage.seed_when_empty && store.count()? == 0 {
        let seeded = store.seed_fixtures()?;
        info!(seeded, "seeded empty store");
    }
    info!(constituency, path = %path.display(), "store open");

    // 4. Build state and initialize
    let event_bus = EventBus::default();
    let state = AppState::new(records::shared(store), event_bus, config.sync.clone());
    state.initialize(&HostIdentity::from_env(), true).await;

    let snapshot = state.snapshot().await;
    let counts = state.status_counts().await;
    info!(
        voters = counts.total,
        verified = counts.verified,
        unsynced = counts.unsynced,
        user = %snapshot.current_user.as_ref().map(|u| u.display_name()).unwrap_or_default(),
        "ready"
    );

    // 5. Run until interrupted
    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received, shutting down");

    state.shutdown().await;
    info!("voterlink stopped");
    Ok(())
}

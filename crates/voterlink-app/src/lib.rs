//! # voterlink-app
//!
//! Application layer of the voter registry: typed record operations over a
//! constituency store, the state container the views render from,
//! list filtering, the sync placeholder and configuration.
//!
//! Data flows one way: view → [`state::AppState`] → [`records`] →
//! [`voterlink_db::VoterStore`] → [`sync`].

pub mod config;
pub mod events;
pub mod filter;
pub mod identity;
pub mod records;
pub mod state;
pub mod sync;

pub use config::AppConfig;
pub use events::EventBus;
pub use filter::VoterFilter;
pub use state::{AppState, StateError, StateSnapshot};

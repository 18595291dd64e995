//! Host platform identity.

use tracing::warn;

use voterlink_types::PlatformUser;

/// Environment variable the binary reads the host user from.
pub const PLATFORM_USER_ENV: &str = "VOTERLINK_PLATFORM_USER";

/// Where the current user comes from at startup.
pub trait IdentitySource: Send + Sync {
    /// The user handed over by the host, if any. Must not block.
    fn current_user(&self) -> Option<PlatformUser>;
}

/// Identity supplied once by the hosting platform.
#[derive(Debug, Clone, Default)]
pub struct HostIdentity(pub Option<PlatformUser>);

impl HostIdentity {
    /// No host user; the state container falls back to its cached copy.
    pub fn absent() -> Self {
        Self(None)
    }

    /// Parse a JSON user object. Malformed payloads count as absent.
    pub fn from_json(raw: &str) -> Self {
        match serde_json::from_str(raw) {
            Ok(user) => Self(Some(user)),
            Err(e) => {
                warn!(error = %e, "ignoring malformed platform user payload");
                Self(None)
            }
        }
    }

    pub fn from_env() -> Self {
        std::env::var(PLATFORM_USER_ENV)
            .map(|raw| Self::from_json(&raw))
            .unwrap_or_default()
    }
}

impl IdentitySource for HostIdentity {
    fn current_user(&self) -> Option<PlatformUser> {
        self.0.clone()
    }
}

//! Host platform identity.

use serde::{Deserialize, Serialize};

use crate::PlatformUserId;

/// User identity handed to the web app by the hosting messaging platform.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PlatformUser {
    #[ts(type = "number")]
    pub id: PlatformUserId,
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

impl PlatformUser {
    pub fn display_name(&self) -> String {
        crate::voter::full_name(&self.first_name, self.last_name.as_deref().unwrap_or(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_host_payload() {
        let user: PlatformUser = serde_json::from_str(
            r#"{"id": 42, "firstName": "Asha", "photoUrl": "https://t.me/i/asha.jpg"}"#,
        )
        .expect("parse");
        assert_eq!(user.id, 42);
        assert_eq!(user.last_name, None);
        assert_eq!(user.display_name(), "Asha");
    }
}

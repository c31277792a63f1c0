//! Session pointers
//!
//! Mock mode only remembers which user is signed in. Hosted mode keeps the
//! tokens handed out by the auth service so the next run can resume.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mock-mode session: a pointer to the current user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
}

/// Hosted-mode session tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostedSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl HostedSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }
}

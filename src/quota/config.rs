//! Quota Configuration
//!
//! The `[quota]` section of the config file and the policy the gate enforces.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default generations per window
pub const DEFAULT_QUOTA_LIMIT: u32 = 1;
/// Default window length in hours
pub const DEFAULT_WINDOW_HOURS: u32 = 24;
/// Default override password
pub const DEFAULT_OVERRIDE_PASSWORD: &str = "defaultpassword";
/// Default state file, relative to the working directory
pub const DEFAULT_STATE_FILE: &str = "request_count.json";

/// Quota configuration
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QuotaConfig {
    /// Generations allowed per window
    pub limit: u32,

    /// Window length in hours
    pub window_hours: u32,

    /// Password that zeroes the quota
    pub override_password: String,

    /// Where the `{count, timestamp}` record lives
    pub state_file: PathBuf,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_QUOTA_LIMIT,
            window_hours: DEFAULT_WINDOW_HOURS,
            override_password: DEFAULT_OVERRIDE_PASSWORD.to_string(),
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
        }
    }
}

impl QuotaConfig {
    /// Policy for the gate
    pub fn policy(&self) -> QuotaPolicy {
        QuotaPolicy {
            limit: self.limit,
            window_hours: self.window_hours,
            override_password: self.override_password.clone(),
        }
    }
}

impl std::fmt::Debug for QuotaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotaConfig")
            .field("limit", &self.limit)
            .field("window_hours", &self.window_hours)
            .field("override_password", &"<redacted>")
            .field("state_file", &self.state_file)
            .finish()
    }
}

/// Limits enforced by [`super::QuotaGate`]
#[derive(Clone, PartialEq, Eq)]
pub struct QuotaPolicy {
    pub limit: u32,
    pub window_hours: u32,
    pub override_password: String,
}

impl QuotaPolicy {
    /// Window length
    pub fn window(&self) -> Duration {
        Duration::hours(i64::from(self.window_hours))
    }
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        QuotaConfig::default().policy()
    }
}

impl std::fmt::Debug for QuotaPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotaPolicy")
            .field("limit", &self.limit)
            .field("window_hours", &self.window_hours)
            .finish_non_exhaustive()
    }
}

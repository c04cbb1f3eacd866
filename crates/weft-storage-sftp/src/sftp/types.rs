// ── Types ─────────────────────────────────────────────────────────────────────

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use weft_storage_core::retry::RetryPolicy;

/// Default SFTP port.
pub const DEFAULT_PORT: u16 = 22;

/// Environment variables consulted when settings carry no credentials.
pub const USERNAME_ENV: &str = "WEFT_SFTP_USERNAME";
pub const PASSWORD_ENV: &str = "WEFT_SFTP_PASSWORD";

// ── Serde default helpers ────────────────────────────────────────────────────

fn default_false() -> bool {
    false
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_keepalive_secs() -> u64 {
    60
}
fn default_retry_count() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    2000
}

// ── Provider settings ────────────────────────────────────────────────────────

/// Provider-level configuration, injected by the engine. Immutable after
/// provider construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SftpSettings {
    /// Username for session authentication. Falls back to
    /// `WEFT_SFTP_USERNAME`, then the local login name.
    #[serde(default)]
    pub username: Option<String>,
    /// Password for session authentication. Falls back to
    /// `WEFT_SFTP_PASSWORD`. When absent, agent and default key files
    /// are tried instead.
    #[serde(default)]
    pub password: Option<String>,
    /// When true, uploads do not copy the local mtime onto the remote file.
    #[serde(default = "default_false")]
    pub not_sync_mtime: bool,
    #[serde(default = "default_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Protocol keepalive interval; 0 disables keepalive.
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_interval_secs: u64,
    /// Known-hosts file consulted at connect time; defaults to
    /// `~/.ssh/known_hosts`.
    #[serde(default)]
    pub known_hosts_path: Option<String>,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for SftpSettings {
    fn default() -> Self {
        Self {
            username: None,
            password: None,
            not_sync_mtime: false,
            connect_timeout_secs: default_timeout_secs(),
            keepalive_interval_secs: default_keepalive_secs(),
            known_hosts_path: None,
            retry_count: default_retry_count(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl SftpSettings {
    /// Fill absent credentials from the environment.
    pub fn with_env_credentials(mut self) -> Self {
        if self.username.is_none() {
            self.username = std::env::var(USERNAME_ENV).ok();
        }
        if self.password.is_none() {
            self.password = std::env::var(PASSWORD_ENV).ok();
        }
        self
    }

    pub(crate) fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_count, Duration::from_millis(self.retry_delay_ms))
    }
}

// ── Session diagnostics ──────────────────────────────────────────────────────

/// Point-in-time description of one pooled session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub host: String,
    pub port: u16,
    pub auth_method: String,
    pub connected_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub operations_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults_from_empty_json() {
        let settings: SftpSettings = serde_json::from_str("{}").unwrap();
        assert!(settings.username.is_none());
        assert!(settings.password.is_none());
        assert!(!settings.not_sync_mtime);
        assert_eq!(settings.connect_timeout_secs, 30);
        assert_eq!(settings.keepalive_interval_secs, 60);
        assert_eq!(settings.retry_count, 3);
        assert_eq!(settings.retry_delay_ms, 2000);
    }

    #[test]
    fn test_settings_camel_case_keys() {
        let settings: SftpSettings =
            serde_json::from_str(r#"{"username":"demo","notSyncMtime":true,"retryCount":5}"#)
                .unwrap();
        assert_eq!(settings.username.as_deref(), Some("demo"));
        assert!(settings.not_sync_mtime);
        assert_eq!(settings.retry_count, 5);
    }

    #[test]
    fn test_env_credentials_do_not_override_explicit_ones() {
        std::env::set_var(USERNAME_ENV, "env-user");
        let settings = SftpSettings {
            username: Some("explicit".into()),
            ..SftpSettings::default()
        }
        .with_env_credentials();
        assert_eq!(settings.username.as_deref(), Some("explicit"));
        std::env::remove_var(USERNAME_ENV);
    }

    #[test]
    fn test_retry_policy_from_settings() {
        let settings = SftpSettings {
            retry_count: 4,
            retry_delay_ms: 10,
            ..SftpSettings::default()
        };
        let policy = settings.retry_policy();
        assert_eq!(policy.max_attempts, 4);
        assert_eq!(policy.initial_delay, Duration::from_millis(10));
    }
}

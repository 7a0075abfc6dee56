//! Sync configuration models

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Scheduler configuration persisted in settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncSettings {
    /// Whether automatic syncing runs at all
    pub enabled: bool,
    /// Periodic consistency-check interval
    pub interval_minutes: u64,
    /// Trigger a sync when the network comes back
    pub sync_on_network_reconnect: bool,
    /// Trigger one sync shortly after startup
    pub sync_on_startup: bool,
    /// Suppress success notifications for background syncs (never errors)
    pub silent_sync: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_minutes: 30,
            sync_on_network_reconnect: true,
            sync_on_startup: true,
            silent_sync: true,
        }
    }
}

/// Remote document credentials and location supplied by a settings UI.
///
/// Opaque to the record store; consumed by the remote client constructor.
/// Token scopes are not validated here - the remote rejecting the token
/// surfaces as `Unauthorized`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConfig {
    /// Bearer token for the remote API
    pub token: String,
    /// Repository in `owner/name` form
    pub repository: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Path of the catalog document within the repository
    #[serde(default = "default_file_path")]
    pub file_path: String,
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_file_path() -> String {
    "books.json".to_string()
}

impl RemoteConfig {
    pub fn new(token: impl Into<String>, repository: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            repository: repository.into(),
            branch: default_branch(),
            file_path: default_file_path(),
        }
    }

    /// Check whether enough is configured to attempt a sync.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.token.trim().is_empty() && !self.repository.trim().is_empty()
    }

    /// Split `repository` into `(owner, name)`.
    pub fn owner_and_name(&self) -> Result<(&str, &str)> {
        match self.repository.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() => Ok((owner, name)),
            _ => Err(Error::InvalidInput(format!(
                "repository must be in owner/name form, got '{}'",
                self.repository
            ))),
        }
    }
}

impl fmt::Debug for RemoteConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("RemoteConfig")
            .field("token", &"[REDACTED]")
            .field("repository", &self.repository)
            .field("branch", &self.branch)
            .field("file_path", &self.file_path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_settings_defaults() {
        let settings = SyncSettings::default();
        assert!(settings.enabled);
        assert_eq!(settings.interval_minutes, 30);
        assert!(settings.silent_sync);
    }

    #[test]
    fn test_remote_config_defaults() {
        let config = RemoteConfig::new("ghp_secret", "alice/books");
        assert_eq!(config.branch, "main");
        assert_eq!(config.file_path, "books.json");
        assert!(config.is_configured());
    }

    #[test]
    fn test_remote_config_requires_token_and_repository() {
        let config = RemoteConfig::new("  ", "alice/books");
        assert!(!config.is_configured());

        let config = RemoteConfig::new("ghp_secret", "");
        assert!(!config.is_configured());
    }

    #[test]
    fn test_owner_and_name_rejects_malformed_repository() {
        let config = RemoteConfig::new("ghp_secret", "alice/books");
        assert_eq!(config.owner_and_name().unwrap(), ("alice", "books"));

        let config = RemoteConfig::new("ghp_secret", "just-a-name");
        assert!(config.owner_and_name().is_err());
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = RemoteConfig::new("ghp_secret", "alice/books");
        let debug = format!("{config:?}");
        assert!(!debug.contains("ghp_secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}

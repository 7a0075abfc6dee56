//! Settings repository implementation
//!
//! Small key-value map holding the sync watermark, the recorded remote
//! document version, the remote credentials blob, and the scheduler
//! configuration. Components receive these explicitly at construction;
//! nothing reaches into ambient state.

use libsql::Connection;

use crate::error::Result;
use crate::models::{RemoteConfig, SyncSettings};

const WATERMARK_KEY: &str = "last_sync_at";
const DATA_VERSION_KEY: &str = "data_version";
const REMOTE_CONFIG_KEY: &str = "remote_config";
const SYNC_SETTINGS_KEY: &str = "sync_settings";

/// Trait for settings storage operations (async)
#[allow(async_fn_in_trait)]
pub trait SettingsRepository {
    /// Get a raw setting value
    async fn get_setting(&self, key: &str) -> Result<Option<String>>;

    /// Save a raw setting value
    async fn save_setting(&self, key: &str, value: &str) -> Result<()>;
}

/// libSQL implementation of `SettingsRepository`
pub struct LibSqlSettingsRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlSettingsRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// The sync watermark: log entries at or below it are already
    /// reflected remotely. `None` means "never synced".
    pub async fn watermark(&self) -> Result<Option<i64>> {
        Ok(self
            .get_setting(WATERMARK_KEY)
            .await?
            .and_then(|value| value.parse().ok()))
    }

    pub async fn set_watermark(&self, timestamp_ms: i64) -> Result<()> {
        self.save_setting(WATERMARK_KEY, &timestamp_ms.to_string())
            .await
    }

    /// The remote document version recorded by the last pull or push.
    pub async fn data_version(&self) -> Result<Option<i64>> {
        Ok(self
            .get_setting(DATA_VERSION_KEY)
            .await?
            .and_then(|value| value.parse().ok()))
    }

    pub async fn set_data_version(&self, version: i64) -> Result<()> {
        self.save_setting(DATA_VERSION_KEY, &version.to_string())
            .await
    }

    pub async fn remote_config(&self) -> Result<Option<RemoteConfig>> {
        match self.get_setting(REMOTE_CONFIG_KEY).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn save_remote_config(&self, config: &RemoteConfig) -> Result<()> {
        let raw = serde_json::to_string(config)?;
        self.save_setting(REMOTE_CONFIG_KEY, &raw).await
    }

    /// Scheduler configuration; defaults apply when nothing is stored.
    pub async fn sync_settings(&self) -> Result<SyncSettings> {
        match self.get_setting(SYNC_SETTINGS_KEY).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(SyncSettings::default()),
        }
    }

    pub async fn save_sync_settings(&self, settings: &SyncSettings) -> Result<()> {
        let raw = serde_json::to_string(settings)?;
        self.save_setting(SYNC_SETTINGS_KEY, &raw).await
    }
}

impl SettingsRepository for LibSqlSettingsRepository<'_> {
    async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query("SELECT value FROM settings WHERE key = ?", [key])
            .await?;

        if let Some(row) = rows.next().await? {
            let value: String = row.get(0)?;
            Ok(Some(value))
        } else {
            Ok(None)
        }
    }

    async fn save_setting(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)",
                [key, value],
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_watermark_defaults_to_never_synced() {
        let db = setup().await;
        let repo = LibSqlSettingsRepository::new(db.connection());

        assert_eq!(repo.watermark().await.unwrap(), None);

        repo.set_watermark(1_700_000_000_000).await.unwrap();
        assert_eq!(repo.watermark().await.unwrap(), Some(1_700_000_000_000));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_data_version_round_trips() {
        let db = setup().await;
        let repo = LibSqlSettingsRepository::new(db.connection());

        assert_eq!(repo.data_version().await.unwrap(), None);
        repo.set_data_version(7).await.unwrap();
        assert_eq!(repo.data_version().await.unwrap(), Some(7));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_remote_config_round_trips() {
        let db = setup().await;
        let repo = LibSqlSettingsRepository::new(db.connection());

        assert!(repo.remote_config().await.unwrap().is_none());

        let config = RemoteConfig::new("ghp_secret", "alice/books");
        repo.save_remote_config(&config).await.unwrap();

        let loaded = repo.remote_config().await.unwrap().unwrap();
        assert_eq!(loaded, config);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_sync_settings_default_when_missing() {
        let db = setup().await;
        let repo = LibSqlSettingsRepository::new(db.connection());

        let settings = repo.sync_settings().await.unwrap();
        assert_eq!(settings, SyncSettings::default());

        let custom = SyncSettings {
            interval_minutes: 5,
            silent_sync: false,
            ..SyncSettings::default()
        };
        repo.save_sync_settings(&custom).await.unwrap();
        assert_eq!(repo.sync_settings().await.unwrap(), custom);
    }
}

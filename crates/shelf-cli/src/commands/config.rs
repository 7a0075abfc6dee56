use std::path::Path;

use shelf_core::db::LibSqlSettingsRepository;
use shelf_core::models::RemoteConfig;

use crate::cli::ConfigCommands;
use crate::commands::common::open_database;
use crate::error::CliError;

pub async fn run_config(command: ConfigCommands, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let settings = LibSqlSettingsRepository::new(db.connection());

    match command {
        ConfigCommands::SetRemote {
            token,
            repository,
            branch,
            file_path,
        } => {
            let config = RemoteConfig {
                token,
                repository,
                branch,
                file_path,
            };
            // Reject obviously broken values before persisting them
            config.owner_and_name()?;
            settings.save_remote_config(&config).await?;
            println!(
                "Remote configured: {} ({} / {})",
                config.repository, config.branch, config.file_path
            );
        }
        ConfigCommands::SetSchedule {
            enabled,
            interval_minutes,
            sync_on_reconnect,
            sync_on_startup,
            silent,
        } => {
            let mut schedule = settings.sync_settings().await?;
            if let Some(enabled) = enabled {
                schedule.enabled = enabled;
            }
            if let Some(minutes) = interval_minutes {
                schedule.interval_minutes = minutes.max(1);
            }
            if let Some(reconnect) = sync_on_reconnect {
                schedule.sync_on_network_reconnect = reconnect;
            }
            if let Some(startup) = sync_on_startup {
                schedule.sync_on_startup = startup;
            }
            if let Some(silent) = silent {
                schedule.silent_sync = silent;
            }
            settings.save_sync_settings(&schedule).await?;
            println!(
                "Schedule: enabled={} every {}m, reconnect={}, startup={}, silent={}",
                schedule.enabled,
                schedule.interval_minutes,
                schedule.sync_on_network_reconnect,
                schedule.sync_on_startup,
                schedule.silent_sync
            );
        }
        ConfigCommands::Show => {
            match settings.remote_config().await? {
                Some(config) => {
                    println!("Remote:   {} ({} / {})", config.repository, config.branch, config.file_path);
                    println!("Token:    [REDACTED]");
                }
                None => println!("Remote:   not configured"),
            }
            let schedule = settings.sync_settings().await?;
            println!(
                "Schedule: enabled={} every {}m, reconnect={}, startup={}, silent={}",
                schedule.enabled,
                schedule.interval_minutes,
                schedule.sync_on_network_reconnect,
                schedule.sync_on_startup,
                schedule.silent_sync
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_set_remote_persists_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("catalog.db");

        run_config(
            ConfigCommands::SetRemote {
                token: "ghp_secret".to_string(),
                repository: "alice/books".to_string(),
                branch: "main".to_string(),
                file_path: "books.json".to_string(),
            },
            &db_path,
        )
        .await
        .unwrap();

        let db = open_database(&db_path).await.unwrap();
        let settings = LibSqlSettingsRepository::new(db.connection());
        let config = settings.remote_config().await.unwrap().unwrap();
        assert_eq!(config.repository, "alice/books");
        assert_eq!(config.token, "ghp_secret");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_set_remote_rejects_malformed_repository() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("catalog.db");

        let error = run_config(
            ConfigCommands::SetRemote {
                token: "ghp_secret".to_string(),
                repository: "no-owner".to_string(),
                branch: "main".to_string(),
                file_path: "books.json".to_string(),
            },
            &db_path,
        )
        .await
        .unwrap_err();
        assert!(matches!(
            error,
            CliError::Core(shelf_core::Error::InvalidInput(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_set_schedule_merges_partial_flags() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("catalog.db");

        run_config(
            ConfigCommands::SetSchedule {
                enabled: None,
                interval_minutes: Some(5),
                sync_on_reconnect: None,
                sync_on_startup: Some(false),
                silent: None,
            },
            &db_path,
        )
        .await
        .unwrap();

        let db = open_database(&db_path).await.unwrap();
        let settings = LibSqlSettingsRepository::new(db.connection());
        let schedule = settings.sync_settings().await.unwrap();
        assert!(schedule.enabled);
        assert_eq!(schedule.interval_minutes, 5);
        assert!(!schedule.sync_on_startup);
        assert!(schedule.silent_sync);
    }
}

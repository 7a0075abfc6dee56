use std::path::Path;

use shelf_core::db::{BookRepository, LibSqlBookRepository, LibSqlSettingsRepository};
use shelf_core::sync::{AutoSyncScheduler, SyncEvent, SyncOutcome, SyncReport};

use crate::cli::SyncCommands;
use crate::commands::common::{build_engine, format_sync_timestamp, open_database};
use crate::error::CliError;

pub async fn run_sync(command: Option<SyncCommands>, db_path: &Path) -> Result<(), CliError> {
    match command {
        // Bare `shelf sync` is an explicit user action: bypass the
        // too-recent gate and bring both sides together
        None => {
            let db = open_database(db_path).await?;
            let engine = build_engine(&db).await?;
            if !engine.is_configured() {
                return Err(CliError::SyncNotConfigured);
            }
            let report = engine.sync(true).await?;
            println!("{}", describe_report(&report));
            Ok(())
        }
        Some(SyncCommands::Push { force }) => {
            let db = open_database(db_path).await?;
            let engine = build_engine(&db).await?;
            if !engine.is_configured() {
                return Err(CliError::SyncNotConfigured);
            }
            let report = engine.sync_to_remote(force).await?;
            println!("{}", describe_report(&report));
            Ok(())
        }
        Some(SyncCommands::Pull { force }) => {
            let db = open_database(db_path).await?;
            let engine = build_engine(&db).await?;
            if !engine.is_configured() {
                return Err(CliError::SyncNotConfigured);
            }
            let report = engine.sync_from_remote(force).await?;
            println!("{}", describe_report(&report));
            Ok(())
        }
        Some(SyncCommands::Status) => run_status(db_path).await,
        Some(SyncCommands::Watch) => run_watch(db_path).await,
    }
}

async fn run_status(db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let settings = LibSqlSettingsRepository::new(db.connection());
    let repo = LibSqlBookRepository::new(db.connection());

    let watermark = settings.watermark().await?;
    let pending = repo.operations_since(watermark).await?.len();
    let books = repo.list_all().await?.len();

    println!("Books:           {books}");
    println!("Pending changes: {pending}");
    match watermark {
        Some(timestamp) => println!("Last sync:       {}", format_sync_timestamp(timestamp)),
        None => println!("Last sync:       never"),
    }
    if let Some(version) = settings.data_version().await? {
        println!("Remote version:  {version}");
    }

    let engine = build_engine(&db).await?;
    if engine.is_configured() {
        match engine.check_consistency().await {
            Ok(report) if report.consistent => println!("Remote:          consistent"),
            Ok(report) => {
                println!(
                    "Remote:          diverged ({} local / {} remote, {} mismatched)",
                    report.local_count,
                    report.remote_count,
                    report.mismatched.len()
                );
            }
            Err(error) => println!("Remote:          unreachable ({error})"),
        }
    } else {
        println!("Remote:          not configured");
    }

    Ok(())
}

async fn run_watch(db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let engine = build_engine(&db).await?;
    if !engine.is_configured() {
        return Err(CliError::SyncNotConfigured);
    }

    let settings = LibSqlSettingsRepository::new(db.connection());
    let sync_settings = settings.sync_settings().await?;

    let scheduler = AutoSyncScheduler::new(engine, sync_settings);
    scheduler.on_status_change(|event| report_event(event));
    scheduler.start();

    println!("Watching for changes; press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;
    println!("Stopped.");
    Ok(())
}

fn report_event(event: &SyncEvent) {
    match &event.outcome {
        SyncOutcome::Completed(report) => println!("{}", describe_report(report)),
        SyncOutcome::Failed { message, .. } => eprintln!("Sync failed: {message}"),
    }
}

fn describe_report(report: &SyncReport) -> String {
    match report {
        SyncReport::Pushed { changes } => format!("Pushed {changes} change(s)"),
        SyncReport::Pulled {
            added,
            updated,
            total,
            from_seed,
        } => {
            if *from_seed {
                format!("Remote unreachable; seeded {added} book(s) from the bundled snapshot")
            } else {
                format!("Pulled {total} book(s): {added} added, {updated} updated")
            }
        }
        SyncReport::Skipped(reason) => format!("Sync skipped: {reason}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_report_wording() {
        assert_eq!(
            describe_report(&SyncReport::Pushed { changes: 3 }),
            "Pushed 3 change(s)"
        );
        assert_eq!(
            describe_report(&SyncReport::Pulled {
                added: 2,
                updated: 1,
                total: 3,
                from_seed: false
            }),
            "Pulled 3 book(s): 2 added, 1 updated"
        );
        assert!(describe_report(&SyncReport::Pulled {
            added: 2,
            updated: 0,
            total: 2,
            from_seed: true
        })
        .contains("bundled snapshot"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_sync_requires_remote_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("catalog.db");

        let error = run_sync(None, &db_path).await.unwrap_err();
        assert!(matches!(error, CliError::SyncNotConfigured));
    }
}

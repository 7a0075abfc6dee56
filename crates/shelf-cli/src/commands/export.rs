use std::path::Path;

use shelf_core::db::{BookRepository, LibSqlBookRepository};
use shelf_core::export::{render_export, ExportFormat as CoreFormat};

use crate::cli::ExportFormat;
use crate::commands::common::open_database;
use crate::error::CliError;

pub async fn run_export(
    format: ExportFormat,
    output_path: Option<&Path>,
    db_path: &Path,
) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let repo = LibSqlBookRepository::new(db.connection());
    let books = repo.list_all().await?;

    let core_format = match format {
        ExportFormat::Json => CoreFormat::Json,
        ExportFormat::Csv => CoreFormat::Csv,
    };
    let rendered = render_export(&books, core_format)?;

    if let Some(path) = output_path {
        std::fs::write(path, rendered)?;
        println!("{}", path.display());
    } else {
        println!("{rendered}");
    }

    Ok(())
}

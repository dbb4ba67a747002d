use anyhow::Result;
use rusqlite::Connection;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::commands::store;
use crate::config::resolve_db_path;
use crate::model::StoreStatus;
use crate::util::print_json;

pub fn run(args: StatusArgs) -> Result<()> {
    let db_path = resolve_db_path(&args.store);
    let db_path_label = db_path.display().to_string();

    let status = if db_path.exists() {
        let connection = store::open_store(&db_path)?;
        store_status(&connection, &db_path_label)?
    } else {
        warn!(path = %db_path_label, "database missing");
        StoreStatus {
            db_path: db_path_label,
            projects: 0,
            active_characters: 0,
            retired_characters: 0,
            flags: 0,
            dismissed_flags: 0,
        }
    };

    info!(
        path = %status.db_path,
        projects = status.projects,
        active_characters = status.active_characters,
        retired_characters = status.retired_characters,
        flags = status.flags,
        dismissed_flags = status.dismissed_flags,
        "database status"
    );

    print_json(&status)
}

pub(crate) fn store_status(connection: &Connection, db_path: &str) -> Result<StoreStatus> {
    Ok(StoreStatus {
        db_path: db_path.to_string(),
        projects: store::count_rows(connection, "SELECT COUNT(*) FROM projects")?,
        active_characters: store::count_rows(
            connection,
            "SELECT COUNT(*) FROM characters WHERE merged_into_id IS NULL",
        )?,
        retired_characters: store::count_rows(
            connection,
            "SELECT COUNT(*) FROM characters WHERE merged_into_id IS NOT NULL",
        )?,
        flags: store::count_rows(connection, "SELECT COUNT(*) FROM flags")?,
        dismissed_flags: store::count_rows(
            connection,
            "SELECT COUNT(*) FROM flags WHERE dismissed = 1",
        )?,
    })
}

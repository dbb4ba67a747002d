use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

use crate::cli::DismissArgs;
use crate::commands::{Workspace, load_analyzer, store};
use crate::model::DismissOutcome;
use crate::util::print_json;
use crate::voice::PatternTables;

pub fn run(args: DismissArgs) -> Result<()> {
    let workspace = Workspace::open(&args.store)?;
    let outcome = dismiss_flag(
        &workspace.connection,
        &workspace.tables,
        &args.character_id,
        &args.flag_id,
    )?;

    info!(
        character_id = %args.character_id,
        flag_id = %outcome.flag.id,
        consistency_score = outcome.consistency_score,
        "dismissed consistency flag"
    );

    print_json(&outcome)
}

pub(crate) fn dismiss_flag(
    connection: &Connection,
    tables: &PatternTables,
    character_id: &str,
    flag_id: &str,
) -> Result<DismissOutcome> {
    let character = store::require_character(connection, character_id)?;
    let analyzer = load_analyzer(connection, tables, &character)?;

    let (flag, consistency_score) = analyzer.dismiss(flag_id, &character.id)?;
    store::mark_flag_dismissed(connection, &flag)?;

    Ok(DismissOutcome {
        flag,
        consistency_score,
    })
}

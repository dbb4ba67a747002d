use anyhow::Result;
use rusqlite::Connection;
use tracing::{info, warn};

use crate::cli::FlagsArgs;
use crate::commands::{Workspace, load_analyzer, store};
use crate::model::FlagList;
use crate::util::print_json;
use crate::voice::{PatternTables, compute_score};

pub fn run(args: FlagsArgs) -> Result<()> {
    let workspace = Workspace::open(&args.store)?;
    let list = character_flags(
        &workspace.connection,
        &workspace.tables,
        &args.character_id,
        args.active_only,
    )?;

    info!(
        character_id = %list.character_id,
        flags = list.flags.len(),
        consistency_score = list.consistency_score,
        "listed consistency flags"
    );

    print_json(&list)
}

/// Flags for a character; the score always counts every active flag even
/// when dismissed flags are filtered from the listing.
pub(crate) fn character_flags(
    connection: &Connection,
    tables: &PatternTables,
    character_id: &str,
    active_only: bool,
) -> Result<FlagList> {
    let character = store::require_character(connection, character_id)?;
    let analyzer = load_analyzer(connection, tables, &character)?;

    let assessed = analyzer.flags(&character);
    if assessed.is_degraded() {
        warn!(
            character_id = %character.id,
            lines = character.dialogue_line_count,
            "flags computed from low dialogue volume"
        );
    }
    let consistency_score = compute_score(&assessed.value);
    let flags = if active_only {
        assessed
            .value
            .into_iter()
            .filter(|flag| !flag.dismissed)
            .collect()
    } else {
        assessed.value
    };

    Ok(FlagList {
        character_id: character.id,
        consistency_score,
        warning: assessed.warning,
        flags,
    })
}

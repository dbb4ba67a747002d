use anyhow::Result;
use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::cli::ProfileArgs;
use crate::commands::{Workspace, load_analyzer, store};
use crate::util::print_json;
use crate::voice::{Dimension, PatternTables, VoiceProfile};

pub fn run(args: ProfileArgs) -> Result<()> {
    let workspace = Workspace::open(&args.store)?;
    let profile = character_profile(&workspace.connection, &workspace.tables, &args.character_id)?;

    if let Some(warning) = &profile.warning {
        warn!(character_id = %profile.character_id, %warning, "profile is degraded");
    }
    for dimension in Dimension::ALL {
        debug!(
            %dimension,
            quotes = profile.dimension(dimension).representative_quotes.len(),
            "profile dimension"
        );
    }
    info!(
        character_id = %profile.character_id,
        consistency_score = profile.consistency_score,
        "generated voice profile"
    );

    print_json(&profile)
}

pub(crate) fn character_profile(
    connection: &Connection,
    tables: &PatternTables,
    character_id: &str,
) -> Result<VoiceProfile> {
    let character = store::require_character(connection, character_id)?;
    let analyzer = load_analyzer(connection, tables, &character)?;
    Ok(analyzer.generate_profile(&character))
}

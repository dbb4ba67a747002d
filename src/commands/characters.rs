use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

use crate::cli::CharactersArgs;
use crate::commands::{Workspace, store};
use crate::util::print_json;
use crate::voice::{Character, CharacterView};

pub fn run(args: CharactersArgs) -> Result<()> {
    let workspace = Workspace::open(&args.store)?;
    let characters = list_characters(&workspace.connection, &args.project_id)?;

    info!(
        project_id = %args.project_id,
        characters = characters.len(),
        "listed characters"
    );

    print_json(&characters)
}

/// Active characters of a project in extraction order.
pub(crate) fn list_characters(
    connection: &Connection,
    project_id: &str,
) -> Result<Vec<CharacterView>> {
    store::require_project(connection, project_id)?;
    let characters = store::list_active_characters(connection, project_id)?;
    Ok(characters.iter().map(Character::view).collect())
}

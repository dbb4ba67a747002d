use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::info;

use crate::cli::MergeArgs;
use crate::commands::{Workspace, store};
use crate::model::MergeSummary;
use crate::util::print_json;
use crate::voice::{Character, VoiceError, merge_characters};

pub fn run(args: MergeArgs) -> Result<()> {
    let mut workspace = Workspace::open(&args.store)?;
    let summary = merge_in_project(
        &mut workspace.connection,
        &args.project_id,
        &args.first,
        &args.second,
    )?;

    info!(
        project_id = %args.project_id,
        merged_id = %summary.character.id,
        lines = summary.character.dialogue_line_count,
        "merged characters"
    );

    print_json(&summary)
}

fn project_character(
    connection: &Connection,
    project_id: &str,
    character_id: &str,
) -> Result<Character> {
    let character = store::require_character(connection, character_id)?;
    if character.project_id != project_id {
        return Err(VoiceError::character_not_found(character_id).into());
    }
    Ok(character)
}

/// Merge two active characters of a project, persisting the new character
/// and tombstoning both inputs in one transaction.
pub(crate) fn merge_in_project(
    connection: &mut Connection,
    project_id: &str,
    first_id: &str,
    second_id: &str,
) -> Result<MergeSummary> {
    store::require_project(connection, project_id)?;
    if first_id == second_id {
        return Err(VoiceError::InvalidArgument(
            "cannot merge a character with itself".to_string(),
        )
        .into());
    }

    let first = project_character(connection, project_id, first_id)?;
    let second = project_character(connection, project_id, second_id)?;
    let outcome = merge_characters(&first, &second)?;

    let tx = connection
        .transaction()
        .context("failed to start merge transaction")?;
    store::insert_character(&tx, &outcome.merged)?;
    for retired in &outcome.retired {
        store::record_tombstone(&tx, retired)?;
    }
    tx.commit().context("failed to commit merge transaction")?;

    Ok(MergeSummary {
        character: outcome.merged.view(),
        merged_character_ids: outcome
            .retired
            .iter()
            .map(|character| character.id.clone())
            .collect(),
    })
}

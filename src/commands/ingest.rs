use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::info;
use uuid::Uuid;

use crate::cli::IngestArgs;
use crate::commands::{Workspace, store};
use crate::model::{IngestSummary, ProjectRecord};
use crate::util::{now_utc_string, print_json, sha256_files, write_json_pretty};
use crate::voice::{Character, DialogueExtractor, PatternTables, build_characters};

const UNTITLED: &str = "Untitled manuscript";
pub(crate) const NO_DIALOGUE_MESSAGE: &str = "No attributed dialogue found in manuscript.";

pub fn run(args: IngestArgs) -> Result<()> {
    let mut workspace = Workspace::open(&args.store)?;

    info!(
        db_path = %workspace.db_path.display(),
        chapters = args.chapters.len(),
        force = args.force,
        "starting ingest"
    );

    let chapters = store::read_chapter_files(&args.chapters)?;
    let source_sha256 = sha256_files(&args.chapters)?;
    let title = match (&args.title, args.chapters.first()) {
        (Some(title), _) => title.clone(),
        (None, Some(first)) => default_title(first),
        (None, None) => UNTITLED.to_string(),
    };

    let summary = ingest_manuscript(
        &mut workspace.connection,
        &workspace.tables,
        &title,
        &chapters,
        &source_sha256,
        args.force,
    )?;

    if let Some(summary_path) = &args.summary_path {
        write_json_pretty(summary_path, &summary)?;
        info!(path = %summary_path.display(), "wrote ingest summary");
    }

    print_json(&summary)
}

fn default_title(first_chapter: &Path) -> String {
    first_chapter
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| UNTITLED.to_string())
}

pub(crate) fn word_count(chapters: &[String]) -> usize {
    chapters
        .iter()
        .map(|chapter| chapter.split_whitespace().count())
        .sum()
}

/// Store a manuscript and its extracted characters.
///
/// A manuscript whose digest matches an earlier project is not stored again
/// unless `force` is set; the earlier project's active characters are
/// returned instead.
pub(crate) fn ingest_manuscript(
    connection: &mut Connection,
    tables: &PatternTables,
    title: &str,
    chapters: &[String],
    source_sha256: &str,
    force: bool,
) -> Result<IngestSummary> {
    if !force {
        if let Some(project) = store::find_project_by_source(connection, source_sha256)? {
            let characters = store::list_active_characters(connection, &project.id)?;
            info!(
                project_id = %project.id,
                characters = characters.len(),
                "manuscript already ingested; reusing project"
            );
            return Ok(summarize(project, &characters, true));
        }
    }

    let extractor = DialogueExtractor::new(tables)?;
    let project = ProjectRecord {
        id: Uuid::new_v4().to_string(),
        title: title.to_string(),
        chapter_count: chapters.len(),
        word_count: word_count(chapters),
        source_sha256: source_sha256.to_string(),
        created_at: now_utc_string(),
    };

    let characters = build_characters(&project.id, extractor.extract(chapters));

    let tx = connection
        .transaction()
        .context("failed to start ingest transaction")?;
    store::insert_project(&tx, &project, chapters)?;
    for character in &characters {
        store::insert_character(&tx, character)?;
    }
    tx.commit().context("failed to commit ingest transaction")?;

    info!(
        project_id = %project.id,
        chapters = project.chapter_count,
        words = project.word_count,
        characters = characters.len(),
        "ingested manuscript"
    );

    Ok(summarize(project, &characters, false))
}

fn summarize(
    project: ProjectRecord,
    characters: &[Character],
    reused_existing: bool,
) -> IngestSummary {
    let message = characters.is_empty().then(|| NO_DIALOGUE_MESSAGE.to_string());

    IngestSummary {
        project_id: project.id,
        title: project.title,
        chapter_count: project.chapter_count,
        word_count: project.word_count,
        source_sha256: project.source_sha256,
        reused_existing,
        characters: characters.iter().map(Character::view).collect(),
        message,
        generated_at: now_utc_string(),
    }
}

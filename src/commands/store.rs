use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, params};

use crate::model::ProjectRecord;
use crate::util::ensure_directory;
use crate::voice::{
    Character, ConsistencyFlag, DialogueLine, ManuscriptLocation, Severity, VoiceError,
};

const DB_SCHEMA_VERSION: &str = "1";
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

pub fn open_store(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        ensure_directory(parent)?;
    }
    let connection = Connection::open(db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    configure_connection(&connection)?;
    ensure_schema(&connection)?;
    Ok(connection)
}

fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .busy_timeout(BUSY_TIMEOUT)
        .context("failed to set busy timeout")?;
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    connection
        .pragma_update(None, "foreign_keys", "ON")
        .context("failed to enable foreign_keys")?;
    Ok(())
}

pub fn ensure_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
        CREATE TABLE IF NOT EXISTS metadata (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS projects (
          project_id TEXT PRIMARY KEY,
          title TEXT NOT NULL,
          chapter_count INTEGER NOT NULL,
          word_count INTEGER NOT NULL,
          source_sha256 TEXT NOT NULL,
          created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS chapters (
          project_id TEXT NOT NULL,
          chapter_index INTEGER NOT NULL,
          text TEXT NOT NULL,
          PRIMARY KEY(project_id, chapter_index),
          FOREIGN KEY(project_id) REFERENCES projects(project_id)
        );

        CREATE TABLE IF NOT EXISTS characters (
          character_id TEXT PRIMARY KEY,
          project_id TEXT NOT NULL,
          name TEXT NOT NULL,
          dialogue_line_count INTEGER NOT NULL,
          warning TEXT,
          merged_into_id TEXT,
          created_at TEXT NOT NULL,
          updated_at TEXT NOT NULL,
          FOREIGN KEY(project_id) REFERENCES projects(project_id)
        );

        CREATE TABLE IF NOT EXISTS dialogue_lines (
          character_id TEXT NOT NULL,
          line_index INTEGER NOT NULL,
          text TEXT NOT NULL,
          chapter_index INTEGER NOT NULL,
          paragraph_index INTEGER NOT NULL,
          PRIMARY KEY(character_id, line_index),
          FOREIGN KEY(character_id) REFERENCES characters(character_id)
        );

        CREATE TABLE IF NOT EXISTS flags (
          flag_id TEXT PRIMARY KEY,
          character_id TEXT NOT NULL,
          project_id TEXT NOT NULL,
          severity TEXT NOT NULL,
          dimension TEXT NOT NULL,
          chapter_index INTEGER NOT NULL,
          paragraph_index INTEGER NOT NULL,
          passage TEXT NOT NULL,
          dismissed INTEGER NOT NULL DEFAULT 0,
          created_at TEXT NOT NULL,
          updated_at TEXT NOT NULL,
          FOREIGN KEY(character_id) REFERENCES characters(character_id)
        );

        CREATE INDEX IF NOT EXISTS idx_characters_project ON characters(project_id);
        CREATE INDEX IF NOT EXISTS idx_projects_source ON projects(source_sha256);
        CREATE INDEX IF NOT EXISTS idx_flags_character ON flags(character_id);
        ",
        )
        .context("failed to create schema")?;

    connection
        .execute(
            "INSERT INTO metadata(key, value) VALUES('db_schema_version', ?1)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![DB_SCHEMA_VERSION],
        )
        .context("failed to record schema version")?;

    Ok(())
}

pub fn insert_project(
    connection: &Connection,
    project: &ProjectRecord,
    chapters: &[String],
) -> Result<()> {
    connection
        .execute(
            "INSERT INTO projects(project_id, title, chapter_count, word_count, source_sha256, created_at)
             VALUES(?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                project.id,
                project.title,
                project.chapter_count,
                project.word_count,
                project.source_sha256,
                project.created_at,
            ],
        )
        .with_context(|| format!("failed to insert project {}", project.id))?;

    let mut statement = connection
        .prepare("INSERT INTO chapters(project_id, chapter_index, text) VALUES(?1, ?2, ?3)")
        .context("failed to prepare chapter insert")?;
    for (index, text) in chapters.iter().enumerate() {
        statement
            .execute(params![project.id, index, text])
            .with_context(|| format!("failed to insert chapter {index} of {}", project.id))?;
    }

    Ok(())
}

fn project_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProjectRecord> {
    Ok(ProjectRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        chapter_count: row.get(2)?,
        word_count: row.get(3)?,
        source_sha256: row.get(4)?,
        created_at: row.get(5)?,
    })
}

pub fn load_project(connection: &Connection, project_id: &str) -> Result<Option<ProjectRecord>> {
    connection
        .query_row(
            "SELECT project_id, title, chapter_count, word_count, source_sha256, created_at
             FROM projects WHERE project_id = ?1",
            params![project_id],
            project_from_row,
        )
        .optional()
        .with_context(|| format!("failed to load project {project_id}"))
}

pub fn require_project(connection: &Connection, project_id: &str) -> Result<ProjectRecord> {
    match load_project(connection, project_id)? {
        Some(project) => Ok(project),
        None => Err(VoiceError::NotFound {
            kind: "project",
            id: project_id.to_string(),
        }
        .into()),
    }
}

pub fn find_project_by_source(
    connection: &Connection,
    source_sha256: &str,
) -> Result<Option<ProjectRecord>> {
    connection
        .query_row(
            "SELECT project_id, title, chapter_count, word_count, source_sha256, created_at
             FROM projects WHERE source_sha256 = ?1
             ORDER BY created_at DESC LIMIT 1",
            params![source_sha256],
            project_from_row,
        )
        .optional()
        .context("failed to look up project by source hash")
}

pub fn insert_character(connection: &Connection, character: &Character) -> Result<()> {
    connection
        .execute(
            "INSERT INTO characters(
               character_id, project_id, name, dialogue_line_count, warning,
               merged_into_id, created_at, updated_at
             ) VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                character.id,
                character.project_id,
                character.name,
                character.dialogue_line_count,
                character.warning,
                character.merged_into_id,
                character.created_at,
                character.updated_at,
            ],
        )
        .with_context(|| format!("failed to insert character {}", character.name))?;

    let mut statement = connection
        .prepare(
            "INSERT INTO dialogue_lines(character_id, line_index, text, chapter_index, paragraph_index)
             VALUES(?1, ?2, ?3, ?4, ?5)",
        )
        .context("failed to prepare dialogue line insert")?;
    for (index, line) in character.dialogue_lines.iter().enumerate() {
        statement
            .execute(params![
                character.id,
                index,
                line.text,
                line.chapter_index,
                line.paragraph_index,
            ])
            .with_context(|| {
                format!("failed to insert dialogue line {index} of {}", character.name)
            })?;
    }

    Ok(())
}

fn load_dialogue_lines(connection: &Connection, character_id: &str) -> Result<Vec<DialogueLine>> {
    let mut statement = connection
        .prepare(
            "SELECT text, chapter_index, paragraph_index FROM dialogue_lines
             WHERE character_id = ?1 ORDER BY line_index",
        )
        .context("failed to prepare dialogue line query")?;
    let rows = statement
        .query_map(params![character_id], |row| {
            Ok(DialogueLine {
                text: row.get(0)?,
                chapter_index: row.get(1)?,
                paragraph_index: row.get(2)?,
            })
        })
        .with_context(|| format!("failed to query dialogue lines of {character_id}"))?;

    rows.collect::<rusqlite::Result<Vec<DialogueLine>>>()
        .with_context(|| format!("failed to read dialogue lines of {character_id}"))
}

struct CharacterRow {
    id: String,
    project_id: String,
    name: String,
    dialogue_line_count: usize,
    warning: Option<String>,
    merged_into_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

const CHARACTER_COLUMNS: &str = "character_id, project_id, name, dialogue_line_count, warning, \
     merged_into_id, created_at, updated_at";

fn character_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CharacterRow> {
    Ok(CharacterRow {
        id: row.get(0)?,
        project_id: row.get(1)?,
        name: row.get(2)?,
        dialogue_line_count: row.get(3)?,
        warning: row.get(4)?,
        merged_into_id: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn hydrate_character(connection: &Connection, row: CharacterRow) -> Result<Character> {
    let dialogue_lines = load_dialogue_lines(connection, &row.id)?;
    if dialogue_lines.len() != row.dialogue_line_count {
        bail!(
            "character {} stores {} dialogue lines but records a count of {}",
            row.id,
            dialogue_lines.len(),
            row.dialogue_line_count
        );
    }

    Ok(Character {
        id: row.id,
        project_id: row.project_id,
        name: row.name,
        dialogue_lines,
        dialogue_line_count: row.dialogue_line_count,
        warning: row.warning,
        merged_into_id: row.merged_into_id,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

pub fn load_character(connection: &Connection, character_id: &str) -> Result<Option<Character>> {
    let row = connection
        .query_row(
            &format!("SELECT {CHARACTER_COLUMNS} FROM characters WHERE character_id = ?1"),
            params![character_id],
            character_row,
        )
        .optional()
        .with_context(|| format!("failed to load character {character_id}"))?;

    row.map(|row| hydrate_character(connection, row)).transpose()
}

/// Active character by ID; unknown and merged-away IDs are `NotFound`.
pub fn require_character(connection: &Connection, character_id: &str) -> Result<Character> {
    let character = load_character(connection, character_id)?
        .ok_or_else(|| VoiceError::character_not_found(character_id))?;
    Ok(character.ensure_active()?)
}

pub fn list_active_characters(connection: &Connection, project_id: &str) -> Result<Vec<Character>> {
    let mut statement = connection
        .prepare(&format!(
            "SELECT {CHARACTER_COLUMNS} FROM characters
             WHERE project_id = ?1 AND merged_into_id IS NULL
             ORDER BY created_at, rowid"
        ))
        .context("failed to prepare character listing")?;
    let rows = statement
        .query_map(params![project_id], character_row)
        .with_context(|| format!("failed to list characters of {project_id}"))?
        .collect::<rusqlite::Result<Vec<CharacterRow>>>()
        .with_context(|| format!("failed to read characters of {project_id}"))?;

    rows.into_iter()
        .map(|row| hydrate_character(connection, row))
        .collect()
}

pub fn record_tombstone(connection: &Connection, retired: &Character) -> Result<()> {
    let updated = connection
        .execute(
            "UPDATE characters SET merged_into_id = ?1, updated_at = ?2
             WHERE character_id = ?3 AND merged_into_id IS NULL",
            params![retired.merged_into_id, retired.updated_at, retired.id],
        )
        .with_context(|| format!("failed to retire character {}", retired.id))?;
    if updated != 1 {
        bail!("character {} was already retired", retired.id);
    }
    Ok(())
}

pub fn insert_flags(connection: &Connection, flags: &[ConsistencyFlag]) -> Result<()> {
    let mut statement = connection
        .prepare(
            "INSERT OR IGNORE INTO flags(
               flag_id, character_id, project_id, severity, dimension, chapter_index,
               paragraph_index, passage, dismissed, created_at, updated_at
             ) VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )
        .context("failed to prepare flag insert")?;
    for flag in flags {
        statement
            .execute(params![
                flag.id,
                flag.character_id,
                flag.project_id,
                flag.severity.as_str(),
                flag.dimension,
                flag.manuscript_location.chapter,
                flag.manuscript_location.paragraph,
                flag.passage,
                flag.dismissed,
                flag.created_at,
                flag.updated_at,
            ])
            .with_context(|| format!("failed to insert flag {}", flag.id))?;
    }
    Ok(())
}

fn parse_severity(index: usize, value: String) -> rusqlite::Result<Severity> {
    Severity::parse(&value).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            index,
            Type::Text,
            format!("unknown severity: {value}").into(),
        )
    })
}

pub fn load_flags(connection: &Connection, character_id: &str) -> Result<Vec<ConsistencyFlag>> {
    let mut statement = connection
        .prepare(
            "SELECT flag_id, character_id, project_id, severity, dimension, chapter_index,
                    paragraph_index, passage, dismissed, created_at, updated_at
             FROM flags WHERE character_id = ?1 ORDER BY rowid",
        )
        .context("failed to prepare flag query")?;

    let rows = statement
        .query_map(params![character_id], |row| {
            Ok(ConsistencyFlag {
                id: row.get(0)?,
                character_id: row.get(1)?,
                project_id: row.get(2)?,
                severity: parse_severity(3, row.get(3)?)?,
                dimension: row.get(4)?,
                manuscript_location: ManuscriptLocation {
                    chapter: row.get(5)?,
                    paragraph: row.get(6)?,
                },
                passage: row.get(7)?,
                dismissed: row.get(8)?,
                created_at: row.get(9)?,
                updated_at: row.get(10)?,
            })
        })
        .with_context(|| format!("failed to query flags of {character_id}"))?;

    rows.collect::<rusqlite::Result<Vec<ConsistencyFlag>>>()
        .with_context(|| format!("failed to read flags of {character_id}"))
}

pub fn mark_flag_dismissed(connection: &Connection, flag: &ConsistencyFlag) -> Result<()> {
    connection
        .execute(
            "UPDATE flags SET dismissed = 1, updated_at = ?1 WHERE flag_id = ?2 AND dismissed = 0",
            params![flag.updated_at, flag.id],
        )
        .with_context(|| format!("failed to dismiss flag {}", flag.id))?;
    Ok(())
}

pub fn count_rows(connection: &Connection, sql: &str) -> Result<i64> {
    connection
        .query_row(sql, [], |row| row.get(0))
        .with_context(|| format!("failed to count rows: {sql}"))
}

pub fn read_chapter_files<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<String>> {
    paths
        .iter()
        .map(|path| {
            let path = path.as_ref();
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
        })
        .collect()
}

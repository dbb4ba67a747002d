use std::fs;

use rusqlite::Connection;

use super::characters::list_characters;
use super::dismiss::dismiss_flag;
use super::flags::character_flags;
use super::ingest::{NO_DIALOGUE_MESSAGE, ingest_manuscript, word_count};
use super::merge::merge_in_project;
use super::profile::character_profile;
use super::status::store_status;
use super::*;
use crate::model::IngestSummary;
use crate::util::sha256_files;
use crate::voice::VoiceError;

const SARAH_LINES: [&str; 11] = [
    "The weather is pleasant today",
    "The garden looks lovely",
    "We walked along the river",
    "The train arrives at noon",
    "My sister lives in the city",
    "The bakery opens early",
    "Bring the blue umbrella",
    "Dinner will be ready soon",
    "The letter came this morning",
    "Yo dude, totally awesome",
    "Nah, whatever, gonna chill",
];

const ELIZABETH_LINES: [&str; 3] = [
    "Indeed, we shall proceed",
    "Certainly, we must examine it",
    "Consequently, we shall determine it",
];

fn memory_store() -> Connection {
    let connection = Connection::open_in_memory().expect("in-memory database opens");
    store::ensure_schema(&connection).expect("schema applies");
    connection
}

fn manuscript() -> Vec<String> {
    let first = SARAH_LINES
        .iter()
        .map(|line| format!("\"{line},\" said Sarah."))
        .collect::<Vec<String>>()
        .join("\n\n");
    let second = ELIZABETH_LINES
        .iter()
        .map(|line| format!("\"{line},\" said Elizabeth."))
        .chain(ELIZABETH_LINES.iter().map(|line| format!("\"{line},\" Elizabeth replied.")))
        .collect::<Vec<String>>()
        .join("\n\n");
    vec![first, second]
}

fn ingest(connection: &mut Connection) -> IngestSummary {
    ingest_manuscript(
        connection,
        &PatternTables::default(),
        "Pride",
        &manuscript(),
        "digest-1",
        false,
    )
    .expect("ingest succeeds")
}

fn character_id(summary: &IngestSummary, name: &str) -> String {
    summary
        .characters
        .iter()
        .find(|character| character.name == name)
        .map(|character| character.id.clone())
        .expect("character extracted")
}

fn voice_error(err: &anyhow::Error) -> &VoiceError {
    err.downcast_ref::<VoiceError>()
        .expect("error carries a voice error")
}

#[test]
fn ingest_persists_project_and_characters() {
    let mut connection = memory_store();
    let summary = ingest(&mut connection);

    assert!(!summary.reused_existing);
    assert!(summary.message.is_none());
    assert_eq!(summary.chapter_count, 2);
    assert_eq!(summary.word_count, word_count(&manuscript()));
    let names = summary
        .characters
        .iter()
        .map(|character| character.name.as_str())
        .collect::<Vec<&str>>();
    assert_eq!(names, vec!["Sarah", "Elizabeth"]);

    let sarah = store::require_character(&connection, &character_id(&summary, "Sarah"))
        .expect("stored character loads");
    assert_eq!(sarah.dialogue_line_count, SARAH_LINES.len());
    assert_eq!(sarah.dialogue_lines[9].text, "Yo dude, totally awesome");
    assert_eq!(sarah.dialogue_lines[9].paragraph_index, 9);
    assert!(sarah.warning.is_some());

    let elizabeth = store::require_character(&connection, &character_id(&summary, "Elizabeth"))
        .expect("stored character loads");
    assert_eq!(elizabeth.dialogue_line_count, 6);
    assert!(elizabeth.dialogue_lines.iter().all(|line| line.chapter_index == 1));
    assert_eq!(elizabeth.dialogue_lines[3].text, "Indeed, we shall proceed");

    let listed = list_characters(&connection, &summary.project_id).expect("project exists");
    assert_eq!(listed.len(), 2);
}

#[test]
fn ingest_reuses_matching_manuscript_unless_forced() {
    let mut connection = memory_store();
    let first = ingest(&mut connection);
    let again = ingest(&mut connection);

    assert!(again.reused_existing);
    assert_eq!(again.project_id, first.project_id);
    assert_eq!(
        character_id(&again, "Sarah"),
        character_id(&first, "Sarah")
    );

    let forced = ingest_manuscript(
        &mut connection,
        &PatternTables::default(),
        "Pride",
        &manuscript(),
        "digest-1",
        true,
    )
    .expect("forced ingest succeeds");
    assert!(!forced.reused_existing);
    assert_ne!(forced.project_id, first.project_id);
    assert_eq!(
        store_status(&connection, ":memory:")
            .expect("counts load")
            .projects,
        2
    );
}

#[test]
fn ingest_without_dialogue_reports_message() {
    let mut connection = memory_store();
    let summary = ingest_manuscript(
        &mut connection,
        &PatternTables::default(),
        "Quiet",
        &["No one spoke at all.\n\nThe house was still.".to_string()],
        "digest-quiet",
        false,
    )
    .expect("ingest succeeds");

    assert!(summary.characters.is_empty());
    assert_eq!(summary.message.as_deref(), Some(NO_DIALOGUE_MESSAGE));
    assert_eq!(summary.word_count, 9);
}

#[test]
fn chapter_files_hash_and_read_in_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let one = dir.path().join("one.txt");
    let two = dir.path().join("two.txt");
    fs::write(&one, "\"Hello,\" said Sarah.").expect("write chapter");
    fs::write(&two, "\"Goodbye,\" said John.").expect("write chapter");

    let chapters = store::read_chapter_files(&[&one, &two]).expect("chapters read");
    assert_eq!(chapters[1], "\"Goodbye,\" said John.");

    let forward = sha256_files(&[&one, &two]).expect("hash");
    let reversed = sha256_files(&[&two, &one]).expect("hash");
    assert_eq!(forward.len(), 64);
    assert_ne!(forward, reversed);
    assert_eq!(forward, sha256_files(&[&one, &two]).expect("hash"));

    assert!(store::read_chapter_files(&[dir.path().join("missing.txt")]).is_err());
}

#[test]
fn open_store_creates_database_under_cache_root() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("nested").join("voiceprint.sqlite");

    let connection = store::open_store(&db_path).expect("store opens");
    assert!(db_path.exists());
    let status = store_status(&connection, &db_path.display().to_string()).expect("counts load");
    assert_eq!(status.projects, 0);
    assert_eq!(status.active_characters, 0);
}

#[test]
fn flag_ids_survive_a_fresh_analyzer() {
    let mut connection = memory_store();
    let summary = ingest(&mut connection);
    let sarah = character_id(&summary, "Sarah");
    let tables = PatternTables::default();

    let first = character_flags(&connection, &tables, &sarah, false).expect("flags load");
    assert_eq!(first.flags.len(), 2);
    assert_eq!(first.consistency_score, 50.0);
    assert!(first.warning.is_some());
    assert_eq!(first.flags[0].passage, "Yo dude, totally awesome");
    assert_eq!(first.flags[0].manuscript_location.paragraph, 9);

    let second = character_flags(&connection, &tables, &sarah, false).expect("flags load");
    assert_eq!(second.flags, first.flags);

    let elizabeth = character_id(&summary, "Elizabeth");
    let uniform = character_flags(&connection, &tables, &elizabeth, false).expect("flags load");
    assert!(uniform.flags.is_empty());
    assert_eq!(uniform.consistency_score, 100.0);
}

#[test]
fn dismissal_persists_and_raises_score() {
    let mut connection = memory_store();
    let summary = ingest(&mut connection);
    let sarah = character_id(&summary, "Sarah");
    let tables = PatternTables::default();

    let flags = character_flags(&connection, &tables, &sarah, false).expect("flags load");
    let target = flags.flags[0].id.clone();

    let outcome = dismiss_flag(&connection, &tables, &sarah, &target).expect("dismiss succeeds");
    assert!(outcome.flag.dismissed);
    assert_eq!(outcome.consistency_score, 75.0);

    let repeat = dismiss_flag(&connection, &tables, &sarah, &target).expect("dismiss succeeds");
    assert_eq!(repeat.consistency_score, 75.0);
    assert_eq!(repeat.flag.updated_at, outcome.flag.updated_at);

    let active = character_flags(&connection, &tables, &sarah, true).expect("flags load");
    assert_eq!(active.flags.len(), 1);
    assert_eq!(active.consistency_score, 75.0);

    let profile = character_profile(&connection, &tables, &sarah).expect("profile builds");
    assert_eq!(profile.consistency_score, 75.0);

    let status = store_status(&connection, ":memory:").expect("counts load");
    assert_eq!(status.flags, 2);
    assert_eq!(status.dismissed_flags, 1);
}

#[test]
fn dismissing_unknown_flag_is_not_found() {
    let mut connection = memory_store();
    let summary = ingest(&mut connection);
    let sarah = character_id(&summary, "Sarah");

    let err = dismiss_flag(&connection, &PatternTables::default(), &sarah, "missing")
        .expect_err("unknown flag");
    assert!(matches!(
        voice_error(&err),
        VoiceError::NotFound { kind: "flag", .. }
    ));
}

#[test]
fn profile_of_unknown_character_is_not_found() {
    let connection = memory_store();
    let err = character_profile(&connection, &PatternTables::default(), "nobody")
        .expect_err("unknown character");
    assert!(matches!(
        voice_error(&err),
        VoiceError::NotFound {
            kind: "character",
            ..
        }
    ));

    let err = list_characters(&connection, "no-project").expect_err("unknown project");
    assert!(matches!(
        voice_error(&err),
        VoiceError::NotFound { kind: "project", .. }
    ));
}

#[test]
fn profile_reports_dimensions_from_stored_dialogue() {
    let mut connection = memory_store();
    let summary = ingest(&mut connection);
    let sarah = character_id(&summary, "Sarah");

    let profile = character_profile(&connection, &PatternTables::default(), &sarah)
        .expect("profile builds");
    assert_eq!(profile.character_id, sarah);
    assert_eq!(profile.project_id, summary.project_id);
    assert_eq!(profile.consistency_score, 50.0);
    assert!(profile.warning.is_some());
    assert_eq!(profile.formality.representative_quotes.len(), 5);
    assert!(
        profile
            .formality
            .representative_quotes
            .iter()
            .all(|quote| SARAH_LINES.contains(&quote.as_str()))
    );
}

#[test]
fn merge_tombstones_inputs_and_lists_new_character() {
    let mut connection = memory_store();
    let summary = ingest(&mut connection);
    let sarah = character_id(&summary, "Sarah");
    let elizabeth = character_id(&summary, "Elizabeth");

    let merged = merge_in_project(&mut connection, &summary.project_id, &sarah, &elizabeth)
        .expect("merge succeeds");
    assert_eq!(merged.character.name, "Elizabeth");
    assert_eq!(merged.character.dialogue_line_count, 17);
    assert!(merged.character.warning.is_some());
    assert_eq!(merged.merged_character_ids, vec![sarah.clone(), elizabeth.clone()]);

    let listed = list_characters(&connection, &summary.project_id).expect("project exists");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, merged.character.id);

    let stored = store::load_character(&connection, &sarah)
        .expect("load succeeds")
        .expect("tombstone kept");
    assert_eq!(stored.merged_into_id.as_deref(), Some(merged.character.id.as_str()));

    let err = character_profile(&connection, &PatternTables::default(), &sarah)
        .expect_err("retired character");
    assert!(matches!(voice_error(&err), VoiceError::NotFound { .. }));

    let err = merge_in_project(
        &mut connection,
        &summary.project_id,
        &merged.character.id,
        &elizabeth,
    )
    .expect_err("retired input");
    assert!(matches!(voice_error(&err), VoiceError::NotFound { .. }));

    let status = store_status(&connection, ":memory:").expect("counts load");
    assert_eq!(status.active_characters, 1);
    assert_eq!(status.retired_characters, 2);
}

#[test]
fn merge_rejects_self_and_foreign_characters() {
    let mut connection = memory_store();
    let summary = ingest(&mut connection);
    let sarah = character_id(&summary, "Sarah");

    let err = merge_in_project(&mut connection, &summary.project_id, &sarah, &sarah)
        .expect_err("self merge");
    assert!(matches!(voice_error(&err), VoiceError::InvalidArgument(_)));

    let other = ingest_manuscript(
        &mut connection,
        &PatternTables::default(),
        "Other",
        &["\"Hello,\" said John.".to_string()],
        "digest-2",
        false,
    )
    .expect("ingest succeeds");
    let john = character_id(&other, "John");

    let err = merge_in_project(&mut connection, &summary.project_id, &sarah, &john)
        .expect_err("foreign character");
    assert!(matches!(
        voice_error(&err),
        VoiceError::NotFound {
            kind: "character",
            ..
        }
    ));
}

#[test]
fn concurrent_first_flag_requests_persist_one_flag_set() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("voiceprint.sqlite");
    let mut connection = store::open_store(&db_path).expect("store opens");
    let tables = PatternTables::default();

    for round in 0..5 {
        let summary = ingest_manuscript(
            &mut connection,
            &tables,
            "Pride",
            &manuscript(),
            "digest-1",
            true,
        )
        .expect("ingest succeeds");
        let sarah = character_id(&summary, "Sarah");

        let lists = std::thread::scope(|scope| {
            let handles = (0..4)
                .map(|_| {
                    scope.spawn(|| {
                        let connection = store::open_store(&db_path).expect("store opens");
                        character_flags(&connection, &tables, &sarah, false).expect("flags load")
                    })
                })
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("thread completes"))
                .collect::<Vec<_>>()
        });

        let stored = store::load_flags(&connection, &sarah).expect("flags stored");
        assert_eq!(stored.len(), 2, "round {round}");
        for list in &lists {
            assert_eq!(list.consistency_score, 50.0, "round {round}");
            assert_eq!(list.flags, stored, "round {round}");
        }
    }
}

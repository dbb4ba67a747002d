use serde::{Deserialize, Serialize};

use crate::voice::{CharacterView, ConsistencyFlag};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: String,
    pub title: String,
    pub chapter_count: usize,
    pub word_count: usize,
    pub source_sha256: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestSummary {
    pub project_id: String,
    pub title: String,
    pub chapter_count: usize,
    pub word_count: usize,
    pub source_sha256: String,
    pub reused_existing: bool,
    pub characters: Vec<CharacterView>,
    pub message: Option<String>,
    pub generated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MergeSummary {
    pub character: CharacterView,
    pub merged_character_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlagList {
    pub character_id: String,
    pub consistency_score: f64,
    pub warning: Option<String>,
    pub flags: Vec<ConsistencyFlag>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DismissOutcome {
    pub flag: ConsistencyFlag,
    pub consistency_score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreStatus {
    pub db_path: String,
    pub projects: i64,
    pub active_characters: i64,
    pub retired_characters: i64,
    pub flags: i64,
    pub dismissed_flags: i64,
}

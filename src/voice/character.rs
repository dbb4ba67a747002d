use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use super::error::VoiceError;

/// Characters with fewer lines than this get a reliability warning.
pub const MIN_RELIABLE_LINES: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DialogueLine {
    pub text: String,
    pub chapter_index: usize,
    pub paragraph_index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub dialogue_lines: Vec<DialogueLine>,
    pub dialogue_line_count: usize,
    pub warning: Option<String>,
    /// Tombstone: set once this character has been merged into another.
    pub merged_into_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The part of a character handed to API callers.
#[derive(Debug, Clone, Serialize)]
pub struct CharacterView {
    pub id: String,
    pub name: String,
    pub dialogue_line_count: usize,
    pub warning: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub merged: Character,
    /// Tombstoned copies of both inputs, pointing at `merged`.
    pub retired: Vec<Character>,
}

pub fn low_volume_warning(line_count: usize) -> Option<String> {
    (line_count < MIN_RELIABLE_LINES).then(|| {
        format!(
            "Character has only {line_count} dialogue lines. Voice profile may be inaccurate."
        )
    })
}

impl Character {
    pub fn new(project_id: &str, name: &str, dialogue_lines: Vec<DialogueLine>) -> Self {
        let now = Utc::now();
        let dialogue_line_count = dialogue_lines.len();
        Self {
            id: Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            name: name.to_string(),
            warning: low_volume_warning(dialogue_line_count),
            dialogue_lines,
            dialogue_line_count,
            merged_into_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_retired(&self) -> bool {
        self.merged_into_id.is_some()
    }

    /// Reject characters that have been merged away.
    pub fn ensure_active(self) -> Result<Self, VoiceError> {
        if self.is_retired() {
            return Err(VoiceError::character_not_found(&self.id));
        }
        Ok(self)
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.dialogue_lines.iter().map(|line| line.text.as_str())
    }

    pub fn view(&self) -> CharacterView {
        CharacterView {
            id: self.id.clone(),
            name: self.name.clone(),
            dialogue_line_count: self.dialogue_line_count,
            warning: self.warning.clone(),
        }
    }
}

/// One character per extracted name, in first-seen order.
pub fn build_characters(
    project_id: &str,
    extracted: IndexMap<String, Vec<DialogueLine>>,
) -> Vec<Character> {
    extracted
        .into_iter()
        .map(|(name, lines)| {
            let character = Character::new(project_id, &name, lines);
            if character.warning.is_some() {
                warn!(
                    character = %character.name,
                    lines = character.dialogue_line_count,
                    "low dialogue volume"
                );
            }
            character
        })
        .collect()
}

/// Combine two characters into a new one named after `second`.
///
/// Neither input is modified; the outcome carries tombstoned copies for the
/// caller to persist.
pub fn merge_characters(first: &Character, second: &Character) -> Result<MergeOutcome, VoiceError> {
    if first.id == second.id {
        return Err(VoiceError::InvalidArgument(
            "cannot merge a character with itself".to_string(),
        ));
    }
    for character in [first, second] {
        if character.is_retired() {
            return Err(VoiceError::character_not_found(&character.id));
        }
    }
    if first.project_id != second.project_id {
        return Err(VoiceError::InvalidArgument(format!(
            "characters {} and {} belong to different projects",
            first.id, second.id
        )));
    }

    let combined = first
        .dialogue_lines
        .iter()
        .chain(second.dialogue_lines.iter())
        .cloned()
        .collect::<Vec<DialogueLine>>();
    let merged = Character::new(&second.project_id, &second.name, combined);

    let retired = [first, second]
        .into_iter()
        .map(|character| Character {
            merged_into_id: Some(merged.id.clone()),
            updated_at: merged.created_at,
            ..character.clone()
        })
        .collect();

    debug!(
        merged_id = %merged.id,
        first = %first.id,
        second = %second.id,
        lines = merged.dialogue_line_count,
        "merged characters"
    );

    Ok(MergeOutcome { merged, retired })
}

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::character::{Character, DialogueLine};
use super::metrics::{NEUTRAL_FORMALITY, StyleMetrics};
use super::quotes::Dimension;

const INFORMAL_OUTLIER_MAX: f64 = 0.25;
const FORMAL_OUTLIER_MIN: f64 = 0.75;
const BASELINE_PIVOT: f64 = 0.4;
const DEVIATION_FLAG: f64 = 0.35;
const DEVIATION_HIGH: f64 = 0.5;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    /// Score points deducted while a flag of this severity is active.
    pub fn penalty(self) -> f64 {
        match self {
            Self::Low => 5.0,
            Self::Medium => 15.0,
            Self::High => 25.0,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ManuscriptLocation {
    pub chapter: usize,
    pub paragraph: usize,
}

impl From<&DialogueLine> for ManuscriptLocation {
    fn from(line: &DialogueLine) -> Self {
        Self {
            chapter: line.chapter_index,
            paragraph: line.paragraph_index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyFlag {
    pub id: String,
    pub character_id: String,
    pub project_id: String,
    pub severity: Severity,
    pub dimension: String,
    pub manuscript_location: ManuscriptLocation,
    pub passage: String,
    pub dismissed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Severity for a line scoring `score` against the character's `mean`, or
/// `None` when the line is in voice.
pub fn classify(score: f64, mean: f64) -> Option<Severity> {
    let deviation = (score - mean).abs();

    if score <= INFORMAL_OUTLIER_MAX && mean >= BASELINE_PIVOT {
        Some(if score == 0.0 {
            Severity::High
        } else {
            Severity::Medium
        })
    } else if score >= FORMAL_OUTLIER_MIN && mean <= BASELINE_PIVOT {
        Some(Severity::High)
    } else if deviation >= DEVIATION_FLAG {
        Some(if deviation >= DEVIATION_HIGH {
            Severity::High
        } else {
            Severity::Medium
        })
    } else {
        None
    }
}

/// Flag every distinct line whose formality strays from the character's
/// mean. Each text is judged once, at its first location.
pub fn detect_flags(character: &Character, metrics: &StyleMetrics) -> Vec<ConsistencyFlag> {
    let mut first_seen = IndexMap::<&str, &DialogueLine>::new();
    for line in &character.dialogue_lines {
        first_seen.entry(line.text.as_str()).or_insert(line);
    }

    let scored = first_seen
        .iter()
        .map(|(text, line)| (*line, metrics.formality_score(text)))
        .collect::<Vec<(&DialogueLine, f64)>>();
    let mean = if scored.is_empty() {
        NEUTRAL_FORMALITY
    } else {
        scored.iter().map(|(_, score)| score).sum::<f64>() / scored.len() as f64
    };

    let now = Utc::now();
    let flags = scored
        .into_iter()
        .filter_map(|(line, score)| {
            classify(score, mean).map(|severity| ConsistencyFlag {
                id: Uuid::new_v4().to_string(),
                character_id: character.id.clone(),
                project_id: character.project_id.clone(),
                severity,
                dimension: Dimension::Formality.as_str().to_string(),
                manuscript_location: ManuscriptLocation::from(line),
                passage: line.text.clone(),
                dismissed: false,
                created_at: now,
                updated_at: now,
            })
        })
        .collect::<Vec<ConsistencyFlag>>();

    debug!(
        character_id = %character.id,
        unique_lines = first_seen.len(),
        mean_formality = mean,
        flags = flags.len(),
        "generated consistency flags"
    );

    flags
}

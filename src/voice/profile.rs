use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::cache::VoiceCache;
use super::character::{Character, MIN_RELIABLE_LINES};
use super::error::{Assessed, VoiceError};
use super::flags::{ConsistencyFlag, detect_flags};
use super::metrics::{StyleMetrics, avg_sentence_length, avg_word_length};
use super::patterns::PatternTables;
use super::quotes::{Dimension, select_quotes, unique_texts};

/// Lines used for the descriptive statistics of a profile.
const PROFILE_SAMPLE_LINES: usize = 20;
const FORMAL_LABEL_MIN: f64 = 0.65;
const INFORMAL_LABEL_MAX: f64 = 0.35;
const PERFECT_SCORE: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceDimension {
    pub description: String,
    pub representative_quotes: Vec<String>,
}

/// The expensive, stable part of a profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileContent {
    pub vocabulary_level: VoiceDimension,
    pub sentence_structure: VoiceDimension,
    pub verbal_tics: VoiceDimension,
    pub formality: VoiceDimension,
    pub warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceProfile {
    pub character_id: String,
    pub project_id: String,
    pub vocabulary_level: VoiceDimension,
    pub sentence_structure: VoiceDimension,
    pub verbal_tics: VoiceDimension,
    pub formality: VoiceDimension,
    pub consistency_score: f64,
    pub warning: Option<String>,
}

impl VoiceProfile {
    pub fn dimension(&self, dimension: Dimension) -> &VoiceDimension {
        match dimension {
            Dimension::VocabularyLevel => &self.vocabulary_level,
            Dimension::SentenceStructure => &self.sentence_structure,
            Dimension::VerbalTics => &self.verbal_tics,
            Dimension::Formality => &self.formality,
        }
    }
}

/// 100 minus the penalties of every active flag, floored at 0.
pub fn compute_score(flags: &[ConsistencyFlag]) -> f64 {
    let penalty = flags
        .iter()
        .filter(|flag| !flag.dismissed)
        .map(|flag| flag.severity.penalty())
        .sum::<f64>();
    (PERFECT_SCORE - penalty).max(0.0)
}

fn formality_label(mean: f64) -> &'static str {
    if mean >= FORMAL_LABEL_MIN {
        "formal"
    } else if mean <= INFORMAL_LABEL_MAX {
        "informal"
    } else {
        "neutral"
    }
}

/// Builds profiles and flags for characters and owns the dismissal flow.
#[derive(Debug, Clone)]
pub struct VoiceAnalyzer {
    metrics: StyleMetrics,
    cache: Arc<VoiceCache>,
}

impl VoiceAnalyzer {
    pub fn new(tables: &PatternTables, cache: Arc<VoiceCache>) -> Result<Self, VoiceError> {
        Ok(Self {
            metrics: StyleMetrics::new(tables)?,
            cache,
        })
    }

    /// Load flags produced by an earlier run so their IDs stay stable.
    pub fn seed_flags(&self, character_id: &str, flags: Vec<ConsistencyFlag>) -> bool {
        self.cache.seed_flags(character_id, flags)
    }

    fn cached_or_generated_flags(&self, character: &Character) -> Arc<[ConsistencyFlag]> {
        self.cache
            .flags_or_generate(&character.id, || detect_flags(character, &self.metrics))
    }

    fn with_dismissal(&self, flag: &ConsistencyFlag) -> ConsistencyFlag {
        let mut flag = flag.clone();
        if let Some(dismissed_at) = self.cache.dismissed_at(&flag.id) {
            flag.dismissed = true;
            flag.updated_at = dismissed_at;
        }
        flag
    }

    fn current_flags(&self, flags: &[ConsistencyFlag]) -> Vec<ConsistencyFlag> {
        flags.iter().map(|flag| self.with_dismissal(flag)).collect()
    }

    /// All flags for the character with their current dismissal state.
    pub fn flags(&self, character: &Character) -> Assessed<Vec<ConsistencyFlag>> {
        let flags = self.cached_or_generated_flags(character);
        Assessed::new(self.current_flags(&flags), character.warning.clone())
    }

    pub fn consistency_score(&self, character: &Character) -> f64 {
        let flags = self.cached_or_generated_flags(character);
        compute_score(&self.current_flags(&flags))
    }

    /// Profile for the character. Dimension content is computed once per
    /// character; the score is recomputed on every call.
    pub fn generate_profile(&self, character: &Character) -> VoiceProfile {
        let content = self
            .cache
            .content_or_build(&character.id, || self.build_content(character));
        let consistency_score = self.consistency_score(character);

        VoiceProfile {
            character_id: character.id.clone(),
            project_id: character.project_id.clone(),
            vocabulary_level: content.vocabulary_level.clone(),
            sentence_structure: content.sentence_structure.clone(),
            verbal_tics: content.verbal_tics.clone(),
            formality: content.formality.clone(),
            consistency_score,
            warning: content.warning.clone(),
        }
    }

    /// Mark a flag dismissed and return it with the recomputed score.
    /// Dismissing an already dismissed flag changes nothing.
    pub fn dismiss(
        &self,
        flag_id: &str,
        character_id: &str,
    ) -> Result<(ConsistencyFlag, f64), VoiceError> {
        let flags = self
            .cache
            .cached_flags(character_id)
            .ok_or_else(|| VoiceError::flag_not_found(flag_id))?;
        if !flags.iter().any(|flag| flag.id == flag_id) {
            return Err(VoiceError::flag_not_found(flag_id));
        }

        self.cache.dismiss(flag_id);

        let current = self.current_flags(&flags);
        let score = compute_score(&current);
        let flag = current
            .into_iter()
            .find(|flag| flag.id == flag_id)
            .ok_or_else(|| VoiceError::flag_not_found(flag_id))?;

        debug!(flag_id, character_id, score, "dismissed flag");
        Ok((flag, score))
    }

    fn build_content(&self, character: &Character) -> ProfileContent {
        let texts = character.texts().collect::<Vec<&str>>();
        let sample = &texts[..texts.len().min(PROFILE_SAMPLE_LINES)];
        let unique = unique_texts(texts.iter().copied());

        let quotes = |dimension| select_quotes(&self.metrics, &unique, dimension);

        let avg_word_len = avg_word_length(&sample.join(" "));
        let avg_sentence_len = avg_sentence_length(sample);
        let tics = self
            .metrics
            .detect_verbal_tics(sample)
            .iter()
            .map(|tic| tic.label())
            .collect::<Vec<String>>();
        let mean_formality = self.metrics.mean_formality(sample);

        let tic_summary = if tics.is_empty() {
            "none detected".to_string()
        } else {
            tics.join(", ")
        };

        let warning = (character.dialogue_line_count < MIN_RELIABLE_LINES).then(|| {
            format!(
                "Only {} dialogue lines available. Profile may not be fully representative.",
                character.dialogue_line_count
            )
        });

        debug!(
            character_id = %character.id,
            unique_lines = unique.len(),
            "built voice profile content"
        );

        ProfileContent {
            vocabulary_level: VoiceDimension {
                description: format!("Average word length: {avg_word_len:.1} characters"),
                representative_quotes: quotes(Dimension::VocabularyLevel),
            },
            sentence_structure: VoiceDimension {
                description: format!("Average sentence length: {avg_sentence_len:.1} words"),
                representative_quotes: quotes(Dimension::SentenceStructure),
            },
            verbal_tics: VoiceDimension {
                description: format!("Recurring patterns: {tic_summary}"),
                representative_quotes: quotes(Dimension::VerbalTics),
            },
            formality: VoiceDimension {
                description: format!(
                    "Overall formality: {} (score: {mean_formality:.2})",
                    formality_label(mean_formality)
                ),
                representative_quotes: quotes(Dimension::Formality),
            },
            warning,
        }
    }
}

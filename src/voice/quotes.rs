use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::metrics::{StyleMetrics, avg_word_length};

pub const MIN_QUOTES: usize = 3;
pub const MAX_QUOTES: usize = 5;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    VocabularyLevel,
    SentenceStructure,
    VerbalTics,
    Formality,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Self::VocabularyLevel,
        Self::SentenceStructure,
        Self::VerbalTics,
        Self::Formality,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::VocabularyLevel => "vocabulary_level",
            Self::SentenceStructure => "sentence_structure",
            Self::VerbalTics => "verbal_tics",
            Self::Formality => "formality",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Distinct texts in first-occurrence order.
pub fn unique_texts<'a, I>(texts: I) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    texts.into_iter().filter(|text| seen.insert(*text)).collect()
}

/// Pick up to five representative quotes for `dimension`.
///
/// `texts` must already be deduplicated. Fewer than three unique texts are
/// returned as-is.
pub fn select_quotes(metrics: &StyleMetrics, texts: &[&str], dimension: Dimension) -> Vec<String> {
    let mut ranked = match dimension {
        Dimension::VocabularyLevel => rank_descending(texts, avg_word_length),
        Dimension::SentenceStructure => {
            rank_descending(texts, |text| text.split_whitespace().count() as f64)
        }
        Dimension::VerbalTics => {
            let tics = metrics.detect_verbal_tics(texts);
            rank_descending(texts, |text| metrics.tic_occurrences(text, &tics) as f64)
        }
        Dimension::Formality => rank_descending(texts, |text| metrics.formality_score(text)),
    };

    let count = ranked.len().clamp(MIN_QUOTES, MAX_QUOTES).min(ranked.len());
    ranked.truncate(count);
    ranked.into_iter().map(str::to_string).collect()
}

/// Stable sort, highest key first.
fn rank_descending<'a, F>(texts: &[&'a str], key: F) -> Vec<&'a str>
where
    F: Fn(&str) -> f64,
{
    let mut keyed = texts
        .iter()
        .map(|text| (key(text), *text))
        .collect::<Vec<(f64, &str)>>();
    keyed.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
    keyed.into_iter().map(|(_, text)| text).collect()
}

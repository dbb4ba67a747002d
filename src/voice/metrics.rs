use std::collections::HashSet;

use indexmap::IndexMap;
use regex::Regex;

use super::error::VoiceError;
use super::patterns::PatternTables;

pub const NEUTRAL_FORMALITY: f64 = 0.5;
const INFORMAL_WORD_WEIGHT: f64 = 0.25;
const FORMAL_WORD_WEIGHT: f64 = 0.25;
const CONTRACTION_WEIGHT: f64 = 0.10;

const TIC_MIN_TOKEN_CHARS: usize = 3;
const TIC_MIN_COUNT: usize = 2;
const TIC_LINE_SHARE: f64 = 0.15;
const MAX_SINGLE_WORD_TICS: usize = 3;
const MAX_TWO_WORD_TICS: usize = 2;
const MAX_TICS: usize = 5;

const TOKEN_PUNCTUATION: &[char] = &[
    '.', ',', '!', '?', ';', ':', '"', '\'', '(', ')', '[', ']', '\u{201C}', '\u{201D}',
    '\u{2018}', '\u{2019}', '\u{2014}', '\u{2013}', '\u{2026}',
];

/// Lowercased, punctuation-stripped whitespace tokens.
pub fn tokens(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|raw| raw.trim_matches(TOKEN_PUNCTUATION).to_lowercase())
        .filter(|token| !token.is_empty())
        .collect()
}

pub fn avg_word_length(text: &str) -> f64 {
    let tokens = tokens(text);
    if tokens.is_empty() {
        return 0.0;
    }
    let total = tokens.iter().map(|token| token.chars().count()).sum::<usize>();
    total as f64 / tokens.len() as f64
}

/// Mean whitespace-token count per line.
pub fn avg_sentence_length<S: AsRef<str>>(lines: &[S]) -> f64 {
    if lines.is_empty() {
        return 0.0;
    }
    let total = lines
        .iter()
        .map(|line| line.as_ref().split_whitespace().count())
        .sum::<usize>();
    total as f64 / lines.len() as f64
}

/// A recurring word or word pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerbalTic {
    Word(String),
    Pair(String, String),
}

impl VerbalTic {
    pub fn label(&self) -> String {
        match self {
            Self::Word(word) => word.clone(),
            Self::Pair(first, second) => format!("{first} {second}"),
        }
    }
}

/// Word-list driven measurements over dialogue text.
#[derive(Debug, Clone)]
pub struct StyleMetrics {
    informal: HashSet<String>,
    formal: HashSet<String>,
    contractions: Option<Regex>,
    stopwords: HashSet<String>,
}

impl StyleMetrics {
    pub fn new(tables: &PatternTables) -> Result<Self, VoiceError> {
        let lowered = |words: &[String]| {
            words
                .iter()
                .map(|word| word.trim().to_lowercase())
                .filter(|word| !word.is_empty())
                .collect::<HashSet<String>>()
        };

        Ok(Self {
            informal: lowered(&tables.informal_words),
            formal: lowered(&tables.formal_words),
            contractions: compile_contractions(&tables.contractions)?,
            stopwords: lowered(&tables.tic_stopwords),
        })
    }

    /// 0.0 is very informal, 1.0 very formal, 0.5 neutral.
    pub fn formality_score(&self, text: &str) -> f64 {
        let lowered = text.to_lowercase().replace('\u{2019}', "'");
        let tokens = tokens(&lowered);
        if tokens.is_empty() {
            return NEUTRAL_FORMALITY;
        }

        let informal = tokens.iter().filter(|token| self.informal.contains(*token)).count();
        let formal = tokens.iter().filter(|token| self.formal.contains(*token)).count();
        let contractions = self
            .contractions
            .as_ref()
            .map(|regex| regex.find_iter(&lowered).count())
            .unwrap_or(0);

        let score = NEUTRAL_FORMALITY - informal as f64 * INFORMAL_WORD_WEIGHT
            + formal as f64 * FORMAL_WORD_WEIGHT
            - contractions as f64 * CONTRACTION_WEIGHT;
        score.clamp(0.0, 1.0)
    }

    pub fn mean_formality<S: AsRef<str>>(&self, lines: &[S]) -> f64 {
        if lines.is_empty() {
            return NEUTRAL_FORMALITY;
        }
        let total = lines
            .iter()
            .map(|line| self.formality_score(line.as_ref()))
            .sum::<f64>();
        total / lines.len() as f64
    }

    fn tic_tokens(&self, text: &str) -> Vec<String> {
        tokens(text)
            .into_iter()
            .filter(|token| token.chars().count() >= TIC_MIN_TOKEN_CHARS)
            .collect()
    }

    /// Words and adjacent word pairs that recur in at least 15% of lines
    /// (and at least twice). Up to three words then two pairs, most
    /// frequent first.
    pub fn detect_verbal_tics<S: AsRef<str>>(&self, lines: &[S]) -> Vec<VerbalTic> {
        let mut words = IndexMap::<String, usize>::new();
        let mut pairs = IndexMap::<(String, String), usize>::new();

        for line in lines {
            let tokens = self.tic_tokens(line.as_ref());
            for token in &tokens {
                if !self.stopwords.contains(token) {
                    *words.entry(token.clone()).or_default() += 1;
                }
            }
            for window in tokens.windows(2) {
                *pairs
                    .entry((window[0].clone(), window[1].clone()))
                    .or_default() += 1;
            }
        }

        let threshold = (TIC_MIN_COUNT as f64).max(lines.len() as f64 * TIC_LINE_SHARE);

        let mut tics = most_frequent(&words, threshold, MAX_SINGLE_WORD_TICS)
            .into_iter()
            .map(VerbalTic::Word)
            .collect::<Vec<VerbalTic>>();
        tics.extend(
            most_frequent(&pairs, threshold, MAX_TWO_WORD_TICS)
                .into_iter()
                .map(|(first, second)| VerbalTic::Pair(first, second)),
        );
        tics.truncate(MAX_TICS);
        tics
    }

    /// Occurrences of any of `tics` in `text`.
    pub fn tic_occurrences(&self, text: &str, tics: &[VerbalTic]) -> usize {
        if tics.is_empty() {
            return 0;
        }
        let tokens = self.tic_tokens(text);
        tics.iter()
            .map(|tic| match tic {
                VerbalTic::Word(word) => tokens.iter().filter(|token| *token == word).count(),
                VerbalTic::Pair(first, second) => tokens
                    .windows(2)
                    .filter(|window| &window[0] == first && &window[1] == second)
                    .count(),
            })
            .sum()
    }
}

fn compile_contractions(contractions: &[String]) -> Result<Option<Regex>, VoiceError> {
    let alternatives = contractions
        .iter()
        .map(|word| word.trim().to_lowercase())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let ends_in_word_char = word
                .chars()
                .last()
                .map(|ch| ch.is_alphanumeric())
                .unwrap_or(false);
            let escaped = regex::escape(&word);
            if ends_in_word_char {
                format!("{escaped}\\b")
            } else {
                escaped
            }
        })
        .collect::<Vec<String>>();

    if alternatives.is_empty() {
        return Ok(None);
    }

    let source = format!("(?i)\\b(?:{})", alternatives.join("|"));
    Regex::new(&source)
        .map(Some)
        .map_err(|source| VoiceError::Pattern {
            rule: "contractions".to_string(),
            source,
        })
}

/// Keys meeting `threshold`, by descending count; ties keep first-seen order.
fn most_frequent<K: Clone>(counts: &IndexMap<K, usize>, threshold: f64, limit: usize) -> Vec<K> {
    let mut entries = counts.iter().collect::<Vec<(&K, &usize)>>();
    entries.sort_by(|a, b| b.1.cmp(a.1));
    entries
        .into_iter()
        .filter(|(_, count)| **count as f64 >= threshold)
        .take(limit)
        .map(|(key, _)| key.clone())
        .collect()
}

use std::ops::Range;

use indexmap::IndexMap;
use tracing::debug;

use super::character::DialogueLine;
use super::error::VoiceError;
use super::names::normalize_name;
use super::patterns::{CompiledPatterns, PatternTables};

#[derive(Debug, Clone)]
pub struct DialogueExtractor {
    patterns: CompiledPatterns,
}

#[derive(Debug)]
struct AttributedQuote {
    span: Range<usize>,
    text: String,
    raw_name: String,
}

impl DialogueExtractor {
    pub fn new(tables: &PatternTables) -> Result<Self, VoiceError> {
        Ok(Self {
            patterns: CompiledPatterns::compile(tables)?,
        })
    }

    /// Map each speaking character to their attributed lines.
    ///
    /// Names and lines keep first-seen order. Quotes without a resolvable
    /// speaker are dropped.
    pub fn extract(&self, chapters: &[String]) -> IndexMap<String, Vec<DialogueLine>> {
        let mut dialogues = IndexMap::<String, Vec<DialogueLine>>::new();

        for (chapter_index, chapter) in chapters.iter().enumerate() {
            let paragraphs = self.split_paragraphs(chapter);
            for (paragraph_index, paragraph) in paragraphs.into_iter().enumerate() {
                for quote in self.attributed_quotes(paragraph) {
                    let name = normalize_name(&quote.raw_name, &self.patterns.honorifics);
                    if name.is_empty() {
                        debug!(raw = %quote.raw_name, "discarded empty speaker name");
                        continue;
                    }

                    dialogues.entry(name).or_default().push(DialogueLine {
                        text: quote.text,
                        chapter_index,
                        paragraph_index,
                    });
                }
            }
        }

        debug!(
            chapters = chapters.len(),
            characters = dialogues.len(),
            lines = dialogues.values().map(Vec::len).sum::<usize>(),
            "dialogue extraction finished"
        );

        dialogues
    }

    pub fn split_paragraphs<'a>(&self, chapter: &'a str) -> Vec<&'a str> {
        self.patterns.paragraph_break.split(chapter).collect()
    }

    /// Matches from every rule, earlier rules winning overlaps, returned in
    /// text order.
    fn attributed_quotes(&self, paragraph: &str) -> Vec<AttributedQuote> {
        let mut accepted = Vec::<AttributedQuote>::new();

        for rule in &self.patterns.rules {
            for captures in rule.regex.captures_iter(paragraph) {
                let Some(whole) = captures.get(0) else {
                    continue;
                };
                let span = whole.range();
                if accepted
                    .iter()
                    .any(|quote| quote.span.start < span.end && span.start < quote.span.end)
                {
                    debug!(
                        rule = %rule.name,
                        start = span.start,
                        "overlapping attribution skipped"
                    );
                    continue;
                }

                let text = captures
                    .name("quote")
                    .map(|value| value.as_str().trim())
                    .unwrap_or_default();
                let raw_name = captures
                    .name("name")
                    .map(|value| value.as_str())
                    .unwrap_or_default();
                if text.is_empty() {
                    continue;
                }

                accepted.push(AttributedQuote {
                    span,
                    text: text.to_string(),
                    raw_name: raw_name.to_string(),
                });
            }
        }

        accepted.sort_by_key(|quote| quote.span.start);
        accepted
    }
}

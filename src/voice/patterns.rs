use regex::Regex;
use serde::{Deserialize, Serialize};

use super::error::VoiceError;

const QUOTE_OPEN: &str = "[\"\u{201C}]";
const QUOTE_CLOSE: &str = "[\"\u{201D}]";
const QUOTE_BODY: &str = "(?P<quote>[^\"\u{201C}\u{201D}]+?),?\\s*";
const NAME_WORD: &str = "\\p{Lu}[\\p{L}'-]*";
const PARAGRAPH_BREAK: &str = r"\r?\n[ \t]*\r?\n\s*";

/// Declarative word and pattern tables driving extraction and style metrics.
///
/// Every field falls back to the built-in table when omitted from a
/// configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternTables {
    pub speech_verbs: Vec<String>,
    pub honorifics: Vec<String>,
    pub informal_words: Vec<String>,
    pub formal_words: Vec<String>,
    pub contractions: Vec<String>,
    pub tic_stopwords: Vec<String>,
    pub attribution_rules: Vec<AttributionRule>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeakerOrder {
    /// `"..." said Name`
    VerbThenName,
    /// `"..." Name said`
    NameThenVerb,
}

/// One attribution pattern. The compiled expression always exposes the
/// quoted text as group `quote` and the raw speaker token as group `name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributionRule {
    pub name: String,
    pub order: SpeakerOrder,
    #[serde(default = "default_true")]
    pub verb_case_insensitive: bool,
}

fn default_true() -> bool {
    true
}

fn owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|word| word.to_string()).collect()
}

impl Default for PatternTables {
    fn default() -> Self {
        Self {
            speech_verbs: owned(&[
                "said",
                "replied",
                "asked",
                "exclaimed",
                "shouted",
                "whispered",
                "called",
                "answered",
                "responded",
                "added",
                "continued",
                "muttered",
                "murmured",
            ]),
            honorifics: owned(&["Mr.", "Mrs.", "Ms.", "Dr.", "Prof.", "Sir", "Lady", "Lord"]),
            informal_words: owned(&[
                "yo", "sup", "dude", "bro", "bruh", "brah", "gonna", "wanna", "gotta", "nah",
                "yeah", "yep", "yup", "whatever", "chill", "awesome", "totally", "kinda", "sorta",
                "lemme", "gimme", "ain't", "cool", "like", "hey", "ugh", "jeez", "whoa", "omg",
                "wtf", "lol", "dunno",
            ]),
            formal_words: owned(&[
                "indeed",
                "therefore",
                "thus",
                "hence",
                "furthermore",
                "moreover",
                "henceforth",
                "consequently",
                "accordingly",
                "hitherto",
                "whereupon",
                "quite",
                "rather",
                "shall",
                "ought",
                "must",
                "propose",
                "suggest",
                "believe",
                "analyze",
                "examine",
                "proceed",
                "ascertain",
                "determine",
                "certainly",
                "undoubtedly",
                "respectfully",
                "formally",
                "precisely",
                "nevertheless",
                "however",
                "nonetheless",
            ]),
            contractions: owned(&[
                "don't", "can't", "won't", "isn't", "aren't", "wasn't", "weren't", "hasn't",
                "haven't", "hadn't", "doesn't", "didn't", "couldn't", "shouldn't", "wouldn't",
                "i'm", "i'll", "i've", "i'd", "you're", "you'll", "you've", "you'd", "he's",
                "she's", "it's", "we're", "we'll", "we've", "we'd", "they're", "they'll",
                "they've", "they'd", "don'tcha", "fixin'", "lookin'", "gonna", "wanna", "gotta",
            ]),
            tic_stopwords: owned(&["the", "and", "but", "for", "not", "you", "are", "was"]),
            attribution_rules: vec![
                AttributionRule {
                    name: "verb_then_name".to_string(),
                    order: SpeakerOrder::VerbThenName,
                    verb_case_insensitive: true,
                },
                AttributionRule {
                    name: "name_then_verb".to_string(),
                    order: SpeakerOrder::NameThenVerb,
                    verb_case_insensitive: true,
                },
            ],
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub name: String,
    pub regex: Regex,
}

/// Attribution rules compiled against the configured verb and honorific
/// tables, in configuration order.
#[derive(Debug, Clone)]
pub struct CompiledPatterns {
    pub rules: Vec<CompiledRule>,
    pub paragraph_break: Regex,
    pub honorifics: Vec<String>,
}

impl CompiledPatterns {
    pub fn compile(tables: &PatternTables) -> Result<Self, VoiceError> {
        let rules = tables
            .attribution_rules
            .iter()
            .map(|rule| {
                let source = render_rule(rule, &tables.speech_verbs, &tables.honorifics);
                Regex::new(&source)
                    .map(|regex| CompiledRule {
                        name: rule.name.clone(),
                        regex,
                    })
                    .map_err(|source| VoiceError::Pattern {
                        rule: rule.name.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let paragraph_break = Regex::new(PARAGRAPH_BREAK).map_err(|source| VoiceError::Pattern {
            rule: "paragraph_break".to_string(),
            source,
        })?;

        Ok(Self {
            rules,
            paragraph_break,
            honorifics: tables.honorifics.clone(),
        })
    }
}

fn alternation(words: &[String]) -> String {
    words
        .iter()
        .map(|word| word.trim())
        .filter(|word| !word.is_empty())
        .map(regex::escape)
        .collect::<Vec<String>>()
        .join("|")
}

fn render_rule(rule: &AttributionRule, verbs: &[String], honorifics: &[String]) -> String {
    let verb_flags = if rule.verb_case_insensitive { "?i" } else { "?" };
    let verb = format!("({verb_flags}:{})", alternation(verbs));

    let honorific_prefix = if honorifics.is_empty() {
        String::new()
    } else {
        format!("(?:(?:{})[ \\t]+)?", alternation(honorifics))
    };
    let name = format!("(?P<name>{honorific_prefix}{NAME_WORD}(?:[ \\t]+{NAME_WORD})*)");

    match rule.order {
        SpeakerOrder::VerbThenName => {
            format!("{QUOTE_OPEN}{QUOTE_BODY}{QUOTE_CLOSE}\\s*{verb}\\s+{name}\\b")
        }
        SpeakerOrder::NameThenVerb => {
            format!("{QUOTE_OPEN}{QUOTE_BODY}{QUOTE_CLOSE}\\s+{name}\\s+{verb}\\b")
        }
    }
}

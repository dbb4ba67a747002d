//! Dialogue attribution, voice profiling and consistency flagging.

mod cache;
mod character;
mod error;
mod extract;
mod flags;
mod metrics;
mod names;
mod patterns;
mod profile;
mod quotes;

pub use cache::VoiceCache;
pub use character::{Character, CharacterView, DialogueLine, build_characters, merge_characters};
pub use error::VoiceError;
pub use extract::DialogueExtractor;
pub use flags::{ConsistencyFlag, ManuscriptLocation, Severity};
pub use patterns::PatternTables;
pub use profile::{VoiceAnalyzer, VoiceProfile, compute_score};
pub use quotes::Dimension;

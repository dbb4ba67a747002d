use thiserror::Error;

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed to compile {rule} pattern")]
    Pattern {
        rule: String,
        #[source]
        source: regex::Error,
    },
}

impl VoiceError {
    pub fn character_not_found(id: &str) -> Self {
        Self::NotFound {
            kind: "character",
            id: id.to_string(),
        }
    }

    pub fn flag_not_found(id: &str) -> Self {
        Self::NotFound {
            kind: "flag",
            id: id.to_string(),
        }
    }
}

/// A computed value plus an optional diagnostic.
///
/// Low dialogue volume produces a valid result with `warning` set rather
/// than an error.
#[derive(Debug, Clone)]
pub struct Assessed<T> {
    pub value: T,
    pub warning: Option<String>,
}

impl<T> Assessed<T> {
    pub fn new(value: T, warning: Option<String>) -> Self {
        Self { value, warning }
    }

    pub fn is_degraded(&self) -> bool {
        self.warning.is_some()
    }
}

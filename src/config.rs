use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::StoreArgs;
use crate::voice::PatternTables;

pub const DEFAULT_DB_FILENAME: &str = "voiceprint.sqlite";

pub fn resolve_db_path(store: &StoreArgs) -> PathBuf {
    store
        .db_path
        .clone()
        .unwrap_or_else(|| store.cache_root.join(DEFAULT_DB_FILENAME))
}

pub fn load_pattern_tables(path: Option<&Path>) -> Result<PatternTables> {
    let Some(path) = path else {
        return Ok(PatternTables::default());
    };

    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let tables: PatternTables = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse pattern tables {}", path.display()))?;

    info!(
        path = %path.display(),
        speech_verbs = tables.speech_verbs.len(),
        attribution_rules = tables.attribution_rules.len(),
        "loaded pattern tables"
    );

    Ok(tables)
}

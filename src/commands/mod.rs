pub mod characters;
pub mod dismiss;
pub mod flags;
pub mod ingest;
pub mod merge;
pub mod profile;
pub mod status;
mod store;
#[cfg(test)]
mod tests;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::debug;

use crate::cli::StoreArgs;
use crate::config::{load_pattern_tables, resolve_db_path};
use crate::voice::{Character, PatternTables, VoiceAnalyzer, VoiceCache};

/// Open store plus the pattern tables every command runs against.
pub struct Workspace {
    pub db_path: PathBuf,
    pub connection: Connection,
    pub tables: PatternTables,
}

impl Workspace {
    pub fn open(store: &StoreArgs) -> Result<Self> {
        let db_path = resolve_db_path(store);
        let tables = load_pattern_tables(store.patterns_path.as_deref())?;
        let connection = store::open_store(&db_path)?;
        Ok(Self {
            db_path,
            connection,
            tables,
        })
    }
}

/// Analyzer whose flag set for `character` matches what the store holds.
///
/// Stored flags are seeded so IDs and dismissals survive across runs; a
/// character seen for the first time gets its flags generated and persisted.
/// The read and the insert share one immediate transaction, so concurrent
/// processes persist exactly one flag set per character.
pub(crate) fn load_analyzer(
    connection: &Connection,
    tables: &PatternTables,
    character: &Character,
) -> Result<VoiceAnalyzer> {
    let analyzer = VoiceAnalyzer::new(tables, Arc::new(VoiceCache::new()))?;

    let tx = Transaction::new_unchecked(connection, TransactionBehavior::Immediate)
        .context("failed to start flag transaction")?;
    let stored = store::load_flags(&tx, &character.id)?;
    if stored.is_empty() {
        let generated = analyzer.flags(character).value;
        store::insert_flags(&tx, &generated)?;
        debug!(
            character_id = %character.id,
            flags = generated.len(),
            "generated consistency flags"
        );
    } else {
        debug!(
            character_id = %character.id,
            flags = stored.len(),
            "seeded stored consistency flags"
        );
        analyzer.seed_flags(&character.id, stored);
    }
    tx.commit().context("failed to commit flag transaction")?;

    Ok(analyzer)
}

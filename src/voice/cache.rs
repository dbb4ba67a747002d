use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError, RwLock};

use chrono::{DateTime, Utc};

use super::flags::ConsistencyFlag;
use super::profile::ProfileContent;

#[derive(Debug, Default)]
struct CharacterSlot {
    flags: OnceLock<Arc<[ConsistencyFlag]>>,
    content: OnceLock<Arc<ProfileContent>>,
}

/// Per-character derived state shared across requests.
///
/// Slots are created on first access and never evicted. Each slot's flags
/// and profile content are initialised at most once, so concurrent first
/// readers all observe the same flag IDs. Dismissals are keyed by flag ID
/// for the life of the cache.
#[derive(Debug, Default)]
pub struct VoiceCache {
    slots: Mutex<HashMap<String, Arc<CharacterSlot>>>,
    dismissed: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl VoiceCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, character_id: &str) -> Arc<CharacterSlot> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .entry(character_id.to_string())
            .or_default()
            .clone()
    }

    fn existing_slot(&self, character_id: &str) -> Option<Arc<CharacterSlot>> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.get(character_id).cloned()
    }

    /// Cached flags for the character, running `generate` only if no flags
    /// have been stored yet.
    pub fn flags_or_generate<F>(&self, character_id: &str, generate: F) -> Arc<[ConsistencyFlag]>
    where
        F: FnOnce() -> Vec<ConsistencyFlag>,
    {
        self.slot(character_id)
            .flags
            .get_or_init(|| Arc::from(generate()))
            .clone()
    }

    pub fn cached_flags(&self, character_id: &str) -> Option<Arc<[ConsistencyFlag]>> {
        self.existing_slot(character_id)
            .and_then(|slot| slot.flags.get().cloned())
    }

    /// Install previously generated flags. Returns `false` when the
    /// character already has flags in this cache; those are kept.
    pub fn seed_flags(&self, character_id: &str, flags: Vec<ConsistencyFlag>) -> bool {
        for flag in flags.iter().filter(|flag| flag.dismissed) {
            self.dismiss_at(&flag.id, flag.updated_at);
        }
        self.slot(character_id).flags.set(Arc::from(flags)).is_ok()
    }

    pub fn content_or_build<F>(&self, character_id: &str, build: F) -> Arc<ProfileContent>
    where
        F: FnOnce() -> ProfileContent,
    {
        self.slot(character_id)
            .content
            .get_or_init(|| Arc::new(build()))
            .clone()
    }

    /// Record a dismissal; returns the time of the first dismissal of
    /// `flag_id`.
    pub fn dismiss(&self, flag_id: &str) -> DateTime<Utc> {
        self.dismiss_at(flag_id, Utc::now())
    }

    fn dismiss_at(&self, flag_id: &str, at: DateTime<Utc>) -> DateTime<Utc> {
        let mut dismissed = self.dismissed.write().unwrap_or_else(PoisonError::into_inner);
        *dismissed.entry(flag_id.to_string()).or_insert(at)
    }

    pub fn dismissed_at(&self, flag_id: &str) -> Option<DateTime<Utc>> {
        let dismissed = self.dismissed.read().unwrap_or_else(PoisonError::into_inner);
        dismissed.get(flag_id).copied()
    }
}

//! crates/aura_tarot_core/src/stores.rs
//!
//! Small per-profile stores (language, AI settings, question draft, reading
//! history). Each caches one value and is re-keyed by the session whenever
//! the active profile changes.

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

use crate::domain::{AiSettings, AiSettingsPatch, Language, Reading};
use crate::identity::IdentityRegistry;
use crate::ports::{KeyValueStore, PortError, PortResult};

/// How a value is written to and read back from its storage key.
pub trait StoredValue: Clone + Default {
    /// `None` when the stored text cannot be understood.
    fn decode(raw: &str) -> Option<Self>;

    /// Whatever can still be read from a payload `decode` rejected.
    fn salvage(_raw: &str) -> Option<Self> {
        None
    }

    fn encode(&self) -> PortResult<String>;
}

impl StoredValue for Language {
    fn decode(raw: &str) -> Option<Self> {
        Language::from_code(raw)
    }

    fn encode(&self) -> PortResult<String> {
        Ok(self.code().to_string())
    }
}

/// Plain text, stored verbatim.
impl StoredValue for String {
    fn decode(raw: &str) -> Option<Self> {
        Some(raw.to_string())
    }

    fn encode(&self) -> PortResult<String> {
        Ok(self.clone())
    }
}

fn decode_json<T: DeserializeOwned>(raw: &str) -> Option<T> {
    serde_json::from_str(raw).ok()
}

fn encode_json<T: Serialize>(value: &T) -> PortResult<String> {
    serde_json::to_string(value).map_err(|e| PortError::Unexpected(e.to_string()))
}

impl StoredValue for AiSettings {
    fn decode(raw: &str) -> Option<Self> {
        decode_json(raw)
    }

    fn encode(&self) -> PortResult<String> {
        encode_json(self)
    }
}

impl StoredValue for Vec<Reading> {
    fn decode(raw: &str) -> Option<Self> {
        decode_json(raw)
    }

    /// Keeps the entries that still decode on their own.
    fn salvage(raw: &str) -> Option<Self> {
        let entries: Vec<serde_json::Value> = decode_json(raw)?;
        Some(
            entries
                .into_iter()
                .filter_map(|entry| serde_json::from_value(entry).ok())
                .collect(),
        )
    }

    fn encode(&self) -> PortResult<String> {
        encode_json(self)
    }
}

//=========================================================================================
// Generic namespaced cell
//=========================================================================================

/// One cached value living under `user_<id>_<logical_name>`.
///
/// An empty key means "not bound to a profile": reads yield the default and
/// writes stay in memory.
pub struct Namespaced<T: StoredValue> {
    store: Arc<dyn KeyValueStore>,
    logical_name: &'static str,
    key: String,
    value: T,
    /// False when the stored payload could not be fully decoded.
    intact: bool,
}

impl<T: StoredValue> Namespaced<T> {
    pub fn unbound(store: Arc<dyn KeyValueStore>, logical_name: &'static str) -> Self {
        Self {
            store,
            logical_name,
            key: String::new(),
            value: T::default(),
            intact: true,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_intact(&self) -> bool {
        self.intact
    }

    /// Points the cell at `key` and reloads the value from there.
    pub fn rebind(&mut self, key: String) {
        self.key = key;
        let (value, intact) = self.load();
        self.value = value;
        self.intact = intact;
    }

    /// Rebinds to this cell's key under the active profile.
    pub fn rebind_for(&mut self, identity: &IdentityRegistry) {
        self.rebind(identity.namespace_key_for(self.logical_name));
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    /// Persists `value` and then caches it.
    pub fn set(&mut self, value: T) -> PortResult<()> {
        if !self.key.is_empty() {
            let raw = value.encode()?;
            self.store.set(&self.key, &raw)?;
        }
        self.value = value;
        self.intact = true;
        Ok(())
    }

    /// Deletes the stored value and resets the cache to the default.
    pub fn clear(&mut self) -> PortResult<()> {
        if !self.key.is_empty() {
            self.store.remove(&self.key)?;
        }
        self.value = T::default();
        self.intact = true;
        Ok(())
    }

    fn load(&self) -> (T, bool) {
        if self.key.is_empty() {
            return (T::default(), true);
        }
        match self.store.get(&self.key) {
            Ok(Some(raw)) => match T::decode(&raw) {
                Some(value) => (value, true),
                None => match T::salvage(&raw) {
                    Some(value) => {
                        warn!(key = %self.key, "Stored value is partly unreadable, keeping what decodes");
                        (value, false)
                    }
                    None => {
                        warn!(key = %self.key, "Stored value is unreadable, using default");
                        (T::default(), false)
                    }
                },
            },
            Ok(None) => (T::default(), true),
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to read stored value, using default");
                (T::default(), false)
            }
        }
    }
}

//=========================================================================================
// Concrete stores
//=========================================================================================

pub type LanguageStore = Namespaced<Language>;

pub type DraftStore = Namespaced<String>;

pub struct SettingsStore {
    cell: Namespaced<AiSettings>,
}

impl SettingsStore {
    pub fn unbound(store: Arc<dyn KeyValueStore>, logical_name: &'static str) -> Self {
        Self {
            cell: Namespaced::unbound(store, logical_name),
        }
    }

    pub fn rebind_for(&mut self, identity: &IdentityRegistry) {
        self.cell.rebind_for(identity);
    }

    pub fn get(&self) -> &AiSettings {
        self.cell.get()
    }

    /// Merges `patch` into the current settings and persists the result.
    pub fn update(&mut self, patch: AiSettingsPatch) -> PortResult<AiSettings> {
        let updated = self.cell.get().merged(patch);
        self.cell.set(updated.clone())?;
        Ok(updated)
    }
}

/// Most-recent-first list of completed readings.
pub struct HistoryStore {
    cell: Namespaced<Vec<Reading>>,
    max_len: Option<usize>,
}

impl HistoryStore {
    /// `max_len` of `None` keeps every reading.
    pub fn unbound(
        store: Arc<dyn KeyValueStore>,
        logical_name: &'static str,
        max_len: Option<usize>,
    ) -> Self {
        Self {
            cell: Namespaced::unbound(store, logical_name),
            max_len,
        }
    }

    pub fn rebind_for(&mut self, identity: &IdentityRegistry) {
        self.cell.rebind_for(identity);
    }

    pub fn list(&self) -> &[Reading] {
        self.cell.get()
    }

    /// Prepends `reading`, evicting the oldest entries beyond the cap.
    ///
    /// Refuses to write while the stored history could not be fully read, so
    /// entries this build does not understand are never overwritten.
    pub fn add(&mut self, reading: Reading) -> PortResult<()> {
        if !self.cell.is_intact() {
            return Err(PortError::Storage(format!(
                "{} holds readings that could not be decoded; not overwriting it",
                self.cell.key()
            )));
        }
        let mut next = Vec::with_capacity(self.cell.get().len() + 1);
        next.push(reading);
        next.extend(self.cell.get().iter().cloned());
        if let Some(max) = self.max_len {
            next.truncate(max.max(1));
        }
        self.cell.set(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AiProvider, SpreadRef};
    use crate::memory_store::MemoryStore;
    use chrono::Utc;

    fn reading(id: &str) -> Reading {
        Reading {
            id: id.to_string(),
            question: format!("question {}", id),
            spread: SpreadRef {
                id: "single".to_string(),
                name: "单张牌".to_string(),
                ..Default::default()
            },
            cards: Vec::new(),
            interpretation: "…".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn unbound_cell_does_no_io() {
        let store = Arc::new(MemoryStore::new());
        let mut lang = LanguageStore::unbound(store.clone(), "app_language");
        lang.set(Language::En).unwrap();
        assert_eq!(*lang.get(), Language::En);
        assert!(store.keys().is_empty());
    }

    #[test]
    fn unknown_language_code_falls_back_to_zh() {
        let store = Arc::new(MemoryStore::with_entries([("user_guest_app_language", "fr")]));
        let mut lang = LanguageStore::unbound(store, "app_language");
        lang.rebind("user_guest_app_language".to_string());
        assert_eq!(*lang.get(), Language::Zh);
    }

    #[test]
    fn corrupt_settings_fall_back_to_defaults() {
        let store = Arc::new(MemoryStore::with_entries([("k", "{\"provider\":")]));
        let mut settings = SettingsStore::unbound(store, "aura_tarot_settings");
        settings.cell.rebind("k".to_string());
        assert_eq!(*settings.get(), AiSettings::default());
    }

    #[test]
    fn settings_patch_merges_and_persists() {
        let store = Arc::new(MemoryStore::new());
        let mut settings = SettingsStore::unbound(store.clone(), "aura_tarot_settings");
        settings.cell.rebind("k".to_string());
        settings
            .update(AiSettingsPatch {
                provider: Some(AiProvider::Deepseek),
                model: Some("deepseek-chat".to_string()),
                ..Default::default()
            })
            .unwrap();

        let raw = store.get("k").unwrap().unwrap();
        assert_eq!(raw, r#"{"provider":"deepseek","apiKey":"","model":"deepseek-chat"}"#);
    }

    #[test]
    fn draft_clear_removes_key() {
        let store = Arc::new(MemoryStore::new());
        let mut draft = DraftStore::unbound(store.clone(), "aura_tarot_current_question");
        draft.rebind("d".to_string());
        draft.set("Will it rain?".to_string()).unwrap();
        assert_eq!(store.get("d").unwrap().as_deref(), Some("Will it rain?"));
        draft.clear().unwrap();
        assert!(store.get("d").unwrap().is_none());
        assert!(draft.get().is_empty());
    }

    #[test]
    fn history_prepends_and_caps() {
        let store = Arc::new(MemoryStore::new());
        let mut history = HistoryStore::unbound(store, "tarot_readings", Some(2));
        history.cell.rebind("h".to_string());
        history.add(reading("1")).unwrap();
        history.add(reading("2")).unwrap();
        history.add(reading("3")).unwrap();

        let ids: Vec<_> = history.list().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "2"]);
    }

    #[test]
    fn partly_unreadable_history_is_listed_but_not_overwritten() {
        let raw = r#"[{"id":"good","question":"q","spread":{"id":"single","name":"单张牌"},"cards":[],"interpretation":"i","timestamp":"2024-02-01T10:00:00.000Z"},{"id":"bad","timestamp":"not a date"}]"#;
        let store = Arc::new(MemoryStore::with_entries([("h", raw)]));
        let mut history = HistoryStore::unbound(store.clone(), "tarot_readings", None);
        history.cell.rebind("h".to_string());

        let ids: Vec<_> = history.list().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["good"]);

        let err = history.add(reading("new")).unwrap_err();
        assert!(matches!(err, PortError::Storage(_)));
        assert_eq!(store.get("h").unwrap().as_deref(), Some(raw));
    }

    #[test]
    fn unparsable_history_is_empty_and_left_alone() {
        let store = Arc::new(MemoryStore::with_entries([("h", "[{oops")]));
        let mut history = HistoryStore::unbound(store.clone(), "tarot_readings", None);
        history.cell.rebind("h".to_string());

        assert!(history.list().is_empty());
        assert!(history.add(reading("new")).is_err());
        assert_eq!(store.get("h").unwrap().as_deref(), Some("[{oops"));
    }

    #[test]
    fn language_cell_may_overwrite_an_unknown_code() {
        let store = Arc::new(MemoryStore::with_entries([("l", "fr")]));
        let mut lang = LanguageStore::unbound(store.clone(), "app_language");
        lang.rebind("l".to_string());
        assert!(!lang.is_intact());

        lang.set(Language::En).unwrap();
        assert!(lang.is_intact());
        assert_eq!(store.get("l").unwrap().as_deref(), Some("en"));
    }
}

//! crates/aura_tarot_core/src/identity.rs
//!
//! The identity registry: the set of local profiles, the active-profile
//! pointer, and the namespacing of every per-profile storage key.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{UserProfile, DEFAULT_PROFILE_NAME, GUEST_ID, GUEST_NAME};
use crate::keys::{self, CURRENT_USER_ID_KEY, LEGACY_KEYS, USERS_KEY};
use crate::ports::{Clock, KeyValueStore, PortError, PortResult};

/// Profiles keyed by id, in insertion order.
pub type ProfileMap = IndexMap<String, UserProfile>;

/// `<unix-millis>_<9 hex chars>`
pub(crate) fn generate_id(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}_{}", now.timestamp_millis(), &suffix[..9])
}

fn name_or_default(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        DEFAULT_PROFILE_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

pub struct IdentityRegistry {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    profiles: ProfileMap,
    /// Index into `profiles`. Profiles are never removed, so it stays valid.
    active: usize,
    generation: u64,
}

impl IdentityRegistry {
    /// Loads the registry, running first-run migration when no profile exists.
    ///
    /// Running it again over the same store is a no-op: once the guest
    /// profile is persisted the migration branch is never taken.
    pub fn bootstrap(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> PortResult<Self> {
        let mut profiles = load_profiles(store.as_ref())?;
        let pointer = store.get(CURRENT_USER_ID_KEY)?;

        if profiles.is_empty() {
            migrate_legacy_keys(store.as_ref());
            let guest = UserProfile {
                id: GUEST_ID.to_string(),
                name: GUEST_NAME.to_string(),
                created_at: clock.now(),
            };
            profiles.insert(guest.id.clone(), guest);
            save_profiles(store.as_ref(), &profiles)?;
            store.set(CURRENT_USER_ID_KEY, GUEST_ID)?;
            info!("First run: created guest profile");
            return Ok(Self {
                store,
                clock,
                profiles,
                active: 0,
                generation: 0,
            });
        }

        if !profiles.contains_key(GUEST_ID) {
            warn!("Profile map has no guest entry; restoring it");
            let guest = UserProfile {
                id: GUEST_ID.to_string(),
                name: GUEST_NAME.to_string(),
                created_at: clock.now(),
            };
            profiles.insert(guest.id.clone(), guest);
            save_profiles(store.as_ref(), &profiles)?;
        }

        let active = match pointer.as_deref().and_then(|id| profiles.get_index_of(id)) {
            Some(index) => index,
            None => {
                // Stale or absent pointer: fall back to the first profile.
                let first = &profiles[0];
                store.set(CURRENT_USER_ID_KEY, &first.id)?;
                info!(profile_id = %first.id, "Active profile pointer reset");
                0
            }
        };

        Ok(Self {
            store,
            clock,
            profiles,
            active,
            generation: 0,
        })
    }

    pub fn list_profiles(&self) -> impl Iterator<Item = &UserProfile> {
        self.profiles.values()
    }

    pub fn get(&self, id: &str) -> Option<&UserProfile> {
        self.profiles.get(id)
    }

    pub fn active_profile(&self) -> &UserProfile {
        &self.profiles[self.active]
    }

    /// Increases every time the active profile changes.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Makes `id` the active profile. Unknown ids are rejected and the stored
    /// pointer is left as it was.
    pub fn set_active(&mut self, id: &str) -> PortResult<()> {
        let index = self
            .profiles
            .get_index_of(id)
            .ok_or_else(|| PortError::NotFound(format!("Profile {} not found", id)))?;
        self.store.set(CURRENT_USER_ID_KEY, id)?;
        if index != self.active {
            self.active = index;
            self.generation += 1;
            info!(profile_id = %id, "Active profile changed");
        }
        Ok(())
    }

    /// Creates a profile with a fresh id and makes it active.
    pub fn create_profile(&mut self, name: Option<&str>) -> PortResult<UserProfile> {
        let now = self.clock.now();
        let name = match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(n) => n.to_string(),
            None => format!("用户{}", self.profiles.len() + 1),
        };
        let profile = UserProfile {
            id: generate_id(now),
            name,
            created_at: now,
        };

        let mut next = self.profiles.clone();
        next.insert(profile.id.clone(), profile.clone());
        save_profiles(self.store.as_ref(), &next)?;
        self.profiles = next;

        self.set_active(&profile.id)?;
        Ok(profile)
    }

    pub fn rename_profile(&mut self, id: &str, name: &str) -> PortResult<UserProfile> {
        let mut next = self.profiles.clone();
        let profile = next
            .get_mut(id)
            .ok_or_else(|| PortError::NotFound(format!("Profile {} not found", id)))?;
        profile.name = name_or_default(name);
        let renamed = profile.clone();
        save_profiles(self.store.as_ref(), &next)?;
        self.profiles = next;
        Ok(renamed)
    }

    /// Creates `id` with `name` unless it already exists. An existing profile
    /// keeps its name.
    pub fn ensure_profile(&mut self, id: &str, name: &str) -> PortResult<&UserProfile> {
        if !self.profiles.contains_key(id) {
            let profile = UserProfile {
                id: id.to_string(),
                name: name_or_default(name),
                created_at: self.clock.now(),
            };
            let mut next = self.profiles.clone();
            next.insert(profile.id.clone(), profile);
            save_profiles(self.store.as_ref(), &next)?;
            self.profiles = next;
        }
        self.profiles
            .get(id)
            .ok_or_else(|| PortError::Unexpected(format!("Profile {} vanished", id)))
    }

    /// The storage key of `logical_name` for the active profile.
    pub fn namespace_key_for(&self, logical_name: &str) -> String {
        keys::namespaced(&self.active_profile().id, logical_name)
    }
}

fn load_profiles(store: &dyn KeyValueStore) -> PortResult<ProfileMap> {
    let Some(raw) = store.get(USERS_KEY)? else {
        return Ok(ProfileMap::new());
    };
    match serde_json::from_str::<ProfileMap>(&raw) {
        Ok(map) => Ok(map),
        Err(e) => {
            warn!(error = %e, "Profile map is unreadable, starting empty");
            Ok(ProfileMap::new())
        }
    }
}

fn save_profiles(store: &dyn KeyValueStore, profiles: &ProfileMap) -> PortResult<()> {
    let raw = serde_json::to_string(profiles).map_err(|e| PortError::Unexpected(e.to_string()))?;
    store.set(USERS_KEY, &raw)
}

/// Moves each pre-profile global key under the guest namespace.
fn migrate_legacy_keys(store: &dyn KeyValueStore) {
    for legacy in LEGACY_KEYS {
        let target = keys::namespaced(GUEST_ID, legacy);
        let moved = store.get(legacy).and_then(|value| match value {
            Some(v) if !v.is_empty() => {
                store.set(&target, &v)?;
                store.remove(legacy)?;
                Ok(true)
            }
            _ => Ok(false),
        });
        match moved {
            Ok(true) => info!(from = legacy, to = %target, "Migrated legacy key"),
            Ok(false) => {}
            Err(e) => warn!(key = legacy, error = %e, "Legacy key migration failed"),
        }
    }
}

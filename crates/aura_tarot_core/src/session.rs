//! crates/aura_tarot_core/src/session.rs
//!
//! The session context: one object, created at startup, that owns the
//! identity and account registries, the guest quota, and every per-profile
//! store. All identity changes go through it so the stores are re-keyed
//! before anyone can read through them again.

use std::sync::Arc;

use tracing::info;

use crate::accounts::{verify_password, AccountRegistry, PasswordScheme};
use crate::auth::{normalize_username, validate_login, validate_registration, AuthError};
use crate::domain::{
    AiSettings, AiSettingsPatch, Language, Reading, UserProfile, GUEST_ID, GUEST_READINGS_PER_DAY,
};
use crate::identity::IdentityRegistry;
use crate::keys;
use crate::ports::{Clock, KeyValueStore, PortError, PortResult};
use crate::quota::GuestQuota;
use crate::stores::{DraftStore, HistoryStore, LanguageStore, SettingsStore};

/// Knobs chosen once per process.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    pub password_scheme: PasswordScheme,
    /// Retention cap for each profile's reading history. `None` keeps all.
    pub max_readings: Option<usize>,
}

pub struct TarotSession {
    clock: Arc<dyn Clock>,
    identity: IdentityRegistry,
    accounts: AccountRegistry,
    quota: GuestQuota,
    language: LanguageStore,
    settings: SettingsStore,
    draft: DraftStore,
    history: HistoryStore,
    /// Identity generation the stores were last keyed for.
    bound_generation: Option<u64>,
}

impl TarotSession {
    /// Bootstraps the identity registry and binds every store to the active profile.
    pub fn open(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        options: SessionOptions,
    ) -> PortResult<Self> {
        let identity = IdentityRegistry::bootstrap(store.clone(), clock.clone())?;
        let mut session = Self {
            accounts: AccountRegistry::new(store.clone(), clock.clone(), options.password_scheme),
            quota: GuestQuota::new(store.clone(), clock.clone()),
            language: LanguageStore::unbound(store.clone(), keys::LANGUAGE),
            settings: SettingsStore::unbound(store.clone(), keys::SETTINGS),
            draft: DraftStore::unbound(store.clone(), keys::CURRENT_QUESTION),
            history: HistoryStore::unbound(store, keys::READINGS, options.max_readings),
            clock,
            identity,
            bound_generation: None,
        };
        session.sync_stores();
        info!(profile_id = %session.active_profile().id, "Session opened");
        Ok(session)
    }

    /// Re-keys every store when the active profile changed since the last bind.
    fn sync_stores(&mut self) {
        let generation = self.identity.generation();
        if self.bound_generation == Some(generation) {
            return;
        }
        self.language.rebind_for(&self.identity);
        self.settings.rebind_for(&self.identity);
        self.draft.rebind_for(&self.identity);
        self.history.rebind_for(&self.identity);
        self.bound_generation = Some(generation);
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn identity_generation(&self) -> u64 {
        self.identity.generation()
    }

    //=====================================================================================
    // Profiles
    //=====================================================================================

    pub fn list_profiles(&self) -> Vec<UserProfile> {
        self.identity.list_profiles().cloned().collect()
    }

    pub fn active_profile(&self) -> &UserProfile {
        self.identity.active_profile()
    }

    pub fn create_profile(&mut self, name: Option<&str>) -> PortResult<UserProfile> {
        let profile = self.identity.create_profile(name)?;
        self.sync_stores();
        Ok(profile)
    }

    pub fn rename_profile(&mut self, id: &str, name: &str) -> PortResult<UserProfile> {
        self.identity.rename_profile(id, name)
    }

    /// Switches straight to another local profile. No credentials are asked
    /// for; any profile present on the device may be selected.
    pub fn switch_profile(&mut self, id: &str) -> PortResult<()> {
        self.identity.set_active(id)?;
        self.sync_stores();
        Ok(())
    }

    //=====================================================================================
    // Authentication
    //=====================================================================================

    pub fn is_guest(&self) -> bool {
        self.active_profile().id == GUEST_ID
    }

    pub fn login(&mut self, username: &str, password: &str) -> Result<UserProfile, AuthError> {
        let username_key = normalize_username(username);
        validate_login(&username_key, password)?;

        let account = self
            .accounts
            .find_by_username(&username_key)?
            .ok_or(AuthError::UserNotFound)?;
        if !verify_password(&account.password_hash, password) {
            return Err(AuthError::WrongPassword);
        }

        self.bind_account(&account.id, &username_key)
    }

    pub fn register(&mut self, username: &str, password: &str) -> Result<UserProfile, AuthError> {
        let username_key = normalize_username(username);
        validate_registration(&username_key, password)?;

        if self.accounts.find_by_username(&username_key)?.is_some() {
            return Err(AuthError::UsernameTaken);
        }
        let password_hash = self.accounts.scheme().hash(password)?;
        let account = self
            .accounts
            .register(&username_key, password_hash)
            .map_err(|e| match e {
                PortError::Conflict(_) => AuthError::UsernameTaken,
                other => AuthError::Storage(other),
            })?;
        info!(account_id = %account.id, "Account registered");

        self.bind_account(&account.id, &username_key)
    }

    fn bind_account(&mut self, account_id: &str, display_name: &str) -> Result<UserProfile, AuthError> {
        self.identity.ensure_profile(account_id, display_name)?;
        self.identity.set_active(account_id)?;
        self.sync_stores();
        info!(profile_id = %account_id, "Signed in");
        Ok(self.active_profile().clone())
    }

    /// Returns to the guest profile. Accounts and their profiles are kept.
    pub fn logout(&mut self) -> PortResult<()> {
        self.identity.set_active(GUEST_ID)?;
        self.sync_stores();
        info!("Signed out");
        Ok(())
    }

    //=====================================================================================
    // Gated actions
    //=====================================================================================

    /// Non-guests are unlimited and always see the full allowance.
    pub fn guest_remaining_today(&self) -> PortResult<u32> {
        if !self.is_guest() {
            return Ok(GUEST_READINGS_PER_DAY);
        }
        self.quota.remaining_today()
    }

    pub fn can_do_gated_action(&self) -> PortResult<bool> {
        if !self.is_guest() {
            return Ok(true);
        }
        self.quota.can_consume()
    }

    pub fn record_gated_action(&mut self) -> PortResult<()> {
        if self.is_guest() {
            self.quota.consume()?;
        }
        Ok(())
    }

    //=====================================================================================
    // Per-profile stores
    //=====================================================================================

    pub fn language(&self) -> Language {
        *self.language.get()
    }

    pub fn set_language(&mut self, language: Language) -> PortResult<()> {
        self.language.set(language)
    }

    pub fn settings(&self) -> &AiSettings {
        self.settings.get()
    }

    pub fn update_settings(&mut self, patch: AiSettingsPatch) -> PortResult<AiSettings> {
        self.settings.update(patch)
    }

    pub fn draft_question(&self) -> &str {
        self.draft.get()
    }

    pub fn set_draft_question(&mut self, question: &str) -> PortResult<()> {
        self.draft.set(question.to_string())
    }

    pub fn clear_draft_question(&mut self) -> PortResult<()> {
        self.draft.clear()
    }

    pub fn readings(&self) -> &[Reading] {
        self.history.list()
    }

    pub fn save_reading(&mut self, reading: Reading) -> PortResult<()> {
        self.history.add(reading)
    }
}

//! crates/aura_tarot_core/src/accounts.rs
//!
//! Credential records, keyed by normalized username and stored as one blob.
//!
//! The default `Sha256` scheme is a single unsalted digest. It matches what the
//! web client has always written and only resists casual local tampering.
//! `Argon2` is available for new installs that do not need that compatibility.

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use indexmap::IndexMap;
use sha2::{Digest, Sha256};
use tracing::{error, warn};
use uuid::Uuid;

use crate::domain::Account;
use crate::keys::ACCOUNTS_KEY;
use crate::ports::{Clock, KeyValueStore, PortError, PortResult};

pub type AccountMap = IndexMap<String, Account>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PasswordScheme {
    #[default]
    Sha256,
    Argon2,
}

impl PasswordScheme {
    pub fn hash(self, password: &str) -> PortResult<String> {
        match self {
            PasswordScheme::Sha256 => Ok(sha256_hex(password)),
            PasswordScheme::Argon2 => {
                let salt = SaltString::generate(&mut OsRng);
                Argon2::default()
                    .hash_password(password.as_bytes(), &salt)
                    .map(|hash| hash.to_string())
                    .map_err(|e| {
                        error!("Failed to hash password: {:?}", e);
                        PortError::Unexpected("Failed to hash password".to_string())
                    })
            }
        }
    }
}

fn sha256_hex(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Checks `password` against a stored hash of either scheme.
pub fn verify_password(stored_hash: &str, password: &str) -> bool {
    if stored_hash.starts_with("$argon2") {
        return match PasswordHash::new(stored_hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                warn!("Failed to parse password hash: {:?}", e);
                false
            }
        };
    }
    sha256_hex(password) == stored_hash
}

pub struct AccountRegistry {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    scheme: PasswordScheme,
}

impl AccountRegistry {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, scheme: PasswordScheme) -> Self {
        Self {
            store,
            clock,
            scheme,
        }
    }

    pub fn scheme(&self) -> PasswordScheme {
        self.scheme
    }

    pub fn find_by_username(&self, username_key: &str) -> PortResult<Option<Account>> {
        Ok(self.load()?.shift_remove(username_key))
    }

    /// Stores a new account. A taken username is a `Conflict` and leaves the
    /// existing record untouched.
    pub fn register(&self, username_key: &str, password_hash: String) -> PortResult<Account> {
        let mut accounts = self.load()?;
        if accounts.contains_key(username_key) {
            return Err(PortError::Conflict(format!("Username {} is taken", username_key)));
        }
        let now = self.clock.now();
        let suffix = Uuid::new_v4().simple().to_string();
        let account = Account {
            id: format!("acc_{}_{}", now.timestamp_millis(), &suffix[..8]),
            password_hash,
            created_at: now,
        };
        accounts.insert(username_key.to_string(), account.clone());
        self.save(&accounts)?;
        Ok(account)
    }

    /// `false` for unknown usernames as well as wrong passwords.
    pub fn verify(&self, username_key: &str, password: &str) -> PortResult<bool> {
        Ok(self
            .find_by_username(username_key)?
            .map(|account| verify_password(&account.password_hash, password))
            .unwrap_or(false))
    }

    fn load(&self) -> PortResult<AccountMap> {
        let Some(raw) = self.store.get(ACCOUNTS_KEY)? else {
            return Ok(AccountMap::new());
        };
        match serde_json::from_str::<AccountMap>(&raw) {
            Ok(map) => Ok(map),
            Err(e) => {
                warn!(error = %e, "Account table is unreadable, treating as empty");
                Ok(AccountMap::new())
            }
        }
    }

    fn save(&self, accounts: &AccountMap) -> PortResult<()> {
        let raw = serde_json::to_string(accounts).map_err(|e| PortError::Unexpected(e.to_string()))?;
        self.store.set(ACCOUNTS_KEY, &raw)
    }
}

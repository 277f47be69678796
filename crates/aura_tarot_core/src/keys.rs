//! crates/aura_tarot_core/src/keys.rs
//!
//! Storage key contract shared with the web client.

pub const USERS_KEY: &str = "aura_tarot_users";
pub const CURRENT_USER_ID_KEY: &str = "aura_tarot_current_user_id";
pub const ACCOUNTS_KEY: &str = "aura_tarot_accounts";
pub const GUEST_DAILY_DATE_KEY: &str = "user_guest_daily_date";
pub const GUEST_DAILY_COUNT_KEY: &str = "user_guest_daily_count";

// Logical names of the per-profile records.
pub const READINGS: &str = "tarot_readings";
pub const SETTINGS: &str = "aura_tarot_settings";
pub const LANGUAGE: &str = "app_language";
pub const CURRENT_QUESTION: &str = "aura_tarot_current_question";

/// Keys written before profiles existed. Each one is moved under the guest
/// namespace on first run.
pub const LEGACY_KEYS: [&str; 4] = [READINGS, SETTINGS, LANGUAGE, CURRENT_QUESTION];

/// `user_<id>_<logical_name>`
pub fn namespaced(profile_id: &str, logical_name: &str) -> String {
    format!("user_{}_{}", profile_id, logical_name)
}

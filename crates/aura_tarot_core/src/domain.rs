//! crates/aura_tarot_core/src/domain.rs
//!
//! Defines the core data structures for the application.
//! Field names serialize in camelCase so that records written by the web
//! client and records written here are interchangeable in the local store.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The reserved id of the unauthenticated profile.
pub const GUEST_ID: &str = "guest";

/// Display name given to the guest profile at bootstrap.
pub const GUEST_NAME: &str = "游客";

/// Label used when a supplied display name trims down to nothing.
pub const DEFAULT_PROFILE_NAME: &str = "用户1";

/// Number of gated actions the guest may perform per calendar day.
pub const GUEST_READINGS_PER_DAY: u32 = 20;

//=========================================================================================
// Identity
//=========================================================================================

/// A logical user persona under which preferences and history are namespaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn is_guest(&self) -> bool {
        self.id == GUEST_ID
    }
}

/// A credential record. The normalized username is the key of the account
/// table and is not repeated inside the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// The guest's consumption for one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuestQuotaState {
    pub date: NaiveDate,
    pub count: u32,
}

impl GuestQuotaState {
    /// Remaining allowance as observed on `today`; a stale day counts as zero used.
    pub fn remaining_on(&self, today: NaiveDate) -> u32 {
        if self.date != today {
            return GUEST_READINGS_PER_DAY;
        }
        GUEST_READINGS_PER_DAY.saturating_sub(self.count)
    }
}

//=========================================================================================
// Preferences
//=========================================================================================

/// Interface language of the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Zh,
    En,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::Zh => "zh",
            Language::En => "en",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "zh" => Some(Language::Zh),
            "en" => Some(Language::En),
            _ => None,
        }
    }
}

/// The remote model vendors a reading can be interpreted by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    #[default]
    Gemini,
    Deepseek,
    Qwen,
    Kimi,
}

/// Per-profile settings for the interpretation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiSettings {
    pub provider: AiProvider,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub model: String,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            provider: AiProvider::Gemini,
            api_key: String::new(),
            model: "gemini-3-flash-preview".to_string(),
        }
    }
}

/// A partial update merged into the current `AiSettings`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiSettingsPatch {
    pub provider: Option<AiProvider>,
    pub api_key: Option<String>,
    pub model: Option<String>,
}

impl AiSettings {
    pub fn merged(&self, patch: AiSettingsPatch) -> Self {
        Self {
            provider: patch.provider.unwrap_or(self.provider),
            api_key: patch.api_key.unwrap_or_else(|| self.api_key.clone()),
            model: patch.model.unwrap_or_else(|| self.model.clone()),
        }
    }
}

//=========================================================================================
// Readings
//=========================================================================================

/// Reference to an entry of the static spread catalog.
///
/// The web client stores the whole catalog entry (category, tag, positions
/// and so on); those fields ride along in `extra` untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpreadRef {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Reference to an entry of the static card catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRef {
    pub name: String,
    #[serde(default)]
    pub name_en: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub meaning: String,
}

/// A card placed on one position of a spread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawnCard {
    pub position: String,
    pub card: CardRef,
}

/// A completed, interpreted reading. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    pub id: String,
    pub question: String,
    pub spread: SpreadRef,
    pub cards: Vec<DrawnCard>,
    pub interpretation: String,
    pub timestamp: DateTime<Utc>,
}

/// Everything the remote interpretation service needs for one reading.
#[derive(Debug, Clone)]
pub struct InterpretationRequest {
    pub question: String,
    pub spread: SpreadRef,
    pub cards: Vec<DrawnCard>,
    pub settings: AiSettings,
    pub language: Language,
}

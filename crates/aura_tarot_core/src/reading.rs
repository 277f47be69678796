//! crates/aura_tarot_core/src/reading.rs
//!
//! The gated reading flow: check the allowance, ask the interpretation
//! service, then store the reading and charge the allowance.
//!
//! The flow is split in two halves so a host that guards the session with a
//! lock can release it while the remote call is in flight.

use tracing::{error, info};
use uuid::Uuid;

use crate::domain::{DrawnCard, InterpretationRequest, Language, Reading, SpreadRef};
use crate::ports::{InterpretationService, PortError};
use crate::session::TarotSession;

#[derive(Debug, thiserror::Error)]
pub enum ReadingError {
    #[error("Today's free readings are used up")]
    QuotaExceeded,
    #[error("The active profile changed while the reading was in progress")]
    ProfileChanged,
    #[error("A reading needs at least one card")]
    NoCards,
    #[error("Storage error: {0}")]
    Storage(#[from] PortError),
}

impl ReadingError {
    pub fn localized(&self, language: Language) -> &'static str {
        match (self, language) {
            (ReadingError::QuotaExceeded, Language::Zh) => "今日免费占卜次数已用完，登录后可继续使用",
            (ReadingError::QuotaExceeded, Language::En) => {
                "You have used today's free readings. Sign in to continue."
            }
            (ReadingError::ProfileChanged, Language::Zh) => "用户已切换，本次占卜未保存",
            (ReadingError::ProfileChanged, Language::En) => {
                "The profile changed, so this reading was not saved."
            }
            (ReadingError::NoCards, Language::Zh) => "请先抽牌",
            (ReadingError::NoCards, Language::En) => "Please draw your cards first.",
            (ReadingError::Storage(_), Language::Zh) => "本地存储不可用，请稍后再试",
            (ReadingError::Storage(_), Language::En) => {
                "Local storage is unavailable, please try again"
            }
        }
    }
}

/// What the user submits once the cards are on the table.
#[derive(Debug, Clone)]
pub struct ReadingDraft {
    pub question: String,
    pub spread: SpreadRef,
    pub cards: Vec<DrawnCard>,
}

/// A reading that passed the gate and is waiting for its interpretation.
#[derive(Debug, Clone)]
pub struct PreparedReading {
    pub request: InterpretationRequest,
    profile_id: String,
    generation: u64,
}

#[derive(Debug, Clone)]
pub enum ReadingOutcome {
    /// Interpreted and stored in the active profile's history.
    Saved(Reading),
    /// The service failed; nothing was stored or charged.
    Apology(String),
}

/// The message shown in place of an interpretation when the service fails.
pub fn apology(error: &PortError, language: Language) -> String {
    let text = match (error, language) {
        (PortError::Unauthorized, Language::Zh) => "请在设置中配置该模型的 API Key 以后再试。",
        (PortError::Unauthorized, Language::En) => {
            "Please set an API key for this model in Settings and try again."
        }
        (_, Language::Zh) => "解读过程中发生了错误，请检查网络或稍后再试。",
        (_, Language::En) => {
            "Something went wrong during the interpretation. Check your network or try again later."
        }
    };
    text.to_string()
}

impl TarotSession {
    /// Checks the gate and captures the active profile's settings.
    pub fn prepare_reading(&self, draft: ReadingDraft) -> Result<PreparedReading, ReadingError> {
        if draft.cards.is_empty() {
            return Err(ReadingError::NoCards);
        }
        if !self.can_do_gated_action()? {
            return Err(ReadingError::QuotaExceeded);
        }
        Ok(PreparedReading {
            request: InterpretationRequest {
                question: draft.question,
                spread: draft.spread,
                cards: draft.cards,
                settings: self.settings().clone(),
                language: self.language(),
            },
            profile_id: self.active_profile().id.clone(),
            generation: self.identity_generation(),
        })
    }

    /// Stores the interpreted reading, clears the draft and charges the gate.
    ///
    /// The gate is checked again because another caller may have used the
    /// last free reading while the interpretation was running.
    pub fn complete_reading(
        &mut self,
        prepared: PreparedReading,
        interpretation: String,
    ) -> Result<Reading, ReadingError> {
        if self.identity_generation() != prepared.generation
            || self.active_profile().id != prepared.profile_id
        {
            return Err(ReadingError::ProfileChanged);
        }
        if !self.can_do_gated_action()? {
            return Err(ReadingError::QuotaExceeded);
        }

        let request = prepared.request;
        let reading = Reading {
            id: Uuid::new_v4().to_string(),
            question: request.question,
            spread: request.spread,
            cards: request.cards,
            interpretation,
            timestamp: self.clock().now(),
        };
        self.save_reading(reading.clone())?;
        self.clear_draft_question()?;
        self.record_gated_action()?;
        info!(reading_id = %reading.id, profile_id = %prepared.profile_id, "Reading saved");
        Ok(reading)
    }

    /// Runs the whole flow for a caller that owns the session outright.
    pub async fn perform_reading(
        &mut self,
        service: &dyn InterpretationService,
        draft: ReadingDraft,
    ) -> Result<ReadingOutcome, ReadingError> {
        let prepared = self.prepare_reading(draft)?;
        match service.interpret(&prepared.request).await {
            Ok(text) => Ok(ReadingOutcome::Saved(self.complete_reading(prepared, text)?)),
            Err(e) => {
                error!("Interpretation failed: {:?}", e);
                Ok(ReadingOutcome::Apology(apology(&e, prepared.request.language)))
            }
        }
    }
}

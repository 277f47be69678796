pub mod accounts;
pub mod auth;
pub mod domain;
pub mod identity;
pub mod keys;
pub mod memory_store;
pub mod ports;
pub mod quota;
pub mod reading;
pub mod session;
pub mod stores;
pub mod testing;

pub use accounts::{AccountRegistry, PasswordScheme};
pub use auth::AuthError;
pub use domain::{
    Account, AiProvider, AiSettings, AiSettingsPatch, CardRef, DrawnCard, GuestQuotaState,
    InterpretationRequest, Language, Reading, SpreadRef, UserProfile, GUEST_ID,
    GUEST_READINGS_PER_DAY,
};
pub use identity::IdentityRegistry;
pub use memory_store::MemoryStore;
pub use ports::{
    Clock, InterpretationService, KeyValueStore, PortError, PortResult, SystemClock,
};
pub use quota::GuestQuota;
pub use reading::{PreparedReading, ReadingDraft, ReadingError, ReadingOutcome};
pub use session::{SessionOptions, TarotSession};

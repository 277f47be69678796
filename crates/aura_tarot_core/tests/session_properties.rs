//! Integration tests for the session layer over a shared in-memory store.
//!
//! Each test reopens sessions against the same store where a process restart
//! matters, mirroring how the client reloads.

use std::sync::Arc;

use aura_tarot_core::{
    keys, AuthError, Clock, KeyValueStore, Language, MemoryStore, Reading, SessionOptions,
    SpreadRef, TarotSession, GUEST_READINGS_PER_DAY,
};
use aura_tarot_core::testing::ManualClock;
use chrono::Duration;

fn open(store: &Arc<MemoryStore>, clock: &Arc<ManualClock>) -> TarotSession {
    TarotSession::open(store.clone(), clock.clone(), SessionOptions::default())
        .expect("session should open")
}

fn reading(id: &str, clock: &ManualClock) -> Reading {
    Reading {
        id: id.to_string(),
        question: format!("question {}", id),
        spread: SpreadRef {
            id: "triangle".to_string(),
            name: "圣三角".to_string(),
            ..Default::default()
        },
        cards: Vec::new(),
        interpretation: format!("interpretation {}", id),
        timestamp: clock.now(),
    }
}

#[test]
fn namespaces_do_not_bleed_between_profiles() {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::at_date(2025, 6, 1));
    let mut session = open(&store, &clock);

    let a = session.create_profile(Some("A")).unwrap();
    session.set_language(Language::En).unwrap();
    session.set_draft_question("what about A?").unwrap();

    let b = session.create_profile(Some("B")).unwrap();
    assert_eq!(session.language(), Language::Zh);
    assert_eq!(session.draft_question(), "");

    session.switch_profile(&a.id).unwrap();
    assert_eq!(session.language(), Language::En);
    assert_eq!(session.draft_question(), "what about A?");

    session.switch_profile(&b.id).unwrap();
    assert_eq!(session.language(), Language::Zh);
}

#[test]
fn bootstrap_twice_does_not_remigrate() {
    let store = Arc::new(MemoryStore::with_entries([
        (keys::READINGS, r#"[{"id":"1","question":"q","spread":{"id":"single","name":"单张牌","cardCount":1},"cards":[],"interpretation":"i","timestamp":"2024-02-01T10:00:00.000Z"}]"#),
        (keys::LANGUAGE, "en"),
    ]));
    let clock = Arc::new(ManualClock::at_date(2025, 6, 1));

    let first = open(&store, &clock);
    assert_eq!(first.readings().len(), 1);
    let keys_after_first = store.keys();
    let users_after_first = store.get(keys::USERS_KEY).unwrap();
    drop(first);

    // A legacy key reappearing after the guest exists must stay where it is.
    store.set(keys::LANGUAGE, "zh").unwrap();

    let second = open(&store, &clock);
    assert_eq!(second.readings().len(), 1);
    assert_eq!(second.language(), Language::En);
    assert_eq!(store.get(keys::USERS_KEY).unwrap(), users_after_first);
    assert_eq!(store.get(keys::LANGUAGE).unwrap().as_deref(), Some("zh"));

    let mut expected = keys_after_first;
    expected.push(keys::LANGUAGE.to_string());
    expected.sort();
    assert_eq!(store.keys(), expected);
}

#[test]
fn quota_rolls_over_on_a_new_day() {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::at_date(2025, 6, 1));
    let mut session = open(&store, &clock);

    store.set(keys::GUEST_DAILY_DATE_KEY, "2025-5-1").unwrap();
    store
        .set(keys::GUEST_DAILY_COUNT_KEY, &GUEST_READINGS_PER_DAY.to_string())
        .unwrap();
    assert!(!session.can_do_gated_action().unwrap());

    clock.advance(Duration::days(1));
    assert!(session.can_do_gated_action().unwrap());
    session.record_gated_action().unwrap();

    assert_eq!(
        store.get(keys::GUEST_DAILY_DATE_KEY).unwrap().as_deref(),
        Some("2025-5-2")
    );
    assert_eq!(
        store.get(keys::GUEST_DAILY_COUNT_KEY).unwrap().as_deref(),
        Some("1")
    );
}

#[test]
fn quota_is_monotonic_within_a_day() {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::at_date(2025, 6, 1));
    let mut session = open(&store, &clock);

    for _ in 0..GUEST_READINGS_PER_DAY {
        assert!(session.can_do_gated_action().unwrap());
        session.record_gated_action().unwrap();
    }
    assert!(!session.can_do_gated_action().unwrap());
}

#[test]
fn register_then_login_case_insensitively() {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::at_date(2025, 6, 1));
    let mut session = open(&store, &clock);

    let registered = session.register("Alice", "secret1").unwrap();
    session.logout().unwrap();
    assert!(session.is_guest());

    let logged_in = session.login("alice", "secret1").unwrap();
    assert_eq!(logged_in.id, registered.id);
    assert_eq!(session.active_profile().id, registered.id);

    // And again after a restart.
    drop(session);
    let mut reopened = open(&store, &clock);
    assert_eq!(reopened.active_profile().id, registered.id);
    reopened.logout().unwrap();
    assert_eq!(reopened.login(" ALICE ", "secret1").unwrap().id, registered.id);
}

#[test]
fn duplicate_registration_is_refused() {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::at_date(2025, 6, 1));
    let mut session = open(&store, &clock);

    session.register("bob", "pw123456").unwrap();
    let accounts_before = store.get(keys::ACCOUNTS_KEY).unwrap();

    let err = session.register("bob", "different1").unwrap_err();
    assert!(matches!(err, AuthError::UsernameTaken));
    assert_eq!(store.get(keys::ACCOUNTS_KEY).unwrap(), accounts_before);

    session.logout().unwrap();
    assert!(session.login("bob", "pw123456").is_ok());
}

#[test]
fn history_is_most_recent_first_across_switches() {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::at_date(2025, 6, 1));
    let mut session = open(&store, &clock);

    session.save_reading(reading("r1", &clock)).unwrap();
    clock.advance(Duration::minutes(5));
    session.save_reading(reading("r2", &clock)).unwrap();

    let other = session.create_profile(None).unwrap();
    assert!(session.readings().is_empty());
    session.switch_profile(&other.id).unwrap();
    session.logout().unwrap();

    let ids: Vec<_> = session.readings().iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["r2", "r1"]);
}

#[test]
fn fresh_install_scenario() {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::at_date(2025, 6, 1));
    let mut session = open(&store, &clock);

    let profile = session.active_profile().clone();
    assert_eq!(profile.id, "guest");
    assert_eq!(profile.name, "游客");
    assert_eq!(
        store.get(keys::CURRENT_USER_ID_KEY).unwrap().as_deref(),
        Some("guest")
    );
    assert!(session.can_do_gated_action().unwrap());

    for _ in 0..GUEST_READINGS_PER_DAY {
        session.record_gated_action().unwrap();
    }
    assert_eq!(session.guest_remaining_today().unwrap(), 0);
    assert!(!session.can_do_gated_action().unwrap());
}

#[test]
fn legacy_install_scenario() {
    let legacy = r#"[{"id":"1706780000000","question":"Will I move?","spread":{"id":"single","name":"单张牌"},"cards":[{"position":"核心启示","card":{"name":"星星","nameEn":"The Star","image":"","meaning":"希望"}}],"interpretation":"Yes.","timestamp":"2024-02-01T09:33:20.000Z"}]"#;
    let store = Arc::new(MemoryStore::with_entries([(keys::READINGS, legacy)]));
    let clock = Arc::new(ManualClock::at_date(2025, 6, 1));
    let session = open(&store, &clock);

    assert_eq!(
        store.get("user_guest_tarot_readings").unwrap().as_deref(),
        Some(legacy)
    );
    assert!(store.get(keys::READINGS).unwrap().is_none());
    assert_eq!(session.readings().len(), 1);
    assert_eq!(session.readings()[0].cards[0].card.name_en, "The Star");
}

#[test]
fn saving_keeps_spread_fields_written_by_the_web_client() {
    let legacy = r#"[{"id":"1706780000000","question":"Does he love me?","spread":{"id":"love","name":"爱情牌阵","tag":"热门","tagType":"hot","category":"love","description":"d","fullDescription":"fd","cardCount":1,"duration":"3分钟","positions":[{"id":1,"name":"核心","description":"x"}],"layoutType":"single"},"cards":[],"interpretation":"Yes.","timestamp":"2024-02-01T09:33:20.000Z"}]"#;
    let store = Arc::new(MemoryStore::with_entries([(keys::READINGS, legacy)]));
    let clock = Arc::new(ManualClock::at_date(2025, 6, 1));
    let mut session = open(&store, &clock);

    session.save_reading(reading("r1", &clock)).unwrap();

    let raw = store.get("user_guest_tarot_readings").unwrap().unwrap();
    let saved: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let old = &saved[1]["spread"];
    assert_eq!(saved[1]["id"], "1706780000000");
    assert_eq!(old["category"], "love");
    assert_eq!(old["tagType"], "hot");
    assert_eq!(old["cardCount"], 1);
    assert_eq!(old["positions"][0]["name"], "核心");
    assert_eq!(old["layoutType"], "single");
    assert_eq!(saved[0]["id"], "r1");
}

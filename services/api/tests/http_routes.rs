//! Route-level tests: the real router over an in-memory store, with the
//! interpretation service replaced by local stubs.

use std::sync::Arc;

use api_lib::web::{self, state::AppState};
use async_trait::async_trait;
use aura_tarot_core::{
    testing::ManualClock, InterpretationRequest, InterpretationService, MemoryStore, PortError,
    PortResult, SessionOptions, TarotSession, GUEST_READINGS_PER_DAY,
};
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

struct Oracle;

#[async_trait]
impl InterpretationService for Oracle {
    async fn interpret(&self, request: &InterpretationRequest) -> PortResult<String> {
        Ok(format!("The cards answer: {}", request.question))
    }
}

struct Offline;

#[async_trait]
impl InterpretationService for Offline {
    async fn interpret(&self, _request: &InterpretationRequest) -> PortResult<String> {
        Err(PortError::Unexpected("connection refused".to_string()))
    }
}

fn app_with(interpreter: Arc<dyn InterpretationService>) -> Router {
    let session = TarotSession::open(
        Arc::new(MemoryStore::new()),
        Arc::new(ManualClock::at_date(2025, 6, 1)),
        SessionOptions::default(),
    )
    .unwrap();
    web::router(Arc::new(AppState::new(session, interpreter)))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, value)
}

fn reading_body(question: &str) -> Value {
    json!({
        "question": question,
        "spread": { "id": "single", "name": "单张牌", "category": "daily", "tagType": "basic", "cardCount": 1 },
        "cards": [{
            "position": "核心启示",
            "card": { "name": "星星", "nameEn": "The Star", "image": "", "meaning": "希望" }
        }]
    })
}

#[tokio::test]
async fn fresh_process_starts_as_guest() {
    let app = app_with(Arc::new(Oracle));
    let (status, body) = send(&app, Method::GET, "/session", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["profile"]["id"], "guest");
    assert_eq!(body["isGuest"], true);
    assert_eq!(body["guestRemainingToday"], GUEST_READINGS_PER_DAY);
    assert_eq!(body["language"], "zh");
}

#[tokio::test]
async fn register_logout_and_login_again() {
    let app = app_with(Arc::new(Oracle));

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/register",
        Some(json!({ "username": "Alice", "password": "secret1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["isGuest"], false);
    assert_eq!(body["profile"]["name"], "alice");
    assert_eq!(body["guestRemainingToday"], GUEST_READINGS_PER_DAY);
    let account_id = body["profile"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(&app, Method::POST, "/auth/logout", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["profile"]["id"], "guest");

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/login",
        Some(json!({ "username": "ALICE", "password": "wrong-one" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, "密码错误");

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/login",
        Some(json!({ "username": " alice ", "password": "secret1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["profile"]["id"], account_id.as_str());
}

#[tokio::test]
async fn registration_rules_are_reported_as_bad_requests() {
    let app = app_with(Arc::new(Oracle));

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/register",
        Some(json!({ "username": "bob", "password": "12345" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "密码至少 6 位");

    send(
        &app,
        Method::POST,
        "/auth/register",
        Some(json!({ "username": "bob", "password": "123456" })),
    )
    .await;
    send(&app, Method::POST, "/auth/logout", None).await;
    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/register",
        Some(json!({ "username": "BOB", "password": "abcdef" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/login",
        Some(json!({ "username": "carol", "password": "whatever" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profiles_can_be_created_renamed_and_switched() {
    let app = app_with(Arc::new(Oracle));

    let (status, created) = send(&app, Method::POST, "/profiles", Some(json!({}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["name"], "用户2");
    let id = created["id"].as_str().unwrap().to_string();

    let (status, renamed) = send(
        &app,
        Method::PUT,
        &format!("/profiles/{}/name", id),
        Some(json!({ "name": "Moon" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["name"], "Moon");

    let (_, list) = send(&app, Method::GET, "/profiles", None).await;
    let names: Vec<_> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["游客", "Moon"]);

    let (status, session) = send(&app, Method::POST, "/profiles/guest/activate", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["profile"]["id"], "guest");

    let (status, _) = send(&app, Method::POST, "/profiles/nobody/activate", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(
        &app,
        Method::PUT,
        "/profiles/nobody/name",
        Some(json!({ "name": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn preferences_follow_the_active_profile() {
    let app = app_with(Arc::new(Oracle));

    let (status, _) = send(&app, Method::PUT, "/language", Some(json!({ "language": "fr" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, Method::PUT, "/language", Some(json!({ "language": "en" }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, settings) = send(
        &app,
        Method::PUT,
        "/settings",
        Some(json!({ "provider": "deepseek", "apiKey": "sk-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settings["provider"], "deepseek");
    assert_eq!(settings["apiKey"], "sk-1");
    assert_eq!(settings["model"], "gemini-3-flash-preview");

    send(&app, Method::PUT, "/draft", Some(json!({ "question": "new job?" }))).await;
    let (_, draft) = send(&app, Method::GET, "/draft", None).await;
    assert_eq!(draft["question"], "new job?");

    // A new profile starts from defaults.
    send(&app, Method::POST, "/profiles", Some(json!({ "name": "B" }))).await;
    let (_, language) = send(&app, Method::GET, "/language", None).await;
    assert_eq!(language["language"], "zh");
    let (_, settings) = send(&app, Method::GET, "/settings", None).await;
    assert_eq!(settings["provider"], "gemini");
    let (_, draft) = send(&app, Method::GET, "/draft", None).await;
    assert_eq!(draft["question"], "");

    // And the guest's values are still there.
    send(&app, Method::POST, "/profiles/guest/activate", None).await;
    let (_, language) = send(&app, Method::GET, "/language", None).await;
    assert_eq!(language["language"], "en");

    let (status, _) = send(&app, Method::DELETE, "/draft", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, draft) = send(&app, Method::GET, "/draft", None).await;
    assert_eq!(draft["question"], "");
}

#[tokio::test]
async fn reading_is_saved_and_charged() {
    let app = app_with(Arc::new(Oracle));
    send(&app, Method::PUT, "/draft", Some(json!({ "question": "Will I move?" }))).await;

    let (status, reading) =
        send(&app, Method::POST, "/readings", Some(reading_body("Will I move?"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reading["interpretation"], "The cards answer: Will I move?");
    assert_eq!(reading["cards"][0]["card"]["nameEn"], "The Star");
    assert_eq!(reading["spread"]["category"], "daily");
    assert_eq!(reading["spread"]["tagType"], "basic");

    let (_, history) = send(&app, Method::GET, "/readings", None).await;
    assert_eq!(history.as_array().unwrap().len(), 1);
    let (_, draft) = send(&app, Method::GET, "/draft", None).await;
    assert_eq!(draft["question"], "");
    let (_, session) = send(&app, Method::GET, "/session", None).await;
    assert_eq!(session["guestRemainingToday"], GUEST_READINGS_PER_DAY - 1);
}

#[tokio::test]
async fn exhausted_guest_gets_too_many_requests() {
    let app = app_with(Arc::new(Oracle));
    for i in 0..GUEST_READINGS_PER_DAY {
        let (status, _) =
            send(&app, Method::POST, "/readings", Some(reading_body(&format!("q{}", i)))).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(&app, Method::POST, "/readings", Some(reading_body("more?"))).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body, "今日免费占卜次数已用完，登录后可继续使用");

    // Signed-in profiles are not gated.
    send(
        &app,
        Method::POST,
        "/auth/register",
        Some(json!({ "username": "dana", "password": "123456" })),
    )
    .await;
    let (status, _) = send(&app, Method::POST, "/readings", Some(reading_body("more?"))).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn failed_interpretation_returns_apology_and_saves_nothing() {
    let app = app_with(Arc::new(Offline));

    let (status, body) = send(&app, Method::POST, "/readings", Some(reading_body("q"))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body.as_str().unwrap().contains("请检查网络"));

    let (_, history) = send(&app, Method::GET, "/readings", None).await;
    assert!(history.as_array().unwrap().is_empty());
    let (_, session) = send(&app, Method::GET, "/session", None).await;
    assert_eq!(session["guestRemainingToday"], GUEST_READINGS_PER_DAY);
}

#[tokio::test]
async fn reading_without_cards_is_rejected() {
    let app = app_with(Arc::new(Oracle));
    let mut body = reading_body("q");
    body["cards"] = json!([]);
    let (status, _) = send(&app, Method::POST, "/readings", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

//! Common test utilities

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::util::ServiceExt;

use market_stall::auth::{JwtService, PasswordHasher};
use market_stall::domain::FixedClock;
use market_stall::repository::MemoryDatabase;
use market_stall::{api, seed, AppState, Repositories};

pub const ADMIN_PASSWORD: &str = "123456";
pub const JWT_SECRET: &str = "integration-test-secret";

/// Business day the test app believes is today
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
}

/// Build the full router over a fresh in-memory database seeded with the
/// admin account and the sample stores.
pub async fn setup_app() -> Router {
    setup_app_on(today()).await.0
}

/// Same as `setup_app`, also returning the database for day-shifted apps
pub async fn setup_app_on(day: NaiveDate) -> (Router, MemoryDatabase) {
    let db = MemoryDatabase::new();
    let hasher = PasswordHasher::new(1024, 1).unwrap();

    seed::seed_defaults(&Repositories::memory(db.clone()), &hasher, ADMIN_PASSWORD)
        .await
        .expect("Failed to seed");

    (app_for(&db, day), db)
}

/// Router over an existing database with the clock pinned to `day`
pub fn app_for(db: &MemoryDatabase, day: NaiveDate) -> Router {
    let state = AppState::new(
        Repositories::memory(db.clone()),
        Arc::new(FixedClock::new(day)),
        PasswordHasher::new(1024, 1).unwrap(),
        JwtService::new(JWT_SECRET, 24),
    );
    api::create_router(state, Duration::from_secs(30))
}

/// Send a request and decode the JSON body (Null when empty or not JSON)
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

/// Log in and return the bearer token
pub async fn login(app: &Router, email: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/users/login",
        None,
        Some(serde_json::json!({ "email": email, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["data"]["token"].as_str().unwrap().to_string()
}

pub async fn admin_token(app: &Router) -> String {
    login(app, seed::ADMIN_EMAIL, ADMIN_PASSWORD).await
}

//! API Integration Tests
//!
//! Full HTTP flows through the router on the in-memory backend.

use axum::http::StatusCode;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::str::FromStr;

mod common;

use common::{admin_token, app_for, login, send, setup_app, setup_app_on, today};

fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).unwrap(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).unwrap(),
        other => panic!("not a decimal: {other}"),
    }
}

async fn store_id(app: &axum::Router, token: &str, stall_id: &str) -> String {
    let (status, body) = send(app, "GET", "/api/stores", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["stallId"] == stall_id)
        .map(|s| s["id"].as_str().unwrap().to_string())
        .unwrap()
}

#[tokio::test]
async fn test_health_and_public_stats() {
    let app = setup_app().await;

    let (status, _) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "GET", "/api/stores/state", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["total"], 8);
    assert_eq!(body["data"]["active"], 8);
    assert_eq!(body["data"]["inactive"], 0);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = setup_app().await;

    let (status, body) = send(&app, "GET", "/api/transactions", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["errorCode"], "unauthenticated");

    let (status, _) = send(&app, "GET", "/api/stores", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_registration_activation_and_roles() {
    let app = setup_app().await;
    let admin = admin_token(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/users/register",
        None,
        Some(json!({ "email": "cashier@example.com", "phone": "012345", "password": "pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["role"], "cashier");
    assert_eq!(body["data"]["isActive"], false);
    assert!(body["data"].get("passwordHash").is_none());
    let cashier_id = body["data"]["id"].as_str().unwrap().to_string();

    // Duplicate email
    let (status, body) = send(
        &app,
        "POST",
        "/api/users/register",
        None,
        Some(json!({ "email": "cashier@example.com", "password": "pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorCode"], "duplicate_key");

    // Inactive accounts cannot log in
    let (status, body) = send(
        &app,
        "POST",
        "/api/users/login",
        None,
        Some(json!({ "email": "cashier@example.com", "password": "pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["errorCode"], "account_disabled");

    // Wrong password
    let (status, body) = send(
        &app,
        "POST",
        "/api/users/login",
        None,
        Some(json!({ "email": "admin@example.com", "password": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorCode"], "invalid_credentials");

    // Admin activates the cashier
    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/users/{cashier_id}"),
        Some(&admin),
        Some(json!({ "isActive": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isActive"], true);

    let cashier = login(&app, "cashier@example.com", "pw").await;

    // Cashier may list users and read a store, but not list or mutate stores
    let (status, body) = send(&app, "GET", "/api/users", Some(&cashier), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);

    let (status, body) = send(&app, "GET", "/api/stores", Some(&cashier), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["errorCode"], "forbidden");

    let m001 = store_id(&app, &admin, "M001").await;
    let (status, body) = send(&app, "GET", &format!("/api/stores/{m001}"), Some(&cashier), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "VK OE");
    assert_eq!(body["data"]["creator"]["email"], "admin@example.com");

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/users/{cashier_id}"),
        Some(&cashier),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Deactivating the cashier invalidates their existing token
    send(
        &app,
        "PUT",
        &format!("/api/users/{cashier_id}"),
        Some(&admin),
        Some(json!({ "isActive": false })),
    )
    .await;
    let (status, body) = send(&app, "GET", "/api/users", Some(&cashier), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["errorCode"], "account_disabled");

    // Deleted users are unauthenticated
    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/users/{cashier_id}"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "GET", "/api/transactions", Some(&cashier), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_store_crud() {
    let app = setup_app().await;
    let admin = admin_token(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/stores",
        Some(&admin),
        Some(json!({
            "stallId": " M009 ",
            "name": "Tea House",
            "owner": "Dara",
            "group": "V3",
            "amount": "750.50"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["stallId"], "M009");
    assert_eq!(body["data"]["isActive"], false);
    assert_eq!(decimal(&body["data"]["amount"]), Decimal::from_str("750.5").unwrap());
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "POST",
        "/api/stores",
        Some(&admin),
        Some(json!({ "stallId": "M001", "name": "X", "owner": "Y", "group": "V1", "amount": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorCode"], "duplicate_key");

    let (status, body) = send(
        &app,
        "POST",
        "/api/stores",
        Some(&admin),
        Some(json!({ "stallId": "M010", "name": "X" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorCode"], "validation_error");

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/stores/{id}"),
        Some(&admin),
        Some(json!({ "isActive": true, "amount": 800 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isActive"], true);
    assert_eq!(decimal(&body["data"]["amount"]), Decimal::from(800));

    let (status, body) = send(&app, "GET", "/api/stores/state", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 9);

    let (status, _) = send(&app, "DELETE", &format!("/api/stores/{id}"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(&app, "GET", &format!("/api/stores/{id}"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["errorCode"], "not_found");

    let (status, body) = send(&app, "GET", "/api/stores/not-a-uuid", Some(&admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorCode"], "validation_error");
}

#[tokio::test]
async fn test_daily_collection_flow() {
    let app = setup_app().await;
    let admin = admin_token(&app).await;
    let m001 = store_id(&app, &admin, "M001").await;

    // Paying before generation finds nothing
    let (status, body) = send(
        &app,
        "POST",
        "/api/transactions/mark-paid",
        Some(&admin),
        Some(json!({ "storeId": m001 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);

    let (status, body) = send(&app, "POST", "/api/transactions", Some(&admin), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["count"], 8);

    let (status, body) = send(&app, "POST", "/api/transactions", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
    assert_eq!(
        body["message"],
        "All active stores already have today's transactions"
    );

    let (status, body) = send(&app, "GET", "/api/transactions/unpaid", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 8);
    let ours = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["storeId"] == m001.as_str())
        .unwrap()
        .clone();
    assert_eq!(ours["date"], today().to_string());
    assert_eq!(ours["status"], "Unpaid");
    assert_eq!(decimal(&ours["amount"]), Decimal::from(1000));
    assert_eq!(ours["store"]["stallId"], "M001");

    let (status, body) = send(
        &app,
        "POST",
        "/api/transactions/mark-paid",
        Some(&admin),
        Some(json!({ "storeId": m001 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "Paid");
    assert!(body["data"]["paidAt"].is_string());
    assert_eq!(decimal(&body["data"]["amount"]), Decimal::from(1000));
    let paid_at = body["data"]["paidAt"].clone();

    let (status, body) = send(
        &app,
        "POST",
        "/api/transactions/mark-paid",
        Some(&admin),
        Some(json!({ "storeId": m001 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorCode"], "validation_error");

    let (_, body) = send(
        &app,
        "GET",
        &format!("/api/transactions/active/{m001}"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(body["count"], 0);

    let (_, body) = send(&app, "GET", "/api/transactions?name=vk", Some(&admin), None).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["paidAt"], paid_at);

    let (status, body) = send(&app, "GET", "/api/transactions/all?date=2026-13-01", Some(&admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorCode"], "validation_error");
}

#[tokio::test]
async fn test_settlement_across_days() {
    let (app, db) = setup_app_on(today()).await;
    let admin = admin_token(&app).await;
    let m002 = store_id(&app, &admin, "M002").await;

    // Two earlier days left unpaid, then today
    for day in [today().pred_opt().unwrap().pred_opt().unwrap(), today().pred_opt().unwrap()] {
        let earlier = app_for(&db, day);
        let (status, _) = send(&earlier, "POST", "/api/transactions", Some(&admin), None).await;
        assert_eq!(status, StatusCode::CREATED);
    }
    send(&app, "POST", "/api/transactions", Some(&admin), None).await;

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/transactions/get-unpaid?storeId={m002}"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&body["data"]["totalAmount"]), Decimal::from(3600));
    assert_eq!(body["count"], 3);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/transactions/payment/{m002}"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 3);
    assert_eq!(decimal(&body["data"]["paidAmount"]), Decimal::from(1200));
    for tx in body["data"]["transactions"].as_array().unwrap() {
        assert_eq!(tx["status"], "Paid");
        assert_eq!(decimal(&tx["finalAmount"]), Decimal::from(1200));
    }

    // Body form of the same query, through the legacy alias
    let (status, body) = send(
        &app,
        "GET",
        "/api/transactions/make-paid",
        Some(&admin),
        Some(json!({ "storeId": m002 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&body["data"]["totalAmount"]), Decimal::ZERO);
    assert_eq!(body["message"], "No unpaid transactions");

    let (status, body) = send(&app, "GET", "/api/transactions/get-unpaid", Some(&admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorCode"], "validation_error");

    let (status, body) = send(&app, "GET", "/api/transactions/dashboard", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&body["data"]["totalFinalAmount"]), Decimal::from(3600));
    assert_eq!(body["data"]["userCount"], 1);
    assert_eq!(body["data"]["storeCount"], 8);
}

#[tokio::test]
async fn test_direct_transaction_edit_and_orphans() {
    let app = setup_app().await;
    let admin = admin_token(&app).await;
    let m003 = store_id(&app, &admin, "M003").await;

    let (_, body) = send(&app, "POST", "/api/transactions", Some(&admin), None).await;
    let tx_id = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["storeId"] == m003.as_str())
        .map(|t| t["id"].as_str().unwrap().to_string())
        .unwrap();

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/transactions/{tx_id}"),
        Some(&admin),
        Some(json!({ "note": "market closed early", "absentMultiplier": "0.5" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["note"], "market closed early");
    assert_eq!(decimal(&body["data"]["absentMultiplier"]), Decimal::from_str("0.5").unwrap());

    let (status, _) = send(&app, "PUT", &format!("/api/transactions/{tx_id}"), Some(&admin), Some(json!("oops"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Deleting the store leaves its transaction behind
    let (status, _) = send(&app, "DELETE", &format!("/api/stores/{m003}"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, "GET", "/api/transactions", Some(&admin), None).await;
    let orphan = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["id"] == tx_id.as_str())
        .unwrap()
        .clone();
    assert!(orphan["store"].is_null());

    let (_, body) = send(&app, "GET", "/api/transactions?name=green", Some(&admin), None).await;
    assert_eq!(body["count"], 0);

    let (status, _) = send(&app, "DELETE", &format!("/api/transactions/{tx_id}"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(&app, "DELETE", &format!("/api/transactions/{tx_id}"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["errorCode"], "not_found");
}

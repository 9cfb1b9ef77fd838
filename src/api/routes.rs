//! API Routes
//!
//! HTTP endpoint definitions.

use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Extension, FromRequest, FromRequestParts, State},
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::auth::authorize;
use crate::domain::{
    Principal, Role, Store, StoreStats, StoreView, Transaction, TransactionFilter,
    TransactionPatch, TransactionView, User,
};
use crate::error::{AppError, AppResult};
use crate::handlers::{
    CreateStoreCommand, Dashboard, LoginCommand, LoginResult, RecordPaymentCommand,
    RegisterCommand, SettlementResult, UnpaidSummary, UpdateStoreCommand, UpdateUserCommand,
};
use crate::state::AppState;

use super::middleware::{auth_middleware, logging_middleware};

const ADMIN: &[Role] = &[Role::Admin];
const STAFF: &[Role] = &[Role::Admin, Role::Cashier];

// =========================================================================
// Extractors and envelope
// =========================================================================

/// JSON body whose rejections render as validation errors
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Success envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
            count: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }
}

type ApiResult<T> = AppResult<Json<ApiResponse<T>>>;
type Created<T> = AppResult<(StatusCode, Json<ApiResponse<T>>)>;

fn listed<T: Serialize>(items: Vec<T>) -> Json<ApiResponse<Vec<T>>> {
    let count = items.len();
    Json(ApiResponse::ok(items).with_count(count))
}

// =========================================================================
// Request types
// =========================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreIdParams {
    #[serde(default)]
    pub store_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TransactionListQuery {
    #[serde(default)]
    pub name: Option<String>,
    /// Creation day, `YYYY-MM-DD`
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

impl From<TransactionListQuery> for TransactionFilter {
    fn from(query: TransactionListQuery) -> Self {
        TransactionFilter {
            name: query.name,
            created_on: query.date,
        }
    }
}

// =========================================================================
// API Router
// =========================================================================

/// Build the full application router
pub fn create_router(state: AppState, request_timeout: Duration) -> Router {
    let public = Router::new()
        .route("/api/users/register", post(register))
        .route("/api/users/login", post(login))
        .route("/api/stores/state", get(store_stats));

    let protected = Router::new()
        // Users
        .route("/api/users", get(list_users))
        .route(
            "/api/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        // Stores
        .route("/api/stores", get(list_stores).post(create_store))
        .route(
            "/api/stores/:id",
            get(get_store).put(update_store).delete(delete_store),
        )
        // Transactions
        .route(
            "/api/transactions",
            get(list_transactions).post(generate_transactions),
        )
        .route("/api/transactions/all", get(list_transactions))
        .route("/api/transactions/unpaid", get(list_today))
        .route("/api/transactions/dashboard", get(dashboard))
        .route("/api/transactions/active/:store_id", get(list_active_for_store))
        .route("/api/transactions/get-unpaid", get(unpaid_summary))
        .route("/api/transactions/make-paid", get(unpaid_summary))
        .route("/api/transactions/mark-paid", post(record_payment))
        .route("/api/transactions/payment/:store_id", post(settle_all_unpaid))
        .route(
            "/api/transactions/:id",
            put(update_transaction).delete(delete_transaction),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Layers run outermost-last: cors -> timeout -> trace -> logging -> auth -> handler
    Router::new()
        .route("/health", get(health_check))
        .merge(public)
        .merge(protected)
        .layer(middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

// =========================================================================
// Users
// =========================================================================

async fn register(
    State(state): State<AppState>,
    ApiJson(command): ApiJson<RegisterCommand>,
) -> Created<User> {
    let user = state.users.register(command).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(user).with_message("Registered. An admin must activate the account.")),
    ))
}

async fn login(
    State(state): State<AppState>,
    ApiJson(command): ApiJson<LoginCommand>,
) -> ApiResult<LoginResult> {
    let result = state.users.login(command).await?;
    Ok(Json(ApiResponse::ok(result)))
}

async fn list_users(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Vec<User>> {
    authorize(&principal, STAFF)?;
    Ok(listed(state.users.list().await?))
}

async fn get_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<User> {
    authorize(&principal, ADMIN)?;
    Ok(Json(ApiResponse::ok(state.users.get(id).await?)))
}

async fn update_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(command): ApiJson<UpdateUserCommand>,
) -> ApiResult<User> {
    authorize(&principal, ADMIN)?;
    let user = state.users.update(id, command).await?;
    Ok(Json(ApiResponse::ok(user).with_message("User updated")))
}

async fn delete_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<User> {
    authorize(&principal, ADMIN)?;
    let user = state.users.delete(id).await?;
    Ok(Json(ApiResponse::ok(user).with_message("User deleted")))
}

// =========================================================================
// Stores
// =========================================================================

async fn store_stats(State(state): State<AppState>) -> ApiResult<StoreStats> {
    Ok(Json(ApiResponse::ok(state.stores.stats().await?)))
}

async fn list_stores(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Vec<StoreView>> {
    authorize(&principal, ADMIN)?;
    Ok(listed(state.stores.list().await?))
}

async fn get_store(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StoreView> {
    authorize(&principal, STAFF)?;
    Ok(Json(ApiResponse::ok(state.stores.get(id).await?)))
}

async fn create_store(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(command): ApiJson<CreateStoreCommand>,
) -> Created<Store> {
    authorize(&principal, ADMIN)?;
    let store = state.stores.create(command, principal.user_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(store).with_message("Store created")),
    ))
}

async fn update_store(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(command): ApiJson<UpdateStoreCommand>,
) -> ApiResult<Store> {
    authorize(&principal, ADMIN)?;
    let store = state.stores.update(id, command, principal.user_id).await?;
    Ok(Json(ApiResponse::ok(store).with_message("Store updated")))
}

async fn delete_store(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Store> {
    authorize(&principal, ADMIN)?;
    let store = state.stores.delete(id).await?;
    Ok(Json(ApiResponse::ok(store).with_message("Store deleted")))
}

// =========================================================================
// Transactions
// =========================================================================

async fn list_transactions(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TransactionListQuery>,
) -> ApiResult<Vec<TransactionView>> {
    let filter = TransactionFilter::from(query);
    Ok(listed(state.transactions.list(&filter).await?))
}

async fn list_today(State(state): State<AppState>) -> ApiResult<Vec<TransactionView>> {
    Ok(listed(state.transactions.list_today().await?))
}

async fn dashboard(State(state): State<AppState>) -> ApiResult<Dashboard> {
    Ok(Json(ApiResponse::ok(state.transactions.dashboard().await?)))
}

async fn list_active_for_store(
    State(state): State<AppState>,
    ApiPath(store_id): ApiPath<Uuid>,
) -> ApiResult<Vec<Transaction>> {
    Ok(listed(state.transactions.list_active_for_store(store_id).await?))
}

/// `storeId` comes from the query string or, failing that, a JSON body
async fn unpaid_summary(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<StoreIdParams>,
    body: Bytes,
) -> ApiResult<UnpaidSummary> {
    let store_id = match query.store_id {
        Some(id) => Some(id),
        None => store_id_from_body(&body)?,
    }
    .ok_or_else(|| AppError::validation("storeId is required"))?;

    let summary = state.transactions.unpaid_summary(store_id).await?;
    let count = summary.transactions.len();
    let mut response = ApiResponse::ok(summary).with_count(count);
    if let Some(message) = response.data.message.clone() {
        response = response.with_message(message);
    }
    Ok(Json(response))
}

fn store_id_from_body(body: &Bytes) -> AppResult<Option<Uuid>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let params: StoreIdParams = serde_json::from_slice(body)
        .map_err(|e| AppError::validation(format!("Invalid JSON body: {e}")))?;
    Ok(params.store_id)
}

async fn generate_transactions(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Created<Vec<Transaction>> {
    let result = state.transactions.generate_daily(principal.user_id).await?;

    let status = if result.created > 0 {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    let mut response = ApiResponse::ok(result.transactions).with_count(result.created);
    if let Some(message) = result.message {
        response = response.with_message(message);
    }
    Ok((status, Json(response)))
}

async fn record_payment(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(command): ApiJson<RecordPaymentCommand>,
) -> ApiResult<Transaction> {
    let paid = state
        .transactions
        .record_payment(command, principal.user_id)
        .await?;
    Ok(Json(ApiResponse::ok(paid).with_message("Payment recorded")))
}

async fn settle_all_unpaid(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(store_id): ApiPath<Uuid>,
) -> ApiResult<SettlementResult> {
    let result = state
        .transactions
        .settle_all_unpaid(store_id, principal.user_id)
        .await?;
    let message = result.message.clone();
    let count = result.count;
    Ok(Json(
        ApiResponse::ok(result)
            .with_message(message)
            .with_count(count),
    ))
}

async fn update_transaction(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<TransactionPatch>,
) -> ApiResult<Transaction> {
    let updated = state
        .transactions
        .update(id, patch, principal.user_id)
        .await?;
    Ok(Json(ApiResponse::ok(updated).with_message("Transaction updated")))
}

async fn delete_transaction(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Transaction> {
    let deleted = state.transactions.delete(id).await?;
    Ok(Json(ApiResponse::ok(deleted).with_message("Transaction deleted")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_serialization() {
        let body = serde_json::to_value(ApiResponse::ok(vec![1, 2]).with_count(2)).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["count"], 2);
        assert!(body.get("message").is_none());
    }

    #[test]
    fn test_store_id_from_body() {
        let id = Uuid::new_v4();
        let body = Bytes::from(format!(r#"{{"storeId":"{id}"}}"#));
        assert_eq!(store_id_from_body(&body).unwrap(), Some(id));

        assert_eq!(store_id_from_body(&Bytes::from_static(b"  ")).unwrap(), None);
        assert!(store_id_from_body(&Bytes::from_static(b"{oops")).is_err());
    }

    #[test]
    fn test_list_query_maps_to_filter() {
        let query: TransactionListQuery =
            serde_json::from_str(r#"{"name":"fish","date":"2026-03-14"}"#).unwrap();
        let filter = TransactionFilter::from(query);
        assert_eq!(filter.name.as_deref(), Some("fish"));
        assert_eq!(filter.created_on, NaiveDate::from_ymd_opt(2026, 3, 14));
    }
}

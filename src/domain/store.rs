//! Stores (market stalls)

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// A rentable stall with its daily fee
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub id: Uuid,
    pub stall_id: String,
    pub name: String,
    pub owner: String,
    pub group: String,
    pub amount: Decimal,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated store ready for insertion
#[derive(Debug, Clone)]
pub struct NewStore {
    pub stall_id: String,
    pub name: String,
    pub owner: String,
    pub group: String,
    pub amount: Decimal,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
}

/// Partial store update; `None` leaves the column unchanged
#[derive(Debug, Clone, Default)]
pub struct StorePatch {
    pub stall_id: Option<String>,
    pub name: Option<String>,
    pub owner: Option<String>,
    pub group: Option<String>,
    pub amount: Option<Decimal>,
    pub is_active: Option<bool>,
}

/// Store counts for the public stats endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub total: i64,
    pub active: i64,
    pub inactive: i64,
}

/// Resolved identity of an audit user
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub id: Uuid,
    pub email: String,
}

/// Store with creator and updater resolved
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreView {
    #[serde(flatten)]
    pub store: Store,
    pub creator: Option<UserRef>,
    pub updater: Option<UserRef>,
}

/// Store summary embedded in transaction listings
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreRef {
    pub id: Uuid,
    pub stall_id: String,
    pub name: String,
    pub owner: String,
    pub group: String,
    pub amount: Decimal,
}

impl From<&Store> for StoreRef {
    fn from(store: &Store) -> Self {
        Self {
            id: store.id,
            stall_id: store.stall_id.clone(),
            name: store.name.clone(),
            owner: store.owner.clone(),
            group: store.group.clone(),
            amount: store.amount,
        }
    }
}

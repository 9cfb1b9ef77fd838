//! Daily rent transactions
//!
//! One record per store per billing day. `Unpaid -> Paid` is the only
//! managed transition; `paid_at` is stamped when a record enters `Paid`.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{StoreRef, UserRef};

/// Payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_status")]
pub enum TransactionStatus {
    Unpaid,
    Paid,
}

impl Default for TransactionStatus {
    fn default() -> Self {
        Self::Unpaid
    }
}

/// Stored transaction
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    pub store_id: Uuid,
    /// Billing day
    pub date: NaiveDate,
    pub amount: Decimal,
    pub base_amount: Decimal,
    pub absent_multiplier: Decimal,
    pub adjustment: Decimal,
    pub owner_discount_share: Decimal,
    pub final_amount: Option<Decimal>,
    pub status: TransactionStatus,
    pub note: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn is_paid(&self) -> bool {
        self.status == TransactionStatus::Paid
    }
}

/// Unpaid transaction to create for a store on a given day
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub store_id: Uuid,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub created_by: Option<Uuid>,
}

/// Optional overrides applied when recording a payment
#[derive(Debug, Clone, Default)]
pub struct PaymentUpdate {
    pub amount: Option<Decimal>,
    pub note: Option<String>,
}

/// Direct edit of any transaction field
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPatch {
    pub store_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub amount: Option<Decimal>,
    pub base_amount: Option<Decimal>,
    pub absent_multiplier: Option<Decimal>,
    pub adjustment: Option<Decimal>,
    pub owner_discount_share: Option<Decimal>,
    pub final_amount: Option<Decimal>,
    pub status: Option<TransactionStatus>,
    pub note: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

/// Listing filter: store name substring and creation day
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub name: Option<String>,
    pub created_on: Option<NaiveDate>,
}

impl TransactionFilter {
    /// Lower-cased, trimmed name needle; blank names do not filter
    pub fn name_needle(&self) -> Option<String> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    /// Half-open UTC window `[day 00:00, next day 00:00)` for `created_on`
    pub fn created_window(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let day = self.created_on?;
        let start = day.and_hms_opt(0, 0, 0)?.and_utc();
        let end = day.succ_opt()?.and_hms_opt(0, 0, 0)?.and_utc();
        Some((start, end))
    }
}

/// Transaction with its store and creator resolved.
/// `store` is `None` once the store has been deleted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub store: Option<StoreRef>,
    pub creator: Option<UserRef>,
}

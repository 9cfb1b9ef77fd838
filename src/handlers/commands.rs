//! Command definitions
//!
//! Commands carry caller input into the lifecycle managers. Store commands
//! keep raw optional fields so presence and format are validated in one place.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::{amount, NewStore, Role, StorePatch, Transaction, User};
use crate::error::{AppError, AppResult};

// =========================================================================
// Stores
// =========================================================================

/// Command to create a store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStoreCommand {
    pub stall_id: Option<String>,
    pub name: Option<String>,
    pub owner: Option<String>,
    pub group: Option<String>,
    /// Number or numeric string
    pub amount: Option<Value>,
    pub is_active: Option<bool>,
}

impl CreateStoreCommand {
    pub fn new(stall_id: &str, name: &str, owner: &str, group: &str, amount: Decimal) -> Self {
        Self {
            stall_id: Some(stall_id.to_string()),
            name: Some(name.to_string()),
            owner: Some(owner.to_string()),
            group: Some(group.to_string()),
            amount: Some(Value::String(amount.to_string())),
            is_active: None,
        }
    }

    pub fn active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }

    /// Validate presence, trim strings and coerce the amount.
    pub fn validate(self, actor: Uuid) -> AppResult<NewStore> {
        let stall_id = required_text(self.stall_id);
        let name = required_text(self.name);
        let owner = required_text(self.owner);
        let group = required_text(self.group);

        let (Some(stall_id), Some(name), Some(owner), Some(group), Some(raw_amount)) =
            (stall_id, name, owner, group, self.amount)
        else {
            return Err(AppError::validation(
                "Stall ID, name, owner, group, and amount are required.",
            ));
        };

        let amount = amount::parse_amount(&raw_amount)
            .map_err(|e| AppError::validation(e.to_string()))?;

        Ok(NewStore {
            stall_id,
            name,
            owner,
            group,
            amount,
            is_active: self.is_active.unwrap_or(false),
            created_by: Some(actor),
        })
    }
}

/// Command to partially update a store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStoreCommand {
    pub stall_id: Option<String>,
    pub name: Option<String>,
    pub owner: Option<String>,
    pub group: Option<String>,
    pub amount: Option<Value>,
    pub is_active: Option<bool>,
}

impl UpdateStoreCommand {
    /// Trim supplied strings (blank is rejected) and coerce the amount.
    pub fn into_patch(self) -> AppResult<StorePatch> {
        let amount = match self.amount {
            None | Some(Value::Null) => None,
            Some(raw) => Some(
                amount::parse_amount(&raw).map_err(|e| AppError::validation(e.to_string()))?,
            ),
        };

        Ok(StorePatch {
            stall_id: optional_text("stallId", self.stall_id)?,
            name: optional_text("name", self.name)?,
            owner: optional_text("owner", self.owner)?,
            group: optional_text("group", self.group)?,
            amount,
            is_active: self.is_active,
        })
    }
}

fn required_text(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn optional_text(field: &str, value: Option<String>) -> AppResult<Option<String>> {
    match value {
        None => Ok(None),
        Some(s) => match required_text(Some(s)) {
            Some(trimmed) => Ok(Some(trimmed)),
            None => Err(AppError::validation(format!("{field} must not be blank"))),
        },
    }
}

// =========================================================================
// Transactions
// =========================================================================

/// Command to record today's payment for a store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPaymentCommand {
    pub store_id: Uuid,
    /// Overrides the owed amount when present
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub note: Option<String>,
}

impl RecordPaymentCommand {
    pub fn new(store_id: Uuid) -> Self {
        Self {
            store_id,
            amount: None,
            note: None,
        }
    }

    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Result of daily generation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub created: usize,
    pub transactions: Vec<Transaction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Result of bulk settlement
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementResult {
    pub paid_amount: Option<Decimal>,
    pub count: usize,
    pub transactions: Vec<Transaction>,
    pub message: String,
}

impl SettlementResult {
    pub fn nothing_to_settle() -> Self {
        Self {
            paid_amount: None,
            count: 0,
            transactions: Vec::new(),
            message: "No unpaid transactions to settle".to_string(),
        }
    }
}

/// Unpaid balance of one store
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnpaidSummary {
    pub total_amount: Decimal,
    pub transactions: Vec<Transaction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Aggregates for the dashboard
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub total_final_amount: Decimal,
    pub user_count: i64,
    pub store_count: i64,
}

// =========================================================================
// Users
// =========================================================================

/// Command to register (or administratively create) a user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterCommand {
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub password: Option<String>,
}

impl RegisterCommand {
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: Some(email.to_string()),
            phone: None,
            password: Some(password.to_string()),
        }
    }

    pub fn with_phone(mut self, phone: &str) -> Self {
        self.phone = Some(phone.to_string());
        self
    }
}

/// Command to log in
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginCommand {
    pub email: String,
    pub password: String,
}

/// Command to update a user; `None` fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserCommand {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

/// Result of a successful login
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    pub token: String,
    pub expires_in: i64,
    pub user: User,
}

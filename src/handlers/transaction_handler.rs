//! Transaction lifecycle
//!
//! Daily rent generation, payment recording and bulk settlement.
//! A transaction moves `Unpaid -> Paid` exactly once; every transition is a
//! conditional update in the repository so concurrent callers cannot
//! double-apply it.

use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::amount::validate_amount;
use crate::domain::{
    Clock, NewTransaction, PaymentUpdate, Transaction, TransactionFilter, TransactionPatch,
    TransactionView,
};
use crate::error::{AppError, AppResult};
use crate::repository::{StoreRepository, TransactionRepository, UserRepository};

use super::{Dashboard, GenerationResult, RecordPaymentCommand, SettlementResult, UnpaidSummary};

/// Handler for transaction operations
#[derive(Clone)]
pub struct TransactionManager {
    stores: Arc<dyn StoreRepository>,
    transactions: Arc<dyn TransactionRepository>,
    users: Arc<dyn UserRepository>,
    clock: Arc<dyn Clock>,
}

impl TransactionManager {
    pub fn new(
        stores: Arc<dyn StoreRepository>,
        transactions: Arc<dyn TransactionRepository>,
        users: Arc<dyn UserRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            stores,
            transactions,
            users,
            clock,
        }
    }

    /// Create today's `Unpaid` transaction for every active store lacking one.
    pub async fn generate_daily(&self, actor: Uuid) -> AppResult<GenerationResult> {
        let today = self.clock.today();

        let active = self.stores.list_active().await?;
        let existing = self.transactions.list_on(today).await?;

        let rows: Vec<NewTransaction> = active
            .iter()
            .filter(|store| {
                !existing
                    .iter()
                    .any(|view| view.transaction.store_id == store.id)
            })
            .map(|store| NewTransaction {
                store_id: store.id,
                date: today,
                amount: store.amount,
                created_by: Some(actor),
            })
            .collect();

        // Rows that lost a race against another generator are skipped here
        let created = if rows.is_empty() {
            Vec::new()
        } else {
            self.transactions.insert_missing(rows).await?
        };

        if created.is_empty() {
            tracing::debug!(date = %today, "No stores need a transaction today");
            return Ok(GenerationResult {
                created: 0,
                transactions: Vec::new(),
                message: Some("All active stores already have today's transactions".to_string()),
            });
        }

        tracing::info!(
            date = %today,
            created = created.len(),
            actor = %actor,
            "Daily transactions generated"
        );

        Ok(GenerationResult {
            created: created.len(),
            transactions: created,
            message: None,
        })
    }

    /// Pay today's transaction of a store.
    pub async fn record_payment(
        &self,
        command: RecordPaymentCommand,
        actor: Uuid,
    ) -> AppResult<Transaction> {
        let today = self.clock.today();

        let amount = command
            .amount
            .map(validate_amount)
            .transpose()
            .map_err(|e| AppError::validation(e.to_string()))?;

        let current = self
            .transactions
            .find_for_store_on(command.store_id, today)
            .await?
            .ok_or_else(|| AppError::not_found("Transaction for today"))?;

        if current.is_paid() {
            return Err(AppError::validation("Transaction is already paid"));
        }

        let payment = PaymentUpdate {
            amount,
            note: command.note,
        };

        // None here means another request paid it first
        let paid = self
            .transactions
            .mark_paid(command.store_id, today, payment, actor, self.clock.now())
            .await?
            .ok_or_else(|| AppError::validation("Transaction is already paid"))?;

        tracing::info!(
            transaction_id = %paid.id,
            store_id = %paid.store_id,
            amount = %paid.amount,
            actor = %actor,
            "Payment recorded"
        );
        Ok(paid)
    }

    /// Settle every unpaid transaction of a store at the store's current rent.
    pub async fn settle_all_unpaid(
        &self,
        store_id: Uuid,
        actor: Uuid,
    ) -> AppResult<SettlementResult> {
        let unpaid = self.transactions.list_unpaid_for_store(store_id).await?;
        if unpaid.is_empty() {
            return Ok(SettlementResult::nothing_to_settle());
        }

        let store = self
            .stores
            .find(store_id)
            .await?
            .ok_or_else(|| AppError::not_found("Store"))?;
        let paid_amount = store.store.amount;

        // Each settled record carries the full current rent
        let settled = self
            .transactions
            .settle_unpaid(store_id, paid_amount, actor, self.clock.now())
            .await?;
        // A concurrent settlement may have claimed every row
        if settled.is_empty() {
            return Ok(SettlementResult::nothing_to_settle());
        }

        tracing::info!(
            store_id = %store_id,
            count = settled.len(),
            paid_amount = %paid_amount,
            actor = %actor,
            "Unpaid transactions settled"
        );

        Ok(SettlementResult {
            paid_amount: Some(paid_amount),
            count: settled.len(),
            message: format!("Settled {} transaction(s)", settled.len()),
            transactions: settled,
        })
    }

    pub async fn unpaid_summary(&self, store_id: Uuid) -> AppResult<UnpaidSummary> {
        let unpaid = self.transactions.list_unpaid_for_store(store_id).await?;
        if unpaid.is_empty() {
            return Ok(UnpaidSummary {
                total_amount: Decimal::ZERO,
                transactions: Vec::new(),
                message: Some("No unpaid transactions".to_string()),
            });
        }

        let total_amount = unpaid.iter().map(|tx| tx.amount).sum();
        Ok(UnpaidSummary {
            total_amount,
            transactions: unpaid,
            message: None,
        })
    }

    pub async fn list(&self, filter: &TransactionFilter) -> AppResult<Vec<TransactionView>> {
        Ok(self.transactions.list(filter).await?)
    }

    pub async fn list_today(&self) -> AppResult<Vec<TransactionView>> {
        Ok(self.transactions.list_on(self.clock.today()).await?)
    }

    pub async fn list_active_for_store(&self, store_id: Uuid) -> AppResult<Vec<Transaction>> {
        Ok(self.transactions.list_unpaid_for_store(store_id).await?)
    }

    /// Direct edit of any field.
    pub async fn update(
        &self,
        id: Uuid,
        patch: TransactionPatch,
        actor: Uuid,
    ) -> AppResult<Transaction> {
        let updated = self
            .transactions
            .update(id, patch, actor)
            .await?
            .ok_or_else(|| AppError::not_found("Transaction"))?;

        tracing::info!(transaction_id = %id, actor = %actor, "Transaction updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<Transaction> {
        let deleted = self
            .transactions
            .delete(id)
            .await?
            .ok_or_else(|| AppError::not_found("Transaction"))?;

        tracing::info!(transaction_id = %id, "Transaction deleted");
        Ok(deleted)
    }

    pub async fn dashboard(&self) -> AppResult<Dashboard> {
        let total_final_amount = self.transactions.total_final_amount().await?;
        let user_count = self.users.count().await?;
        let store_count = self.stores.stats().await?.total;

        Ok(Dashboard {
            total_final_amount,
            user_count,
            store_count,
        })
    }
}

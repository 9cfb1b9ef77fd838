//! In-memory repositories
//!
//! A single lock guards all three tables, so every trait method is atomic
//! with the same guarantees the Postgres constraints give. Used for
//! `STORAGE=memory` runs and tests.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{
    NewStore, NewTransaction, NewUser, PaymentUpdate, Store, StorePatch, StoreRef, StoreStats,
    StoreView, Transaction, TransactionFilter, TransactionPatch, TransactionStatus,
    TransactionView, User, UserPatch, UserRef,
};

use super::{
    RepoError, RepoResult, StoreRepository, TransactionRepository, UserRepository,
};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    stores: Vec<Store>,
    transactions: Vec<Transaction>,
}

impl Tables {
    fn user_ref(&self, id: Option<Uuid>) -> Option<UserRef> {
        let id = id?;
        self.users.iter().find(|u| u.id == id).map(|u| UserRef {
            id: u.id,
            email: u.email.clone(),
        })
    }

    fn store_view(&self, store: &Store) -> StoreView {
        StoreView {
            store: store.clone(),
            creator: self.user_ref(store.created_by),
            updater: self.user_ref(store.updated_by),
        }
    }

    fn transaction_view(&self, tx: &Transaction) -> TransactionView {
        TransactionView {
            transaction: tx.clone(),
            store: self
                .stores
                .iter()
                .find(|s| s.id == tx.store_id)
                .map(StoreRef::from),
            creator: self.user_ref(tx.created_by),
        }
    }
}

/// Shared in-memory database implementing every repository trait
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StoreRepository for MemoryDatabase {
    async fn list(&self) -> RepoResult<Vec<StoreView>> {
        let tables = self.tables.read().await;
        Ok(tables.stores.iter().map(|s| tables.store_view(s)).collect())
    }

    async fn find(&self, id: Uuid) -> RepoResult<Option<StoreView>> {
        let tables = self.tables.read().await;
        Ok(tables
            .stores
            .iter()
            .find(|s| s.id == id)
            .map(|s| tables.store_view(s)))
    }

    async fn list_active(&self) -> RepoResult<Vec<Store>> {
        let tables = self.tables.read().await;
        Ok(tables.stores.iter().filter(|s| s.is_active).cloned().collect())
    }

    async fn stats(&self) -> RepoResult<StoreStats> {
        let tables = self.tables.read().await;
        let total = tables.stores.len() as i64;
        let active = tables.stores.iter().filter(|s| s.is_active).count() as i64;
        Ok(StoreStats {
            total,
            active,
            inactive: total - active,
        })
    }

    async fn insert(&self, store: NewStore) -> RepoResult<Store> {
        let mut tables = self.tables.write().await;
        if tables.stores.iter().any(|s| s.stall_id == store.stall_id) {
            return Err(RepoError::Duplicate { field: "stallId" });
        }

        let now = Utc::now();
        let record = Store {
            id: Uuid::new_v4(),
            stall_id: store.stall_id,
            name: store.name,
            owner: store.owner,
            group: store.group,
            amount: store.amount,
            is_active: store.is_active,
            created_by: store.created_by,
            updated_by: store.created_by,
            created_at: now,
            updated_at: now,
        };
        tables.stores.push(record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        id: Uuid,
        patch: StorePatch,
        actor: Uuid,
    ) -> RepoResult<Option<Store>> {
        let mut tables = self.tables.write().await;
        if !tables.stores.iter().any(|s| s.id == id) {
            return Ok(None);
        }
        if let Some(ref stall_id) = patch.stall_id {
            if tables
                .stores
                .iter()
                .any(|s| s.id != id && &s.stall_id == stall_id)
            {
                return Err(RepoError::Duplicate { field: "stallId" });
            }
        }

        let Some(store) = tables.stores.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };
        if let Some(stall_id) = patch.stall_id {
            store.stall_id = stall_id;
        }
        if let Some(name) = patch.name {
            store.name = name;
        }
        if let Some(owner) = patch.owner {
            store.owner = owner;
        }
        if let Some(group) = patch.group {
            store.group = group;
        }
        if let Some(amount) = patch.amount {
            store.amount = amount;
        }
        if let Some(is_active) = patch.is_active {
            store.is_active = is_active;
        }
        store.updated_by = Some(actor);
        store.updated_at = Utc::now();
        Ok(Some(store.clone()))
    }

    async fn delete(&self, id: Uuid) -> RepoResult<Option<Store>> {
        let mut tables = self.tables.write().await;
        let position = tables.stores.iter().position(|s| s.id == id);
        Ok(position.map(|i| tables.stores.remove(i)))
    }
}

#[async_trait]
impl TransactionRepository for MemoryDatabase {
    async fn insert_missing(&self, rows: Vec<NewTransaction>) -> RepoResult<Vec<Transaction>> {
        let mut tables = self.tables.write().await;
        let mut created = Vec::new();

        for row in rows {
            let exists = tables
                .transactions
                .iter()
                .any(|t| t.store_id == row.store_id && t.date == row.date);
            if exists {
                continue;
            }

            let now = Utc::now();
            let record = Transaction {
                id: Uuid::new_v4(),
                store_id: row.store_id,
                date: row.date,
                amount: row.amount,
                base_amount: row.amount,
                absent_multiplier: Decimal::ONE,
                adjustment: Decimal::ZERO,
                owner_discount_share: Decimal::ZERO,
                final_amount: None,
                status: TransactionStatus::Unpaid,
                note: None,
                paid_at: None,
                created_by: row.created_by,
                updated_by: None,
                created_at: now,
                updated_at: now,
            };
            tables.transactions.push(record.clone());
            created.push(record);
        }

        Ok(created)
    }

    async fn list_on(&self, date: NaiveDate) -> RepoResult<Vec<TransactionView>> {
        let tables = self.tables.read().await;
        Ok(tables
            .transactions
            .iter()
            .filter(|t| t.date == date)
            .map(|t| tables.transaction_view(t))
            .collect())
    }

    async fn find_for_store_on(
        &self,
        store_id: Uuid,
        date: NaiveDate,
    ) -> RepoResult<Option<Transaction>> {
        let tables = self.tables.read().await;
        Ok(tables
            .transactions
            .iter()
            .find(|t| t.store_id == store_id && t.date == date)
            .cloned())
    }

    async fn mark_paid(
        &self,
        store_id: Uuid,
        date: NaiveDate,
        payment: PaymentUpdate,
        actor: Uuid,
        paid_at: DateTime<Utc>,
    ) -> RepoResult<Option<Transaction>> {
        let mut tables = self.tables.write().await;
        let Some(tx) = tables.transactions.iter_mut().find(|t| {
            t.store_id == store_id && t.date == date && t.status == TransactionStatus::Unpaid
        }) else {
            return Ok(None);
        };

        tx.status = TransactionStatus::Paid;
        if let Some(amount) = payment.amount {
            tx.amount = amount;
        }
        if let Some(note) = payment.note {
            tx.note = Some(note);
        }
        tx.paid_at = Some(paid_at);
        tx.updated_by = Some(actor);
        tx.updated_at = paid_at;
        Ok(Some(tx.clone()))
    }

    async fn settle_unpaid(
        &self,
        store_id: Uuid,
        final_amount: Decimal,
        actor: Uuid,
        paid_at: DateTime<Utc>,
    ) -> RepoResult<Vec<Transaction>> {
        let mut tables = self.tables.write().await;
        let mut settled: Vec<Transaction> = tables
            .transactions
            .iter_mut()
            .filter(|t| t.store_id == store_id && t.status == TransactionStatus::Unpaid)
            .map(|tx| {
                tx.status = TransactionStatus::Paid;
                tx.final_amount = Some(final_amount);
                tx.paid_at = Some(paid_at);
                tx.updated_by = Some(actor);
                tx.updated_at = paid_at;
                tx.clone()
            })
            .collect();
        settled.sort_by_key(|t| t.date);
        Ok(settled)
    }

    async fn list_unpaid_for_store(&self, store_id: Uuid) -> RepoResult<Vec<Transaction>> {
        let tables = self.tables.read().await;
        let mut unpaid: Vec<Transaction> = tables
            .transactions
            .iter()
            .filter(|t| t.store_id == store_id && t.status == TransactionStatus::Unpaid)
            .cloned()
            .collect();
        unpaid.sort_by_key(|t| t.date);
        Ok(unpaid)
    }

    async fn list(&self, filter: &TransactionFilter) -> RepoResult<Vec<TransactionView>> {
        let tables = self.tables.read().await;
        let needle = filter.name_needle();
        let window = filter.created_window();

        let mut views: Vec<TransactionView> = tables
            .transactions
            .iter()
            .filter(|t| match window {
                Some((start, end)) => t.created_at >= start && t.created_at < end,
                None => true,
            })
            .map(|t| tables.transaction_view(t))
            .filter(|view| match (&needle, &view.store) {
                (None, _) => true,
                (Some(needle), Some(store)) => store.name.to_lowercase().contains(needle),
                (Some(_), None) => false,
            })
            .collect();
        // Reverse first so equal timestamps list the latest insert first
        views.reverse();
        views.sort_by(|a, b| b.transaction.created_at.cmp(&a.transaction.created_at));
        Ok(views)
    }

    async fn update(
        &self,
        id: Uuid,
        patch: TransactionPatch,
        actor: Uuid,
    ) -> RepoResult<Option<Transaction>> {
        let mut tables = self.tables.write().await;
        let Some(current) = tables.transactions.iter().find(|t| t.id == id) else {
            return Ok(None);
        };

        let store_id = patch.store_id.unwrap_or(current.store_id);
        let date = patch.date.unwrap_or(current.date);
        if tables
            .transactions
            .iter()
            .any(|t| t.id != id && t.store_id == store_id && t.date == date)
        {
            return Err(RepoError::Duplicate {
                field: "storeId/date",
            });
        }

        let Some(tx) = tables.transactions.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        tx.store_id = store_id;
        tx.date = date;
        if let Some(amount) = patch.amount {
            tx.amount = amount;
        }
        if let Some(base_amount) = patch.base_amount {
            tx.base_amount = base_amount;
        }
        if let Some(absent_multiplier) = patch.absent_multiplier {
            tx.absent_multiplier = absent_multiplier;
        }
        if let Some(adjustment) = patch.adjustment {
            tx.adjustment = adjustment;
        }
        if let Some(share) = patch.owner_discount_share {
            tx.owner_discount_share = share;
        }
        if let Some(final_amount) = patch.final_amount {
            tx.final_amount = Some(final_amount);
        }
        if let Some(status) = patch.status {
            tx.status = status;
        }
        if let Some(note) = patch.note {
            tx.note = Some(note);
        }
        if let Some(paid_at) = patch.paid_at {
            tx.paid_at = Some(paid_at);
        }
        tx.updated_by = Some(actor);
        tx.updated_at = Utc::now();
        Ok(Some(tx.clone()))
    }

    async fn delete(&self, id: Uuid) -> RepoResult<Option<Transaction>> {
        let mut tables = self.tables.write().await;
        let position = tables.transactions.iter().position(|t| t.id == id);
        Ok(position.map(|i| tables.transactions.remove(i)))
    }

    async fn total_final_amount(&self) -> RepoResult<Decimal> {
        let tables = self.tables.read().await;
        Ok(tables
            .transactions
            .iter()
            .filter_map(|t| t.final_amount)
            .sum())
    }
}

#[async_trait]
impl UserRepository for MemoryDatabase {
    async fn insert(&self, user: NewUser) -> RepoResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(RepoError::Duplicate { field: "email" });
        }

        let now = Utc::now();
        let record = User {
            id: Uuid::new_v4(),
            email: user.email,
            phone: user.phone,
            password_hash: user.password_hash,
            role: user.role,
            is_active: user.is_active,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(record.clone());
        Ok(record)
    }

    async fn find(&self, id: Uuid) -> RepoResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn list(&self) -> RepoResult<Vec<User>> {
        let tables = self.tables.read().await;
        let mut users = tables.users.clone();
        users.reverse();
        users.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(users)
    }

    async fn update(&self, id: Uuid, patch: UserPatch) -> RepoResult<Option<User>> {
        let mut tables = self.tables.write().await;
        if !tables.users.iter().any(|u| u.id == id) {
            return Ok(None);
        }
        if let Some(ref email) = patch.email {
            if tables.users.iter().any(|u| u.id != id && &u.email == email) {
                return Err(RepoError::Duplicate { field: "email" });
            }
        }

        let Some(user) = tables.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(email) = patch.email {
            user.email = email;
        }
        if let Some(phone) = patch.phone {
            user.phone = Some(phone);
        }
        if let Some(password_hash) = patch.password_hash {
            user.password_hash = password_hash;
        }
        if let Some(role) = patch.role {
            user.role = role;
        }
        if let Some(is_active) = patch.is_active {
            user.is_active = is_active;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: Uuid) -> RepoResult<Option<User>> {
        let mut tables = self.tables.write().await;
        let position = tables.users.iter().position(|u| u.id == id);
        Ok(position.map(|i| tables.users.remove(i)))
    }

    async fn count(&self) -> RepoResult<i64> {
        Ok(self.tables.read().await.users.len() as i64)
    }
}

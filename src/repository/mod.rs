//! Repository module
//!
//! Persistence seams for stores, users and transactions. Every method is a
//! single atomic storage operation; multi-step business logic lives in the
//! lifecycle managers.

mod error;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{
    NewStore, NewTransaction, NewUser, PaymentUpdate, Store, StorePatch, StoreStats, StoreView,
    Transaction, TransactionFilter, TransactionPatch, TransactionView, User, UserPatch,
};

pub use error::{RepoError, RepoResult};
pub use memory::MemoryDatabase;
pub use postgres::{PgStoreRepository, PgTransactionRepository, PgUserRepository};

/// Store persistence
#[async_trait]
pub trait StoreRepository: Send + Sync {
    /// All stores with creator/updater resolved, oldest first
    async fn list(&self) -> RepoResult<Vec<StoreView>>;

    async fn find(&self, id: Uuid) -> RepoResult<Option<StoreView>>;

    async fn list_active(&self) -> RepoResult<Vec<Store>>;

    async fn stats(&self) -> RepoResult<StoreStats>;

    /// Insert; `RepoError::Duplicate` on an existing stall id
    async fn insert(&self, store: NewStore) -> RepoResult<Store>;

    /// Apply a partial update, stamping `updated_by`
    async fn update(&self, id: Uuid, patch: StorePatch, actor: Uuid)
        -> RepoResult<Option<Store>>;

    /// Hard delete, returning the removed record
    async fn delete(&self, id: Uuid) -> RepoResult<Option<Store>>;
}

/// Transaction persistence
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Insert each row unless its (store, date) pair already exists.
    /// Returns only the rows actually created.
    async fn insert_missing(&self, rows: Vec<NewTransaction>) -> RepoResult<Vec<Transaction>>;

    async fn list_on(&self, date: NaiveDate) -> RepoResult<Vec<TransactionView>>;

    async fn find_for_store_on(
        &self,
        store_id: Uuid,
        date: NaiveDate,
    ) -> RepoResult<Option<Transaction>>;

    /// Move the store's unpaid transaction for `date` to `Paid`.
    /// `None` when there is no unpaid transaction for that day.
    async fn mark_paid(
        &self,
        store_id: Uuid,
        date: NaiveDate,
        payment: PaymentUpdate,
        actor: Uuid,
        paid_at: DateTime<Utc>,
    ) -> RepoResult<Option<Transaction>>;

    /// Move every unpaid transaction of the store to `Paid` with one final amount.
    /// Returns the settled rows, oldest billing day first.
    async fn settle_unpaid(
        &self,
        store_id: Uuid,
        final_amount: Decimal,
        actor: Uuid,
        paid_at: DateTime<Utc>,
    ) -> RepoResult<Vec<Transaction>>;

    /// Unpaid transactions of a store, oldest billing day first
    async fn list_unpaid_for_store(&self, store_id: Uuid) -> RepoResult<Vec<Transaction>>;

    /// Filtered listing, newest created first
    async fn list(&self, filter: &TransactionFilter) -> RepoResult<Vec<TransactionView>>;

    async fn update(
        &self,
        id: Uuid,
        patch: TransactionPatch,
        actor: Uuid,
    ) -> RepoResult<Option<Transaction>>;

    async fn delete(&self, id: Uuid) -> RepoResult<Option<Transaction>>;

    /// Sum of `final_amount` over all transactions
    async fn total_final_amount(&self) -> RepoResult<Decimal>;
}

/// User persistence
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert; `RepoError::Duplicate` on an existing email
    async fn insert(&self, user: NewUser) -> RepoResult<User>;

    async fn find(&self, id: Uuid) -> RepoResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>>;

    /// All users, most recently updated first
    async fn list(&self) -> RepoResult<Vec<User>>;

    async fn update(&self, id: Uuid, patch: UserPatch) -> RepoResult<Option<User>>;

    async fn delete(&self, id: Uuid) -> RepoResult<Option<User>>;

    async fn count(&self) -> RepoResult<i64>;
}

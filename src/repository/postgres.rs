//! Postgres repositories
//!
//! Uniqueness of `stores.stall_id`, `users.email` and
//! `transactions (store_id, date)` is enforced by constraints (see
//! `migrations/001_initial.sql`); violations surface as `RepoError::Duplicate`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{
    NewStore, NewTransaction, NewUser, PaymentUpdate, Store, StorePatch, StoreRef, StoreStats,
    StoreView, Transaction, TransactionFilter, TransactionPatch, TransactionView, User, UserPatch,
    UserRef,
};

use super::{RepoResult, StoreRepository, TransactionRepository, UserRepository};

fn user_ref(id: Option<Uuid>, email: Option<String>) -> Option<UserRef> {
    id.zip(email).map(|(id, email)| UserRef { id, email })
}

// =========================================================================
// Stores
// =========================================================================

#[derive(Debug, sqlx::FromRow)]
struct StoreViewRow {
    #[sqlx(flatten)]
    store: Store,
    creator_email: Option<String>,
    updater_email: Option<String>,
}

impl From<StoreViewRow> for StoreView {
    fn from(row: StoreViewRow) -> Self {
        let creator = user_ref(row.store.created_by, row.creator_email);
        let updater = user_ref(row.store.updated_by, row.updater_email);
        StoreView {
            store: row.store,
            creator,
            updater,
        }
    }
}

const STORE_VIEW_SELECT: &str = r#"
    SELECT s.*, cu.email AS creator_email, uu.email AS updater_email
    FROM stores s
    LEFT JOIN users cu ON cu.id = s.created_by
    LEFT JOIN users uu ON uu.id = s.updated_by
"#;

/// Store repository backed by Postgres
#[derive(Debug, Clone)]
pub struct PgStoreRepository {
    pool: PgPool,
}

impl PgStoreRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StoreRepository for PgStoreRepository {
    async fn list(&self) -> RepoResult<Vec<StoreView>> {
        let rows: Vec<StoreViewRow> =
            sqlx::query_as(&format!("{STORE_VIEW_SELECT} ORDER BY s.created_at ASC"))
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(StoreView::from).collect())
    }

    async fn find(&self, id: Uuid) -> RepoResult<Option<StoreView>> {
        let row: Option<StoreViewRow> =
            sqlx::query_as(&format!("{STORE_VIEW_SELECT} WHERE s.id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(StoreView::from))
    }

    async fn list_active(&self) -> RepoResult<Vec<Store>> {
        let stores = sqlx::query_as::<_, Store>(
            "SELECT * FROM stores WHERE is_active ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(stores)
    }

    async fn stats(&self) -> RepoResult<StoreStats> {
        let (total, active, inactive): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COUNT(*) FILTER (WHERE is_active),
                COUNT(*) FILTER (WHERE NOT is_active)
            FROM stores
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(StoreStats {
            total,
            active,
            inactive,
        })
    }

    async fn insert(&self, store: NewStore) -> RepoResult<Store> {
        let record = sqlx::query_as::<_, Store>(
            r#"
            INSERT INTO stores
                (id, stall_id, name, owner, "group", amount, is_active, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&store.stall_id)
        .bind(&store.name)
        .bind(&store.owner)
        .bind(&store.group)
        .bind(store.amount)
        .bind(store.is_active)
        .bind(store.created_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(record)
    }

    async fn update(
        &self,
        id: Uuid,
        patch: StorePatch,
        actor: Uuid,
    ) -> RepoResult<Option<Store>> {
        let record = sqlx::query_as::<_, Store>(
            r#"
            UPDATE stores SET
                stall_id = COALESCE($2, stall_id),
                name = COALESCE($3, name),
                owner = COALESCE($4, owner),
                "group" = COALESCE($5, "group"),
                amount = COALESCE($6, amount),
                is_active = COALESCE($7, is_active),
                updated_by = $8,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.stall_id)
        .bind(patch.name)
        .bind(patch.owner)
        .bind(patch.group)
        .bind(patch.amount)
        .bind(patch.is_active)
        .bind(actor)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn delete(&self, id: Uuid) -> RepoResult<Option<Store>> {
        let record = sqlx::query_as::<_, Store>("DELETE FROM stores WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }
}

// =========================================================================
// Transactions
// =========================================================================

#[derive(Debug, sqlx::FromRow)]
struct TransactionViewRow {
    #[sqlx(flatten)]
    transaction: Transaction,
    store_stall_id: Option<String>,
    store_name: Option<String>,
    store_owner: Option<String>,
    store_group: Option<String>,
    store_amount: Option<Decimal>,
    creator_email: Option<String>,
}

impl From<TransactionViewRow> for TransactionView {
    fn from(row: TransactionViewRow) -> Self {
        let store_id = row.transaction.store_id;
        let store = match (
            row.store_stall_id,
            row.store_name,
            row.store_owner,
            row.store_group,
            row.store_amount,
        ) {
            (Some(stall_id), Some(name), Some(owner), Some(group), Some(amount)) => {
                Some(StoreRef {
                    id: store_id,
                    stall_id,
                    name,
                    owner,
                    group,
                    amount,
                })
            }
            _ => None,
        };
        let creator = user_ref(row.transaction.created_by, row.creator_email);

        TransactionView {
            transaction: row.transaction,
            store,
            creator,
        }
    }
}

const TRANSACTION_VIEW_SELECT: &str = r#"
    SELECT t.*,
        s.stall_id AS store_stall_id,
        s.name AS store_name,
        s.owner AS store_owner,
        s."group" AS store_group,
        s.amount AS store_amount,
        cu.email AS creator_email
    FROM transactions t
    LEFT JOIN stores s ON s.id = t.store_id
    LEFT JOIN users cu ON cu.id = t.created_by
"#;

/// Transaction repository backed by Postgres
#[derive(Debug, Clone)]
pub struct PgTransactionRepository {
    pool: PgPool,
}

impl PgTransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionRepository for PgTransactionRepository {
    async fn insert_missing(&self, rows: Vec<NewTransaction>) -> RepoResult<Vec<Transaction>> {
        let mut tx = self.pool.begin().await?;
        let mut created = Vec::with_capacity(rows.len());

        for row in rows {
            let inserted = sqlx::query_as::<_, Transaction>(
                r#"
                INSERT INTO transactions (id, store_id, date, amount, base_amount, created_by)
                VALUES ($1, $2, $3, $4, $4, $5)
                ON CONFLICT (store_id, date) DO NOTHING
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(row.store_id)
            .bind(row.date)
            .bind(row.amount)
            .bind(row.created_by)
            .fetch_optional(&mut *tx)
            .await?;

            match inserted {
                Some(record) => created.push(record),
                None => tracing::debug!(
                    store_id = %row.store_id,
                    date = %row.date,
                    "Transaction already exists, skipping"
                ),
            }
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn list_on(&self, date: NaiveDate) -> RepoResult<Vec<TransactionView>> {
        let rows: Vec<TransactionViewRow> = sqlx::query_as(&format!(
            "{TRANSACTION_VIEW_SELECT} WHERE t.date = $1 ORDER BY t.created_at ASC"
        ))
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(TransactionView::from).collect())
    }

    async fn find_for_store_on(
        &self,
        store_id: Uuid,
        date: NaiveDate,
    ) -> RepoResult<Option<Transaction>> {
        let record = sqlx::query_as::<_, Transaction>(
            "SELECT * FROM transactions WHERE store_id = $1 AND date = $2",
        )
        .bind(store_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn mark_paid(
        &self,
        store_id: Uuid,
        date: NaiveDate,
        payment: PaymentUpdate,
        actor: Uuid,
        paid_at: DateTime<Utc>,
    ) -> RepoResult<Option<Transaction>> {
        let record = sqlx::query_as::<_, Transaction>(
            r#"
            UPDATE transactions SET
                status = 'Paid',
                amount = COALESCE($3, amount),
                note = COALESCE($4, note),
                paid_at = $5,
                updated_by = $6,
                updated_at = $5
            WHERE store_id = $1 AND date = $2 AND status = 'Unpaid'
            RETURNING *
            "#,
        )
        .bind(store_id)
        .bind(date)
        .bind(payment.amount)
        .bind(payment.note)
        .bind(paid_at)
        .bind(actor)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn settle_unpaid(
        &self,
        store_id: Uuid,
        final_amount: Decimal,
        actor: Uuid,
        paid_at: DateTime<Utc>,
    ) -> RepoResult<Vec<Transaction>> {
        let settled = sqlx::query_as::<_, Transaction>(
            r#"
            WITH settled AS (
                UPDATE transactions SET
                    status = 'Paid',
                    final_amount = $2,
                    paid_at = $3,
                    updated_by = $4,
                    updated_at = $3
                WHERE store_id = $1 AND status = 'Unpaid'
                RETURNING *
            )
            SELECT * FROM settled ORDER BY date ASC
            "#,
        )
        .bind(store_id)
        .bind(final_amount)
        .bind(paid_at)
        .bind(actor)
        .fetch_all(&self.pool)
        .await?;
        Ok(settled)
    }

    async fn list_unpaid_for_store(&self, store_id: Uuid) -> RepoResult<Vec<Transaction>> {
        let unpaid = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT * FROM transactions
            WHERE store_id = $1 AND status = 'Unpaid'
            ORDER BY date ASC
            "#,
        )
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(unpaid)
    }

    async fn list(&self, filter: &TransactionFilter) -> RepoResult<Vec<TransactionView>> {
        let (start, end) = filter.created_window().unzip();
        let rows: Vec<TransactionViewRow> = sqlx::query_as(&format!(
            r#"{TRANSACTION_VIEW_SELECT}
            WHERE ($1::text IS NULL OR strpos(lower(s.name), $1) > 0)
              AND ($2::timestamptz IS NULL OR t.created_at >= $2)
              AND ($3::timestamptz IS NULL OR t.created_at < $3)
            ORDER BY t.created_at DESC"#
        ))
        .bind(filter.name_needle())
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(TransactionView::from).collect())
    }

    async fn update(
        &self,
        id: Uuid,
        patch: TransactionPatch,
        actor: Uuid,
    ) -> RepoResult<Option<Transaction>> {
        let record = sqlx::query_as::<_, Transaction>(
            r#"
            UPDATE transactions SET
                store_id = COALESCE($2, store_id),
                date = COALESCE($3, date),
                amount = COALESCE($4, amount),
                base_amount = COALESCE($5, base_amount),
                absent_multiplier = COALESCE($6, absent_multiplier),
                adjustment = COALESCE($7, adjustment),
                owner_discount_share = COALESCE($8, owner_discount_share),
                final_amount = COALESCE($9, final_amount),
                status = COALESCE($10, status),
                note = COALESCE($11, note),
                paid_at = COALESCE($12, paid_at),
                updated_by = $13,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.store_id)
        .bind(patch.date)
        .bind(patch.amount)
        .bind(patch.base_amount)
        .bind(patch.absent_multiplier)
        .bind(patch.adjustment)
        .bind(patch.owner_discount_share)
        .bind(patch.final_amount)
        .bind(patch.status)
        .bind(patch.note)
        .bind(patch.paid_at)
        .bind(actor)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn delete(&self, id: Uuid) -> RepoResult<Option<Transaction>> {
        let record =
            sqlx::query_as::<_, Transaction>("DELETE FROM transactions WHERE id = $1 RETURNING *")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(record)
    }

    async fn total_final_amount(&self) -> RepoResult<Decimal> {
        let total: Decimal =
            sqlx::query_scalar("SELECT COALESCE(SUM(final_amount), 0) FROM transactions")
                .fetch_one(&self.pool)
                .await?;
        Ok(total)
    }
}

// =========================================================================
// Users
// =========================================================================

/// User repository backed by Postgres
#[derive(Debug, Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn insert(&self, user: NewUser) -> RepoResult<User> {
        let record = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, phone, password_hash, role, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(user.is_active)
        .fetch_one(&self.pool)
        .await?;
        Ok(record)
    }

    async fn find(&self, id: Uuid) -> RepoResult<Option<User>> {
        let record = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let record = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    async fn list(&self) -> RepoResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY updated_at DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn update(&self, id: Uuid, patch: UserPatch) -> RepoResult<Option<User>> {
        let record = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                email = COALESCE($2, email),
                phone = COALESCE($3, phone),
                password_hash = COALESCE($4, password_hash),
                role = COALESCE($5, role),
                is_active = COALESCE($6, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.email)
        .bind(patch.phone)
        .bind(patch.password_hash)
        .bind(patch.role)
        .bind(patch.is_active)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn delete(&self, id: Uuid) -> RepoResult<Option<User>> {
        let record = sqlx::query_as::<_, User>("DELETE FROM users WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    async fn count(&self) -> RepoResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

//! Postgres repository tests
//!
//! Need a migrated database in DATABASE_URL.
//! Run with: cargo test --test integration_postgres -- --ignored

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use market_stall::db;
use market_stall::domain::{NewStore, NewTransaction, NewUser, PaymentUpdate, Role};
use market_stall::repository::{
    PgStoreRepository, PgTransactionRepository, PgUserRepository, RepoError, StoreRepository,
    TransactionRepository, UserRepository,
};

async fn setup_test_db() -> PgPool {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    let pool = db::connect(&database_url, 5)
        .await
        .expect("Failed to connect to DB");
    assert!(
        db::check_schema(&pool).await.expect("schema check failed"),
        "run migrations/001_initial.sql first"
    );

    sqlx::query("TRUNCATE TABLE transactions, stores, users")
        .execute(&pool)
        .await
        .expect("Failed to clean up DB");

    pool
}

async fn seed_store(pool: &PgPool, stall_id: &str) -> (Uuid, Uuid) {
    let admin = PgUserRepository::new(pool.clone())
        .insert(NewUser {
            email: format!("{}@example.com", stall_id.to_lowercase()),
            phone: None,
            password_hash: "not-a-real-hash".to_string(),
            role: Role::Admin,
            is_active: true,
        })
        .await
        .unwrap();

    let store = PgStoreRepository::new(pool.clone())
        .insert(NewStore {
            stall_id: stall_id.to_string(),
            name: "Fresh Fish".to_string(),
            owner: "Sophea".to_string(),
            group: "V2".to_string(),
            amount: Decimal::from(1200),
            is_active: true,
            created_by: Some(admin.id),
        })
        .await
        .unwrap();

    (admin.id, store.id)
}

#[tokio::test]
#[ignore]
async fn test_unique_constraints_map_to_fields() {
    let pool = setup_test_db().await;
    let (admin, _) = seed_store(&pool, "M001").await;

    let err = PgStoreRepository::new(pool.clone())
        .insert(NewStore {
            stall_id: "M001".to_string(),
            name: "Other".to_string(),
            owner: "Other".to_string(),
            group: "V1".to_string(),
            amount: Decimal::ONE,
            is_active: false,
            created_by: Some(admin),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Duplicate { field: "stallId" }));

    let err = PgUserRepository::new(pool.clone())
        .insert(NewUser {
            email: "m001@example.com".to_string(),
            phone: None,
            password_hash: "x".to_string(),
            role: Role::Cashier,
            is_active: false,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Duplicate { field: "email" }));
}

#[tokio::test]
#[ignore]
async fn test_insert_missing_skips_existing_day() {
    let pool = setup_test_db().await;
    let (admin, store_id) = seed_store(&pool, "M002").await;
    let repo = PgTransactionRepository::new(pool.clone());
    let day = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();

    let row = NewTransaction {
        store_id,
        date: day,
        amount: Decimal::from(1200),
        created_by: Some(admin),
    };
    assert_eq!(repo.insert_missing(vec![row.clone()]).await.unwrap().len(), 1);
    assert!(repo.insert_missing(vec![row]).await.unwrap().is_empty());
    assert_eq!(repo.list_on(day).await.unwrap().len(), 1);
}

#[tokio::test]
#[ignore]
async fn test_mark_paid_and_settle_are_conditional() {
    let pool = setup_test_db().await;
    let (admin, store_id) = seed_store(&pool, "M003").await;
    let repo = PgTransactionRepository::new(pool.clone());

    let days: Vec<NaiveDate> = (12..=14)
        .map(|d| NaiveDate::from_ymd_opt(2026, 3, d).unwrap())
        .collect();
    let rows = days
        .iter()
        .map(|day| NewTransaction {
            store_id,
            date: *day,
            amount: Decimal::from(1200),
            created_by: Some(admin),
        })
        .collect();
    repo.insert_missing(rows).await.unwrap();

    let paid = repo
        .mark_paid(store_id, days[2], PaymentUpdate::default(), admin, Utc::now())
        .await
        .unwrap()
        .unwrap();
    assert!(paid.is_paid());
    assert!(repo
        .mark_paid(store_id, days[2], PaymentUpdate::default(), admin, Utc::now())
        .await
        .unwrap()
        .is_none());

    let settled = repo
        .settle_unpaid(store_id, Decimal::from(1300), admin, Utc::now())
        .await
        .unwrap();
    assert_eq!(settled.len(), 2);
    assert_eq!(settled[0].date, days[0]);
    assert!(settled.iter().all(|t| t.final_amount == Some(Decimal::from(1300))));
    assert!(repo.list_unpaid_for_store(store_id).await.unwrap().is_empty());
    assert_eq!(repo.total_final_amount().await.unwrap(), Decimal::from(2600));
}

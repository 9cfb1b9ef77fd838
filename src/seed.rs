//! Demo data
//!
//! An active admin account and the eight sample stalls. Records that
//! already exist are left untouched, so seeding can be repeated.

use rust_decimal::Decimal;

use crate::auth::PasswordHasher;
use crate::domain::{NewStore, NewUser, Role};
use crate::error::{AppError, AppResult};
use crate::repository::RepoError;
use crate::state::Repositories;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PHONE: &str = "097885687";

/// (stall id, name, owner, group, daily rent)
const SAMPLE_STORES: &[(&str, &str, &str, &str, i64)] = &[
    ("M001", "VK OE", "Vannak", "V1", 1000),
    ("M002", "Fresh Fish", "Sophea", "V2", 1200),
    ("M003", "Green Veg", "Rithy", "V1", 900),
    ("M004", "Fruit Paradise", "Srey Mom", "V3", 1500),
    ("M005", "Rice & Grain", "Vichea", "V2", 2000),
    ("M006", "Meat Market", "Sophal", "V3", 1800),
    ("M007", "Spices & Herbs", "Chenda", "V1", 1100),
    ("M008", "Bakery Corner", "Ratha", "V2", 1300),
];

/// What a seeding run changed
#[derive(Debug, Clone, Default)]
pub struct SeedReport {
    pub admin_created: bool,
    pub stores_created: usize,
    pub stores_skipped: usize,
}

/// Seed the admin account and sample stores
pub async fn seed_defaults(
    repos: &Repositories,
    hasher: &PasswordHasher,
    admin_password: &str,
) -> AppResult<SeedReport> {
    let mut report = SeedReport::default();

    let admin = match repos.users.find_by_email(ADMIN_EMAIL).await? {
        Some(existing) => existing,
        None => {
            let password_hash = hasher
                .hash_blocking(admin_password.to_string())
                .await
                .map_err(|e| AppError::Internal(e.to_string()))?;
            report.admin_created = true;
            repos
                .users
                .insert(NewUser {
                    email: ADMIN_EMAIL.to_string(),
                    phone: Some(ADMIN_PHONE.to_string()),
                    password_hash,
                    role: Role::Admin,
                    is_active: true,
                })
                .await?
        }
    };

    for (stall_id, name, owner, group, amount) in SAMPLE_STORES {
        let store = NewStore {
            stall_id: stall_id.to_string(),
            name: name.to_string(),
            owner: owner.to_string(),
            group: group.to_string(),
            amount: Decimal::from(*amount),
            is_active: true,
            created_by: Some(admin.id),
        };

        match repos.stores.insert(store).await {
            Ok(_) => report.stores_created += 1,
            Err(RepoError::Duplicate { .. }) => report.stores_skipped += 1,
            Err(e) => return Err(e.into()),
        }
    }

    tracing::info!(
        admin_created = report.admin_created,
        stores_created = report.stores_created,
        stores_skipped = report.stores_skipped,
        "Seed complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryDatabase;

    #[tokio::test]
    async fn test_seed_is_repeatable() {
        let repos = Repositories::memory(MemoryDatabase::new());
        let hasher = PasswordHasher::new(1024, 1).unwrap();

        let first = seed_defaults(&repos, &hasher, "123456").await.unwrap();
        assert!(first.admin_created);
        assert_eq!(first.stores_created, 8);

        let second = seed_defaults(&repos, &hasher, "123456").await.unwrap();
        assert!(!second.admin_created);
        assert_eq!(second.stores_created, 0);
        assert_eq!(second.stores_skipped, 8);

        let stats = repos.stores.stats().await.unwrap();
        assert_eq!((stats.total, stats.active), (8, 8));

        let admin = repos.users.find_by_email(ADMIN_EMAIL).await.unwrap().unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert!(admin.is_active);
        assert!(hasher.verify("123456", &admin.password_hash).unwrap());
    }
}

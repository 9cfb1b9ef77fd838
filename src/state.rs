//! Shared application state
//!
//! Managers are built once at startup over one set of repositories and
//! cloned into every request.

use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::{AuthService, JwtService, PasswordHasher};
use crate::domain::Clock;
use crate::handlers::{StoreManager, TransactionManager, UserManager};
use crate::repository::{
    MemoryDatabase, PgStoreRepository, PgTransactionRepository, PgUserRepository,
    StoreRepository, TransactionRepository, UserRepository,
};

/// The repository set backing one running instance
#[derive(Clone)]
pub struct Repositories {
    pub stores: Arc<dyn StoreRepository>,
    pub transactions: Arc<dyn TransactionRepository>,
    pub users: Arc<dyn UserRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            stores: Arc::new(PgStoreRepository::new(pool.clone())),
            transactions: Arc::new(PgTransactionRepository::new(pool.clone())),
            users: Arc::new(PgUserRepository::new(pool)),
        }
    }

    pub fn memory(db: MemoryDatabase) -> Self {
        Self {
            stores: Arc::new(db.clone()),
            transactions: Arc::new(db.clone()),
            users: Arc::new(db),
        }
    }
}

/// State handed to every route
#[derive(Clone)]
pub struct AppState {
    pub stores: StoreManager,
    pub transactions: TransactionManager,
    pub users: UserManager,
    pub auth: AuthService,
}

impl AppState {
    pub fn new(
        repos: Repositories,
        clock: Arc<dyn Clock>,
        hasher: PasswordHasher,
        jwt: JwtService,
    ) -> Self {
        Self {
            stores: StoreManager::new(repos.stores.clone()),
            transactions: TransactionManager::new(
                repos.stores.clone(),
                repos.transactions.clone(),
                repos.users.clone(),
                clock,
            ),
            users: UserManager::new(repos.users.clone(), hasher, jwt.clone()),
            auth: AuthService::new(jwt, repos.users),
        }
    }
}

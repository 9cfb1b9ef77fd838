//! Store lifecycle
//!
//! CRUD over market stalls. Audit fields are stamped from the acting user.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{Store, StoreStats, StoreView};
use crate::error::{AppError, AppResult};
use crate::repository::StoreRepository;

use super::{CreateStoreCommand, UpdateStoreCommand};

/// Handler for store operations
#[derive(Clone)]
pub struct StoreManager {
    stores: Arc<dyn StoreRepository>,
}

impl StoreManager {
    pub fn new(stores: Arc<dyn StoreRepository>) -> Self {
        Self { stores }
    }

    pub async fn list(&self) -> AppResult<Vec<StoreView>> {
        Ok(self.stores.list().await?)
    }

    pub async fn stats(&self) -> AppResult<StoreStats> {
        Ok(self.stores.stats().await?)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<StoreView> {
        self.stores
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("Store"))
    }

    pub async fn create(&self, command: CreateStoreCommand, actor: Uuid) -> AppResult<Store> {
        let new_store = command.validate(actor)?;
        let store = self.stores.insert(new_store).await?;

        tracing::info!(
            store_id = %store.id,
            stall_id = %store.stall_id,
            actor = %actor,
            "Store created"
        );
        Ok(store)
    }

    pub async fn update(
        &self,
        id: Uuid,
        command: UpdateStoreCommand,
        actor: Uuid,
    ) -> AppResult<Store> {
        let patch = command.into_patch()?;
        let store = self
            .stores
            .update(id, patch, actor)
            .await?
            .ok_or_else(|| AppError::not_found("Store"))?;

        tracing::info!(store_id = %store.id, actor = %actor, "Store updated");
        Ok(store)
    }

    /// Hard delete. Transactions of the store are left in place.
    pub async fn delete(&self, id: Uuid) -> AppResult<Store> {
        let store = self
            .stores
            .delete(id)
            .await?
            .ok_or_else(|| AppError::not_found("Store"))?;

        tracing::info!(store_id = %store.id, stall_id = %store.stall_id, "Store deleted");
        Ok(store)
    }
}

//! In-memory reference implementation of the storage traits.
//!
//! This adapter is deterministic and test-friendly. Deployments that need
//! durability should use the PostgreSQL adapter instead.

use crate::traits::{ProductStore, RequestStore, UserStore};
use crate::{StorageError, StorageResult};
use async_trait::async_trait;
use shortfall_types::{Product, RequestId, ShortageRequest, User};
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory storage adapter.
#[derive(Default)]
pub struct InMemoryShortfallStorage {
    requests: RwLock<HashMap<RequestId, ShortageRequest>>,
    users: RwLock<HashMap<String, User>>,
    products: RwLock<HashMap<String, Product>>,
}

impl InMemoryShortfallStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RequestStore for InMemoryShortfallStorage {
    async fn put_request(&self, request: ShortageRequest) -> StorageResult<()> {
        let mut guard = self
            .requests
            .write()
            .map_err(|_| StorageError::Backend("requests lock poisoned".to_string()))?;
        guard.insert(request.id.clone(), request);
        Ok(())
    }

    async fn list_requests(&self) -> StorageResult<Vec<ShortageRequest>> {
        let guard = self
            .requests
            .read()
            .map_err(|_| StorageError::Backend("requests lock poisoned".to_string()))?;
        Ok(guard.values().cloned().collect())
    }

    async fn delete_request(&self, id: &RequestId) -> StorageResult<()> {
        let mut guard = self
            .requests
            .write()
            .map_err(|_| StorageError::Backend("requests lock poisoned".to_string()))?;
        guard.remove(id);
        Ok(())
    }
}

#[async_trait]
impl UserStore for InMemoryShortfallStorage {
    async fn put_user(&self, user: User) -> StorageResult<()> {
        if user.username.trim().is_empty() {
            return Err(StorageError::InvalidInput(
                "username must not be empty".to_string(),
            ));
        }
        let mut guard = self
            .users
            .write()
            .map_err(|_| StorageError::Backend("users lock poisoned".to_string()))?;
        guard.insert(user.username.clone(), user);
        Ok(())
    }

    async fn list_users(&self) -> StorageResult<Vec<User>> {
        let guard = self
            .users
            .read()
            .map_err(|_| StorageError::Backend("users lock poisoned".to_string()))?;
        Ok(guard.values().cloned().collect())
    }

    async fn delete_user(&self, username: &str) -> StorageResult<()> {
        let mut guard = self
            .users
            .write()
            .map_err(|_| StorageError::Backend("users lock poisoned".to_string()))?;
        guard.remove(username);
        Ok(())
    }
}

#[async_trait]
impl ProductStore for InMemoryShortfallStorage {
    async fn put_product(&self, product: Product) -> StorageResult<()> {
        if product.code.trim().is_empty() {
            return Err(StorageError::InvalidInput(
                "product code must not be empty".to_string(),
            ));
        }
        let mut guard = self
            .products
            .write()
            .map_err(|_| StorageError::Backend("products lock poisoned".to_string()))?;
        guard.insert(product.code.clone(), product);
        Ok(())
    }

    async fn list_products(&self) -> StorageResult<Vec<Product>> {
        let guard = self
            .products
            .read()
            .map_err(|_| StorageError::Backend("products lock poisoned".to_string()))?;
        Ok(guard.values().cloned().collect())
    }

    async fn delete_product(&self, code: &str) -> StorageResult<()> {
        let mut guard = self
            .products
            .write()
            .map_err(|_| StorageError::Backend("products lock poisoned".to_string()))?;
        guard.remove(code);
        Ok(())
    }

    async fn clear_products(&self) -> StorageResult<()> {
        let mut guard = self
            .products
            .write()
            .map_err(|_| StorageError::Backend("products lock poisoned".to_string()))?;
        guard.clear();
        Ok(())
    }
}

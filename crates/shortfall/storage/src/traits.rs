use crate::StorageResult;
use async_trait::async_trait;
use shortfall_types::{Product, RequestId, ShortageRequest, User};

/// Storage interface for shortage request records.
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Insert or replace a request, keyed by its id.
    async fn put_request(&self, request: ShortageRequest) -> StorageResult<()>;

    /// Read every stored request, in no particular order.
    async fn list_requests(&self) -> StorageResult<Vec<ShortageRequest>>;

    /// Remove one request. Removing an absent id is not an error.
    async fn delete_request(&self, id: &RequestId) -> StorageResult<()>;
}

/// Storage interface for operator accounts, keyed by username.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert or replace an account.
    async fn put_user(&self, user: User) -> StorageResult<()>;

    /// Read every stored account.
    async fn list_users(&self) -> StorageResult<Vec<User>>;

    /// Remove one account by username. Removing an absent one is not an error.
    async fn delete_user(&self, username: &str) -> StorageResult<()>;
}

/// Storage interface for the product master, keyed by product code.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Insert or replace a product entry.
    async fn put_product(&self, product: Product) -> StorageResult<()>;

    /// Read the whole product master.
    async fn list_products(&self) -> StorageResult<Vec<Product>>;

    /// Remove one product by code. Removing an absent one is not an error.
    async fn delete_product(&self, code: &str) -> StorageResult<()>;

    /// Wipe the product master. Requests and accounts are untouched.
    async fn clear_products(&self) -> StorageResult<()>;
}

/// Unified storage bundle used by the workflow engine and service.
pub trait ShortfallStorage: RequestStore + UserStore + ProductStore + Send + Sync {}

impl<T> ShortfallStorage for T where T: RequestStore + UserStore + ProductStore + Send + Sync {}

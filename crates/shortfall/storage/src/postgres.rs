//! PostgreSQL adapter for shortfall storage.
//!
//! Every entity lands in a document table of the same shape: the natural
//! key as primary key, the full record as JSONB. Reads pull back whole
//! documents; ordering and filtering stay in the engine.

use crate::traits::{ProductStore, RequestStore, UserStore};
use crate::{StorageError, StorageResult};
use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use shortfall_types::{Product, RequestId, ShortageRequest, User};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;

const REQUESTS_TABLE: &str = "shortfall_requests";
const USERS_TABLE: &str = "shortfall_users";
const PRODUCTS_TABLE: &str = "shortfall_products";

/// PostgreSQL-backed storage adapter.
#[derive(Clone)]
pub struct PostgresShortfallStorage {
    pool: PgPool,
}

impl PostgresShortfallStorage {
    /// Connect to PostgreSQL and initialize required schema.
    pub async fn connect(database_url: &str) -> StorageResult<Self> {
        Self::connect_with_options(database_url, 5, 5).await
    }

    /// Connect with explicit pool parameters.
    pub async fn connect_with_options(
        database_url: &str,
        max_connections: u32,
        connect_timeout_secs: u64,
    ) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(std::time::Duration::from_secs(connect_timeout_secs))
            .connect(database_url)
            .await
            .map_err(|e| StorageError::Backend(format!("failed to connect postgres: {e}")))?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Create adapter from an existing pool.
    pub async fn from_pool(pool: PgPool) -> StorageResult<Self> {
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn init_schema(&self) -> StorageResult<()> {
        for table in [REQUESTS_TABLE, USERS_TABLE, PRODUCTS_TABLE] {
            let ddl = format!(
                r#"
                CREATE TABLE IF NOT EXISTS {table} (
                    natural_key TEXT PRIMARY KEY,
                    document JSONB NOT NULL,
                    updated_at TIMESTAMPTZ NOT NULL
                )
                "#
            );
            sqlx::query(&ddl)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::Backend(format!("schema init failed: {e}")))?;
        }
        Ok(())
    }

    async fn upsert(&self, table: &str, key: &str, record: &impl Serialize) -> StorageResult<()> {
        let document =
            serde_json::to_value(record).map_err(|e| StorageError::Serialization(e.to_string()))?;
        let sql = format!(
            r#"
            INSERT INTO {table} (natural_key, document, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (natural_key)
            DO UPDATE SET document = EXCLUDED.document, updated_at = EXCLUDED.updated_at
            "#
        );
        sqlx::query(&sql)
            .bind(key)
            .bind(document)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn list<T: DeserializeOwned>(&self, table: &str) -> StorageResult<Vec<T>> {
        let sql = format!("SELECT document FROM {table}");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        rows.iter()
            .map(|row| {
                let document: serde_json::Value = row
                    .try_get("document")
                    .map_err(|e| StorageError::Backend(e.to_string()))?;
                serde_json::from_value(document)
                    .map_err(|e| StorageError::Serialization(e.to_string()))
            })
            .collect()
    }

    async fn remove(&self, table: &str, key: &str) -> StorageResult<()> {
        let sql = format!("DELETE FROM {table} WHERE natural_key = $1");
        sqlx::query(&sql)
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl RequestStore for PostgresShortfallStorage {
    async fn put_request(&self, request: ShortageRequest) -> StorageResult<()> {
        let key = request.id.0.clone();
        self.upsert(REQUESTS_TABLE, &key, &request).await
    }

    async fn list_requests(&self) -> StorageResult<Vec<ShortageRequest>> {
        self.list(REQUESTS_TABLE).await
    }

    async fn delete_request(&self, id: &RequestId) -> StorageResult<()> {
        self.remove(REQUESTS_TABLE, &id.0).await
    }
}

#[async_trait]
impl UserStore for PostgresShortfallStorage {
    async fn put_user(&self, user: User) -> StorageResult<()> {
        if user.username.trim().is_empty() {
            return Err(StorageError::InvalidInput(
                "username must not be empty".to_string(),
            ));
        }
        let key = user.username.clone();
        self.upsert(USERS_TABLE, &key, &user).await
    }

    async fn list_users(&self) -> StorageResult<Vec<User>> {
        self.list(USERS_TABLE).await
    }

    async fn delete_user(&self, username: &str) -> StorageResult<()> {
        self.remove(USERS_TABLE, username).await
    }
}

#[async_trait]
impl ProductStore for PostgresShortfallStorage {
    async fn put_product(&self, product: Product) -> StorageResult<()> {
        if product.code.trim().is_empty() {
            return Err(StorageError::InvalidInput(
                "product code must not be empty".to_string(),
            ));
        }
        let key = product.code.clone();
        self.upsert(PRODUCTS_TABLE, &key, &product).await
    }

    async fn list_products(&self) -> StorageResult<Vec<Product>> {
        self.list(PRODUCTS_TABLE).await
    }

    async fn delete_product(&self, code: &str) -> StorageResult<()> {
        self.remove(PRODUCTS_TABLE, code).await
    }

    async fn clear_products(&self) -> StorageResult<()> {
        let sql = format!("DELETE FROM {PRODUCTS_TABLE}");
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }
}

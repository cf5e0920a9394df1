//! The application facade behind the HTTP surface.
//!
//! Owns everything that is not a workflow transition: accounts and
//! login, the product master, CSV exchange, and admin maintenance. The
//! pipeline itself stays inside the engine; this layer only adds the
//! bookkeeping around it.

use std::sync::Arc;

use shortfall_engine::WorkflowEngine;
use shortfall_storage::ShortfallStorage;
use shortfall_types::{Product, RequestId, Role, ShortfallError, ShortfallResult, User};
use tracing::info;

use crate::csv;

/// The two bootstrap administrator accounts, carrying every role.
/// First-run convenience for a closed floor network, not a security
/// model.
fn seed_users() -> Vec<User> {
    let all_roles = |mut user: User| {
        for role in Role::all() {
            user = user.with_role(role);
        }
        user
    };
    vec![
        all_roles(User::new("ADM001", "admin", "admin", "Master Administrator")),
        all_roles(User::new(
            "ADM002",
            "supervisor",
            "2026Ops",
            "Operations Supervisor",
        )),
    ]
}

/// Application facade over one storage backend
pub struct ShortfallApp {
    store: Arc<dyn ShortfallStorage>,
    engine: WorkflowEngine,
}

impl ShortfallApp {
    // =========================================================================
    // BOOTSTRAP
    // =========================================================================

    /// Build the app over a store, seeding the administrator accounts
    /// when the user store is empty. Seeding is idempotent.
    pub async fn bootstrap(store: Arc<dyn ShortfallStorage>) -> ShortfallResult<Self> {
        let app = Self {
            engine: WorkflowEngine::new(store.clone()),
            store,
        };
        app.seed_admins().await?;
        Ok(app)
    }

    pub fn engine(&self) -> &WorkflowEngine {
        &self.engine
    }

    async fn seed_admins(&self) -> ShortfallResult<()> {
        if !self.store.list_users().await?.is_empty() {
            return Ok(());
        }
        for user in seed_users() {
            let username = user.username.clone();
            self.store.put_user(user).await?;
            info!(username = %username, "seeded administrator account");
        }
        Ok(())
    }

    // =========================================================================
    // AUTHENTICATION
    // =========================================================================

    /// Check credentials and return the account snapshot.
    ///
    /// The username lookup is case-insensitive; the password comparison
    /// is plain equality. Unknown username and wrong password fail
    /// identically, so the response never says which half was wrong.
    pub async fn login(&self, username: &str, password: &str) -> ShortfallResult<User> {
        let invalid = || ShortfallError::InvalidInput("invalid credentials".to_string());
        let user = self.user_by_username(username).await?.ok_or_else(invalid)?;
        if user.password != password {
            return Err(invalid());
        }
        info!(username = %user.username, "login accepted");
        Ok(user)
    }

    /// Case-insensitive account lookup
    pub async fn user_by_username(&self, username: &str) -> ShortfallResult<Option<User>> {
        let needle = username.to_lowercase();
        let users = self.store.list_users().await?;
        Ok(users
            .into_iter()
            .find(|user| user.username.to_lowercase() == needle))
    }

    // =========================================================================
    // ACCOUNT ADMINISTRATION
    // =========================================================================

    /// Every account, sorted by username
    pub async fn users(&self) -> ShortfallResult<Vec<User>> {
        let mut users = self.store.list_users().await?;
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    /// Create an account; the username must be new
    pub async fn create_user(&self, user: User) -> ShortfallResult<User> {
        if user.username.trim().is_empty() || user.name.trim().is_empty() {
            return Err(ShortfallError::InvalidInput(
                "username and name must not be empty".to_string(),
            ));
        }
        if self.user_by_username(&user.username).await?.is_some() {
            return Err(ShortfallError::InvalidInput(format!(
                "username '{}' is already taken",
                user.username
            )));
        }
        self.store.put_user(user.clone()).await?;
        info!(username = %user.username, "account created");
        Ok(user)
    }

    /// Replace an existing account wholesale. The username is the
    /// natural key and cannot change here.
    pub async fn update_user(&self, username: &str, user: User) -> ShortfallResult<User> {
        let existing = self
            .user_by_username(username)
            .await?
            .ok_or_else(|| ShortfallError::NotFound(format!("user '{username}' not found")))?;
        if user.username != existing.username {
            return Err(ShortfallError::InvalidInput(
                "username cannot be changed on update".to_string(),
            ));
        }
        if user.name.trim().is_empty() {
            return Err(ShortfallError::InvalidInput(
                "name must not be empty".to_string(),
            ));
        }
        self.store.put_user(user.clone()).await?;
        info!(username = %user.username, "account updated");
        Ok(user)
    }

    /// Delete an account. The master administrator stays.
    pub async fn delete_user(&self, username: &str) -> ShortfallResult<()> {
        if username.eq_ignore_ascii_case("admin") {
            return Err(ShortfallError::InvalidInput(
                "the master administrator account cannot be deleted".to_string(),
            ));
        }
        let existing = self
            .user_by_username(username)
            .await?
            .ok_or_else(|| ShortfallError::NotFound(format!("user '{username}' not found")))?;
        self.store.delete_user(&existing.username).await?;
        info!(username = %existing.username, "account deleted");
        Ok(())
    }

    // =========================================================================
    // PRODUCT MASTER
    // =========================================================================

    /// The whole product master, sorted by code
    pub async fn products(&self) -> ShortfallResult<Vec<Product>> {
        let mut products = self.store.list_products().await?;
        products.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(products)
    }

    /// Insert or replace one product entry
    pub async fn upsert_product(&self, product: Product) -> ShortfallResult<Product> {
        if product.code.trim().is_empty() || product.description.trim().is_empty() {
            return Err(ShortfallError::InvalidInput(
                "product code and description must not be empty".to_string(),
            ));
        }
        if !product.weight_per_unit.is_finite() || product.weight_per_unit <= 0.0 {
            return Err(ShortfallError::InvalidInput(
                "unit weight must be a positive number".to_string(),
            ));
        }
        self.store.put_product(product.clone()).await?;
        Ok(product)
    }

    /// Remove one product by code; removing an absent code is a no-op
    pub async fn delete_product(&self, code: &str) -> ShortfallResult<()> {
        self.store.delete_product(code).await?;
        Ok(())
    }

    /// Wipe the product master
    pub async fn clear_products(&self) -> ShortfallResult<()> {
        self.store.clear_products().await?;
        info!("product master cleared");
        Ok(())
    }

    /// Import products from CSV text. Returns how many rows landed.
    pub async fn import_products_csv(&self, body: &str) -> ShortfallResult<usize> {
        let mut imported = 0usize;
        for product in csv::parse_products(body) {
            self.store.put_product(product).await?;
            imported += 1;
        }
        info!(imported, "product master import finished");
        Ok(imported)
    }

    // =========================================================================
    // EXPORTS AND MAINTENANCE
    // =========================================================================

    /// The request log as CSV, in canonical order
    pub async fn export_requests_csv(&self) -> ShortfallResult<String> {
        let requests = self.engine.collection().await?;
        Ok(csv::render_requests(&requests))
    }

    /// The product master as CSV, sorted by code
    pub async fn export_products_csv(&self) -> ShortfallResult<String> {
        let products = self.products().await?;
        Ok(csv::render_products(&products))
    }

    /// Remove one request outright (admin maintenance)
    pub async fn delete_request(&self, id: &RequestId) -> ShortfallResult<()> {
        self.engine.get(id).await?;
        self.store.delete_request(id).await?;
        info!(request_id = %id, "request deleted");
        Ok(())
    }
}

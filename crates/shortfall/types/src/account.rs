//! User accounts and workstation roles

use serde::{Deserialize, Serialize};

// ── Roles ────────────────────────────────────────────────────────────

/// Workstation role. Each role gets its own queue view; ADMIN sees
/// everything and manages accounts and the product master.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Reports shortages and collects finished goods
    Logistics,
    /// Schedules approved requests (PCP)
    Planning,
    /// Decides produce-or-cut on scheduled requests
    CustomerService,
    /// Runs the line: starts and finishes production
    Production,
    /// Account and product-master administration
    Admin,
}

impl Role {
    pub fn all() -> [Role; 5] {
        [
            Role::Logistics,
            Role::Planning,
            Role::CustomerService,
            Role::Production,
            Role::Admin,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Role::Logistics => "LOGISTICS",
            Role::Planning => "PLANNING",
            Role::CustomerService => "CUSTOMER_SERVICE",
            Role::Production => "PRODUCTION",
            Role::Admin => "ADMIN",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ── Users ────────────────────────────────────────────────────────────

/// An operator account.
///
/// Passwords are stored as plain text to match the deployment this
/// system runs in (closed shop-floor network, shared terminals).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub password: String,
    pub name: String,
    pub roles: Vec<Role>,
}

impl User {
    pub fn new(
        id: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            password: password.into(),
            name: name.into(),
            roles: Vec::new(),
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        if !self.roles.contains(&role) {
            self.roles.push(role);
        }
        self
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

//! Authentication and authorization module
//!
//! Validates portal-issued JWTs and guards the configuration API behind the
//! admin role. Token issuance lives in the portal's auth service.

mod jwt;
mod middleware;

pub use jwt::decode_token;
pub use middleware::admin_middleware;

#[cfg(test)]
pub(crate) use jwt::{issue_token, TokenType};

use serde::{Deserialize, Serialize};

/// Portal user roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular portal user
    User,
    /// Technician: manages assets and maintenance, not configuration
    Technician,
    /// Can edit UI configuration and trigger schema synchronization
    Admin,
}

impl Role {
    pub fn can_configure(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Technician => write!(f, "technician"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

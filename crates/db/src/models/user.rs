//! User credential model and DTOs.

use armorsight_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Full row from the `users` table.
///
/// Contains the password hash -- NEVER serialize this to API responses directly.
/// Use [`UserProfile`] for external-facing output.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: DbId,
    pub usercode: String,
    pub user_name: String,
    pub affiliation_id: String,
    pub field: String,
    pub tank_id: String,
    pub password_hash: String,
    pub created_at: Timestamp,
}

/// Public user representation (no password hash).
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub usercode: String,
    pub name: String,
    pub unit: String,
    pub rank: String,
    pub tank: String,
    pub created_at: Timestamp,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            usercode: user.usercode,
            name: user.user_name,
            unit: user.affiliation_id,
            rank: user.field,
            tank: user.tank_id,
            created_at: user.created_at,
        }
    }
}

/// DTO for inserting a new user. The password must already be hashed.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub usercode: String,
    pub user_name: String,
    pub affiliation_id: String,
    pub field: String,
    pub tank_id: String,
    pub password_hash: String,
}

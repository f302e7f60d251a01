//! Repository for the `users` table.

use armorsight_core::types::DbId;
use sqlx::PgPool;

use crate::models::user::{CreateUser, User};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, usercode, user_name, affiliation_id, field, tank_id, \
                        password_hash, created_at";

/// Provides insert and lookup operations for users. There are no update or
/// delete paths.
pub struct UserRepo;

impl UserRepo {
    /// Insert a new user.
    ///
    /// Returns `None` when the usercode is already taken. The check is done
    /// by the `uq_users_usercode` constraint inside the insert itself, so two
    /// concurrent registrations for the same code cannot both succeed.
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (usercode, user_name, affiliation_id, field, tank_id, password_hash)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT ON CONSTRAINT uq_users_usercode DO NOTHING
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.usercode)
            .bind(&input.user_name)
            .bind(&input.affiliation_id)
            .bind(&input.field)
            .bind(&input.tank_id)
            .bind(&input.password_hash)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by usercode (exact, case-sensitive).
    pub async fn find_by_usercode(
        pool: &PgPool,
        usercode: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE usercode = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(usercode)
            .fetch_optional(pool)
            .await
    }
}

//! # User Repository
//!
//! Cashiers and administrators. Password hashes are stored as given;
//! hashing and verification belong to the authentication layer.

use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use kasir_core::ident::Clock;
use kasir_core::User;

const USER_COLUMNS: &str =
    "id, username, password_hash, full_name, role, is_active, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl UserRepository {
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        UserRepository { pool, clock }
    }

    /// Inserts a user built by [`User::new`].
    pub async fn insert(&self, user: &User) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id, username, password_hash, full_name, role, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(user.role)
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &user.username),
            other => other,
        })?;

        debug!(user_id = %user.id, username = %user.username, "User inserted");
        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Login lookup.
    pub async fn get_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn list_active(&self) -> DbResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE is_active = 1 ORDER BY username");
        let users = sqlx::query_as::<_, User>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE users SET is_active = 0, updated_at = ?1 WHERE id = ?2")
            .bind(self.clock.now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }
        Ok(())
    }
}

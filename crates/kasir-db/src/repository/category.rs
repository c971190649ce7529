//! # Category Repository

use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use kasir_core::ident::Clock;
use kasir_core::Category;

const CATEGORY_COLUMNS: &str = "id, name, description, is_active, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        CategoryRepository { pool, clock }
    }

    /// Inserts a category built by [`Category::new`].
    ///
    /// A duplicate name surfaces as `UniqueViolation`.
    pub async fn insert(&self, category: &Category) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO categories (id, name, description, is_active, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.is_active)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &category.name),
            other => other,
        })?;

        debug!(category_id = %category.id, name = %category.name, "Category inserted");
        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Category>> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?1");
        let category = sqlx::query_as::<_, Category>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(category)
    }

    pub async fn get_by_name(&self, name: &str) -> DbResult<Option<Category>> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE name = ?1");
        let category = sqlx::query_as::<_, Category>(&sql)
            .bind(name.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(category)
    }

    pub async fn list_active(&self) -> DbResult<Vec<Category>> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE is_active = 1 ORDER BY name");
        let categories = sqlx::query_as::<_, Category>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(categories)
    }

    /// Soft-deletes a category. Items keep referencing it.
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        let result =
            sqlx::query("UPDATE categories SET is_active = 0, updated_at = ?1 WHERE id = ?2")
                .bind(self.clock.now())
                .bind(id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Category", id));
        }
        Ok(())
    }
}

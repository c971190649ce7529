//! # Item Repository
//!
//! Database operations for catalog items.
//!
//! `stock_quantity` and `version` are written only by the stock ledger
//! (see [`super::stock`]). Nothing in this file updates either column
//! except the initial insert.

use std::sync::Arc;

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use kasir_core::ident::Clock;
use kasir_core::views::ItemResponse;
use kasir_core::{Item, ItemUpdate};

/// Column list matching the field order of [`Item`].
pub(crate) const ITEM_COLUMNS: &str = "id, barcode, name, category_id, \
     wholesale_cost_price, wholesale_selling_price, quantity_per_wholesale, \
     retail_cost_price, retail_selling_price, stock_quantity, minimum_stock, \
     is_active, created_at, updated_at";

/// An item together with its optimistic-concurrency version.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct VersionedItem {
    #[sqlx(flatten)]
    pub item: Item,
    pub version: i64,
}

/// Repository for item database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.items();
/// let item = repo.get_by_barcode("8991234567890").await?;
/// let low = repo.list_low_stock().await?;
/// ```
#[derive(Debug, Clone)]
pub struct ItemRepository {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl ItemRepository {
    /// Creates a new ItemRepository.
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        ItemRepository { pool, clock }
    }

    /// Gets an item by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Item>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1");
        let item = sqlx::query_as::<_, Item>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    /// Gets an item by its barcode (scanner lookup).
    pub async fn get_by_barcode(&self, barcode: &str) -> DbResult<Option<Item>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE barcode = ?1");
        let item = sqlx::query_as::<_, Item>(&sql)
            .bind(barcode.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    /// Active items whose name or barcode contains `query`, by name.
    ///
    /// An empty query lists active items.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Item>> {
        let query = query.trim();
        debug!(query = %query, limit = %limit, "Searching items");

        let pattern = format!("%{}%", query);
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM items \
             WHERE is_active = 1 AND (name LIKE ?1 OR barcode LIKE ?1) \
             ORDER BY name LIMIT ?2"
        );
        let items = sqlx::query_as::<_, Item>(&sql)
            .bind(pattern)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = items.len(), "Search returned items");
        Ok(items)
    }

    /// Active items in a category.
    pub async fn list_by_category(&self, category_id: &str) -> DbResult<Vec<Item>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM items \
             WHERE category_id = ?1 AND is_active = 1 ORDER BY name"
        );
        let items = sqlx::query_as::<_, Item>(&sql)
            .bind(category_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    /// Active items with `stock_quantity < minimum_stock`.
    pub async fn list_low_stock(&self) -> DbResult<Vec<Item>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM items \
             WHERE is_active = 1 AND stock_quantity < minimum_stock \
             ORDER BY stock_quantity, name"
        );
        let items = sqlx::query_as::<_, Item>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    /// Total number of items, active or not.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Applies a catalog edit and returns the updated item.
    ///
    /// `ItemUpdate` has no stock field, and the statement below does not
    /// mention `stock_quantity` or `version`, so a concurrent sale is never
    /// overwritten.
    pub async fn update(&self, id: &str, update: &ItemUpdate) -> DbResult<Item> {
        let mut item = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Item", id))?;

        update.apply_to(&mut item, self.clock.now())?;

        sqlx::query(
            r#"
            UPDATE items SET
                name = ?1,
                category_id = ?2,
                wholesale_cost_price = ?3,
                wholesale_selling_price = ?4,
                quantity_per_wholesale = ?5,
                retail_cost_price = ?6,
                retail_selling_price = ?7,
                minimum_stock = ?8,
                is_active = ?9,
                updated_at = ?10
            WHERE id = ?11
            "#,
        )
        .bind(&item.name)
        .bind(&item.category_id)
        .bind(item.wholesale_cost_price)
        .bind(item.wholesale_selling_price)
        .bind(item.quantity_per_wholesale)
        .bind(item.retail_cost_price)
        .bind(item.retail_selling_price)
        .bind(item.minimum_stock)
        .bind(item.is_active)
        .bind(item.updated_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        debug!(item_id = %id, "Item updated");

        // Re-read so the returned stock reflects any sale that ran meanwhile.
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Item", id))
    }

    /// Soft-deletes an item. Its history stays intact.
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE items SET is_active = 0, updated_at = ?1 WHERE id = ?2")
            .bind(self.clock.now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Item", id));
        }
        Ok(())
    }

    /// The item joined with its category name.
    pub async fn response(&self, id: &str) -> DbResult<Option<ItemResponse>> {
        let Some(item) = self.get_by_id(id).await? else {
            return Ok(None);
        };
        let category = super::CategoryRepository::new(self.pool.clone(), self.clock.clone())
            .get_by_id(&item.category_id)
            .await?;
        Ok(Some(ItemResponse::project(&item, category.as_ref())))
    }
}

// =============================================================================
// Connection-level operations (run inside a caller's transaction)
// =============================================================================

/// Inserts a new item with version 0.
pub(crate) async fn insert(conn: &mut SqliteConnection, item: &Item) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO items (
            id, barcode, name, category_id,
            wholesale_cost_price, wholesale_selling_price, quantity_per_wholesale,
            retail_cost_price, retail_selling_price,
            stock_quantity, minimum_stock, is_active, version,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, 0, ?13, ?14)
        "#,
    )
    .bind(&item.id)
    .bind(&item.barcode)
    .bind(&item.name)
    .bind(&item.category_id)
    .bind(item.wholesale_cost_price)
    .bind(item.wholesale_selling_price)
    .bind(item.quantity_per_wholesale)
    .bind(item.retail_cost_price)
    .bind(item.retail_selling_price)
    .bind(item.stock_quantity)
    .bind(item.minimum_stock)
    .bind(item.is_active)
    .bind(item.created_at)
    .bind(item.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::UniqueViolation { field, .. } if field.ends_with("name") => {
            DbError::duplicate(field, &item.name)
        }
        DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &item.barcode),
        other => other,
    })?;

    debug!(item_id = %item.id, barcode = %item.barcode, "Item inserted");
    Ok(())
}

/// Reads an item and its current version.
pub(crate) async fn fetch_versioned(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<VersionedItem>> {
    let sql = format!("SELECT {ITEM_COLUMNS}, version FROM items WHERE id = ?1");
    let row = sqlx::query_as::<_, VersionedItem>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

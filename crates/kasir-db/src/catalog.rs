//! # Catalog Operations
//!
//! Creation of users, categories and items. Timestamps come from the
//! database clock and barcodes from its identifier generator.
//!
//! ## Item Creation
//! ```text
//! NewItem { barcode: None, stock_quantity: 24, .. }
//!      │
//!      ▼
//! barcode = ids.barcode()            "K7Q2M9XA1B"
//!      │
//!      ▼
//! BEGIN
//!   INSERT items (stock 0) ── UNIQUE(barcode)? ──► ROLLBACK, new barcode
//!   RESTOCK +24 "Initial stock"       (ledger entry for opening stock)
//! COMMIT
//! ```
//!
//! Opening stock goes through the ledger like any other stock change, so
//! the sum of an item's movements always equals its `stock_quantity`.

use tracing::{info, warn};

use kasir_core::ledger::MovementRequest;
use kasir_core::{Category, CoreError, Item, ItemUpdate, NewCategory, NewItem, NewUser, User};

use crate::error::DbResult;
use crate::pool::Database;
use crate::repository::{item, stock};

const BARCODE_COLUMN: &str = "barcode";
const INITIAL_STOCK_REASON: &str = "Initial stock";

impl Database {
    pub async fn create_user(&self, input: NewUser) -> DbResult<User> {
        let user = User::new(input, self.clock.now())?;
        self.users().insert(&user).await?;

        info!(user_id = %user.id, username = %user.username, role = ?user.role, "User created");
        Ok(user)
    }

    pub async fn create_category(&self, input: NewCategory) -> DbResult<Category> {
        let category = Category::new(input, self.clock.now())?;
        self.categories().insert(&category).await?;

        info!(category_id = %category.id, name = %category.name, "Category created");
        Ok(category)
    }

    /// Creates an item, generating a barcode if none was supplied.
    ///
    /// A generated barcode that is already taken is replaced, up to the
    /// configured retry count. A supplied barcode that is taken fails with
    /// `DuplicateIdentifier` at once. Opening stock is recorded as a
    /// Restock movement by `actor`.
    pub async fn create_item(&self, input: NewItem, actor: &str) -> DbResult<Item> {
        let supplied = input.barcode.as_deref().map(|b| b.trim().to_uppercase());
        let attempts = match supplied {
            Some(_) => 1,
            None => self.ledger.max_id_retries + 1,
        };

        let mut last_barcode = String::new();
        for attempt in 1..=attempts {
            let barcode = supplied.clone().unwrap_or_else(|| self.ids.barcode());
            let item = Item::new(input.clone(), barcode.clone(), self.clock.now())?;

            match self.insert_with_opening_stock(&item, actor).await {
                Ok(created) => {
                    info!(
                        item_id = %created.id,
                        barcode = %created.barcode,
                        stock = created.stock_quantity,
                        "Item created"
                    );
                    return Ok(created);
                }
                Err(e) if e.is_unique_violation_on(BARCODE_COLUMN) => {
                    warn!(barcode = %barcode, attempt, "Barcode already in use");
                    last_barcode = barcode;
                }
                Err(e) => return Err(e),
            }
        }

        Err(CoreError::DuplicateIdentifier {
            field: BARCODE_COLUMN.to_string(),
            value: last_barcode,
        }
        .into())
    }

    /// Catalog edit. Stock is untouched; see [`Database::adjust_stock`].
    pub async fn update_item(&self, item_id: &str, update: &ItemUpdate) -> DbResult<Item> {
        self.items().update(item_id, update).await
    }

    async fn insert_with_opening_stock(&self, draft: &Item, actor: &str) -> DbResult<Item> {
        let opening = draft.stock_quantity;
        let empty = Item {
            stock_quantity: 0,
            ..draft.clone()
        };

        let mut tx = self.begin_write().await?;
        item::insert(&mut tx, &empty).await?;

        let mut created = empty;
        if opening > 0 {
            let request = MovementRequest::restock(&draft.id, opening, INITIAL_STOCK_REASON, actor);
            let movement =
                stock::apply_movement(&mut tx, &request, draft.created_at, self.ledger.max_stock_retries)
                    .await?;
            created.stock_quantity = movement.new_stock();
            created.updated_at = movement.created_at();
        }

        tx.commit().await?;
        Ok(created)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

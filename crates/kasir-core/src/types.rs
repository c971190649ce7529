//! # Domain Types
//!
//! Core domain types used throughout Kasir POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Item       │   │    LineItem     │   │  StockMovement  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  barcode        │   │  quantity       │   │  quantity_change│       │
//! │  │  retail prices  │◄──│  unit_mode      │◄──│  previous_stock │       │
//! │  │  wholesale ...  │   │  unit_price     │   │  new_stock      │       │
//! │  │  stock_quantity │   │  ecer_quantity  │   │  movement_type  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    UnitMode     │   │TransactionStatus│   │  MovementType   │       │
//! │  │  Ecer (retail)  │   │  Pending        │   │  SALE           │       │
//! │  │  Grosir (pack)  │   │  Completed      │   │  ADJUSTMENT     │       │
//! │  └─────────────────┘   │  Cancelled      │   │  RESTOCK        │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! References between entities are by id only. The core never follows a
//! back-reference; callers hand it already-resolved entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::validation;

// =============================================================================
// Enumerations
// =============================================================================

/// Role of a POS user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "PascalCase"))]
#[ts(export)]
pub enum UserRole {
    Admin,
    #[default]
    Kasir,
}

/// Unit a sale quantity is expressed in.
///
/// ## Conversion
/// ```text
/// Ecer   (retail)    : 1 unit  = 1 base unit
/// Grosir (wholesale) : 1 pack  = quantity_per_wholesale base units
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum UnitMode {
    /// Smallest sellable and stockable unit.
    #[default]
    #[serde(rename = "Ecer")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Ecer"))]
    Retail,
    /// A pack of `quantity_per_wholesale` base units.
    #[serde(rename = "Grosir")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Grosir"))]
    Wholesale,
}

/// Lifecycle of a transaction: `Pending → Completed | Cancelled`.
///
/// Both `Completed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "PascalCase"))]
#[ts(export)]
pub enum TransactionStatus {
    /// Lines are being attached; stock untouched.
    #[default]
    Pending,
    /// Stock debited for every line.
    Completed,
    /// Abandoned before commit.
    Cancelled,
}

impl TransactionStatus {
    /// Returns true if no transition can leave this state.
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

/// Kind of stock-affecting event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum MovementType {
    /// Consumption by a sale line (negative change).
    Sale,
    /// Manual correction (either sign).
    Adjustment,
    /// Goods received (positive change).
    Restock,
}

impl MovementType {
    /// Checks that `change` has the sign this movement type requires.
    pub const fn accepts(&self, change: i64) -> bool {
        match self {
            MovementType::Sale => change < 0,
            MovementType::Restock => change > 0,
            MovementType::Adjustment => change != 0,
        }
    }
}

// =============================================================================
// User & Category
// =============================================================================

/// A cashier or administrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: String,
    pub username: String,
    /// Opaque hash produced by the authentication layer.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a user. The password is hashed before it gets here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub full_name: String,
    #[serde(default)]
    pub role: UserRole,
}

impl User {
    /// Builds a validated, active user.
    pub fn new(input: NewUser, now: DateTime<Utc>) -> CoreResult<Self> {
        validation::validate_username(&input.username)?;
        validation::validate_full_name(&input.full_name)?;
        validation::require("password_hash", &input.password_hash)?;

        Ok(User {
            id: Uuid::new_v4().to_string(),
            username: input.username.trim().to_string(),
            password_hash: input.password_hash,
            full_name: input.full_name.trim().to_string(),
            role: input.role,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Product category.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Category {
    /// Builds a validated, active category.
    pub fn new(input: NewCategory, now: DateTime<Utc>) -> CoreResult<Self> {
        validation::validate_category_name(&input.name)?;
        validation::validate_description(&input.description)?;

        Ok(Category {
            id: Uuid::new_v4().to_string(),
            name: input.name.trim().to_string(),
            description: input.description,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }
}

// =============================================================================
// Item
// =============================================================================

/// A catalog item with retail (Ecer) and wholesale (Grosir) price schedules.
///
/// `stock_quantity` is always in base (Ecer) units and only ever changes
/// through a stock ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Item {
    pub id: String,
    pub barcode: String,
    pub name: String,
    pub category_id: String,

    /// Cost of one wholesale pack.
    pub wholesale_cost_price: Money,
    /// Selling price of one wholesale pack.
    pub wholesale_selling_price: Money,
    /// How many base units one wholesale pack contains (≥ 1).
    pub quantity_per_wholesale: i64,

    /// Cost of one base unit.
    pub retail_cost_price: Money,
    /// Selling price of one base unit.
    pub retail_selling_price: Money,

    /// Current stock in base units (≥ 0).
    pub stock_quantity: i64,
    /// Low-stock threshold in base units.
    pub minimum_stock: i64,

    /// Soft-delete flag.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Builds a validated item from catalog input.
    ///
    /// `barcode` is the final barcode: either the one supplied in `input`
    /// or one produced by an [`crate::ident::IdGenerator`].
    pub fn new(input: NewItem, barcode: String, now: DateTime<Utc>) -> CoreResult<Self> {
        validation::validate_barcode(&barcode)?;
        validation::validate_item_name(&input.name)?;
        validation::require("category_id", &input.category_id)?;
        validation::validate_price("wholesale_cost_price", input.wholesale_cost_price)?;
        validation::validate_price("wholesale_selling_price", input.wholesale_selling_price)?;
        validation::validate_price("retail_cost_price", input.retail_cost_price)?;
        validation::validate_price("retail_selling_price", input.retail_selling_price)?;
        validation::validate_quantity_per_wholesale(input.quantity_per_wholesale)?;
        validation::validate_stock_level("stock_quantity", input.stock_quantity)?;
        validation::validate_stock_level("minimum_stock", input.minimum_stock)?;

        Ok(Item {
            id: Uuid::new_v4().to_string(),
            barcode,
            name: input.name.trim().to_string(),
            category_id: input.category_id,
            wholesale_cost_price: input.wholesale_cost_price,
            wholesale_selling_price: input.wholesale_selling_price,
            quantity_per_wholesale: input.quantity_per_wholesale,
            retail_cost_price: input.retail_cost_price,
            retail_selling_price: input.retail_selling_price,
            stock_quantity: input.stock_quantity,
            minimum_stock: input.minimum_stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    /// Selling price of one unit in the given mode.
    #[inline]
    pub fn price_for(&self, unit: UnitMode) -> Money {
        match unit {
            UnitMode::Wholesale => self.wholesale_selling_price,
            UnitMode::Retail => self.retail_selling_price,
        }
    }

    /// Converts a sale quantity into base (Ecer) units.
    ///
    /// ## Example
    /// ```rust
    /// # use kasir_core::types::{Item, NewItem, UnitMode};
    /// # let input = NewItem { quantity_per_wholesale: 12, ..NewItem::named("Teh Botol", "cat-1") };
    /// # let item = Item::new(input, "TEHBOTOL01".into(), chrono::Utc::now()).unwrap();
    /// assert_eq!(item.to_base_quantity(2, UnitMode::Retail).unwrap(), 2);
    /// assert_eq!(item.to_base_quantity(2, UnitMode::Wholesale).unwrap(), 24);
    /// assert!(item.to_base_quantity(0, UnitMode::Retail).is_err());
    /// ```
    pub fn to_base_quantity(&self, quantity: i64, unit: UnitMode) -> CoreResult<i64> {
        if quantity <= 0 {
            return Err(CoreError::InvalidQuantity { quantity });
        }

        match unit {
            UnitMode::Retail => Ok(quantity),
            UnitMode::Wholesale => quantity
                .checked_mul(self.quantity_per_wholesale)
                .ok_or(CoreError::InvalidQuantity { quantity }),
        }
    }

    /// Advisory stock check: is there enough stock right now?
    ///
    /// Read-only. Stock may change before the debit, so the ledger
    /// re-checks under its own lock.
    pub fn can_fulfill(&self, quantity: i64, unit: UnitMode) -> bool {
        match self.to_base_quantity(quantity, unit) {
            Ok(required) => self.stock_quantity >= required,
            Err(_) => false,
        }
    }

    /// `stock_quantity < minimum_stock`.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity < self.minimum_stock
    }

    /// Stock level after applying `change`, or `None` on overflow.
    #[inline]
    pub fn stock_after(&self, change: i64) -> Option<i64> {
        self.stock_quantity.checked_add(change)
    }
}

/// Input for creating an item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewItem {
    /// Auto-generated when `None`.
    #[serde(default)]
    pub barcode: Option<String>,
    pub name: String,
    pub category_id: String,
    #[serde(default)]
    pub wholesale_cost_price: Money,
    #[serde(default)]
    pub wholesale_selling_price: Money,
    #[serde(default = "default_quantity_per_wholesale")]
    pub quantity_per_wholesale: i64,
    #[serde(default)]
    pub retail_cost_price: Money,
    #[serde(default)]
    pub retail_selling_price: Money,
    #[serde(default)]
    pub stock_quantity: i64,
    #[serde(default)]
    pub minimum_stock: i64,
}

fn default_quantity_per_wholesale() -> i64 {
    1
}

impl NewItem {
    /// Input with default prices and stock, for the given name and category.
    pub fn named(name: impl Into<String>, category_id: impl Into<String>) -> Self {
        NewItem {
            barcode: None,
            name: name.into(),
            category_id: category_id.into(),
            wholesale_cost_price: Money::zero(),
            wholesale_selling_price: Money::zero(),
            quantity_per_wholesale: default_quantity_per_wholesale(),
            retail_cost_price: Money::zero(),
            retail_selling_price: Money::zero(),
            stock_quantity: 0,
            minimum_stock: 0,
        }
    }
}

/// Catalog edit. Deliberately has no stock field: stock moves only
/// through the ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemUpdate {
    pub name: Option<String>,
    pub category_id: Option<String>,
    pub wholesale_cost_price: Option<Money>,
    pub wholesale_selling_price: Option<Money>,
    pub quantity_per_wholesale: Option<i64>,
    pub retail_cost_price: Option<Money>,
    pub retail_selling_price: Option<Money>,
    pub minimum_stock: Option<i64>,
    pub is_active: Option<bool>,
}

impl ItemUpdate {
    /// Applies the update to `item`, validating every supplied field first.
    ///
    /// On error `item` is left untouched.
    pub fn apply_to(&self, item: &mut Item, now: DateTime<Utc>) -> CoreResult<()> {
        if let Some(name) = &self.name {
            validation::validate_item_name(name)?;
        }
        if let Some(category_id) = &self.category_id {
            validation::require("category_id", category_id)?;
        }
        for (field, price) in [
            ("wholesale_cost_price", self.wholesale_cost_price),
            ("wholesale_selling_price", self.wholesale_selling_price),
            ("retail_cost_price", self.retail_cost_price),
            ("retail_selling_price", self.retail_selling_price),
        ] {
            if let Some(price) = price {
                validation::validate_price(field, price)?;
            }
        }
        if let Some(qpw) = self.quantity_per_wholesale {
            validation::validate_quantity_per_wholesale(qpw)?;
        }
        if let Some(minimum) = self.minimum_stock {
            validation::validate_stock_level("minimum_stock", minimum)?;
        }

        if let Some(name) = &self.name {
            item.name = name.trim().to_string();
        }
        if let Some(category_id) = &self.category_id {
            item.category_id = category_id.clone();
        }
        if let Some(price) = self.wholesale_cost_price {
            item.wholesale_cost_price = price;
        }
        if let Some(price) = self.wholesale_selling_price {
            item.wholesale_selling_price = price;
        }
        if let Some(qpw) = self.quantity_per_wholesale {
            item.quantity_per_wholesale = qpw;
        }
        if let Some(price) = self.retail_cost_price {
            item.retail_cost_price = price;
        }
        if let Some(price) = self.retail_selling_price {
            item.retail_selling_price = price;
        }
        if let Some(minimum) = self.minimum_stock {
            item.minimum_stock = minimum;
        }
        if let Some(active) = self.is_active {
            item.is_active = active;
        }
        item.updated_at = now;

        Ok(())
    }
}

// =============================================================================
// Sale Requests
// =============================================================================

/// One requested line of a sale: (item, quantity, unit).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleLine {
    pub item_id: String,
    pub quantity: i64,
    #[serde(default)]
    pub unit_mode: UnitMode,
}

/// Set an item's stock to an absolute level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockAdjustment {
    pub item_id: String,
    pub new_quantity: i64,
    pub reason: String,
}

// =============================================================================
// Line Item
// =============================================================================

/// A priced line of a transaction.
///
/// Fields are private: a line is produced by [`crate::pricing::price_line`]
/// and never changes afterwards. `unit_price` is the price at sale time and
/// is never re-read from the item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct LineItem {
    id: String,
    transaction_id: String,
    item_id: String,
    quantity: i64,
    unit_mode: UnitMode,
    unit_price: Money,
    total_price: Money,
    ecer_quantity: i64,
    created_at: DateTime<Utc>,
}

impl LineItem {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        transaction_id: &str,
        item_id: &str,
        quantity: i64,
        unit_mode: UnitMode,
        unit_price: Money,
        total_price: Money,
        ecer_quantity: i64,
        created_at: DateTime<Utc>,
    ) -> Self {
        LineItem {
            id: Uuid::new_v4().to_string(),
            transaction_id: transaction_id.to_string(),
            item_id: item_id.to_string(),
            quantity,
            unit_mode,
            unit_price,
            total_price,
            ecer_quantity,
            created_at,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    /// Quantity in `unit_mode` units.
    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn unit_mode(&self) -> UnitMode {
        self.unit_mode
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    /// `quantity * unit_price`.
    pub fn total_price(&self) -> Money {
        self.total_price
    }

    /// Quantity in base units; always > 0.
    pub fn ecer_quantity(&self) -> i64 {
        self.ecer_quantity
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Checks the line's own arithmetic invariants.
    pub(crate) fn is_consistent(&self) -> bool {
        self.quantity > 0
            && self.ecer_quantity > 0
            && self.unit_price.checked_multiply_quantity(self.quantity) == Some(self.total_price)
    }
}

// =============================================================================
// Stock Movement
// =============================================================================

/// Immutable ledger entry for one stock-affecting event.
///
/// Invariant: `new_stock == previous_stock + quantity_change` and both
/// snapshots are ≥ 0. Built only by [`StockMovement::plan`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockMovement {
    id: String,
    item_id: String,
    transaction_item_id: Option<String>,
    movement_type: MovementType,
    quantity_change: i64,
    previous_stock: i64,
    new_stock: i64,
    reason: String,
    created_at: DateTime<Utc>,
    created_by: String,
}

impl StockMovement {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    /// The originating line item, for sales.
    pub fn transaction_item_id(&self) -> Option<&str> {
        self.transaction_item_id.as_deref()
    }

    pub fn movement_type(&self) -> MovementType {
        self.movement_type
    }

    /// Signed change: negative for sales, positive for restocks.
    pub fn quantity_change(&self) -> i64 {
        self.quantity_change
    }

    pub fn previous_stock(&self) -> i64 {
        self.previous_stock
    }

    pub fn new_stock(&self) -> i64 {
        self.new_stock
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Actor (user id) who caused the movement.
    pub fn created_by(&self) -> &str {
        &self.created_by
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        item_id: &str,
        transaction_item_id: Option<String>,
        movement_type: MovementType,
        quantity_change: i64,
        previous_stock: i64,
        new_stock: i64,
        reason: String,
        created_at: DateTime<Utc>,
        created_by: String,
    ) -> Self {
        StockMovement {
            id: Uuid::new_v4().to_string(),
            item_id: item_id.to_string(),
            transaction_item_id,
            movement_type,
            quantity_change,
            previous_stock,
            new_stock,
            reason,
            created_at,
            created_by,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Item with 10 base units in stock and 5 units per wholesale pack.
    pub(crate) fn sample_item() -> Item {
        let input = NewItem {
            wholesale_selling_price: Money::from_cents(4_500),
            quantity_per_wholesale: 5,
            retail_selling_price: Money::from_cents(1_000),
            stock_quantity: 10,
            minimum_stock: 3,
            ..NewItem::named("Indomie Goreng", "cat-mie")
        };
        Item::new(input, "INDOMIE001".to_string(), Utc::now()).unwrap()
    }

    #[test]
    fn test_price_for_unit() {
        let item = sample_item();
        assert_eq!(item.price_for(UnitMode::Retail).cents(), 1_000);
        assert_eq!(item.price_for(UnitMode::Wholesale).cents(), 4_500);
    }

    #[test]
    fn test_to_base_quantity() {
        let item = sample_item();
        for q in [1, 2, 7, 100] {
            assert_eq!(item.to_base_quantity(q, UnitMode::Retail).unwrap(), q);
            assert_eq!(item.to_base_quantity(q, UnitMode::Wholesale).unwrap(), q * 5);
        }
        assert!(matches!(
            item.to_base_quantity(0, UnitMode::Wholesale),
            Err(CoreError::InvalidQuantity { quantity: 0 })
        ));
        assert!(item.to_base_quantity(-3, UnitMode::Retail).is_err());
        assert!(item.to_base_quantity(i64::MAX, UnitMode::Wholesale).is_err());
    }

    #[test]
    fn test_can_fulfill_is_stable() {
        let item = sample_item();
        assert!(item.can_fulfill(2, UnitMode::Wholesale));
        assert!(!item.can_fulfill(3, UnitMode::Wholesale));
        assert!(item.can_fulfill(10, UnitMode::Retail));
        assert!(!item.can_fulfill(11, UnitMode::Retail));
        assert!(!item.can_fulfill(0, UnitMode::Retail));

        let first = item.can_fulfill(2, UnitMode::Wholesale);
        for _ in 0..5 {
            assert_eq!(item.can_fulfill(2, UnitMode::Wholesale), first);
        }
        assert_eq!(item.stock_quantity, 10);
    }

    #[test]
    fn test_low_stock_flag() {
        let mut item = sample_item();
        assert!(!item.is_low_stock());
        item.stock_quantity = 3;
        assert!(!item.is_low_stock());
        item.stock_quantity = 2;
        assert!(item.is_low_stock());
    }

    #[test]
    fn test_item_validation() {
        let bad = NewItem {
            quantity_per_wholesale: 0,
            ..NewItem::named("Gula", "cat-1")
        };
        assert!(Item::new(bad, "GULA000001".into(), Utc::now()).is_err());

        let bad = NewItem {
            stock_quantity: -1,
            ..NewItem::named("Gula", "cat-1")
        };
        assert!(Item::new(bad, "GULA000001".into(), Utc::now()).is_err());

        assert!(Item::new(NewItem::named("Gula", "cat-1"), "gula".into(), Utc::now()).is_err());
    }

    #[test]
    fn test_item_update_never_touches_stock() {
        let mut item = sample_item();
        let update = ItemUpdate {
            retail_selling_price: Some(Money::from_cents(1_200)),
            quantity_per_wholesale: Some(6),
            ..Default::default()
        };
        update.apply_to(&mut item, Utc::now()).unwrap();

        assert_eq!(item.retail_selling_price.cents(), 1_200);
        assert_eq!(item.quantity_per_wholesale, 6);
        assert_eq!(item.stock_quantity, 10);
    }

    #[test]
    fn test_item_update_is_all_or_nothing() {
        let mut item = sample_item();
        let update = ItemUpdate {
            name: Some("Indomie Soto".into()),
            quantity_per_wholesale: Some(0),
            ..Default::default()
        };
        assert!(update.apply_to(&mut item, Utc::now()).is_err());
        assert_eq!(item.name, "Indomie Goreng");
    }

    #[test]
    fn test_movement_type_signs() {
        assert!(MovementType::Sale.accepts(-1));
        assert!(!MovementType::Sale.accepts(1));
        assert!(MovementType::Restock.accepts(5));
        assert!(!MovementType::Restock.accepts(-5));
        assert!(MovementType::Adjustment.accepts(-2));
        assert!(!MovementType::Adjustment.accepts(0));
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(serde_json::to_string(&UnitMode::Retail).unwrap(), "\"Ecer\"");
        assert_eq!(serde_json::to_string(&UnitMode::Wholesale).unwrap(), "\"Grosir\"");
        assert_eq!(serde_json::to_string(&MovementType::Restock).unwrap(), "\"RESTOCK\"");
        assert_eq!(
            serde_json::to_string(&TransactionStatus::Cancelled).unwrap(),
            "\"Cancelled\""
        );
        assert_eq!(UserRole::default(), UserRole::Kasir);
    }

    #[test]
    fn test_user_password_hash_not_serialized() {
        let user = User::new(
            NewUser {
                username: "siti".into(),
                password_hash: "$argon2id$v=19$...".into(),
                full_name: "Siti Rahayu".into(),
                role: UserRole::Kasir,
            },
            Utc::now(),
        )
        .unwrap();
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2"));
    }
}

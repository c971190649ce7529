//! # Read-Only Views
//!
//! Projections handed to presentation layers. Each one joins an entity with
//! the names of the entities it references; none carries logic of its own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::transaction::Transaction;
use crate::types::{Category, Item, LineItem, TransactionStatus, UnitMode, User};

/// An item with its category name and low-stock flag.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ItemResponse {
    pub id: String,
    pub barcode: String,
    pub name: String,
    pub category_id: String,
    pub category_name: Option<String>,
    pub wholesale_cost_price: Money,
    pub wholesale_selling_price: Money,
    pub quantity_per_wholesale: i64,
    pub retail_cost_price: Money,
    pub retail_selling_price: Money,
    pub stock_quantity: i64,
    pub minimum_stock: i64,
    pub is_low_stock: bool,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl ItemResponse {
    /// `category` is `None` when the referenced category no longer resolves.
    pub fn project(item: &Item, category: Option<&Category>) -> Self {
        ItemResponse {
            id: item.id.clone(),
            barcode: item.barcode.clone(),
            name: item.name.clone(),
            category_id: item.category_id.clone(),
            category_name: category.map(|c| c.name.clone()),
            wholesale_cost_price: item.wholesale_cost_price,
            wholesale_selling_price: item.wholesale_selling_price,
            quantity_per_wholesale: item.quantity_per_wholesale,
            retail_cost_price: item.retail_cost_price,
            retail_selling_price: item.retail_selling_price,
            stock_quantity: item.stock_quantity,
            minimum_stock: item.minimum_stock,
            is_low_stock: item.is_low_stock(),
            is_active: item.is_active,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

/// A line item with the name and barcode of what was sold.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineItemResponse {
    pub id: String,
    pub item_id: String,
    pub item_name: Option<String>,
    pub barcode: Option<String>,
    pub quantity: i64,
    pub unit_mode: UnitMode,
    pub unit_price: Money,
    pub total_price: Money,
    pub ecer_quantity: i64,
}

impl LineItemResponse {
    pub fn project(line: &LineItem, item: Option<&Item>) -> Self {
        LineItemResponse {
            id: line.id().to_string(),
            item_id: line.item_id().to_string(),
            item_name: item.map(|i| i.name.clone()),
            barcode: item.map(|i| i.barcode.clone()),
            quantity: line.quantity(),
            unit_mode: line.unit_mode(),
            unit_price: line.unit_price(),
            total_price: line.total_price(),
            ecer_quantity: line.ecer_quantity(),
        }
    }
}

/// A transaction with the cashier's name and expanded lines.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TransactionResponse {
    pub id: String,
    pub transaction_number: String,
    pub user_id: String,
    pub user_name: Option<String>,
    pub subtotal: Money,
    pub tax_amount: Money,
    pub discount_amount: Money,
    pub total_amount: Money,
    pub payment_amount: Money,
    pub change_amount: Money,
    pub status: TransactionStatus,
    pub notes: String,
    pub items: Vec<LineItemResponse>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl TransactionResponse {
    /// `items` is the catalog slice the lines refer to; lines whose item is
    /// missing from it are still listed, without a name.
    pub fn project(txn: &Transaction, user: Option<&User>, items: &[Item]) -> Self {
        let record = txn.record();
        let lines = txn
            .lines()
            .iter()
            .map(|line| {
                let item = items.iter().find(|i| i.id == line.item_id());
                LineItemResponse::project(line, item)
            })
            .collect();

        TransactionResponse {
            id: record.id.clone(),
            transaction_number: record.transaction_number.clone(),
            user_id: record.user_id.clone(),
            user_name: user.map(|u| u.full_name.clone()),
            subtotal: record.subtotal,
            tax_amount: record.tax_amount,
            discount_amount: record.discount_amount,
            total_amount: record.total_amount,
            payment_amount: record.payment_amount,
            change_amount: record.change_amount,
            status: record.status,
            notes: record.notes.clone(),
            items: lines,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::tests::{fixed_instant, FixedClock, SequenceIds};
    use crate::types::tests::sample_item;
    use crate::types::{NewCategory, NewUser, UserRole};

    #[test]
    fn test_item_projection() {
        let mut item = sample_item();
        let category = Category::new(
            NewCategory {
                name: "Mie Instan".into(),
                description: String::new(),
            },
            fixed_instant(),
        )
        .unwrap();

        let view = ItemResponse::project(&item, Some(&category));
        assert_eq!(view.category_name.as_deref(), Some("Mie Instan"));
        assert!(!view.is_low_stock);

        item.stock_quantity = 1;
        let view = ItemResponse::project(&item, None);
        assert!(view.is_low_stock);
        assert!(view.category_name.is_none());
    }

    #[test]
    fn test_transaction_projection() {
        let item = sample_item();
        let user = User::new(
            NewUser {
                username: "budi".into(),
                password_hash: "hash".into(),
                full_name: "Budi Santoso".into(),
                role: UserRole::Kasir,
            },
            fixed_instant(),
        )
        .unwrap();

        let mut txn = Transaction::open(
            &user.id,
            &SequenceIds::default(),
            std::sync::Arc::new(FixedClock(fixed_instant())),
        );
        txn.add_line(&item, 1, UnitMode::Wholesale).unwrap();
        txn.add_line(&item, 2, UnitMode::Retail).unwrap();

        let view = TransactionResponse::project(&txn, Some(&user), std::slice::from_ref(&item));
        assert_eq!(view.user_name.as_deref(), Some("Budi Santoso"));
        assert_eq!(view.items.len(), 2);
        assert_eq!(view.items[0].item_name.as_deref(), Some("Indomie Goreng"));
        assert_eq!(view.items[1].ecer_quantity, 2);
        assert_eq!(view.subtotal.cents(), 6_500);
    }
}

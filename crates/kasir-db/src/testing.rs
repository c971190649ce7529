//! Shared fixtures for database tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tempfile::TempDir;
use kasir_core::ident::{Clock, IdGenerator};
use kasir_core::{Category, Item, Money, NewCategory, NewItem, NewUser, User, UserRole};

use crate::pool::{Database, DbConfig};

/// In-memory database with an admin, a cashier, one category and one item.
///
/// `indomie`: barcode `INDOMIE001`, 10 in stock, 5 per pack, retail 1000,
/// wholesale 4500, minimum stock 3.
pub(crate) struct Fixture {
    pub db: Database,
    pub admin: User,
    pub cashier: User,
    pub category: Category,
    pub indomie: Item,
}

impl Fixture {
    pub async fn stock_of(&self, item_id: &str) -> i64 {
        self.db
            .items()
            .get_by_id(item_id)
            .await
            .unwrap()
            .unwrap()
            .stock_quantity
    }
}

pub(crate) async fn fixture() -> Fixture {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    seed(db).await
}

pub(crate) async fn fixture_with_ids(ids: Arc<dyn IdGenerator>) -> Fixture {
    let db = Database::new(DbConfig::in_memory())
        .await
        .unwrap()
        .with_id_generator(ids);
    seed(db).await
}

/// Same seed data in a WAL file database with a five-connection pool, so
/// concurrent writers really run on separate connections. Keep the
/// `TempDir` alive for the duration of the test.
pub(crate) async fn file_fixture() -> (Fixture, TempDir) {
    let dir = TempDir::new().unwrap();
    let config = DbConfig::new(dir.path().join("kasir.db")).max_connections(5);
    let db = Database::new(config).await.unwrap();
    (seed(db).await, dir)
}

async fn seed(db: Database) -> Fixture {
    let admin = db
        .create_user(NewUser {
            username: "admin".to_string(),
            password_hash: "$argon2id$admin".to_string(),
            full_name: "Budi Admin".to_string(),
            role: UserRole::Admin,
        })
        .await
        .unwrap();
    let cashier = db
        .create_user(NewUser {
            username: "siti".to_string(),
            password_hash: "$argon2id$siti".to_string(),
            full_name: "Siti Kasir".to_string(),
            role: UserRole::Kasir,
        })
        .await
        .unwrap();
    let category = db
        .create_category(NewCategory {
            name: "Mie Instan".to_string(),
            description: String::new(),
        })
        .await
        .unwrap();

    let input = NewItem {
        barcode: Some("INDOMIE001".to_string()),
        wholesale_selling_price: Money::from_cents(4_500),
        quantity_per_wholesale: 5,
        retail_selling_price: Money::from_cents(1_000),
        stock_quantity: 10,
        minimum_stock: 3,
        ..NewItem::named("Indomie Goreng", &category.id)
    };
    let indomie = db.create_item(input, &admin.id).await.unwrap();

    Fixture {
        db,
        admin,
        cashier,
        category,
        indomie,
    }
}

/// Clock frozen at one instant.
#[derive(Debug)]
pub(crate) struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Hands out scripted identifiers; the last one of each list repeats.
pub(crate) struct RepeatingIds {
    numbers: Mutex<VecDeque<String>>,
    barcodes: Mutex<VecDeque<String>>,
    counter: AtomicU32,
}

impl RepeatingIds {
    pub fn new(numbers: &[&str]) -> Self {
        RepeatingIds {
            numbers: Mutex::new(numbers.iter().map(|n| n.to_string()).collect()),
            barcodes: Mutex::new(VecDeque::new()),
            counter: AtomicU32::new(0),
        }
    }

    pub fn with_barcodes(self, barcodes: &[&str]) -> Self {
        *self.barcodes.lock().unwrap_or_else(PoisonError::into_inner) =
            barcodes.iter().map(|b| b.to_string()).collect();
        self
    }

    fn next(queue: &Mutex<VecDeque<String>>) -> Option<String> {
        let mut queue = queue.lock().unwrap_or_else(PoisonError::into_inner);
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

impl IdGenerator for RepeatingIds {
    fn transaction_number(&self, _now: DateTime<Utc>) -> String {
        Self::next(&self.numbers).unwrap_or_else(|| "TXN202601150930420000".to_string())
    }

    fn barcode(&self) -> String {
        Self::next(&self.barcodes).unwrap_or_else(|| {
            format!("TESTBC{:04}", self.counter.fetch_add(1, Ordering::SeqCst) + 1)
        })
    }
}

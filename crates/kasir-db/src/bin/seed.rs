//! # Seed Data Generator
//!
//! Populates the database with a small Indonesian grocery catalog and one
//! sample sale for development.
//!
//! ## Usage
//! ```bash
//! # Use kasir.toml / KASIR_* settings
//! cargo run -p kasir-db --bin seed
//!
//! # Specify database path
//! cargo run -p kasir-db --bin seed -- --db ./data/kasir.db
//!
//! # Verbose logging
//! RUST_LOG=kasir_db=debug cargo run -p kasir-db --bin seed
//! ```
//!
//! ## Generated Data
//! - Users: `admin` (Admin) and `kasir1` (Kasir). Password hashes are
//!   placeholders that match no password.
//! - Categories with items priced per piece (Ecer) and per carton (Grosir)
//! - One completed sale mixing both units

use std::env;
use std::path::PathBuf;

use kasir_core::{Money, NewCategory, NewItem, NewUser, SaleLine, UnitMode, UserRole};
use kasir_db::{CheckoutRequest, Database, DbConfig, KasirConfig};
use tracing_subscriber::EnvFilter;

/// Placeholder hash for seeded users; never matches a real password.
const LOCKED_HASH: &str = "!locked";

/// (category, description, items)
/// item: (name, barcode, retail Rp, wholesale Rp, per wholesale, stock, minimum)
#[allow(clippy::type_complexity)]
const CATALOG: &[(&str, &str, &[(&str, &str, i64, i64, i64, i64, i64)])] = &[
    (
        "Mie Instan",
        "Mie dan bihun instan",
        &[
            ("Indomie Goreng", "8998866200011", 3_500, 132_000, 40, 200, 40),
            ("Indomie Soto", "8998866200028", 3_200, 120_000, 40, 120, 40),
            ("Mie Sedaap Goreng", "8998866600019", 3_300, 125_000, 40, 80, 40),
        ],
    ),
    (
        "Minuman",
        "Minuman kemasan",
        &[
            ("Teh Botol Sosro 450ml", "8992388101014", 5_000, 110_000, 24, 96, 24),
            ("Aqua 600ml", "8886008101053", 4_000, 85_000, 24, 144, 48),
            ("Kopi Kapal Api Sachet", "8991002101012", 1_500, 14_000, 10, 300, 50),
        ],
    ),
    (
        "Sembako",
        "Bahan pokok",
        &[
            ("Gula Pasir 1kg", "8997009510017", 17_000, 160_000, 10, 50, 10),
            ("Minyak Goreng 1L", "8993496110019", 19_000, 220_000, 12, 36, 12),
            ("Beras 5kg", "8997009520016", 75_000, 290_000, 4, 20, 4),
        ],
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Kasir POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>       Database file path (overrides config)");
                println!("  -c, --config <PATH>   Config file (default: platform kasir.toml)");
                println!("  -h, --help            Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = KasirConfig::load(config_path)?;
    if let Some(path) = db_path {
        config.database.path = path;
    }

    println!("🌱 {} Seed Data Generator", config.store.name);
    println!("================================");
    println!("Database: {}", config.database.path.display());
    println!();

    let db = Database::new(DbConfig::from_config(&config)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.items().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} items", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let admin = db
        .create_user(NewUser {
            username: "admin".to_string(),
            password_hash: LOCKED_HASH.to_string(),
            full_name: "Administrator".to_string(),
            role: UserRole::Admin,
        })
        .await?;
    let cashier = db
        .create_user(NewUser {
            username: "kasir1".to_string(),
            password_hash: LOCKED_HASH.to_string(),
            full_name: "Kasir Satu".to_string(),
            role: UserRole::Kasir,
        })
        .await?;
    println!("✓ Created users: {}, {}", admin.username, cashier.username);

    let mut items = Vec::new();
    for (category_name, description, entries) in CATALOG {
        let category = db
            .create_category(NewCategory {
                name: category_name.to_string(),
                description: description.to_string(),
            })
            .await?;

        for &(name, barcode, retail, wholesale, per_wholesale, stock, minimum) in entries.iter() {
            let rupiah = |amount: i64| Money::from_major_minor(amount, 0);
            let input = NewItem {
                barcode: Some(barcode.to_string()),
                retail_cost_price: rupiah(retail * 85 / 100),
                retail_selling_price: rupiah(retail),
                wholesale_cost_price: rupiah(wholesale * 85 / 100),
                wholesale_selling_price: rupiah(wholesale),
                quantity_per_wholesale: per_wholesale,
                stock_quantity: stock,
                minimum_stock: minimum,
                ..NewItem::named(name, &category.id)
            };
            items.push(db.create_item(input, &admin.id).await?);
        }
        println!("✓ Category {}: {} items", category.name, entries.len());
    }

    // One sale: a carton of noodles plus two loose bottles of tea.
    let request = CheckoutRequest {
        user_id: cashier.id.clone(),
        lines: vec![
            SaleLine {
                item_id: items[0].id.clone(),
                quantity: 1,
                unit_mode: UnitMode::Wholesale,
            },
            SaleLine {
                item_id: items[3].id.clone(),
                quantity: 2,
                unit_mode: UnitMode::Retail,
            },
        ],
        payment_amount: Money::from_major_minor(150_000, 0),
        notes: "Contoh transaksi".to_string(),
        ..Default::default()
    };
    let txn = db.checkout(&request).await?;

    println!();
    println!("✓ Sample sale {}", txn.number());
    if let Some(view) = db.transactions().response(txn.id()).await? {
        println!("{}", serde_json::to_string_pretty(&view)?);
    }

    let low = db.items().list_low_stock().await?;
    println!();
    println!("Low stock items: {}", low.len());

    db.close().await;
    println!();
    println!("✓ Seed complete!");

    Ok(())
}

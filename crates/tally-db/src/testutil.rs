//! Shared helpers for tally-db tests: an isolated in-memory database
//! plus seed functions for the entities most tests need.

use crate::pool::{Database, DbConfig};
use crate::repository::customer::NewCustomer;
use crate::repository::product::NewProduct;
use crate::repository::supplier::NewSupplier;

/// Fresh in-memory database with migrations applied.
pub async fn test_db() -> Database {
    Database::new(DbConfig::in_memory())
        .await
        .expect("in-memory database")
}

/// Inserts a product (opening stock goes through the ledger) and
/// returns its id.
pub async fn seed_product(
    db: &Database,
    name: &str,
    barcode: &str,
    price_cents: i64,
    cost_cents: i64,
    stock: i64,
) -> i64 {
    db.products()
        .create(NewProduct {
            name: name.to_string(),
            barcode: barcode.to_string(),
            price_cents,
            cost_cents,
            stock,
            min_stock: 0,
        })
        .await
        .expect("seed product")
        .id
}

/// Inserts a customer and returns its id.
pub async fn seed_customer(db: &Database, name: &str) -> i64 {
    db.customers()
        .create(NewCustomer {
            name: name.to_string(),
            phone: None,
            address: None,
        })
        .await
        .expect("seed customer")
        .id
}

/// Inserts a supplier and returns its id.
pub async fn seed_supplier(db: &Database, name: &str) -> i64 {
    db.suppliers()
        .create(NewSupplier {
            name: name.to_string(),
            phone: None,
            address: None,
        })
        .await
        .expect("seed supplier")
        .id
}

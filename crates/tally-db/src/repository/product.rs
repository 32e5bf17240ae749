//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Opening Stock
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create(stock: 12)                                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  INSERT products (stock = 0)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StockLedger::apply(In, 12, "Initial Stock")  ← counter becomes 12      │
//! │                                                                         │
//! │  Opening stock flows through the ledger like every other change, so    │
//! │  the counter/ledger invariant holds from the product's first second.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::ledger::StockLedger;
use tally_core::validation::{validate_barcode, validate_money_non_negative, validate_name};
use tally_core::{CoreError, MovementDirection, Product};

/// Input for creating a product.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub barcode: String,
    pub price_cents: i64,
    pub cost_cents: i64,
    /// Opening stock, recorded as an `Initial Stock` ledger movement.
    pub stock: i64,
    pub min_stock: i64,
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a product. Opening stock goes through the ledger.
    ///
    /// Fails with a unique violation if the barcode is already taken.
    pub async fn create(&self, input: NewProduct) -> StoreResult<Product> {
        validate_name(&input.name)?;
        validate_barcode(&input.barcode)?;
        validate_money_non_negative("price", input.price_cents)?;
        validate_money_non_negative("cost", input.cost_cents)?;

        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO products (name, barcode, price_cents, cost_cents, stock, min_stock, created_at) \
             VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6) RETURNING id",
        )
        .bind(input.name.trim())
        .bind(input.barcode.trim())
        .bind(input.price_cents)
        .bind(input.cost_cents)
        .bind(input.min_stock)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        if input.stock > 0 {
            StockLedger::apply(&mut tx, id, MovementDirection::In, input.stock, "Initial Stock")
                .await?;
        }

        let product = Self::fetch_by_id(&mut tx, id).await?;
        tx.commit().await?;

        debug!(product_id = id, barcode = %product.barcode, "Product created");
        Ok(product)
    }

    /// Fetches a product by id.
    pub async fn get_by_id(&self, id: i64) -> StoreResult<Product> {
        let product = sqlx::query_as::<_, Product>(
            "SELECT id, name, barcode, price_cents, cost_cents, stock, min_stock, created_at \
             FROM products WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        product.ok_or(StoreError::Core(CoreError::NotFound {
            entity: "product",
            id,
        }))
    }

    /// Fetches a product by barcode.
    pub async fn get_by_barcode(&self, barcode: &str) -> StoreResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            "SELECT id, name, barcode, price_cents, cost_cents, stock, min_stock, created_at \
             FROM products WHERE barcode = ?1",
        )
        .bind(barcode.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists products ordered by name.
    pub async fn list(&self, limit: u32) -> StoreResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT id, name, barcode, price_cents, cost_cents, stock, min_stock, created_at \
             FROM products ORDER BY name LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Lists products at or below their reorder threshold.
    pub async fn low_stock(&self) -> StoreResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT id, name, barcode, price_cents, cost_cents, stock, min_stock, created_at \
             FROM products WHERE stock <= min_stock ORDER BY stock ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Fetches a product inside a caller-owned transaction.
    pub(crate) async fn fetch_by_id(
        conn: &mut sqlx::SqliteConnection,
        id: i64,
    ) -> StoreResult<Product> {
        let product = sqlx::query_as::<_, Product>(
            "SELECT id, name, barcode, price_cents, cost_cents, stock, min_stock, created_at \
             FROM products WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        product.ok_or(StoreError::Core(CoreError::NotFound {
            entity: "product",
            id,
        }))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

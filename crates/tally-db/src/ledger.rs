//! # Stock Movement Ledger
//!
//! Append-only ledger backing the `products.stock` counter.
//!
//! ## The Invariant
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  For every product, at every commit point:                             │
//! │                                                                         │
//! │     products.stock == Σ(in movements) − Σ(out movements)               │
//! │                                                                         │
//! │  Holds because the counter update and the movement insert happen       │
//! │  in the SAME transaction, always through this module.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Movements are never updated or deleted. Undoing an operation writes a
//! compensating movement in the opposite direction.
//!
//! ## Two Write Paths
//! - [`StockLedger::apply`] - unclamped; the counter may go negative
//!   (checkout deliberately permits overselling)
//! - [`StockLedger::apply_clamped`] - outbound removal capped at current
//!   stock; the movement row records the EFFECTIVE quantity so the
//!   invariant holds even when the cap bites (purchase void/edit rollback)

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use tally_core::validation::validate_quantity;
use tally_core::{CoreError, MovementDirection, StockMovement};

// =============================================================================
// Outcome Types
// =============================================================================

/// Result of a clamped outbound removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClampedRemoval {
    /// Stock counter after the removal.
    pub new_stock: i64,
    /// Units actually removed (≤ requested).
    pub effective: i64,
    /// Units the cap swallowed (requested − effective).
    pub shortfall: i64,
}

/// One product whose counter disagrees with its ledger sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockMismatch {
    pub product_id: i64,
    pub stock: i64,
    pub ledger_sum: i64,
}

// =============================================================================
// Stock Ledger
// =============================================================================

/// The stock movement ledger.
///
/// Write operations are associated functions taking a connection so the
/// transaction managers can call them inside their own transactions.
/// Read operations (history, reconciliation) run on the pool.
#[derive(Debug, Clone)]
pub struct StockLedger {
    pool: SqlitePool,
}

impl StockLedger {
    /// Creates a new StockLedger.
    pub fn new(pool: SqlitePool) -> Self {
        StockLedger { pool }
    }

    // -------------------------------------------------------------------------
    // Writes (inside a caller-owned transaction)
    // -------------------------------------------------------------------------

    /// Records a movement and updates the stock counter atomically.
    ///
    /// Returns the new stock value. The counter may go negative on `out`
    /// movements; callers that need a floor check it before calling in
    /// (sale edit, manual adjustment) or use [`Self::apply_clamped`].
    ///
    /// ## Arguments
    /// * `conn` - connection carrying the caller's open transaction
    /// * `quantity` - always positive; `direction` carries the sign
    /// * `reason` - human-readable cause, e.g. `"Sale #INV-00042"`
    pub async fn apply(
        conn: &mut SqliteConnection,
        product_id: i64,
        direction: MovementDirection,
        quantity: i64,
        reason: &str,
    ) -> StoreResult<i64> {
        validate_quantity(quantity)?;

        let new_stock: Option<i64> = sqlx::query_scalar(
            "UPDATE products SET stock = stock + ?1 WHERE id = ?2 RETURNING stock",
        )
        .bind(quantity * direction.sign())
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?;

        let new_stock = new_stock.ok_or(StoreError::Core(CoreError::NotFound {
            entity: "product",
            id: product_id,
        }))?;

        sqlx::query(
            "INSERT INTO stock_movements (product_id, direction, quantity, reason, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(product_id)
        .bind(direction)
        .bind(quantity)
        .bind(reason)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        debug!(product_id, ?direction, quantity, reason, new_stock, "Stock movement applied");
        Ok(new_stock)
    }

    /// Applies a signed stock delta: positive puts units back, negative
    /// takes them out. A zero delta is a no-op.
    pub async fn apply_delta(
        conn: &mut SqliteConnection,
        product_id: i64,
        delta: i64,
        reason: &str,
    ) -> StoreResult<()> {
        if delta == 0 {
            return Ok(());
        }
        let direction = if delta > 0 {
            MovementDirection::In
        } else {
            MovementDirection::Out
        };
        Self::apply(conn, product_id, direction, delta.abs(), reason).await?;
        Ok(())
    }

    /// Removes up to `requested` units, capped at the current stock.
    ///
    /// The movement row records the EFFECTIVE quantity, never the
    /// requested one, so the counter/ledger invariant survives the cap.
    /// If nothing can be removed (stock already ≤ 0) no movement is
    /// written at all.
    ///
    /// Used when voiding or rolling back a purchase: the received units
    /// may have been sold since, and stock must not go negative on a
    /// correction of our own paperwork.
    pub async fn apply_clamped(
        conn: &mut SqliteConnection,
        product_id: i64,
        requested: i64,
        reason: &str,
    ) -> StoreResult<ClampedRemoval> {
        validate_quantity(requested)?;

        let stock: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await?;

        let stock = stock.ok_or(StoreError::Core(CoreError::NotFound {
            entity: "product",
            id: product_id,
        }))?;

        let effective = requested.min(stock).max(0);
        let shortfall = requested - effective;

        if effective == 0 {
            warn!(product_id, requested, stock, reason, "Clamped removal skipped entirely");
            return Ok(ClampedRemoval {
                new_stock: stock,
                effective: 0,
                shortfall,
            });
        }

        if shortfall > 0 {
            warn!(product_id, requested, effective, reason, "Removal clamped at current stock");
        }

        let new_stock =
            Self::apply(conn, product_id, MovementDirection::Out, effective, reason).await?;

        Ok(ClampedRemoval {
            new_stock,
            effective,
            shortfall,
        })
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Returns a product's movement history, newest first.
    pub async fn history(&self, product_id: i64, limit: u32) -> StoreResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(
            "SELECT id, product_id, direction, quantity, reason, created_at \
             FROM stock_movements WHERE product_id = ?1 \
             ORDER BY id DESC LIMIT ?2",
        )
        .bind(product_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Checks one product's counter against its ledger sum.
    ///
    /// A mismatch indicates a bug or an out-of-band write, never a
    /// normal outcome, so it surfaces as an error.
    pub async fn reconcile(&self, product_id: i64) -> StoreResult<()> {
        let row: Option<(i64, i64)> = sqlx::query_as(
            "SELECT p.stock, \
                    COALESCE((SELECT SUM(CASE m.direction WHEN 'in' THEN m.quantity ELSE -m.quantity END) \
                              FROM stock_movements m WHERE m.product_id = p.id), 0) \
             FROM products p WHERE p.id = ?1",
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        let (stock, ledger_sum) = row.ok_or(StoreError::Core(CoreError::NotFound {
            entity: "product",
            id: product_id,
        }))?;

        if stock != ledger_sum {
            return Err(StoreError::Core(CoreError::ConsistencyFailure {
                product_id,
                stock,
                ledger_sum,
            }));
        }
        Ok(())
    }

    /// Checks every product, returning the products whose counters
    /// disagree with the ledger. An empty list means the store is sound.
    pub async fn reconcile_all(&self) -> StoreResult<Vec<StockMismatch>> {
        let rows: Vec<(i64, i64, i64)> = sqlx::query_as(
            "SELECT p.id, p.stock, \
                    COALESCE((SELECT SUM(CASE m.direction WHEN 'in' THEN m.quantity ELSE -m.quantity END) \
                              FROM stock_movements m WHERE m.product_id = p.id), 0) \
             FROM products p ORDER BY p.id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter(|&(_, stock, ledger_sum)| stock != ledger_sum)
            .map(|(product_id, stock, ledger_sum)| StockMismatch {
                product_id,
                stock,
                ledger_sum,
            })
            .collect())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{seed_product, test_db};

    #[tokio::test]
    async fn test_apply_updates_counter_and_ledger() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Cola", "111", 500, 300, 10).await;

        let mut tx = db.pool().begin().await.unwrap();
        let new_stock =
            StockLedger::apply(&mut tx, product_id, MovementDirection::Out, 4, "Sale #INV-00001")
                .await
                .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(new_stock, 6);
        db.ledger().reconcile(product_id).await.unwrap();

        let history = db.ledger().history(product_id, 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].quantity, 4);
        assert_eq!(history[0].direction, MovementDirection::Out);
        assert_eq!(history[0].reason, "Sale #INV-00001");
    }

    #[tokio::test]
    async fn test_apply_allows_negative_stock() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Cola", "111", 500, 300, 2).await;

        let mut tx = db.pool().begin().await.unwrap();
        let new_stock =
            StockLedger::apply(&mut tx, product_id, MovementDirection::Out, 5, "Sale #INV-00001")
                .await
                .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(new_stock, -3);
        db.ledger().reconcile(product_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_apply_unknown_product() {
        let db = test_db().await;

        let mut tx = db.pool().begin().await.unwrap();
        let err = StockLedger::apply(&mut tx, 999, MovementDirection::In, 1, "Restock")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Core(CoreError::NotFound { entity: "product", id: 999 })
        ));
    }

    #[tokio::test]
    async fn test_apply_rejects_non_positive_quantity() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Cola", "111", 500, 300, 10).await;

        let mut tx = db.pool().begin().await.unwrap();
        assert!(
            StockLedger::apply(&mut tx, product_id, MovementDirection::In, 0, "Restock")
                .await
                .is_err()
        );
        assert!(
            StockLedger::apply(&mut tx, product_id, MovementDirection::In, -3, "Restock")
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_apply_clamped_partial() {
        let db = test_db().await;
        // Received 10, but 7 already sold: only 3 left to take back.
        let product_id = seed_product(&db, "Cola", "111", 500, 300, 3).await;

        let mut tx = db.pool().begin().await.unwrap();
        let outcome = StockLedger::apply_clamped(&mut tx, product_id, 10, "Purchase Voided #1")
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(outcome.effective, 3);
        assert_eq!(outcome.shortfall, 7);
        assert_eq!(outcome.new_stock, 0);

        // The movement records the effective quantity, so the ledger
        // still matches the counter.
        db.ledger().reconcile(product_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_apply_clamped_no_stock_writes_nothing() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Cola", "111", 500, 300, 0).await;

        let mut tx = db.pool().begin().await.unwrap();
        let outcome = StockLedger::apply_clamped(&mut tx, product_id, 5, "Purchase Voided #1")
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(outcome.effective, 0);
        assert_eq!(outcome.new_stock, 0);
        assert!(db.ledger().history(product_id, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_apply_delta_zero_is_noop() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Cola", "111", 500, 300, 5).await;

        let mut tx = db.pool().begin().await.unwrap();
        StockLedger::apply_delta(&mut tx, product_id, 0, "Sale Edit #INV-00001")
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert!(db.ledger().history(product_id, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_all_detects_out_of_band_write() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Cola", "111", 500, 300, 5).await;
        let other = seed_product(&db, "Chips", "222", 300, 150, 8).await;

        // Bypass the ledger, corrupting the counter.
        sqlx::query("UPDATE products SET stock = 99 WHERE id = ?1")
            .bind(product_id)
            .execute(db.pool())
            .await
            .unwrap();

        let mismatches = db.ledger().reconcile_all().await.unwrap();
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].product_id, product_id);
        assert_eq!(mismatches[0].stock, 99);
        assert_eq!(mismatches[0].ledger_sum, 5);

        db.ledger().reconcile(other).await.unwrap();
    }
}

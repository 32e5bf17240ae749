//! # Purchase Transaction Manager
//!
//! Orchestrates supplier receipts: create, edit, void. Each receipt
//! line re-blends the product's weighted-average cost and puts units
//! into stock through the ledger.
//!
//! ## Edit = Rollback + Apply
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  edit(purchase)                                                          │
//! │     BEGIN                                                                │
//! │       for old items: clamped OUT  "Purchase Edit Rollback #<id>"        │
//! │       delete old items                                                   │
//! │       for new items: blend cost, IN  "Purchase Edit Apply #<id>"        │
//! │       update header (supplier, total, date)                              │
//! │       audit: PURCHASE_EDIT                                               │
//! │     COMMIT                                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Two Deliberate Asymmetries
//! - Rollback/void removals are CLAMPED at current stock: the received
//!   units may have been sold since, and correcting our own paperwork
//!   must not drive the counter negative. (Checkout oversell is the
//!   till's privilege, not the back office's.)
//! - Cost is NEVER un-blended. The weighted average is lossy; voiding a
//!   receipt restores quantities but the blended cost stands. Known
//!   limitation of average costing, not a bug.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use crate::audit::{actions, AuditTrail};
use crate::error::{StoreError, StoreResult};
use crate::ledger::StockLedger;
use crate::repository::product::ProductRepository;
use tally_core::costing::blended_unit_cost;
use tally_core::validation::{validate_money_non_negative, validate_not_empty, validate_quantity};
use tally_core::{CoreError, Money, MovementDirection, Purchase, PurchaseItem};

// =============================================================================
// Request / Response DTOs
// =============================================================================

/// One receipt line.
#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseLine {
    pub product_id: i64,
    pub quantity: i64,
    /// Unit cost paid to the supplier, in cents.
    pub cost_cents: i64,
}

/// Purchase create/edit input.
#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseRequest {
    pub supplier_id: i64,
    pub items: Vec<PurchaseLine>,
    /// Receipt date; defaults to now.
    pub date: Option<DateTime<Utc>>,
}

/// Purchase create/edit output.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseOutcome {
    pub status: &'static str,
    pub purchase_id: i64,
    pub total_cents: i64,
}

// =============================================================================
// Purchase Manager
// =============================================================================

/// The purchase transaction manager.
#[derive(Debug, Clone)]
pub struct PurchaseManager {
    pool: SqlitePool,
}

impl PurchaseManager {
    /// Creates a new PurchaseManager.
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseManager { pool }
    }

    fn validate_request(request: &PurchaseRequest) -> StoreResult<()> {
        validate_not_empty("items", request.items.len())?;
        for line in &request.items {
            validate_quantity(line.quantity)?;
            validate_money_non_negative("cost", line.cost_cents)?;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Create
    // -------------------------------------------------------------------------

    /// Records a supplier receipt: purchase + item rows, cost blending,
    /// inbound stock movements. All-or-nothing.
    pub async fn create(&self, request: PurchaseRequest) -> StoreResult<PurchaseOutcome> {
        Self::validate_request(&request)?;

        let mut tx = self.pool.begin().await?;

        Self::ensure_supplier(&mut tx, request.supplier_id).await?;

        let total: Money = request
            .items
            .iter()
            .map(|l| Money::from_cents(l.cost_cents) * l.quantity)
            .sum();

        let purchase_id: i64 = sqlx::query_scalar(
            "INSERT INTO purchases (supplier_id, total_cents, created_at) \
             VALUES (?1, ?2, ?3) RETURNING id",
        )
        .bind(request.supplier_id)
        .bind(total.cents())
        .bind(request.date.unwrap_or_else(Utc::now))
        .fetch_one(&mut *tx)
        .await?;

        let reason = format!("Purchase #{purchase_id}");
        Self::apply_lines(&mut tx, purchase_id, &request.items, &reason).await?;

        AuditTrail::record(
            &mut tx,
            actions::PURCHASE_CREATE,
            &format!("purchase {purchase_id}: total {total}"),
        )
        .await?;

        tx.commit().await?;

        info!(purchase_id, %total, "Purchase recorded");
        Ok(PurchaseOutcome {
            status: "success",
            purchase_id,
            total_cents: total.cents(),
        })
    }

    // -------------------------------------------------------------------------
    // Edit
    // -------------------------------------------------------------------------

    /// Replaces a purchase's items: rolls the old receipt's stock back
    /// (clamped), then applies the new item set exactly like a create.
    ///
    /// The old receipt's cost blending is NOT undone; the new lines
    /// blend on top of whatever the cost currently is.
    pub async fn edit(
        &self,
        purchase_id: i64,
        request: PurchaseRequest,
    ) -> StoreResult<PurchaseOutcome> {
        Self::validate_request(&request)?;

        let mut tx = self.pool.begin().await?;

        Self::fetch_purchase(&mut tx, purchase_id).await?;
        Self::ensure_supplier(&mut tx, request.supplier_id).await?;
        let old_items = Self::fetch_items(&mut tx, purchase_id).await?;

        // Revert phase.
        let rollback_reason = format!("Purchase Edit Rollback #{purchase_id}");
        for item in &old_items {
            StockLedger::apply_clamped(&mut tx, item.product_id, item.quantity, &rollback_reason)
                .await?;
        }
        sqlx::query("DELETE FROM purchase_items WHERE purchase_id = ?1")
            .bind(purchase_id)
            .execute(&mut *tx)
            .await?;

        // Apply phase: identical to create.
        let apply_reason = format!("Purchase Edit Apply #{purchase_id}");
        let total = Self::apply_lines(&mut tx, purchase_id, &request.items, &apply_reason).await?;

        sqlx::query(
            "UPDATE purchases SET supplier_id = ?1, total_cents = ?2, created_at = ?3 \
             WHERE id = ?4",
        )
        .bind(request.supplier_id)
        .bind(total.cents())
        .bind(request.date.unwrap_or_else(Utc::now))
        .bind(purchase_id)
        .execute(&mut *tx)
        .await?;

        AuditTrail::record(
            &mut tx,
            actions::PURCHASE_EDIT,
            &format!("purchase {purchase_id}: new total {total}"),
        )
        .await?;

        tx.commit().await?;

        info!(purchase_id, %total, "Purchase edited");
        Ok(PurchaseOutcome {
            status: "success",
            purchase_id,
            total_cents: total.cents(),
        })
    }

    // -------------------------------------------------------------------------
    // Delete
    // -------------------------------------------------------------------------

    /// Voids a purchase: removes the received units from stock (clamped
    /// at zero) and deletes the purchase and its items. Cost is not
    /// reverted.
    pub async fn delete(&self, purchase_id: i64) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let purchase = Self::fetch_purchase(&mut tx, purchase_id).await?;
        let items = Self::fetch_items(&mut tx, purchase_id).await?;

        let reason = format!("Purchase Voided #{purchase_id}");
        for item in &items {
            StockLedger::apply_clamped(&mut tx, item.product_id, item.quantity, &reason).await?;
        }

        // ON DELETE CASCADE removes the items.
        sqlx::query("DELETE FROM purchases WHERE id = ?1")
            .bind(purchase_id)
            .execute(&mut *tx)
            .await?;

        AuditTrail::record(
            &mut tx,
            actions::PURCHASE_DELETE,
            &format!("purchase {purchase_id}: total {}", purchase.total()),
        )
        .await?;

        tx.commit().await?;

        info!(purchase_id, "Purchase voided");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Fetches a purchase with its items.
    pub async fn get(&self, purchase_id: i64) -> StoreResult<(Purchase, Vec<PurchaseItem>)> {
        let mut conn = self.pool.acquire().await?;
        let purchase = Self::fetch_purchase(&mut conn, purchase_id).await?;
        let items = Self::fetch_items(&mut conn, purchase_id).await?;
        Ok((purchase, items))
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    /// Inserts item rows, blends costs, and moves stock in. Returns the
    /// items' total.
    async fn apply_lines(
        conn: &mut SqliteConnection,
        purchase_id: i64,
        lines: &[PurchaseLine],
        reason: &str,
    ) -> StoreResult<Money> {
        let mut total = Money::zero();

        for line in lines {
            let product = ProductRepository::fetch_by_id(&mut *conn, line.product_id).await?;
            let unit_cost = Money::from_cents(line.cost_cents);
            let subtotal = unit_cost * line.quantity;
            total += subtotal;

            // Blend BEFORE the stock moves: the formula weighs the
            // pre-receipt quantity against the incoming batch.
            let new_cost =
                blended_unit_cost(product.stock, product.cost(), line.quantity, unit_cost);
            sqlx::query("UPDATE products SET cost_cents = ?1 WHERE id = ?2")
                .bind(new_cost.cents())
                .bind(line.product_id)
                .execute(&mut *conn)
                .await?;

            sqlx::query(
                "INSERT INTO purchase_items (purchase_id, product_id, quantity, cost_cents, subtotal_cents) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(purchase_id)
            .bind(line.product_id)
            .bind(line.quantity)
            .bind(line.cost_cents)
            .bind(subtotal.cents())
            .execute(&mut *conn)
            .await?;

            StockLedger::apply(conn, line.product_id, MovementDirection::In, line.quantity, reason)
                .await?;
        }

        Ok(total)
    }

    async fn ensure_supplier(conn: &mut SqliteConnection, supplier_id: i64) -> StoreResult<()> {
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM suppliers WHERE id = ?1")
            .bind(supplier_id)
            .fetch_optional(&mut *conn)
            .await?;
        exists
            .map(|_| ())
            .ok_or(StoreError::Core(CoreError::NotFound {
                entity: "supplier",
                id: supplier_id,
            }))
    }

    async fn fetch_purchase(conn: &mut SqliteConnection, purchase_id: i64) -> StoreResult<Purchase> {
        let purchase = sqlx::query_as::<_, Purchase>(
            "SELECT id, supplier_id, total_cents, created_at FROM purchases WHERE id = ?1",
        )
        .bind(purchase_id)
        .fetch_optional(&mut *conn)
        .await?;

        purchase.ok_or(StoreError::Core(CoreError::NotFound {
            entity: "purchase",
            id: purchase_id,
        }))
    }

    async fn fetch_items(
        conn: &mut SqliteConnection,
        purchase_id: i64,
    ) -> StoreResult<Vec<PurchaseItem>> {
        let items = sqlx::query_as::<_, PurchaseItem>(
            "SELECT id, purchase_id, product_id, quantity, cost_cents, subtotal_cents \
             FROM purchase_items WHERE purchase_id = ?1 ORDER BY id",
        )
        .bind(purchase_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(items)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sales::{CartLine, CheckoutRequest};
    use crate::testutil::{seed_product, seed_supplier, test_db};
    use tally_core::PaymentMethod;

    fn receipt(supplier_id: i64, items: Vec<PurchaseLine>) -> PurchaseRequest {
        PurchaseRequest {
            supplier_id,
            items,
            date: None,
        }
    }

    #[tokio::test]
    async fn test_create_blends_cost_and_moves_stock() {
        let db = test_db().await;
        let supplier = seed_supplier(&db, "Metro").await;
        // 10 on hand at cost 100.00
        let cola = seed_product(&db, "Cola", "111", 15000, 10000, 10).await;

        // Receive 5 at 130.00.
        let outcome = db
            .purchases()
            .create(receipt(
                supplier,
                vec![PurchaseLine { product_id: cola, quantity: 5, cost_cents: 13000 }],
            ))
            .await
            .unwrap();
        assert_eq!(outcome.total_cents, 5 * 13000);

        let product = db.products().get_by_id(cola).await.unwrap();
        assert_eq!(product.stock, 15);
        // (10·10000 + 5·13000) / 15 = 11000
        assert_eq!(product.cost_cents, 11000);
        db.ledger().reconcile(cola).await.unwrap();

        let history = db.ledger().history(cola, 10).await.unwrap();
        assert_eq!(history[0].reason, format!("Purchase #{}", outcome.purchase_id));
    }

    #[tokio::test]
    async fn test_create_empty_stock_takes_batch_cost() {
        let db = test_db().await;
        let supplier = seed_supplier(&db, "Metro").await;
        let cola = seed_product(&db, "Cola", "111", 15000, 10000, 0).await;

        db.purchases()
            .create(receipt(
                supplier,
                vec![PurchaseLine { product_id: cola, quantity: 5, cost_cents: 13000 }],
            ))
            .await
            .unwrap();

        assert_eq!(db.products().get_by_id(cola).await.unwrap().cost_cents, 13000);
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_supplier_and_bad_lines() {
        let db = test_db().await;
        let cola = seed_product(&db, "Cola", "111", 500, 300, 0).await;

        let err = db
            .purchases()
            .create(receipt(99, vec![PurchaseLine { product_id: cola, quantity: 1, cost_cents: 100 }]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Core(CoreError::NotFound { entity: "supplier", .. })
        ));

        let supplier = seed_supplier(&db, "Metro").await;
        assert!(db.purchases().create(receipt(supplier, vec![])).await.is_err());
        assert!(db
            .purchases()
            .create(receipt(
                supplier,
                vec![PurchaseLine { product_id: cola, quantity: 0, cost_cents: 100 }],
            ))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_edit_rolls_back_then_applies() {
        let db = test_db().await;
        let supplier = seed_supplier(&db, "Metro").await;
        let cola = seed_product(&db, "Cola", "111", 500, 300, 0).await;
        let chips = seed_product(&db, "Chips", "222", 300, 150, 0).await;

        let outcome = db
            .purchases()
            .create(receipt(
                supplier,
                vec![PurchaseLine { product_id: cola, quantity: 10, cost_cents: 300 }],
            ))
            .await
            .unwrap();

        let edited = db
            .purchases()
            .edit(
                outcome.purchase_id,
                receipt(
                    supplier,
                    vec![PurchaseLine { product_id: chips, quantity: 4, cost_cents: 150 }],
                ),
            )
            .await
            .unwrap();
        assert_eq!(edited.total_cents, 600);

        assert_eq!(db.products().get_by_id(cola).await.unwrap().stock, 0);
        assert_eq!(db.products().get_by_id(chips).await.unwrap().stock, 4);
        db.ledger().reconcile(cola).await.unwrap();
        db.ledger().reconcile(chips).await.unwrap();

        let (purchase, items) = db.purchases().get(outcome.purchase_id).await.unwrap();
        assert_eq!(purchase.total_cents, 600);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].product_id, chips);
    }

    #[tokio::test]
    async fn test_void_clamps_when_units_already_sold() {
        let db = test_db().await;
        let supplier = seed_supplier(&db, "Metro").await;
        let cola = seed_product(&db, "Cola", "111", 500, 300, 0).await;

        let outcome = db
            .purchases()
            .create(receipt(
                supplier,
                vec![PurchaseLine { product_id: cola, quantity: 10, cost_cents: 300 }],
            ))
            .await
            .unwrap();

        // 7 of the 10 get sold before the void.
        db.sales()
            .checkout(CheckoutRequest {
                items: vec![CartLine { product_id: cola, quantity: 7, price_cents: None }],
                tax_cents: 0,
                discount_cents: 0,
                payment_method: PaymentMethod::Cash,
                customer_id: None,
            })
            .await
            .unwrap();

        db.purchases().delete(outcome.purchase_id).await.unwrap();

        // Only the 3 remaining come back out; the counter floors at 0
        // and the ledger records the effective removal.
        assert_eq!(db.products().get_by_id(cola).await.unwrap().stock, 0);
        db.ledger().reconcile(cola).await.unwrap();
        assert!(db.purchases().get(outcome.purchase_id).await.is_err());
    }

    #[tokio::test]
    async fn test_void_does_not_revert_cost() {
        let db = test_db().await;
        let supplier = seed_supplier(&db, "Metro").await;
        let cola = seed_product(&db, "Cola", "111", 15000, 10000, 10).await;

        let outcome = db
            .purchases()
            .create(receipt(
                supplier,
                vec![PurchaseLine { product_id: cola, quantity: 5, cost_cents: 13000 }],
            ))
            .await
            .unwrap();
        db.purchases().delete(outcome.purchase_id).await.unwrap();

        let product = db.products().get_by_id(cola).await.unwrap();
        assert_eq!(product.stock, 10);
        // The blend stands even though the receipt is gone.
        assert_eq!(product.cost_cents, 11000);
    }
}

//! # Sale Transaction Manager
//!
//! Orchestrates the sale lifecycle: checkout, edit, return, delete.
//! This is the only module allowed to touch sales rows; stock and
//! credit effects go through the ledger and the reconciler.
//!
//! ## One Transaction Per Operation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  checkout                                                                │
//! │     BEGIN                                                                │
//! │       allocate invoice number     ← same txn as the insert, so the     │
//! │       insert sale + items            UNIQUE index arbitrates races     │
//! │       ledger: out per line        ← oversell permitted at the till     │
//! │       credit: +total (if credit sale)                                   │
//! │       audit: SALE_CREATE                                                 │
//! │     COMMIT                                                               │
//! │                                                                         │
//! │  Any failure mid-flight rolls the whole thing back: no sale row, no    │
//! │  movements, no credit change, no audit entry.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Oversell
//! Checkout does NOT check stock: the customer is standing at the till
//! holding the item, so the physical count wins over the book count and
//! the counter goes negative. Sale EDIT is different: an increase is a
//! bookkeeping change, not a physical fact, so it requires stock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use crate::audit::{actions, AuditTrail};
use crate::credit::CreditReconciler;
use crate::error::{StoreError, StoreResult};
use crate::invoice::next_invoice;
use crate::ledger::StockLedger;
use crate::repository::product::ProductRepository;
use tally_core::delta::stock_deltas;
use tally_core::validation::{validate_money_non_negative, validate_not_empty, validate_quantity};
use tally_core::{CoreError, Money, MovementDirection, PaymentMethod, Sale, SaleItem, SaleStatus};

// =============================================================================
// Request / Response DTOs
// =============================================================================

/// One cart line. `price_cents` overrides the product's list price when
/// given (price negotiation at the till); otherwise the product's
/// current price is frozen into the line.
#[derive(Debug, Clone, Deserialize)]
pub struct CartLine {
    pub product_id: i64,
    pub quantity: i64,
    pub price_cents: Option<i64>,
}

/// Checkout input. The cart key is accepted as either `cart_items`
/// (register payloads) or `items`.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    #[serde(alias = "cart_items")]
    pub items: Vec<CartLine>,
    pub tax_cents: i64,
    pub discount_cents: i64,
    pub payment_method: PaymentMethod,
    pub customer_id: Option<i64>,
}

/// Checkout output.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutReceipt {
    pub status: &'static str,
    pub sale_id: i64,
    pub invoice_no: String,
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    pub customer_id: Option<i64>,
    /// Balance after the sale, present only for credit sales with a
    /// customer attached.
    pub customer_balance_cents: Option<i64>,
}

/// Sale edit input. Items fully replace the old set.
#[derive(Debug, Clone, Deserialize)]
pub struct EditSaleRequest {
    #[serde(alias = "cart_items")]
    pub items: Vec<CartLine>,
    pub payment_method: PaymentMethod,
    pub customer_id: Option<i64>,
    /// Overrides the sale date when given.
    pub date: Option<DateTime<Utc>>,
}

/// Sale edit output.
#[derive(Debug, Clone, Serialize)]
pub struct EditSaleOutcome {
    pub status: &'static str,
    pub sale_id: i64,
    pub total_cents: i64,
}

/// One return line, keyed by the sale item being returned against.
#[derive(Debug, Clone, Deserialize)]
pub struct ReturnLine {
    pub sale_item_id: i64,
    pub quantity: i64,
}

/// Return output.
#[derive(Debug, Clone, Serialize)]
pub struct ReturnOutcome {
    pub status: &'static str,
    pub message: String,
    pub returned_amount_cents: i64,
    pub sale_status: SaleStatus,
}

// =============================================================================
// Sale Manager
// =============================================================================

/// The sale transaction manager.
#[derive(Debug, Clone)]
pub struct SaleManager {
    pool: SqlitePool,
}

impl SaleManager {
    /// Creates a new SaleManager.
    pub fn new(pool: SqlitePool) -> Self {
        SaleManager { pool }
    }

    // -------------------------------------------------------------------------
    // Checkout
    // -------------------------------------------------------------------------

    /// Commits a sale: invoice number, sale + item rows, outbound stock
    /// movements, credit accrual, audit entry. All-or-nothing.
    pub async fn checkout(&self, request: CheckoutRequest) -> StoreResult<CheckoutReceipt> {
        validate_not_empty("cart", request.items.len())?;
        validate_money_non_negative("tax", request.tax_cents)?;
        validate_money_non_negative("discount", request.discount_cents)?;
        for line in &request.items {
            validate_quantity(line.quantity)?;
            if let Some(price) = line.price_cents {
                validate_money_non_negative("price", price)?;
            }
        }

        let mut tx = self.pool.begin().await?;

        let invoice_no = next_invoice(&mut tx).await?;

        // Resolve every line before writing anything: a bad product id
        // aborts with zero effect.
        let mut resolved: Vec<(i64, i64, Money)> = Vec::with_capacity(request.items.len());
        let mut items_total = Money::zero();
        for line in &request.items {
            let product = ProductRepository::fetch_by_id(&mut tx, line.product_id).await?;
            let price = line.price_cents.map(Money::from_cents).unwrap_or(product.price());
            items_total += price * line.quantity;
            resolved.push((line.product_id, line.quantity, price));
        }

        let total = items_total + Money::from_cents(request.tax_cents)
            - Money::from_cents(request.discount_cents);

        let sale_id: i64 = sqlx::query_scalar(
            "INSERT INTO sales (invoice_no, total_cents, tax_cents, discount_cents, \
                                payment_method, status, returned_cents, customer_id, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, 'completed', 0, ?6, ?7) RETURNING id",
        )
        .bind(&invoice_no)
        .bind(total.cents())
        .bind(request.tax_cents)
        .bind(request.discount_cents)
        .bind(request.payment_method)
        .bind(request.customer_id)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        let reason = format!("Sale #{invoice_no}");
        for &(product_id, quantity, price) in &resolved {
            sqlx::query(
                "INSERT INTO sale_items (sale_id, product_id, quantity, price_cents, \
                                         subtotal_cents, returned_quantity) \
                 VALUES (?1, ?2, ?3, ?4, ?5, 0)",
            )
            .bind(sale_id)
            .bind(product_id)
            .bind(quantity)
            .bind(price.cents())
            .bind((price * quantity).cents())
            .execute(&mut *tx)
            .await?;

            StockLedger::apply(&mut tx, product_id, MovementDirection::Out, quantity, &reason)
                .await?;
        }

        let mut customer_balance = None;
        if request.payment_method.is_credit() {
            if let Some(customer_id) = request.customer_id {
                let outcome = CreditReconciler::adjust(&mut tx, customer_id, total).await?;
                customer_balance = Some(outcome.balance.cents());
            }
        }

        AuditTrail::record(
            &mut tx,
            actions::SALE_CREATE,
            &format!("{invoice_no}: total {total}"),
        )
        .await?;

        tx.commit().await?;

        info!(sale_id, %invoice_no, %total, "Checkout committed");
        Ok(CheckoutReceipt {
            status: "success",
            sale_id,
            invoice_no,
            total_cents: total.cents(),
            payment_method: request.payment_method,
            customer_id: request.customer_id,
            customer_balance_cents: customer_balance,
        })
    }

    // -------------------------------------------------------------------------
    // Edit
    // -------------------------------------------------------------------------

    /// Replaces a sale's items and header, applying only the per-product
    /// stock DELTAS between old and new item sets. Editing a sale to an
    /// identical item set touches no stock at all.
    ///
    /// A quantity increase requires that much stock on hand; the whole
    /// edit is rejected otherwise. A sale with returns posted against it
    /// cannot be edited at all: the replacement items would start with
    /// `returned_quantity = 0`, making already-returned units returnable
    /// a second time.
    pub async fn edit(&self, sale_id: i64, request: EditSaleRequest) -> StoreResult<EditSaleOutcome> {
        validate_not_empty("items", request.items.len())?;
        for line in &request.items {
            validate_quantity(line.quantity)?;
            if let Some(price) = line.price_cents {
                validate_money_non_negative("price", price)?;
            }
        }

        let mut tx = self.pool.begin().await?;

        let sale = Self::fetch_sale(&mut tx, sale_id).await?;

        // Recreated items would reset returned_quantity while the sale
        // keeps its returned amount; refuse rather than corrupt.
        if sale.returned_amount().is_positive() {
            return Err(StoreError::Core(CoreError::EditAfterReturn {
                invoice_no: sale.invoice_no,
                returned_cents: sale.returned_cents,
            }));
        }

        let old_items = Self::fetch_items(&mut tx, sale_id).await?;

        let old_pairs: Vec<(i64, i64)> =
            old_items.iter().map(|i| (i.product_id, i.quantity)).collect();
        let new_pairs: Vec<(i64, i64)> =
            request.items.iter().map(|l| (l.product_id, l.quantity)).collect();
        let deltas = stock_deltas(&old_pairs, &new_pairs);

        // Pre-commit sufficiency check: every net stock decrease must be
        // covered before any movement is written.
        for delta in &deltas {
            if delta.delta < 0 {
                let product = ProductRepository::fetch_by_id(&mut tx, delta.product_id).await?;
                let needed = -delta.delta;
                if product.stock < needed {
                    return Err(StoreError::Core(CoreError::InsufficientStock {
                        name: product.name,
                        available: product.stock,
                        requested: needed,
                    }));
                }
            }
        }

        let reason = format!("Sale Edit #{}", sale.invoice_no);
        for delta in &deltas {
            StockLedger::apply_delta(&mut tx, delta.product_id, delta.delta, &reason).await?;
        }

        // Items are replaced wholesale, never patched in place.
        sqlx::query("DELETE FROM sale_items WHERE sale_id = ?1")
            .bind(sale_id)
            .execute(&mut *tx)
            .await?;

        let mut items_total = Money::zero();
        for line in &request.items {
            let product = ProductRepository::fetch_by_id(&mut tx, line.product_id).await?;
            let price = line.price_cents.map(Money::from_cents).unwrap_or(product.price());
            let subtotal = price * line.quantity;
            items_total += subtotal;

            sqlx::query(
                "INSERT INTO sale_items (sale_id, product_id, quantity, price_cents, \
                                         subtotal_cents, returned_quantity) \
                 VALUES (?1, ?2, ?3, ?4, ?5, 0)",
            )
            .bind(sale_id)
            .bind(line.product_id)
            .bind(line.quantity)
            .bind(price.cents())
            .bind(subtotal.cents())
            .execute(&mut *tx)
            .await?;
        }

        let new_total = items_total + Money::from_cents(sale.tax_cents)
            - Money::from_cents(sale.discount_cents);

        // Credit effects: reverse the old sale's accrual, then apply the
        // new one. Covers payment method changes, customer changes, and
        // plain total changes with one rule.
        if sale.payment_method.is_credit() {
            if let Some(old_customer) = sale.customer_id {
                CreditReconciler::adjust(&mut tx, old_customer, -sale.total()).await?;
            }
        }
        if request.payment_method.is_credit() {
            if let Some(new_customer) = request.customer_id {
                CreditReconciler::adjust(&mut tx, new_customer, new_total).await?;
            }
        }

        sqlx::query(
            "UPDATE sales SET total_cents = ?1, payment_method = ?2, customer_id = ?3, \
                              created_at = ?4 WHERE id = ?5",
        )
        .bind(new_total.cents())
        .bind(request.payment_method)
        .bind(request.customer_id)
        .bind(request.date.unwrap_or(sale.created_at))
        .bind(sale_id)
        .execute(&mut *tx)
        .await?;

        AuditTrail::record(
            &mut tx,
            actions::SALE_EDIT,
            &format!("{}: total {} -> {}", sale.invoice_no, sale.total(), new_total),
        )
        .await?;

        tx.commit().await?;

        info!(sale_id, invoice_no = %sale.invoice_no, %new_total, "Sale edited");
        Ok(EditSaleOutcome {
            status: "success",
            sale_id,
            total_cents: new_total.cents(),
        })
    }

    // -------------------------------------------------------------------------
    // Return
    // -------------------------------------------------------------------------

    /// Returns items against a sale. Every line is validated against its
    /// remaining returnable quantity BEFORE anything mutates; one bad
    /// line rejects the whole return.
    pub async fn return_items(
        &self,
        sale_id: i64,
        lines: Vec<ReturnLine>,
    ) -> StoreResult<ReturnOutcome> {
        validate_not_empty("return_items", lines.len())?;
        for line in &lines {
            validate_quantity(line.quantity)?;
        }

        let mut tx = self.pool.begin().await?;

        let sale = Self::fetch_sale(&mut tx, sale_id).await?;
        let items = Self::fetch_items(&mut tx, sale_id).await?;

        // Pre-validation pass.
        let mut resolved: Vec<(&SaleItem, i64)> = Vec::with_capacity(lines.len());
        for line in &lines {
            let item = items
                .iter()
                .find(|i| i.id == line.sale_item_id)
                .ok_or(StoreError::Core(CoreError::NotFound {
                    entity: "sale item",
                    id: line.sale_item_id,
                }))?;

            let returnable = item.available_to_return();
            if line.quantity > returnable {
                let product = ProductRepository::fetch_by_id(&mut tx, item.product_id).await?;
                return Err(StoreError::Core(CoreError::InvalidReturnQuantity {
                    name: product.name,
                    requested: line.quantity,
                    returnable,
                }));
            }
            resolved.push((item, line.quantity));
        }

        // Mutation pass.
        let reason = format!("Customer Return - Sale #{}", sale.invoice_no);
        let mut refund = Money::zero();
        for (item, quantity) in &resolved {
            sqlx::query("UPDATE sale_items SET returned_quantity = returned_quantity + ?1 WHERE id = ?2")
                .bind(quantity)
                .bind(item.id)
                .execute(&mut *tx)
                .await?;

            StockLedger::apply(&mut tx, item.product_id, MovementDirection::In, *quantity, &reason)
                .await?;

            refund += item.price() * *quantity;
        }

        let returned = sale.returned_amount() + refund;
        let new_status = SaleStatus::from_amounts(returned, sale.total());

        sqlx::query("UPDATE sales SET returned_cents = ?1, status = ?2 WHERE id = ?3")
            .bind(returned.cents())
            .bind(new_status)
            .bind(sale_id)
            .execute(&mut *tx)
            .await?;

        if sale.payment_method.is_credit() {
            if let Some(customer_id) = sale.customer_id {
                CreditReconciler::adjust(&mut tx, customer_id, -refund).await?;
            }
        }

        AuditTrail::record(
            &mut tx,
            actions::SALE_RETURN,
            &format!("{}: refunded {refund}", sale.invoice_no),
        )
        .await?;

        tx.commit().await?;

        info!(sale_id, invoice_no = %sale.invoice_no, %refund, ?new_status, "Return committed");
        Ok(ReturnOutcome {
            status: "success",
            message: format!("Refunded {refund} against {}", sale.invoice_no),
            returned_amount_cents: refund.cents(),
            sale_status: new_status,
        })
    }

    // -------------------------------------------------------------------------
    // Delete
    // -------------------------------------------------------------------------

    /// Deletes a sale permanently, putting every item's FULL quantity
    /// back into stock and reversing any credit accrual (clamped at
    /// zero). The audit entry and the compensating movements are the
    /// only remaining record.
    ///
    /// Items already partially returned get re-added in full anyway,
    /// matching long-standing register behavior; the earlier return
    /// movements remain in the ledger for anyone chasing the difference.
    pub async fn delete(&self, sale_id: i64) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let sale = Self::fetch_sale(&mut tx, sale_id).await?;
        let items = Self::fetch_items(&mut tx, sale_id).await?;

        for item in &items {
            StockLedger::apply(
                &mut tx,
                item.product_id,
                MovementDirection::In,
                item.quantity,
                "Sale Deletion - Stock Returned",
            )
            .await?;
        }

        if sale.payment_method.is_credit() {
            if let Some(customer_id) = sale.customer_id {
                CreditReconciler::adjust(&mut tx, customer_id, -sale.total()).await?;
            }
        }

        // ON DELETE CASCADE removes the items.
        sqlx::query("DELETE FROM sales WHERE id = ?1")
            .bind(sale_id)
            .execute(&mut *tx)
            .await?;

        AuditTrail::record(
            &mut tx,
            actions::SALE_DELETE,
            &format!("{}: total {}", sale.invoice_no, sale.total()),
        )
        .await?;

        tx.commit().await?;

        info!(sale_id, invoice_no = %sale.invoice_no, "Sale deleted");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Fetches a sale with its items.
    pub async fn get(&self, sale_id: i64) -> StoreResult<(Sale, Vec<SaleItem>)> {
        let mut conn = self.pool.acquire().await?;
        let sale = Self::fetch_sale(&mut conn, sale_id).await?;
        let items = Self::fetch_items(&mut conn, sale_id).await?;
        Ok((sale, items))
    }

    async fn fetch_sale(conn: &mut SqliteConnection, sale_id: i64) -> StoreResult<Sale> {
        let sale = sqlx::query_as::<_, Sale>(
            "SELECT id, invoice_no, total_cents, tax_cents, discount_cents, payment_method, \
                    status, returned_cents, customer_id, created_at \
             FROM sales WHERE id = ?1",
        )
        .bind(sale_id)
        .fetch_optional(&mut *conn)
        .await?;

        sale.ok_or(StoreError::Core(CoreError::NotFound {
            entity: "sale",
            id: sale_id,
        }))
    }

    async fn fetch_items(conn: &mut SqliteConnection, sale_id: i64) -> StoreResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(
            "SELECT id, sale_id, product_id, quantity, price_cents, subtotal_cents, \
                    returned_quantity \
             FROM sale_items WHERE sale_id = ?1 ORDER BY id",
        )
        .bind(sale_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(items)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

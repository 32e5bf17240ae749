//! # Inventory Manager
//!
//! Manual stock changes outside the sale/purchase flows: writing off
//! damaged or lost units, and ad-hoc restocks.
//!
//! Unlike checkout, a manual write-off must NOT oversell: nobody is
//! standing at the till holding the goods, so removing more than the
//! book count is a data-entry error and is rejected outright.

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;

use crate::audit::{actions, AuditTrail};
use crate::error::{StoreError, StoreResult};
use crate::ledger::StockLedger;
use crate::repository::product::ProductRepository;
use tally_core::validation::{validate_money_non_negative, validate_quantity};
use tally_core::{AdjustmentKind, CoreError, MovementDirection};

// =============================================================================
// Response DTOs
// =============================================================================

/// Outcome of a manual stock change.
#[derive(Debug, Clone, Serialize)]
pub struct StockChangeOutcome {
    pub status: &'static str,
    pub message: String,
    pub new_stock: i64,
}

// =============================================================================
// Inventory Manager
// =============================================================================

/// Manager for manual stock adjustments and restocks.
#[derive(Debug, Clone)]
pub struct InventoryManager {
    pool: SqlitePool,
}

impl InventoryManager {
    /// Creates a new InventoryManager.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryManager { pool }
    }

    /// Writes off units (damage, expiry, loss, theft).
    ///
    /// Rejected with zero state change when `quantity` exceeds the
    /// current stock.
    pub async fn adjust_stock(
        &self,
        product_id: i64,
        quantity: i64,
        kind: AdjustmentKind,
    ) -> StoreResult<StockChangeOutcome> {
        validate_quantity(quantity)?;

        let mut tx = self.pool.begin().await?;

        let product = ProductRepository::fetch_by_id(&mut tx, product_id).await?;
        if quantity > product.stock {
            return Err(StoreError::Core(CoreError::InsufficientStock {
                name: product.name,
                available: product.stock,
                requested: quantity,
            }));
        }

        let reason = format!("{kind} - Manual Adjustment");
        let new_stock =
            StockLedger::apply(&mut tx, product_id, MovementDirection::Out, quantity, &reason)
                .await?;

        AuditTrail::record(
            &mut tx,
            actions::STOCK_ADJUST,
            &format!("{}: -{quantity} ({kind}), stock {new_stock}", product.name),
        )
        .await?;

        tx.commit().await?;

        info!(product_id, quantity, %kind, new_stock, "Stock adjusted");
        Ok(StockChangeOutcome {
            status: "success",
            message: format!("Removed {quantity} x {} ({kind})", product.name),
            new_stock,
        })
    }

    /// Adds units to stock outside a purchase receipt.
    ///
    /// When `cost_cents` is given it replaces the product's unit cost
    /// directly (no blending: a restock is a correction, not a priced
    /// receipt).
    pub async fn restock(
        &self,
        product_id: i64,
        quantity: i64,
        cost_cents: Option<i64>,
        reason: Option<&str>,
    ) -> StoreResult<StockChangeOutcome> {
        validate_quantity(quantity)?;
        if let Some(cost) = cost_cents {
            validate_money_non_negative("cost", cost)?;
        }

        let mut tx = self.pool.begin().await?;

        let product = ProductRepository::fetch_by_id(&mut tx, product_id).await?;

        if let Some(cost) = cost_cents {
            sqlx::query("UPDATE products SET cost_cents = ?1 WHERE id = ?2")
                .bind(cost)
                .bind(product_id)
                .execute(&mut *tx)
                .await?;
        }

        let reason = reason.unwrap_or("Restock");
        let new_stock =
            StockLedger::apply(&mut tx, product_id, MovementDirection::In, quantity, reason)
                .await?;

        AuditTrail::record(
            &mut tx,
            actions::RESTOCK,
            &format!("{}: +{quantity}, stock {new_stock}", product.name),
        )
        .await?;

        tx.commit().await?;

        info!(product_id, quantity, new_stock, "Restocked");
        Ok(StockChangeOutcome {
            status: "success",
            message: format!("Added {quantity} x {}", product.name),
            new_stock,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # Domain Types
//!
//! Core domain types used throughout Tally POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          Domain Types                               │
//! │                                                                     │
//! │  ┌───────────────┐   ┌───────────────┐   ┌───────────────┐        │
//! │  │    Product    │   │     Sale      │   │   Purchase    │        │
//! │  │  ───────────  │   │  ───────────  │   │  ───────────  │        │
//! │  │  barcode      │   │  invoice_no   │   │  supplier_id  │        │
//! │  │  price_cents  │   │  status       │   │  total_cents  │        │
//! │  │  cost_cents   │   │  total_cents  │   │  created_at   │        │
//! │  │  stock        │   │  returned     │   └───────┬───────┘        │
//! │  └───────┬───────┘   └───────┬───────┘           │                │
//! │          │                   │                   │                │
//! │          │           ┌───────▼───────┐   ┌───────▼───────┐        │
//! │          │           │   SaleItem    │   │ PurchaseItem  │        │
//! │          │           └───────────────┘   └───────────────┘        │
//! │          ▼                                                         │
//! │  ┌───────────────┐                                                 │
//! │  │ StockMovement │  append-only ledger entry: every stock change   │
//! │  └───────────────┘  flows through here                             │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants carried by these types
//! - `Product.stock` equals Σ(in movements) − Σ(out movements) for the product
//! - `Sale.total_cents` = Σ(item subtotals) + tax − discount
//! - `SaleItem.returned_quantity` ≤ `SaleItem.quantity`
//! - `Customer.credit_balance_cents` ≥ 0 (clamp-always policy)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::money::Money;

// =============================================================================
// Movement Direction
// =============================================================================

/// Direction of a stock movement: into or out of inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum MovementDirection {
    /// Stock received (purchase, customer return, restock, revert of a sale).
    In,
    /// Stock removed (sale, damage/loss adjustment, purchase void).
    Out,
}

impl MovementDirection {
    /// Signed contribution of one unit in this direction to the stock counter.
    #[inline]
    pub const fn sign(self) -> i64 {
        match self {
            MovementDirection::In => 1,
            MovementDirection::Out => -1,
        }
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How a sale was paid. `Credit` sales accrue on the customer's balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Card payment on an external terminal.
    Card,
    /// On account: the total is added to the customer's credit balance.
    Credit,
}

impl PaymentMethod {
    /// Whether this method settles against a customer's credit balance.
    #[inline]
    pub const fn is_credit(self) -> bool {
        matches!(self, PaymentMethod::Credit)
    }
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

// =============================================================================
// Sale Status
// =============================================================================

/// The status of a sale with respect to returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    /// Sale completed, nothing returned.
    Completed,
    /// Some items returned, returned amount below the sale total.
    PartiallyReturned,
    /// Returned amount reached (or exceeded) the sale total.
    Returned,
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::Completed
    }
}

impl SaleStatus {
    /// Derives the status from cumulative returned amount vs the total.
    pub fn from_amounts(returned: Money, total: Money) -> Self {
        if returned >= total && returned.is_positive() {
            SaleStatus::Returned
        } else if returned.is_positive() {
            SaleStatus::PartiallyReturned
        } else {
            SaleStatus::Completed
        }
    }
}

// =============================================================================
// Stock Adjustment Kind
// =============================================================================

/// Reason category for a manual outbound stock adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdjustmentKind {
    Damage,
    Expired,
    Lost,
    Theft,
}

impl fmt::Display for AdjustmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AdjustmentKind::Damage => "Damage",
            AdjustmentKind::Expired => "Expired",
            AdjustmentKind::Lost => "Lost",
            AdjustmentKind::Theft => "Theft",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: i64,
    /// Display name shown to cashier and on receipts.
    pub name: String,
    /// Business identifier, unique across products.
    pub barcode: String,
    /// Selling price in cents.
    pub price_cents: i64,
    /// Weighted-average unit cost in cents (see [`crate::costing`]).
    pub cost_cents: i64,
    /// Current stock counter, denormalized from the movement ledger.
    /// May go negative: checkout deliberately permits overselling.
    pub stock: i64,
    /// Reorder threshold for low-stock reporting.
    pub min_stock: i64,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Returns the selling price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Returns the unit cost as Money.
    #[inline]
    pub fn cost(&self) -> Money {
        Money::from_cents(self.cost_cents)
    }

    /// Whether the stock counter is at or below the reorder threshold.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer who may buy on credit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// Amount currently owed from credit sales, net of payments and
    /// returns. Kept ≥ 0 by the reconciler's clamp-always policy.
    pub credit_balance_cents: i64,
}

// =============================================================================
// Supplier
// =============================================================================

/// A supplier that purchases are received from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Supplier {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

// =============================================================================
// Sale
// =============================================================================

/// A committed sale transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: i64,
    /// Unique, monotonically increasing, human-readable identifier
    /// (`INV-00001`, `INV-00002`, ...). Never reused, even after deletion.
    pub invoice_no: String,
    /// Σ(item subtotals) + tax − discount.
    pub total_cents: i64,
    pub tax_cents: i64,
    pub discount_cents: i64,
    pub payment_method: PaymentMethod,
    pub status: SaleStatus,
    /// Cumulative amount refunded through returns.
    pub returned_cents: i64,
    pub customer_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn returned_amount(&self) -> Money {
        Money::from_cents(self.returned_cents)
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line item in a sale. The unit price is frozen at checkout time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleItem {
    pub id: i64,
    pub sale_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    /// Unit price in cents at time of sale (frozen).
    pub price_cents: i64,
    /// price × quantity.
    pub subtotal_cents: i64,
    /// Units returned so far; never exceeds `quantity`.
    pub returned_quantity: i64,
}

impl SaleItem {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Units still eligible for return.
    #[inline]
    pub fn available_to_return(&self) -> i64 {
        self.quantity - self.returned_quantity
    }
}

// =============================================================================
// Purchase
// =============================================================================

/// A supplier receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Purchase {
    pub id: i64,
    pub supplier_id: i64,
    /// Σ(item subtotals).
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl Purchase {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A line item in a purchase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PurchaseItem {
    pub id: i64,
    pub purchase_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    /// Unit cost paid to the supplier, in cents.
    pub cost_cents: i64,
    /// cost × quantity.
    pub subtotal_cents: i64,
}

// =============================================================================
// Stock Movement
// =============================================================================

/// An immutable ledger entry recording a stock change and its cause.
///
/// Movements are append-only: they are never mutated or deleted. Undoing
/// an operation writes a compensating movement instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockMovement {
    pub id: i64,
    pub product_id: i64,
    pub direction: MovementDirection,
    /// Always positive; the direction carries the sign.
    pub quantity: i64,
    /// Human-readable cause, e.g. `"Sale #INV-00001"`, `"Purchase #12"`.
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Audit Entry
// =============================================================================

/// A row in the audit trail. Write-only from the other components'
/// perspective; every mutating operation records one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AuditEntry {
    pub id: i64,
    /// Action tag, e.g. `SALE_CREATE`, `PURCHASE_DELETE`, `CREDIT_CLAMPED`.
    pub action: String,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

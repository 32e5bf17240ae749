//! # tally-db: Storage & Transaction Layer for Tally POS
//!
//! SQLite persistence and cross-entity orchestration. Everything stateful
//! lives here; the business math lives in tally-core.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally POS Data Flow                              │
//! │                                                                         │
//! │  Caller (UI / API boundary, out of scope)                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tally-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │  Transaction managers            Shared components              │   │
//! │  │  ┌──────────────────┐            ┌──────────────────┐          │   │
//! │  │  │   SaleManager    │──────────► │   StockLedger    │          │   │
//! │  │  │ PurchaseManager  │──────────► │ CreditReconciler │          │   │
//! │  │  │ InventoryManager │──────────► │    AuditTrail    │          │   │
//! │  │  └──────────────────┘            └──────────────────┘          │   │
//! │  │           │                               │                     │   │
//! │  │           └───────────┬───────────────────┘                     │   │
//! │  │                       ▼                                         │   │
//! │  │        one SQLite transaction per operation                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database (WAL mode, foreign keys on)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database and store error types
//! - [`repository`] - Plain CRUD (product, customer, supplier)
//! - [`ledger`] - Append-only stock movement ledger + reconciliation
//! - [`audit`] - Audit trail
//! - [`credit`] - Customer credit reconciler (clamp-always)
//! - [`invoice`] - Invoice number allocation against the sales table
//! - [`sales`] - Sale lifecycle: checkout, edit, return, delete
//! - [`purchases`] - Purchase lifecycle: create, edit, void
//! - [`inventory`] - Manual stock adjustments and restocks
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_db::{Database, DbConfig};
//! use tally_db::sales::{CartLine, CheckoutRequest};
//! use tally_core::PaymentMethod;
//!
//! let db = Database::new(DbConfig::new("path/to/tally.db")).await?;
//!
//! let receipt = db.sales().checkout(CheckoutRequest {
//!     items: vec![CartLine { product_id: 1, quantity: 2, price_cents: None }],
//!     tax_cents: 0,
//!     discount_cents: 0,
//!     payment_method: PaymentMethod::Cash,
//!     customer_id: None,
//! }).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod audit;
pub mod credit;
pub mod error;
pub mod inventory;
pub mod invoice;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod purchases;
pub mod repository;
pub mod sales;

#[cfg(test)]
pub(crate) mod testutil;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, StoreError, StoreResult};
pub use pool::{Database, DbConfig};

// Component re-exports for convenience
pub use audit::AuditTrail;
pub use credit::CreditReconciler;
pub use inventory::InventoryManager;
pub use ledger::StockLedger;
pub use purchases::PurchaseManager;
pub use repository::customer::CustomerRepository;
pub use repository::product::ProductRepository;
pub use repository::supplier::SupplierRepository;
pub use sales::SaleManager;

//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                      │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── StoreError       - CoreError | DbError at the component surface   │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → StoreError → caller               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (barcode, invoice, id, counts)
//! 3. Errors are enum variants, never String
//! 4. Conflict errors leave the store untouched: they are raised before
//!    any write, or the surrounding transaction rolls back

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic failures.
/// Raising one of them aborts the whole operation; no partial effect is
/// ever visible.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced entity does not exist.
    ///
    /// ## When This Occurs
    /// - Cart references a product id that was deleted
    /// - Editing/returning/deleting a sale by an unknown id
    /// - Credit operation names an unknown customer
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// Insufficient stock to complete the operation.
    ///
    /// ## When This Occurs
    /// - Sale edit increases a line's quantity beyond available stock
    /// - Manual adjustment removes more than is on hand
    ///
    /// Note: plain checkout does NOT raise this - overselling at the till
    /// is allowed and the stock counter goes negative.
    #[error("Insufficient stock for {name}: available {available}, requested {requested}")]
    InsufficientStock {
        name: String,
        available: i64,
        requested: i64,
    },

    /// Return quantity exceeds what is still returnable on a line.
    ///
    /// ## When This Occurs
    /// - quantity requested > quantity sold − quantity already returned
    ///
    /// Raised during pre-validation, before any line of the return is
    /// applied, so a bad line rejects the whole return.
    #[error(
        "Invalid return for {name}: {requested} requested, only {returnable} returnable"
    )]
    InvalidReturnQuantity {
        name: String,
        requested: i64,
        returnable: i64,
    },

    /// Editing a sale that already has returns posted against it.
    ///
    /// Edit replaces the item rows wholesale; the replacements would
    /// carry `returned_quantity = 0` and let returned units be returned
    /// again, so such sales are frozen except for further returns or
    /// deletion.
    #[error("Cannot edit {invoice_no}: {returned_cents} cents already returned against it")]
    EditAfterReturn {
        invoice_no: String,
        returned_cents: i64,
    },

    /// Debt payment exceeds the customer's outstanding balance.
    #[error("Payment {payment_cents} exceeds outstanding balance {balance_cents}")]
    PaymentExceedsBalance {
        payment_cents: i64,
        balance_cents: i64,
    },

    /// The stock counter disagrees with the movement ledger.
    ///
    /// Returned by reconciliation; indicates a bug or out-of-band write,
    /// never a normal outcome.
    #[error(
        "Stock mismatch for product {product_id}: counter {stock}, ledger sum {ledger_sum}"
    )]
    ConsistencyFailure {
        product_id: i64,
        stock: i64,
        ledger_sum: i64,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustBeNonNegative { field: String },

    /// Invalid format (e.g., malformed barcode).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A cart or receipt has no lines.
    #[error("{field} must contain at least one item")]
    Empty { field: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

//! # Invoice Number Allocation
//!
//! Reads the latest sale inside the checkout transaction and asks
//! tally-core for the next number.
//!
//! ## Concurrency
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Two checkouts racing:                                                   │
//! │                                                                         │
//! │  T1: read latest → INV-00041 → next = INV-00042 → INSERT ... COMMIT ✓  │
//! │  T2: read latest → INV-00041 → next = INV-00042 → INSERT ✗             │
//! │                                                                         │
//! │  The UNIQUE index on sales.invoice_no rejects T2's insert; its whole   │
//! │  transaction rolls back. No duplicate ever becomes visible.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::SqliteConnection;

use crate::error::StoreResult;
use tally_core::invoice::next_invoice_number;

/// Computes the next invoice number from the sales table.
///
/// Must be called inside the transaction that inserts the sale, so the
/// UNIQUE constraint can arbitrate concurrent allocations.
pub async fn next_invoice(conn: &mut SqliteConnection) -> StoreResult<String> {
    let last: Option<(i64, String)> =
        sqlx::query_as("SELECT id, invoice_no FROM sales ORDER BY id DESC LIMIT 1")
            .fetch_optional(&mut *conn)
            .await?;

    Ok(next_invoice_number(
        last.as_ref().map(|(id, no)| (*id, no.as_str())),
    ))
}

// =============================================================================
// Unit Tests
// =============================================================================

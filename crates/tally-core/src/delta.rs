//! # Edit Deltas
//!
//! Per-product quantity deltas between a sale's old items and its
//! replacement items. Sale edits apply ONLY these deltas to stock
//! instead of reverting everything and re-selling, so editing a sale
//! to itself touches nothing.
//!
//! ## Why Deltas
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Old sale:  A×5, B×2          New sale:  A×3, C×1                       │
//! │                                                                         │
//! │  revert-and-reapply:   A +5, B +2, A −3, C −1   (4 movements,           │
//! │                        A churns through +5/−3)                          │
//! │                                                                         │
//! │  delta strategy:       A +2, B +2, C −1         (3 movements,           │
//! │                        identical edit → 0 movements)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sign convention: `delta` is the change to STOCK. Reducing a line's
//! sold quantity puts units back (positive delta); increasing it takes
//! units out (negative delta).

use std::collections::BTreeMap;

/// The stock change for one product implied by a sale edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockDelta {
    pub product_id: i64,
    /// Positive: units return to stock. Negative: units leave stock.
    pub delta: i64,
}

/// Computes per-product stock deltas between old and new sale lines.
///
/// Lines are `(product_id, quantity)` pairs; duplicate product ids on
/// either side are summed. Products whose net change is zero are
/// omitted. Output is ordered by product id so movement rows are
/// written deterministically.
///
/// ## Example
/// ```rust
/// use tally_core::delta::{stock_deltas, StockDelta};
///
/// let old = [(1, 5), (2, 2)];
/// let new = [(1, 3), (3, 1)];
/// assert_eq!(
///     stock_deltas(&old, &new),
///     vec![
///         StockDelta { product_id: 1, delta: 2 },  // sold 2 fewer → back in
///         StockDelta { product_id: 2, delta: 2 },  // line removed → back in
///         StockDelta { product_id: 3, delta: -1 }, // new line → out
///     ]
/// );
/// ```
pub fn stock_deltas(old: &[(i64, i64)], new: &[(i64, i64)]) -> Vec<StockDelta> {
    // BTreeMap keeps the output ordered by product id.
    let mut net: BTreeMap<i64, i64> = BTreeMap::new();

    for &(product_id, qty) in old {
        *net.entry(product_id).or_insert(0) += qty;
    }
    for &(product_id, qty) in new {
        *net.entry(product_id).or_insert(0) -= qty;
    }

    net.into_iter()
        .filter(|&(_, delta)| delta != 0)
        .map(|(product_id, delta)| StockDelta { product_id, delta })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

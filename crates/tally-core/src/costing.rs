//! # Weighted-Average Costing
//!
//! Inventory valuation: every purchase receipt re-blends the product's
//! unit cost with the incoming batch.
//!
//! ## The Blend
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  WEIGHTED AVERAGE ON RECEIPT                                            │
//! │                                                                         │
//! │  On hand: 10 units @ 100.00          ┐                                  │
//! │  Receive:  5 units @ 130.00          ├─► value = 10·10000 + 5·13000     │
//! │                                      ┘         = 165000 cents           │
//! │                                                                         │
//! │  new cost = 165000 / 15 = 11000 cents (110.00)                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Irreversibility
//!
//! The blend is LOSSY. Once two batches are averaged, the original batch
//! costs are gone from the product row; voiding or editing the purchase
//! later restores stock quantities but the cost stays blended. Callers
//! that need the pre-blend cost must capture it before calling in here.
//!
//! ## Edge Cases
//! - stock ≤ 0 on hand: the incoming batch cost simply becomes the cost
//!   (averaging against negative stock would produce nonsense)
//! - intermediate math is i128, so qty·cost products cannot overflow
//! - division rounds half up, away from zero is irrelevant here since
//!   all inputs are non-negative

use crate::money::Money;

/// Computes the new weighted-average unit cost after receiving a batch.
///
/// ## Arguments
/// * `stock` - units currently on hand (may be zero or negative)
/// * `cost` - current weighted-average unit cost
/// * `qty` - units in the incoming batch, must be > 0 (caller validates)
/// * `unit_cost` - unit cost of the incoming batch
///
/// ## Example
/// ```rust
/// use tally_core::costing::blended_unit_cost;
/// use tally_core::Money;
///
/// let new_cost = blended_unit_cost(
///     10,
///     Money::from_cents(10000),
///     5,
///     Money::from_cents(13000),
/// );
/// assert_eq!(new_cost.cents(), 11000);
/// ```
pub fn blended_unit_cost(stock: i64, cost: Money, qty: i64, unit_cost: Money) -> Money {
    if stock <= 0 {
        return unit_cost;
    }

    let on_hand_value = stock as i128 * cost.cents() as i128;
    let batch_value = qty as i128 * unit_cost.cents() as i128;
    let total_qty = stock as i128 + qty as i128;

    // Round half up.
    let blended = (on_hand_value + batch_value + total_qty / 2) / total_qty;

    Money::from_cents(blended as i64)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blend_two_batches() {
        // 10 @ 100.00 + 5 @ 130.00 = 15 units worth 1650.00
        let cost = blended_unit_cost(10, Money::from_cents(10000), 5, Money::from_cents(13000));
        assert_eq!(cost.cents(), 11000);
    }

    #[test]
    fn test_empty_stock_takes_batch_cost() {
        let cost = blended_unit_cost(0, Money::from_cents(10000), 5, Money::from_cents(13000));
        assert_eq!(cost.cents(), 13000);
    }

    #[test]
    fn test_negative_stock_takes_batch_cost() {
        // Oversold product: averaging against negative stock is meaningless.
        let cost = blended_unit_cost(-3, Money::from_cents(10000), 5, Money::from_cents(13000));
        assert_eq!(cost.cents(), 13000);
    }

    #[test]
    fn test_rounding_half_up() {
        // 1 @ 1 cent + 2 @ 2 cents = 5/3 = 1.67 → 2
        let cost = blended_unit_cost(1, Money::from_cents(1), 2, Money::from_cents(2));
        assert_eq!(cost.cents(), 2);

        // 2 @ 1 cent + 1 @ 2 cents = 4/3 = 1.33 → 1
        let cost = blended_unit_cost(2, Money::from_cents(1), 1, Money::from_cents(2));
        assert_eq!(cost.cents(), 1);
    }

    #[test]
    fn test_same_cost_is_fixed_point() {
        let cost = blended_unit_cost(100, Money::from_cents(750), 37, Money::from_cents(750));
        assert_eq!(cost.cents(), 750);
    }

    #[test]
    fn test_no_overflow_on_large_values() {
        // Near-i64 quantities and costs must not overflow the intermediate.
        let cost = blended_unit_cost(
            1_000_000,
            Money::from_cents(9_000_000_000),
            1_000_000,
            Money::from_cents(1_000_000_000),
        );
        assert_eq!(cost.cents(), 5_000_000_000);
    }

    #[test]
    fn test_blend_is_irreversible() {
        // Blending then "removing" the batch does not restore the old cost;
        // documented behavior, not a bug.
        let original = Money::from_cents(10000);
        let blended = blended_unit_cost(10, original, 5, Money::from_cents(13000));
        assert_ne!(blended, original);
        // There is no inverse call; the cost stays at the blended value.
    }
}

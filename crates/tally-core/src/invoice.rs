//! # Invoice Numbering
//!
//! Pure generation/parsing logic for human-readable invoice numbers.
//! The database side (reading the latest sale inside the checkout
//! transaction) lives in tally-db; this module only decides what the
//! next number is.
//!
//! ## Scheme
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  INV-00001, INV-00002, ... INV-99999, INV-100000, ...                  │
//! │                                                                         │
//! │  - zero-padded to 5 digits, grows naturally past 99999                 │
//! │  - strictly increasing in sale id order                                 │
//! │  - NEVER reused: deleting a sale leaves a gap, the next invoice         │
//! │    continues from the highest ever issued (latest sale row)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Legacy Fallback
//!
//! Databases migrated from the old system can hold timestamp-style
//! invoice numbers (e.g. `INV-20240115103000`) or free-form text. A
//! suffix that fails to parse, or parses above
//! [`LEGACY_INVOICE_SUFFIX_THRESHOLD`](crate::LEGACY_INVOICE_SUFFIX_THRESHOLD),
//! is never incremented directly; numbering falls back to
//! `last sale id + 1`, which is still unique and increasing because row
//! ids are AUTOINCREMENT.

use crate::LEGACY_INVOICE_SUFFIX_THRESHOLD;

/// Prefix carried by every generated invoice number.
pub const INVOICE_PREFIX: &str = "INV-";

/// Computes the next invoice number from the latest sale on record.
///
/// ## Arguments
/// * `last` - `(id, invoice_no)` of the most recent sale (highest id),
///   or `None` when no sales exist yet.
///
/// ## Example
/// ```rust
/// use tally_core::invoice::next_invoice_number;
///
/// assert_eq!(next_invoice_number(None), "INV-00001");
/// assert_eq!(next_invoice_number(Some((7, "INV-00007"))), "INV-00008");
/// // Legacy timestamp-style number: fall back to id + 1.
/// assert_eq!(
///     next_invoice_number(Some((42, "INV-20240115103000"))),
///     "INV-00043"
/// );
/// ```
pub fn next_invoice_number(last: Option<(i64, &str)>) -> String {
    let next = match last {
        None => 1,
        Some((last_id, invoice_no)) => match parse_suffix(invoice_no) {
            Some(n) if n <= LEGACY_INVOICE_SUFFIX_THRESHOLD => n + 1,
            _ => last_id + 1,
        },
    };
    format!("{INVOICE_PREFIX}{next:05}")
}

/// Extracts the numeric suffix of an `INV-` invoice number.
///
/// Returns `None` for numbers without the prefix, with a non-numeric
/// suffix, or with a suffix too large for i64.
pub fn parse_suffix(invoice_no: &str) -> Option<i64> {
    let digits = invoice_no.strip_prefix(INVOICE_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<i64>().ok()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_invoice() {
        assert_eq!(next_invoice_number(None), "INV-00001");
    }

    #[test]
    fn test_sequential_increment() {
        assert_eq!(next_invoice_number(Some((1, "INV-00001"))), "INV-00002");
        assert_eq!(next_invoice_number(Some((41, "INV-00041"))), "INV-00042");
    }

    #[test]
    fn test_growth_past_padding() {
        // Padding is a floor, not a ceiling.
        assert_eq!(next_invoice_number(Some((99999, "INV-99999"))), "INV-100000");
        assert_eq!(
            next_invoice_number(Some((100000, "INV-100000"))),
            "INV-100001"
        );
    }

    #[test]
    fn test_legacy_timestamp_falls_back_to_id() {
        assert_eq!(
            next_invoice_number(Some((42, "INV-20240115103000"))),
            "INV-00043"
        );
    }

    #[test]
    fn test_unparseable_falls_back_to_id() {
        assert_eq!(next_invoice_number(Some((7, "TICKET-9"))), "INV-00008");
        assert_eq!(next_invoice_number(Some((7, "INV-"))), "INV-00008");
        assert_eq!(next_invoice_number(Some((7, "INV-12a4"))), "INV-00008");
    }

    #[test]
    fn test_parse_suffix() {
        assert_eq!(parse_suffix("INV-00042"), Some(42));
        assert_eq!(parse_suffix("INV-100001"), Some(100001));
        assert_eq!(parse_suffix("INV-"), None);
        assert_eq!(parse_suffix("INV-12a4"), None);
        assert_eq!(parse_suffix("42"), None);
    }

    #[test]
    fn test_threshold_boundary() {
        let at = format!("INV-{LEGACY_INVOICE_SUFFIX_THRESHOLD}");
        assert_eq!(
            next_invoice_number(Some((3, &at))),
            format!("INV-{:05}", LEGACY_INVOICE_SUFFIX_THRESHOLD + 1)
        );

        let above = format!("INV-{}", LEGACY_INVOICE_SUFFIX_THRESHOLD + 1);
        assert_eq!(next_invoice_number(Some((3, &above))), "INV-00004");
    }
}

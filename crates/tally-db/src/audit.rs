//! # Audit Trail
//!
//! Write-only log of every mutating operation. Managers record an entry
//! inside the same transaction as the operation itself, so an entry
//! exists exactly when the operation committed.
//!
//! ## Action Vocabulary
//! ```text
//! SALE_CREATE      SALE_EDIT       SALE_RETURN     SALE_DELETE
//! PURCHASE_CREATE  PURCHASE_EDIT   PURCHASE_DELETE
//! STOCK_ADJUST     RESTOCK
//! CREDIT_PAYMENT   CREDIT_CLAMPED
//! ```
//!
//! `CREDIT_CLAMPED` is the odd one out: it records that a balance
//! adjustment was capped at zero, i.e. money the books silently forgave.
//! It exists so that data never disappears without trace.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};

use crate::error::StoreResult;
use tally_core::AuditEntry;

// =============================================================================
// Action Tags
// =============================================================================

/// Audit action tags. Kept as constants so typos fail at compile time.
pub mod actions {
    pub const SALE_CREATE: &str = "SALE_CREATE";
    pub const SALE_EDIT: &str = "SALE_EDIT";
    pub const SALE_RETURN: &str = "SALE_RETURN";
    pub const SALE_DELETE: &str = "SALE_DELETE";
    pub const PURCHASE_CREATE: &str = "PURCHASE_CREATE";
    pub const PURCHASE_EDIT: &str = "PURCHASE_EDIT";
    pub const PURCHASE_DELETE: &str = "PURCHASE_DELETE";
    pub const STOCK_ADJUST: &str = "STOCK_ADJUST";
    pub const RESTOCK: &str = "RESTOCK";
    pub const CREDIT_PAYMENT: &str = "CREDIT_PAYMENT";
    pub const CREDIT_CLAMPED: &str = "CREDIT_CLAMPED";
}

// =============================================================================
// Audit Trail
// =============================================================================

/// The audit trail. Writes take a connection so they join the caller's
/// transaction; reads run on the pool.
#[derive(Debug, Clone)]
pub struct AuditTrail {
    pool: SqlitePool,
}

impl AuditTrail {
    /// Creates a new AuditTrail.
    pub fn new(pool: SqlitePool) -> Self {
        AuditTrail { pool }
    }

    /// Records an audit entry inside the caller's transaction.
    pub async fn record(
        conn: &mut SqliteConnection,
        action: &str,
        details: &str,
    ) -> StoreResult<()> {
        sqlx::query("INSERT INTO audit_log (action, details, created_at) VALUES (?1, ?2, ?3)")
            .bind(action)
            .bind(details)
            .bind(Utc::now())
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Returns the most recent audit entries, newest first.
    pub async fn recent(&self, limit: u32) -> StoreResult<Vec<AuditEntry>> {
        let entries = sqlx::query_as::<_, AuditEntry>(
            "SELECT id, action, details, created_at FROM audit_log ORDER BY id DESC LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Returns recent entries for one action tag, newest first.
    pub async fn recent_for_action(&self, action: &str, limit: u32) -> StoreResult<Vec<AuditEntry>> {
        let entries = sqlx::query_as::<_, AuditEntry>(
            "SELECT id, action, details, created_at FROM audit_log \
             WHERE action = ?1 ORDER BY id DESC LIMIT ?2",
        )
        .bind(action)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::test_db;

    #[tokio::test]
    async fn test_record_and_read_back() {
        let db = test_db().await;

        let mut tx = db.pool().begin().await.unwrap();
        AuditTrail::record(&mut tx, actions::RESTOCK, "product 1: +5")
            .await
            .unwrap();
        AuditTrail::record(&mut tx, actions::SALE_CREATE, "INV-00001")
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let entries = db.audit().recent(10).await.unwrap();
        assert_eq!(entries.len(), 2);
        // Newest first.
        assert_eq!(entries[0].action, actions::SALE_CREATE);
        assert_eq!(entries[1].action, actions::RESTOCK);
        assert_eq!(entries[1].details.as_deref(), Some("product 1: +5"));
    }

    #[tokio::test]
    async fn test_rollback_discards_entry() {
        let db = test_db().await;

        let mut tx = db.pool().begin().await.unwrap();
        AuditTrail::record(&mut tx, actions::SALE_CREATE, "INV-00001")
            .await
            .unwrap();
        drop(tx); // rollback

        assert!(db.audit().recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_filter_by_action() {
        let db = test_db().await;

        let mut tx = db.pool().begin().await.unwrap();
        AuditTrail::record(&mut tx, actions::RESTOCK, "a").await.unwrap();
        AuditTrail::record(&mut tx, actions::SALE_CREATE, "b").await.unwrap();
        AuditTrail::record(&mut tx, actions::RESTOCK, "c").await.unwrap();
        tx.commit().await.unwrap();

        let restocks = db
            .audit()
            .recent_for_action(actions::RESTOCK, 10)
            .await
            .unwrap();
        assert_eq!(restocks.len(), 2);
        assert!(restocks.iter().all(|e| e.action == actions::RESTOCK));
    }
}

//! # Credit Reconciler
//!
//! The ONLY writer of `customers.credit_balance_cents`. Credit sales,
//! returns, edits, deletions, and debt payments all funnel their balance
//! changes through here.
//!
//! ## Clamp-Always Policy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  A balance can never go negative. When an adjustment would push it      │
//! │  below zero (e.g. refunding a credit sale after the customer already   │
//! │  paid it off), the balance floors at zero and the swallowed amount     │
//! │  is recorded:                                                           │
//! │                                                                         │
//! │     balance 300, adjust −1000  →  balance 0                            │
//! │                                   audit: CREDIT_CLAMPED, 700 forgiven  │
//! │                                   tracing: warn!                        │
//! │                                                                         │
//! │  The store never tracks money it owes the customer; that difference    │
//! │  is settled at the till, outside the books.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{SqliteConnection, SqlitePool};
use tracing::{info, warn};

use crate::audit::{actions, AuditTrail};
use crate::error::{StoreError, StoreResult};
use tally_core::validation::validate_money_positive;
use tally_core::{CoreError, Money};

// =============================================================================
// Outcome Types
// =============================================================================

/// Result of a balance adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreditAdjustment {
    /// Balance after the adjustment (≥ 0).
    pub balance: Money,
    /// Amount the zero floor swallowed; zero when no clamping happened.
    pub forgiven: Money,
}

// =============================================================================
// Credit Reconciler
// =============================================================================

/// Customer credit balance reconciler.
///
/// [`Self::adjust`] joins the caller's transaction; [`Self::pay_debt`]
/// owns its own.
#[derive(Debug, Clone)]
pub struct CreditReconciler {
    pool: SqlitePool,
}

impl CreditReconciler {
    /// Creates a new CreditReconciler.
    pub fn new(pool: SqlitePool) -> Self {
        CreditReconciler { pool }
    }

    /// Adjusts a customer's balance by a signed delta, flooring at zero.
    ///
    /// Positive deltas accrue debt (credit sale), negative deltas reduce
    /// it (return, payment, sale deletion). When the floor bites, a
    /// `CREDIT_CLAMPED` audit entry records the forgiven amount inside
    /// the same transaction.
    pub async fn adjust(
        conn: &mut SqliteConnection,
        customer_id: i64,
        delta: Money,
    ) -> StoreResult<CreditAdjustment> {
        let balance: Option<i64> =
            sqlx::query_scalar("SELECT credit_balance_cents FROM customers WHERE id = ?1")
                .bind(customer_id)
                .fetch_optional(&mut *conn)
                .await?;

        let balance = Money::from_cents(balance.ok_or(StoreError::Core(CoreError::NotFound {
            entity: "customer",
            id: customer_id,
        }))?);

        let unclamped = balance + delta;
        let new_balance = unclamped.clamp_at_zero();
        let forgiven = new_balance - unclamped; // ≥ 0, the swallowed amount

        sqlx::query("UPDATE customers SET credit_balance_cents = ?1 WHERE id = ?2")
            .bind(new_balance.cents())
            .bind(customer_id)
            .execute(&mut *conn)
            .await?;

        if forgiven.is_positive() {
            warn!(
                customer_id,
                %delta,
                %balance,
                %forgiven,
                "Credit adjustment clamped at zero"
            );
            AuditTrail::record(
                conn,
                actions::CREDIT_CLAMPED,
                &format!(
                    "customer {customer_id}: balance {balance} adjusted by {delta}, {forgiven} forgiven"
                ),
            )
            .await?;
        }

        Ok(CreditAdjustment {
            balance: new_balance,
            forgiven,
        })
    }

    /// Records a debt payment against a customer's balance.
    ///
    /// The payment must be positive and must not exceed the outstanding
    /// balance: unlike internal adjustments, a cashier typing too large
    /// an amount is an input error, not something to forgive silently.
    pub async fn pay_debt(&self, customer_id: i64, amount: Money) -> StoreResult<Money> {
        validate_money_positive("payment", amount.cents())?;

        let mut tx = self.pool.begin().await?;

        let balance: Option<i64> =
            sqlx::query_scalar("SELECT credit_balance_cents FROM customers WHERE id = ?1")
                .bind(customer_id)
                .fetch_optional(&mut *tx)
                .await?;

        let balance = Money::from_cents(balance.ok_or(StoreError::Core(CoreError::NotFound {
            entity: "customer",
            id: customer_id,
        }))?);

        if amount > balance {
            return Err(StoreError::Core(CoreError::PaymentExceedsBalance {
                payment_cents: amount.cents(),
                balance_cents: balance.cents(),
            }));
        }

        let outcome = Self::adjust(&mut tx, customer_id, -amount).await?;

        AuditTrail::record(
            &mut tx,
            actions::CREDIT_PAYMENT,
            &format!("customer {customer_id}: paid {amount}, balance {}", outcome.balance),
        )
        .await?;

        tx.commit().await?;

        info!(customer_id, %amount, balance = %outcome.balance, "Debt payment recorded");
        Ok(outcome.balance)
    }

    /// Returns a customer's current balance.
    pub async fn balance(&self, customer_id: i64) -> StoreResult<Money> {
        let balance: Option<i64> =
            sqlx::query_scalar("SELECT credit_balance_cents FROM customers WHERE id = ?1")
                .bind(customer_id)
                .fetch_optional(&self.pool)
                .await?;

        balance
            .map(Money::from_cents)
            .ok_or(StoreError::Core(CoreError::NotFound {
                entity: "customer",
                id: customer_id,
            }))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{seed_customer, test_db};

    #[tokio::test]
    async fn test_adjust_accrues_and_reduces() {
        let db = test_db().await;
        let customer_id = seed_customer(&db, "Ali").await;

        let mut tx = db.pool().begin().await.unwrap();
        let outcome = CreditReconciler::adjust(&mut tx, customer_id, Money::from_cents(1500))
            .await
            .unwrap();
        assert_eq!(outcome.balance.cents(), 1500);
        assert!(outcome.forgiven.is_zero());

        let outcome = CreditReconciler::adjust(&mut tx, customer_id, Money::from_cents(-500))
            .await
            .unwrap();
        assert_eq!(outcome.balance.cents(), 1000);
        tx.commit().await.unwrap();

        assert_eq!(db.credit().balance(customer_id).await.unwrap().cents(), 1000);
    }

    #[tokio::test]
    async fn test_adjust_clamps_and_audits() {
        let db = test_db().await;
        let customer_id = seed_customer(&db, "Ali").await;

        let mut tx = db.pool().begin().await.unwrap();
        CreditReconciler::adjust(&mut tx, customer_id, Money::from_cents(300))
            .await
            .unwrap();
        let outcome = CreditReconciler::adjust(&mut tx, customer_id, Money::from_cents(-1000))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert!(outcome.balance.is_zero());
        assert_eq!(outcome.forgiven.cents(), 700);

        let clamps = db
            .audit()
            .recent_for_action(actions::CREDIT_CLAMPED, 10)
            .await
            .unwrap();
        assert_eq!(clamps.len(), 1);
        assert!(clamps[0].details.as_deref().unwrap().contains("7.00 forgiven"));
    }

    #[tokio::test]
    async fn test_adjust_unknown_customer() {
        let db = test_db().await;

        let mut tx = db.pool().begin().await.unwrap();
        let err = CreditReconciler::adjust(&mut tx, 42, Money::from_cents(100))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Core(CoreError::NotFound { entity: "customer", id: 42 })
        ));
    }

    #[tokio::test]
    async fn test_pay_debt() {
        let db = test_db().await;
        let customer_id = seed_customer(&db, "Ali").await;

        let mut tx = db.pool().begin().await.unwrap();
        CreditReconciler::adjust(&mut tx, customer_id, Money::from_cents(2000))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let balance = db
            .credit()
            .pay_debt(customer_id, Money::from_cents(1200))
            .await
            .unwrap();
        assert_eq!(balance.cents(), 800);

        let payments = db
            .audit()
            .recent_for_action(actions::CREDIT_PAYMENT, 10)
            .await
            .unwrap();
        assert_eq!(payments.len(), 1);
    }

    #[tokio::test]
    async fn test_pay_debt_rejects_overpayment_and_non_positive() {
        let db = test_db().await;
        let customer_id = seed_customer(&db, "Ali").await;

        let mut tx = db.pool().begin().await.unwrap();
        CreditReconciler::adjust(&mut tx, customer_id, Money::from_cents(500))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let err = db
            .credit()
            .pay_debt(customer_id, Money::from_cents(600))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Core(CoreError::PaymentExceedsBalance { .. })
        ));

        assert!(db.credit().pay_debt(customer_id, Money::zero()).await.is_err());
        assert!(db
            .credit()
            .pay_debt(customer_id, Money::from_cents(-100))
            .await
            .is_err());

        // Balance untouched by the failed attempts.
        assert_eq!(db.credit().balance(customer_id).await.unwrap().cents(), 500);
    }
}

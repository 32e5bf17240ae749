//! # Customer Repository
//!
//! Database operations for customers. Balances are NOT written here;
//! every balance change goes through [`crate::credit::CreditReconciler`].

use serde::Deserialize;
use sqlx::SqlitePool;

use crate::error::{StoreError, StoreResult};
use tally_core::validation::validate_name;
use tally_core::{CoreError, Customer};

/// Input for creating a customer.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Inserts a customer with a zero balance.
    pub async fn create(&self, input: NewCustomer) -> StoreResult<Customer> {
        validate_name(&input.name)?;

        let customer = sqlx::query_as::<_, Customer>(
            "INSERT INTO customers (name, phone, address, credit_balance_cents) \
             VALUES (?1, ?2, ?3, 0) \
             RETURNING id, name, phone, address, credit_balance_cents",
        )
        .bind(input.name.trim())
        .bind(input.phone)
        .bind(input.address)
        .fetch_one(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Fetches a customer by id.
    pub async fn get_by_id(&self, id: i64) -> StoreResult<Customer> {
        let customer = sqlx::query_as::<_, Customer>(
            "SELECT id, name, phone, address, credit_balance_cents FROM customers WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        customer.ok_or(StoreError::Core(CoreError::NotFound {
            entity: "customer",
            id,
        }))
    }

    /// Lists customers ordered by name.
    pub async fn list(&self, limit: u32) -> StoreResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(
            "SELECT id, name, phone, address, credit_balance_cents \
             FROM customers ORDER BY name LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    /// Lists customers carrying outstanding debt, largest first.
    pub async fn with_outstanding_debt(&self) -> StoreResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(
            "SELECT id, name, phone, address, credit_balance_cents \
             FROM customers WHERE credit_balance_cents > 0 \
             ORDER BY credit_balance_cents DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

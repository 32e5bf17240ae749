//! # Supplier Repository
//!
//! Database operations for suppliers.

use serde::Deserialize;
use sqlx::SqlitePool;

use crate::error::{StoreError, StoreResult};
use tally_core::validation::validate_name;
use tally_core::{CoreError, Supplier};

/// Input for creating a supplier.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSupplier {
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Repository for supplier database operations.
#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
}

impl SupplierRepository {
    /// Creates a new SupplierRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SupplierRepository { pool }
    }

    /// Inserts a supplier.
    pub async fn create(&self, input: NewSupplier) -> StoreResult<Supplier> {
        validate_name(&input.name)?;

        let supplier = sqlx::query_as::<_, Supplier>(
            "INSERT INTO suppliers (name, phone, address) VALUES (?1, ?2, ?3) \
             RETURNING id, name, phone, address",
        )
        .bind(input.name.trim())
        .bind(input.phone)
        .bind(input.address)
        .fetch_one(&self.pool)
        .await?;

        Ok(supplier)
    }

    /// Fetches a supplier by id.
    pub async fn get_by_id(&self, id: i64) -> StoreResult<Supplier> {
        let supplier = sqlx::query_as::<_, Supplier>(
            "SELECT id, name, phone, address FROM suppliers WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        supplier.ok_or(StoreError::Core(CoreError::NotFound {
            entity: "supplier",
            id,
        }))
    }

    /// Lists suppliers ordered by name.
    pub async fn list(&self, limit: u32) -> StoreResult<Vec<Supplier>> {
        let suppliers = sqlx::query_as::<_, Supplier>(
            "SELECT id, name, phone, address FROM suppliers ORDER BY name LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(suppliers)
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
    async fn test_create_and_fetch() {
        let db = test_db().await;

        let supplier = db
            .suppliers()
            .create(NewSupplier {
                name: "Metro Wholesale".to_string(),
                phone: None,
                address: Some("Industrial Area".to_string()),
            })
            .await
            .unwrap();

        let fetched = db.suppliers().get_by_id(supplier.id).await.unwrap();
        assert_eq!(fetched.name, "Metro Wholesale");
    }

    #[tokio::test]
    async fn test_unknown_supplier() {
        let db = test_db().await;
        assert!(db.suppliers().get_by_id(7).await.is_err());
    }
}

//! # Finished-Goods Stock Registry
//!
//! A slim registry of products and their two stock fields. Product catalog
//! CRUD (pricing, images, descriptions) lives in the external product
//! service; the ledger only needs an identity to hang `stock_units` and
//! `stock_mass_base` on, which production credits and wastage debits.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use khata_core::ProductStock;

/// Column list shared by the product queries.
const PRODUCT_COLUMNS: &str = "id, name, stock_units, stock_mass_base, created_at, updated_at";

/// Repository for finished-goods stock.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Registers a product with zero stock.
    pub async fn create(&self, name: &str) -> DbResult<ProductStock> {
        debug!(name = %name, "Registering product stock entry");

        let now = Utc::now();
        let product = ProductStock {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            stock_units: 0.0,
            stock_mass_base: 0.0,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO products (id, name, stock_units, stock_mass_base, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.stock_units)
        .bind(product.stock_mass_base)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<ProductStock>> {
        let product = sqlx::query_as::<_, ProductStock>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists products sorted by name.
    pub async fn list(&self) -> DbResult<Vec<ProductStock>> {
        let products = sqlx::query_as::<_, ProductStock>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Fetches a product on an open connection (engine-internal).
    pub(crate) async fn fetch(
        conn: &mut SqliteConnection,
        id: &str,
    ) -> Result<Option<ProductStock>, sqlx::Error> {
        sqlx::query_as::<_, ProductStock>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await
    }

    /// Applies stock deltas on an open connection (engine-internal).
    ///
    /// Only production and wastage call this, inside their own database
    /// transaction; callers have already validated non-negativity.
    pub(crate) async fn adjust_stock(
        conn: &mut SqliteConnection,
        id: &str,
        delta_units: f64,
        delta_mass_base: f64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE products SET
                stock_units = stock_units + ?2,
                stock_mass_base = stock_mass_base + ?3,
                updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(delta_units)
        .bind(delta_mass_base)
        .bind(Utc::now())
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Deletes a product stock entry with no stock movements recorded.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_create_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db.products().create("Kaju Katli").await.unwrap();

        let loaded = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Kaju Katli");
        assert_eq!(loaded.stock_units, 0.0);
        assert_eq!(loaded.stock_mass_base, 0.0);
    }
}

//! # Recipe Table
//!
//! Per-product bill of materials: how many base units of each raw material
//! one produced unit consumes.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use khata_core::{RecipeLine, RecipeMode};

/// One line of a recipe being saved.
#[derive(Debug, Clone)]
pub struct NewRecipeLine {
    pub material_id: String,
    /// Base units consumed per produced unit.
    pub base_per_unit: f64,
    pub mode: RecipeMode,
}

/// Repository for product recipes.
#[derive(Debug, Clone)]
pub struct RecipeRepository {
    pool: SqlitePool,
}

impl RecipeRepository {
    /// Creates a new RecipeRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RecipeRepository { pool }
    }

    /// Replaces the recipe for a product.
    ///
    /// The previous lines are dropped and the given ones inserted in a
    /// single transaction. Lines with an empty material reference or a
    /// non-positive quantity are skipped rather than rejected, so a sparse
    /// form submission saves its valid rows.
    pub async fn save(
        &self,
        product_id: &str,
        lines: Vec<NewRecipeLine>,
    ) -> DbResult<Vec<RecipeLine>> {
        debug!(product_id = %product_id, lines = lines.len(), "Replacing recipe");

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM product_recipes WHERE product_id = ?1")
            .bind(product_id)
            .execute(&mut *tx)
            .await?;

        let now = Utc::now();
        for line in lines {
            if line.material_id.trim().is_empty() || line.base_per_unit <= 0.0 {
                continue;
            }
            sqlx::query(
                r#"
                INSERT INTO product_recipes (
                    id, product_id, material_id, base_per_unit, mode, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(product_id)
            .bind(&line.material_id)
            .bind(line.base_per_unit)
            .bind(line.mode)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.get(product_id).await
    }

    /// Gets the recipe lines for a product.
    pub async fn get(&self, product_id: &str) -> DbResult<Vec<RecipeLine>> {
        let lines = sqlx::query_as::<_, RecipeLine>(
            "SELECT id, product_id, material_id, base_per_unit, mode, created_at \
             FROM product_recipes WHERE product_id = ?1 ORDER BY created_at, id",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Removes the recipe for a product.
    pub async fn delete(&self, product_id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM product_recipes WHERE product_id = ?1")
            .bind(product_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Recipe", product_id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

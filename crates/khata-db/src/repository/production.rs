//! # Production Engine
//!
//! Converts raw materials into finished-goods stock according to the
//! product's recipe.
//!
//! ## Check-Then-Commit
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    produce(product, units)                              │
//! │                                                                         │
//! │  1. Load recipe rows ── none? ──► NoRecipeDefined                      │
//! │  2. Lock product + every per_unit line's material (sorted ids)         │
//! │  3. BEGIN                                                              │
//! │  4. For EVERY line: needed = base_per_unit × units                     │
//! │        stock < needed? ──► InsufficientMaterial ──► ROLLBACK           │
//! │     (no line has been touched yet: partial consumption cannot occur)   │
//! │  5. For every line: stock −= needed; append tx(production_consume)     │
//! │  6. product.stock_units += units; stock_mass_base += output mass       │
//! │     append tx(production_output, mass or 0)                            │
//! │  7. COMMIT                                                             │
//! │                                                                         │
//! │  All consume/output rows share one generated batch id in ref_id.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, LedgerResult};
use crate::locks::MaterialLocks;
use crate::repository::material::MaterialRepository;
use crate::repository::product::ProductRepository;
use crate::repository::transaction::{NewTransaction, TransactionRepository};
use khata_core::{validation, CoreError, ProductStock, RecipeLine, RecipeMode, TxKind};

/// One consumed recipe line in a production receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumedLine {
    pub material_id: String,
    pub consumed_base: f64,
}

/// Result of a successful production run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionReceipt {
    /// Batch marker shared by all ledger rows of this run.
    pub batch_id: String,
    pub units_produced: f64,
    pub output_mass_base: Option<f64>,
    /// The product with its updated stock.
    pub product: ProductStock,
    pub consumed: Vec<ConsumedLine>,
}

/// The production engine.
#[derive(Debug, Clone)]
pub struct ProductionEngine {
    pool: SqlitePool,
    locks: Arc<MaterialLocks>,
}

impl ProductionEngine {
    /// Creates a new ProductionEngine.
    pub fn new(pool: SqlitePool, locks: Arc<MaterialLocks>) -> Self {
        ProductionEngine { pool, locks }
    }

    /// Produces `units` of a product, consuming its recipe.
    ///
    /// ## Failure Modes
    /// - `InvalidUnits` - units ≤ 0 or not finite
    /// - `ProductNotFound` / `NoRecipeDefined`
    /// - `InsufficientMaterial{material_id}` - any line short; nothing is
    ///   consumed and no ledger row is appended
    pub async fn produce(
        &self,
        product_id: &str,
        units: f64,
        output_mass_base: Option<f64>,
    ) -> LedgerResult<ProductionReceipt> {
        validation::validate_units_produced(units)?;

        // Existence pre-check; the authoritative read happens again inside
        // the transaction once the locks are held.
        let exists: Option<(String,)> = sqlx::query_as("SELECT id FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)?;
        if exists.is_none() {
            return Err(CoreError::ProductNotFound(product_id.to_string()).into());
        }

        let recipe: Vec<RecipeLine> = sqlx::query_as(
            "SELECT id, product_id, material_id, base_per_unit, mode, created_at \
             FROM product_recipes WHERE product_id = ?1 ORDER BY created_at, id",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        if recipe.is_empty() {
            return Err(CoreError::NoRecipeDefined(product_id.to_string()).into());
        }

        // Only per_unit lines drive consumption; per_kg lines are stored
        // reference data for mass-based costing.
        let lines: Vec<&RecipeLine> = recipe
            .iter()
            .filter(|line| line.mode == RecipeMode::PerUnit)
            .collect();

        // The product id joins the lock set so product-stock writes are
        // serialized against wastage on the same product.
        let mut lock_ids: Vec<String> =
            lines.iter().map(|line| line.material_id.clone()).collect();
        lock_ids.push(product_id.to_string());
        let _guards = self.locks.acquire_many(&lock_ids).await;

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let _product = ProductRepository::fetch(&mut tx, product_id)
            .await
            .map_err(DbError::from)?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        // Phase 1: check every line before touching anything.
        let mut plan: Vec<(String, f64)> = Vec::with_capacity(lines.len());
        for line in &lines {
            let needed = line.base_per_unit * units;
            let material = MaterialRepository::fetch_active(&mut tx, &line.material_id)
                .await
                .map_err(DbError::from)?
                .ok_or_else(|| CoreError::MaterialNotFound(line.material_id.clone()))?;

            if material.quantity_base < needed {
                return Err(CoreError::InsufficientMaterial {
                    material_id: line.material_id.clone(),
                    available_base: material.quantity_base,
                    needed_base: needed,
                }
                .into());
            }
            plan.push((line.material_id.clone(), needed));
        }

        let batch_id = Uuid::new_v4().to_string();

        debug!(
            product_id = %product_id,
            batch_id = %batch_id,
            units,
            lines = plan.len(),
            "Production precheck passed"
        );

        // Phase 2: every line passed; apply the deductions.
        for (material_id, needed) in &plan {
            sqlx::query(
                "UPDATE raw_materials SET quantity_base = quantity_base - ?2, updated_at = ?3 \
                 WHERE id = ?1",
            )
            .bind(material_id)
            .bind(needed)
            .bind(chrono::Utc::now())
            .execute(&mut *tx)
            .await
            .map_err(DbError::from)?;

            TransactionRepository::append(
                &mut tx,
                NewTransaction {
                    kind: TxKind::ProductionConsume,
                    material_id: Some(material_id.clone()),
                    product_id: Some(product_id.to_string()),
                    delta_base: -needed,
                    note: Some(format!("Consumed for production of {units} units")),
                    reason: None,
                    ref_id: Some(batch_id.clone()),
                },
            )
            .await
            .map_err(DbError::from)?;
        }

        // Credit the finished goods.
        let mass = output_mass_base.unwrap_or(0.0);
        ProductRepository::adjust_stock(&mut tx, product_id, units, mass)
            .await
            .map_err(DbError::from)?;

        TransactionRepository::append(
            &mut tx,
            NewTransaction {
                kind: TxKind::ProductionOutput,
                material_id: None,
                product_id: Some(product_id.to_string()),
                delta_base: mass,
                note: Some(format!("Produced {units} units")),
                reason: None,
                ref_id: Some(batch_id.clone()),
            },
        )
        .await
        .map_err(DbError::from)?;

        let updated = ProductRepository::fetch(&mut tx, product_id)
            .await
            .map_err(DbError::from)?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            product_id = %product_id,
            batch_id = %batch_id,
            units,
            "Production completed"
        );

        Ok(ProductionReceipt {
            batch_id,
            units_produced: units,
            output_mass_base,
            product: updated,
            consumed: plan
                .into_iter()
                .map(|(material_id, consumed_base)| ConsumedLine {
                    material_id,
                    consumed_base,
                })
                .collect(),
        })
    }
}

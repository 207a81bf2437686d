//! # Wastage Recorder
//!
//! Stock reductions that do not arise from a sale: damage, spoilage,
//! expiry, loss. Every record carries a reason code and lands in the
//! inventory transaction ledger like any other stock change.

use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult, LedgerResult};
use crate::locks::MaterialLocks;
use crate::repository::material::MaterialRepository;
use crate::repository::product::ProductRepository;
use crate::repository::transaction::{NewTransaction, TransactionRepository};
use khata_core::{
    validation, CoreError, InventoryTransaction, TxKind, Unit, WastageReason, WASTAGE_LIST_LIMIT,
};

/// Input for recording wastage.
///
/// Exactly one of `material_id` / `product_id` must be set.
#[derive(Debug, Clone, Default)]
pub struct WastageRequest {
    pub material_id: Option<String>,
    pub product_id: Option<String>,
    /// Quantity in `unit`.
    pub quantity: f64,
    /// Declared unit; defaults to the material's display unit, or to pieces
    /// for a product.
    pub unit: Option<String>,
    /// Free-text reason; normalized into the closed reason set.
    pub reason: String,
    pub notes: Option<String>,
}

/// The wastage recorder.
#[derive(Debug, Clone)]
pub struct WastageRecorder {
    pool: SqlitePool,
    locks: Arc<MaterialLocks>,
}

impl WastageRecorder {
    /// Creates a new WastageRecorder.
    pub fn new(pool: SqlitePool, locks: Arc<MaterialLocks>) -> Self {
        WastageRecorder { pool, locks }
    }

    /// Records a wastage event and debits the targeted stock.
    ///
    /// ## Failure Modes
    /// - `AmbiguousWastageTarget` - both or neither target set
    /// - `InvalidQuantity` / `InvalidUnit`
    /// - `InsufficientStock` - material holds less than requested
    /// - `NegativeInventory` - product stock would go below zero
    ///
    /// Unrecognized reason text is accepted and recorded as `other`; the
    /// raw text survives in the note.
    pub async fn record(&self, request: WastageRequest) -> LedgerResult<InventoryTransaction> {
        validation::validate_quantity(request.quantity)?;

        let material_id = request.material_id.clone();
        let product_id = request.product_id.clone();
        match (material_id, product_id) {
            (Some(_), Some(_)) | (None, None) => Err(CoreError::AmbiguousWastageTarget.into()),
            (Some(material_id), None) => self.record_material(material_id, request).await,
            (None, Some(product_id)) => self.record_product(product_id, request).await,
        }
    }

    async fn record_material(
        &self,
        material_id: String,
        request: WastageRequest,
    ) -> LedgerResult<InventoryTransaction> {
        let _guard = self.locks.acquire(&material_id).await;
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let material = MaterialRepository::fetch_active(&mut tx, &material_id)
            .await
            .map_err(DbError::from)?
            .ok_or_else(|| CoreError::MaterialNotFound(material_id.clone()))?;

        let unit = match &request.unit {
            Some(s) => s.parse::<Unit>()?,
            None => material.unit,
        };
        let base = unit.to_base(request.quantity);

        if material.quantity_base < base {
            return Err(CoreError::InsufficientStock {
                name: material.name,
                available: material.quantity_base,
                requested: base,
            }
            .into());
        }

        debug!(material_id = %material_id, base, reason = %request.reason, "Recording material wastage");

        sqlx::query(
            "UPDATE raw_materials SET quantity_base = quantity_base - ?2, updated_at = ?3 \
             WHERE id = ?1",
        )
        .bind(&material_id)
        .bind(base)
        .bind(chrono::Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;

        let entry = TransactionRepository::append(
            &mut tx,
            NewTransaction {
                kind: TxKind::Wastage,
                material_id: Some(material_id.clone()),
                product_id: None,
                delta_base: -base,
                note: Some(wastage_note("Wastage", &request.reason, &request.notes)),
                reason: Some(WastageReason::parse(&request.reason)),
                ref_id: None,
            },
        )
        .await
        .map_err(DbError::from)?;

        tx.commit().await.map_err(DbError::from)?;

        info!(material_id = %material_id, base, "Material wastage recorded");

        Ok(entry)
    }

    async fn record_product(
        &self,
        product_id: String,
        request: WastageRequest,
    ) -> LedgerResult<InventoryTransaction> {
        // Product stock shares the lock registry so wastage serializes
        // against production output on the same product.
        let _guard = self.locks.acquire(&product_id).await;
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let product = ProductRepository::fetch(&mut tx, &product_id)
            .await
            .map_err(DbError::from)?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.clone()))?;

        let unit = match &request.unit {
            Some(s) => Some(s.parse::<Unit>()?),
            None => None,
        };

        // Piece-like (or undeclared) units debit stock_units; mass/volume
        // units debit stock_mass_base.
        let piece_wise = unit.map(|u| u.is_piece()).unwrap_or(true);

        let (delta_units, delta_base) = if piece_wise {
            if product.stock_units < request.quantity {
                return Err(CoreError::NegativeInventory {
                    entity: product.name,
                    current: product.stock_units,
                    delta: -request.quantity,
                }
                .into());
            }
            // pcs are stored 1:1 in the base field, so the ledger delta is
            // the piece count itself.
            (-request.quantity, -request.quantity)
        } else {
            let base = unit.unwrap_or(Unit::G).to_base(request.quantity);
            if product.stock_mass_base < base {
                return Err(CoreError::NegativeInventory {
                    entity: product.name,
                    current: product.stock_mass_base,
                    delta: -base,
                }
                .into());
            }
            (0.0, -base)
        };

        debug!(product_id = %product_id, delta_units, delta_base, "Recording product wastage");

        ProductRepository::adjust_stock(
            &mut tx,
            &product_id,
            delta_units,
            if piece_wise { 0.0 } else { delta_base },
        )
        .await
        .map_err(DbError::from)?;

        let mut note = wastage_note("Wastage product", &request.reason, &request.notes);
        if piece_wise {
            note.push_str(&format!(" ({} units)", request.quantity));
        }

        let entry = TransactionRepository::append(
            &mut tx,
            NewTransaction {
                kind: TxKind::Wastage,
                material_id: None,
                product_id: Some(product_id.clone()),
                delta_base,
                note: Some(note),
                reason: Some(WastageReason::parse(&request.reason)),
                ref_id: None,
            },
        )
        .await
        .map_err(DbError::from)?;

        tx.commit().await.map_err(DbError::from)?;

        info!(product_id = %product_id, delta_base, "Product wastage recorded");

        Ok(entry)
    }

    /// Lists recent wastage transactions, most recent first.
    pub async fn list(&self) -> DbResult<Vec<InventoryTransaction>> {
        let rows = sqlx::query_as::<_, InventoryTransaction>(
            "SELECT id, kind, material_id, product_id, delta_base, note, reason, ref_id, created_at \
             FROM inventory_transactions WHERE kind = 'wastage' \
             ORDER BY created_at DESC, id DESC LIMIT ?1",
        )
        .bind(WASTAGE_LIST_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

/// Builds the audit note: `"{prefix}: {reason}"` plus optional free text.
fn wastage_note(prefix: &str, reason: &str, notes: &Option<String>) -> String {
    let reason = if reason.trim().is_empty() {
        "unspecified"
    } else {
        reason.trim()
    };
    match notes {
        Some(extra) if !extra.trim().is_empty() => {
            format!("{prefix}: {reason} - {}", extra.trim())
        }
        _ => format!("{prefix}: {reason}"),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

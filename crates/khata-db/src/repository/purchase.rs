//! # Purchase Ledger
//!
//! Inbound raw-material acquisitions and their effect on the material store.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Purchase Lifecycle                                │
//! │                                                                         │
//! │  1. CREATE                                                             │
//! │     └── normalize quantity → decompose GST → insert row                │
//! │     └── stock += quantity; avg = (old_qty×old_avg + gross) / new_qty   │
//! │     └── append tx(purchase, +quantity)                                 │
//! │                                                                         │
//! │  2. EDIT (any subset of fields)                                        │
//! │     └── apply quantity delta (reject if stock would go negative)       │
//! │     └── update row; RECOMPUTE avg = Σgross / Σqty over ALL purchases   │
//! │     └── append tx(purchase_edit, delta) only if quantity changed       │
//! │                                                                         │
//! │  3. REVERSE (delete)                                                   │
//! │     └── stock −= quantity (reject if negative); delete row; recompute  │
//! │     └── append tx(purchase_reversal, −quantity)                        │
//! │                                                                         │
//! │  Every step runs inside the material's exclusive scope plus one        │
//! │  database transaction: the stock write, the purchase row, and the      │
//! │  ledger append commit together or not at all.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The cost basis is the tax-inclusive gross amount. That inflates the
//! inventory valuation by the input tax paid; it is the documented behavior
//! of this ledger, kept deliberately (see DESIGN.md) rather than silently
//! switching to the net base amount.

use std::sync::Arc;

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult, LedgerResult};
use crate::locks::MaterialLocks;
use crate::repository::material::MaterialRepository;
use crate::repository::transaction::{NewTransaction, TransactionRepository};
use khata_core::{validation, CoreError, Purchase, TaxSpec, TxKind, Unit};

/// Column list shared by the purchase queries.
const PURCHASE_COLUMNS: &str = "id, supplier, material_id, quantity_base, gross_amount, \
     base_amount, tax_amount, tax_rate, invoice_ref, notes, created_at, updated_at";

/// Input for recording a purchase.
#[derive(Debug, Clone)]
pub struct NewPurchase {
    pub supplier: Option<String>,
    pub material_id: String,
    /// Quantity in the caller's declared unit.
    pub quantity: f64,
    /// The caller's declared unit ("g", "kg", "ml", "l", "pcs").
    pub unit: String,
    /// Total paid, inclusive of GST.
    pub gross_amount: f64,
    /// Optional explicit tax specification; defaults to the material's rate.
    pub tax: TaxSpec,
    /// Opaque reference to an uploaded invoice in external blob storage.
    pub invoice_ref: Option<String>,
    pub notes: Option<String>,
}

/// Partial edit of a purchase. `None` fields keep their current value.
#[derive(Debug, Clone, Default)]
pub struct PurchaseEdit {
    /// New quantity in `unit` (or the material's display unit if no unit
    /// accompanies it).
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub gross_amount: Option<f64>,
    /// New tax specification, resolved against the purchase's current rate.
    pub tax: Option<TaxSpec>,
    pub supplier: Option<String>,
    pub notes: Option<String>,
    pub invoice_ref: Option<String>,
}

/// Repository for the purchase ledger.
#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    pool: SqlitePool,
    locks: Arc<MaterialLocks>,
}

impl PurchaseRepository {
    /// Creates a new PurchaseRepository.
    pub fn new(pool: SqlitePool, locks: Arc<MaterialLocks>) -> Self {
        PurchaseRepository { pool, locks }
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Records a purchase and books it into the material store.
    ///
    /// ## Effects (one atomic unit)
    /// 1. Insert the purchase row with derived base/tax amounts
    /// 2. `quantity_base += purchased`; moving average folds in the gross
    /// 3. An explicit unified override rate is persisted back onto the
    ///    material's default `gst_rate`
    /// 4. Append tx(`purchase`, +purchased, ref = purchase id)
    pub async fn create(&self, input: NewPurchase) -> LedgerResult<Purchase> {
        validation::validate_quantity(input.quantity)?;
        validation::validate_amount(input.gross_amount)?;
        let unit: Unit = input.unit.parse()?;
        let quantity_base = unit.to_base(input.quantity);

        let _guard = self.locks.acquire(&input.material_id).await;
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let material = MaterialRepository::fetch_active(&mut tx, &input.material_id)
            .await
            .map_err(DbError::from)?
            .ok_or_else(|| CoreError::MaterialNotFound(input.material_id.clone()))?;

        let (rate, parts) = input.tax.decompose(input.gross_amount, material.gst_rate);
        validation::validate_rate(rate)?;

        let now = Utc::now();
        let purchase = Purchase {
            id: Uuid::new_v4().to_string(),
            supplier: input.supplier,
            material_id: input.material_id.clone(),
            quantity_base,
            gross_amount: input.gross_amount,
            base_amount: parts.base,
            tax_amount: parts.tax,
            tax_rate: rate,
            invoice_ref: input.invoice_ref,
            notes: input.notes,
            created_at: now,
            updated_at: now,
        };

        debug!(
            purchase_id = %purchase.id,
            material_id = %purchase.material_id,
            quantity_base,
            gross = input.gross_amount,
            rate,
            "Recording purchase"
        );

        sqlx::query(
            r#"
            INSERT INTO purchases (
                id, supplier, material_id, quantity_base, gross_amount,
                base_amount, tax_amount, tax_rate, invoice_ref, notes,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&purchase.id)
        .bind(&purchase.supplier)
        .bind(&purchase.material_id)
        .bind(purchase.quantity_base)
        .bind(purchase.gross_amount)
        .bind(purchase.base_amount)
        .bind(purchase.tax_amount)
        .bind(purchase.tax_rate)
        .bind(&purchase.invoice_ref)
        .bind(&purchase.notes)
        .bind(purchase.created_at)
        .bind(purchase.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;

        // Moving average over the tax-inclusive gross amount.
        let new_qty = material.quantity_base + quantity_base;
        let new_avg = if new_qty > 0.0 {
            (material.quantity_base * material.avg_cost_per_base + input.gross_amount) / new_qty
        } else {
            0.0
        };

        // An explicit unified override becomes the material's new default.
        let material_rate = if input.tax.rate.is_some() && rate != material.gst_rate {
            rate
        } else {
            material.gst_rate
        };

        sqlx::query(
            r#"
            UPDATE raw_materials SET
                quantity_base = ?2,
                avg_cost_per_base = ?3,
                gst_rate = ?4,
                updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(&purchase.material_id)
        .bind(new_qty)
        .bind(new_avg)
        .bind(material_rate)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;

        TransactionRepository::append(
            &mut tx,
            NewTransaction {
                kind: TxKind::Purchase,
                material_id: Some(purchase.material_id.clone()),
                product_id: None,
                delta_base: quantity_base,
                note: Some("Purchase added".to_string()),
                reason: None,
                ref_id: Some(purchase.id.clone()),
            },
        )
        .await
        .map_err(DbError::from)?;

        tx.commit().await.map_err(DbError::from)?;

        info!(purchase_id = %purchase.id, material_id = %purchase.material_id, "Purchase recorded");

        Ok(purchase)
    }

    // =========================================================================
    // Edit
    // =========================================================================

    /// Edits a purchase and reconciles the material store.
    ///
    /// The quantity delta is applied first (rejected if it would drive
    /// stock negative), then the stored fields are updated, then the
    /// average cost is recomputed from the FULL purchase history of the
    /// material, all inside the same exclusive scope. A `purchase_edit`
    /// ledger row is appended only when the quantity actually changed.
    pub async fn edit(&self, id: &str, changes: PurchaseEdit) -> LedgerResult<Purchase> {
        if let Some(qty) = changes.quantity {
            validation::validate_quantity(qty)?;
        }
        if let Some(gross) = changes.gross_amount {
            validation::validate_amount(gross)?;
        }

        // Resolve the material id up front so the lock can be taken before
        // the authoritative re-read inside the transaction.
        let existing = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::PurchaseNotFound(id.to_string()))?;

        let _guard = self.locks.acquire(&existing.material_id).await;
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let purchase = Self::fetch(&mut tx, id)
            .await
            .map_err(DbError::from)?
            .ok_or_else(|| CoreError::PurchaseNotFound(id.to_string()))?;

        let material = MaterialRepository::fetch_active(&mut tx, &purchase.material_id)
            .await
            .map_err(DbError::from)?
            .ok_or_else(|| CoreError::MaterialNotFound(purchase.material_id.clone()))?;

        // New quantity, normalized through the declared (or display) unit.
        let new_quantity_base = match changes.quantity {
            Some(value) => {
                let unit = match &changes.unit {
                    Some(s) => s.parse::<Unit>()?,
                    None => material.unit,
                };
                unit.to_base(value)
            }
            None => purchase.quantity_base,
        };

        let new_gross = changes.gross_amount.unwrap_or(purchase.gross_amount);
        let rate = changes
            .tax
            .map(|spec| spec.resolve(purchase.tax_rate))
            .unwrap_or(purchase.tax_rate);
        validation::validate_rate(rate)?;
        let parts = khata_core::decompose(new_gross, rate);

        let delta = new_quantity_base - purchase.quantity_base;
        if material.quantity_base + delta < 0.0 {
            return Err(CoreError::NegativeInventory {
                entity: material.name,
                current: material.quantity_base,
                delta,
            }
            .into());
        }

        let now = Utc::now();

        debug!(purchase_id = %id, delta, new_gross, rate, "Editing purchase");

        if delta != 0.0 {
            sqlx::query(
                "UPDATE raw_materials SET quantity_base = quantity_base + ?2, updated_at = ?3 \
                 WHERE id = ?1",
            )
            .bind(&purchase.material_id)
            .bind(delta)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(DbError::from)?;
        }

        let updated = Purchase {
            quantity_base: new_quantity_base,
            gross_amount: new_gross,
            base_amount: parts.base,
            tax_amount: parts.tax,
            tax_rate: rate,
            supplier: changes.supplier.or(purchase.supplier),
            notes: changes.notes.or(purchase.notes),
            invoice_ref: changes.invoice_ref.or(purchase.invoice_ref),
            updated_at: now,
            ..purchase
        };

        sqlx::query(
            r#"
            UPDATE purchases SET
                supplier = ?2,
                quantity_base = ?3,
                gross_amount = ?4,
                base_amount = ?5,
                tax_amount = ?6,
                tax_rate = ?7,
                invoice_ref = ?8,
                notes = ?9,
                updated_at = ?10
            WHERE id = ?1
            "#,
        )
        .bind(&updated.id)
        .bind(&updated.supplier)
        .bind(updated.quantity_base)
        .bind(updated.gross_amount)
        .bind(updated.base_amount)
        .bind(updated.tax_amount)
        .bind(updated.tax_rate)
        .bind(&updated.invoice_ref)
        .bind(&updated.notes)
        .bind(updated.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;

        // Full-history recompute keeps the average consistent no matter how
        // many edits have happened.
        Self::recompute_average_cost(&mut tx, &updated.material_id)
            .await
            .map_err(DbError::from)?;

        if delta != 0.0 {
            TransactionRepository::append(
                &mut tx,
                NewTransaction {
                    kind: TxKind::PurchaseEdit,
                    material_id: Some(updated.material_id.clone()),
                    product_id: None,
                    delta_base: delta,
                    note: Some("Purchase edited".to_string()),
                    reason: None,
                    ref_id: Some(updated.id.clone()),
                },
            )
            .await
            .map_err(DbError::from)?;
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(purchase_id = %id, delta, "Purchase edited");

        Ok(updated)
    }

    // =========================================================================
    // Reverse
    // =========================================================================

    /// Reverses (deletes) a purchase.
    ///
    /// Subtracts the purchased quantity from the material store (rejected
    /// if stock would go negative), removes the purchase row, recomputes
    /// the average cost from the remaining purchases, and appends a
    /// `purchase_reversal` ledger row.
    pub async fn reverse(&self, id: &str) -> LedgerResult<()> {
        let existing = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::PurchaseNotFound(id.to_string()))?;

        let _guard = self.locks.acquire(&existing.material_id).await;
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let purchase = Self::fetch(&mut tx, id)
            .await
            .map_err(DbError::from)?
            .ok_or_else(|| CoreError::PurchaseNotFound(id.to_string()))?;

        let material = MaterialRepository::fetch_active(&mut tx, &purchase.material_id)
            .await
            .map_err(DbError::from)?
            .ok_or_else(|| CoreError::MaterialNotFound(purchase.material_id.clone()))?;

        let updated_qty = material.quantity_base - purchase.quantity_base;
        if updated_qty < 0.0 {
            return Err(CoreError::NegativeInventory {
                entity: material.name,
                current: material.quantity_base,
                delta: -purchase.quantity_base,
            }
            .into());
        }

        let now = Utc::now();

        debug!(purchase_id = %id, quantity_base = purchase.quantity_base, "Reversing purchase");

        sqlx::query("DELETE FROM purchases WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(DbError::from)?;

        sqlx::query(
            "UPDATE raw_materials SET quantity_base = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(&purchase.material_id)
        .bind(updated_qty)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;

        Self::recompute_average_cost(&mut tx, &purchase.material_id)
            .await
            .map_err(DbError::from)?;

        TransactionRepository::append(
            &mut tx,
            NewTransaction {
                kind: TxKind::PurchaseReversal,
                material_id: Some(purchase.material_id.clone()),
                product_id: None,
                delta_base: -purchase.quantity_base,
                note: Some("Purchase reversed (deleted)".to_string()),
                reason: None,
                ref_id: Some(purchase.id.clone()),
            },
        )
        .await
        .map_err(DbError::from)?;

        tx.commit().await.map_err(DbError::from)?;

        info!(purchase_id = %id, "Purchase reversed");

        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Gets a purchase by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Purchase>> {
        let purchase = sqlx::query_as::<_, Purchase>(&format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchases WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(purchase)
    }

    /// Lists purchases, most recent first.
    pub async fn list(&self) -> DbResult<Vec<Purchase>> {
        let purchases = sqlx::query_as::<_, Purchase>(&format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchases ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(purchases)
    }

    /// Lists purchases of one material, oldest first.
    pub async fn list_for_material(&self, material_id: &str) -> DbResult<Vec<Purchase>> {
        let purchases = sqlx::query_as::<_, Purchase>(&format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchases \
             WHERE material_id = ?1 ORDER BY created_at, id"
        ))
        .bind(material_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(purchases)
    }

    // =========================================================================
    // Internal
    // =========================================================================

    async fn fetch(
        conn: &mut SqliteConnection,
        id: &str,
    ) -> Result<Option<Purchase>, sqlx::Error> {
        sqlx::query_as::<_, Purchase>(&format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchases WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await
    }

    /// Recomputes a material's average cost from its full purchase history:
    /// `avg = Σ gross_amount / Σ quantity_base` over every remaining
    /// purchase row (tax-inclusive, like the incremental update).
    ///
    /// Must be called inside the material's exclusive scope.
    pub(crate) async fn recompute_average_cost(
        conn: &mut SqliteConnection,
        material_id: &str,
    ) -> Result<f64, sqlx::Error> {
        let (total_value, total_qty): (f64, f64) = sqlx::query_as(
            "SELECT COALESCE(SUM(gross_amount), 0.0), COALESCE(SUM(quantity_base), 0.0) \
             FROM purchases WHERE material_id = ?1",
        )
        .bind(material_id)
        .fetch_one(&mut *conn)
        .await?;

        let avg = if total_qty > 0.0 {
            total_value / total_qty
        } else {
            0.0
        };

        sqlx::query(
            "UPDATE raw_materials SET avg_cost_per_base = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(material_id)
        .bind(avg)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        Ok(avg)
    }
}

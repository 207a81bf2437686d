//! # Inventory Transaction Ledger
//!
//! Append and query operations for the audit log of stock changes.
//!
//! ## Append-Only Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every mutating engine operation appends exactly the rows that         │
//! │  describe its stock effect, inside the SAME database transaction as    │
//! │  the stock write:                                                      │
//! │                                                                        │
//! │    purchase          +quantity_base        ref: purchase id            │
//! │    purchase_edit     new − old             ref: purchase id            │
//! │    purchase_reversal −quantity_base        ref: purchase id            │
//! │    production_consume −needed per line     ref: batch id               │
//! │    production_output +output mass (or 0)   ref: batch id               │
//! │    wastage           −wasted               reason code attached        │
//! │                                                                        │
//! │  Rows are never updated or deleted. For every material:                │
//! │    SUM(delta_base) == raw_materials.quantity_base                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::error::DbResult;
use khata_core::{InventoryTransaction, TxKind, WastageReason};

/// Column list shared by the ledger queries.
const TX_COLUMNS: &str =
    "id, kind, material_id, product_id, delta_base, note, reason, ref_id, created_at";

/// Input for appending one ledger row.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub kind: TxKind,
    pub material_id: Option<String>,
    pub product_id: Option<String>,
    pub delta_base: f64,
    pub note: Option<String>,
    pub reason: Option<WastageReason>,
    pub ref_id: Option<String>,
}

/// Read-side repository for the inventory transaction ledger.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    /// Creates a new TransactionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Appends a ledger row on an open connection.
    ///
    /// Called by the engine operations from inside their own database
    /// transaction, so the stock write and its audit row commit together.
    pub async fn append(
        conn: &mut SqliteConnection,
        entry: NewTransaction,
    ) -> Result<InventoryTransaction, sqlx::Error> {
        let tx = InventoryTransaction {
            id: Uuid::new_v4().to_string(),
            kind: entry.kind,
            material_id: entry.material_id,
            product_id: entry.product_id,
            delta_base: entry.delta_base,
            note: entry.note,
            reason: entry.reason,
            ref_id: entry.ref_id,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO inventory_transactions (
                id, kind, material_id, product_id, delta_base, note, reason, ref_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&tx.id)
        .bind(tx.kind)
        .bind(&tx.material_id)
        .bind(&tx.product_id)
        .bind(tx.delta_base)
        .bind(&tx.note)
        .bind(tx.reason)
        .bind(&tx.ref_id)
        .bind(tx.created_at)
        .execute(conn)
        .await?;

        Ok(tx)
    }

    /// Lists all ledger rows for a material, oldest first.
    pub async fn list_for_material(
        &self,
        material_id: &str,
    ) -> DbResult<Vec<InventoryTransaction>> {
        let rows = sqlx::query_as::<_, InventoryTransaction>(&format!(
            "SELECT {TX_COLUMNS} FROM inventory_transactions \
             WHERE material_id = ?1 ORDER BY created_at, id"
        ))
        .bind(material_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Lists ledger rows of one kind, most recent first.
    pub async fn list_by_kind(
        &self,
        kind: TxKind,
        limit: u32,
    ) -> DbResult<Vec<InventoryTransaction>> {
        let rows = sqlx::query_as::<_, InventoryTransaction>(&format!(
            "SELECT {TX_COLUMNS} FROM inventory_transactions \
             WHERE kind = ?1 ORDER BY created_at DESC, id DESC LIMIT ?2"
        ))
        .bind(kind)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Sum of all signed deltas recorded for a material.
    ///
    /// The ledger-consistency invariant requires this to equal the
    /// material's current `quantity_base` at all times.
    pub async fn sum_deltas(&self, material_id: &str) -> DbResult<f64> {
        let total: f64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(delta_base), 0.0) FROM inventory_transactions \
             WHERE material_id = ?1",
        )
        .bind(material_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    /// Total rows recorded (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM inventory_transactions")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

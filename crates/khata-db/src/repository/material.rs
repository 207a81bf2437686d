//! # Raw Material Registry
//!
//! Database operations for the material registry.
//!
//! ## Field Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Who Writes What                                     │
//! │                                                                         │
//! │  THIS REPOSITORY (registry CRUD)                                       │
//! │  ├── name, unit, reorder_threshold_base, gst_rate, is_active           │
//! │                                                                         │
//! │  LEDGER OPERATIONS ONLY (purchase / production / wastage / recompute)  │
//! │  ├── quantity_base                                                     │
//! │  └── avg_cost_per_base                                                 │
//! │                                                                         │
//! │  update() deliberately has no way to touch the derived stock fields.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult, LedgerResult};
use khata_core::{validation, RawMaterial, Unit};

/// Column list shared by the material queries.
const MATERIAL_COLUMNS: &str = "id, name, unit, quantity_base, reorder_threshold_base, \
     avg_cost_per_base, gst_rate, is_active, created_at, updated_at";

/// Input for registering a material.
#[derive(Debug, Clone)]
pub struct NewMaterial {
    pub name: String,
    /// Display unit; also the unit `reorder_level` is given in.
    pub unit: Unit,
    /// Alert level in the display unit (converted to base on insert).
    pub reorder_level: Option<f64>,
    /// Default GST percentage for purchases of this material.
    pub gst_rate: f64,
}

/// Partial update of registry fields (stock fields are not editable here).
#[derive(Debug, Clone, Default)]
pub struct MaterialUpdate {
    pub name: Option<String>,
    pub unit: Option<Unit>,
    /// New alert level, in the (possibly updated) display unit.
    pub reorder_level: Option<f64>,
    pub gst_rate: Option<f64>,
}

/// Repository for raw-material registry operations.
#[derive(Debug, Clone)]
pub struct MaterialRepository {
    pool: SqlitePool,
}

impl MaterialRepository {
    /// Creates a new MaterialRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MaterialRepository { pool }
    }

    /// Registers a new material with zero stock and zero average cost.
    pub async fn create(&self, input: NewMaterial) -> LedgerResult<RawMaterial> {
        validation::validate_name(&input.name)?;
        validation::validate_rate(input.gst_rate)?;

        debug!(name = %input.name, "Registering material");

        let now = Utc::now();
        let material = RawMaterial {
            id: Uuid::new_v4().to_string(),
            name: input.name.trim().to_string(),
            unit: input.unit,
            quantity_base: 0.0,
            reorder_threshold_base: input
                .reorder_level
                .map(|level| input.unit.to_base(level))
                .unwrap_or(0.0),
            avg_cost_per_base: 0.0,
            gst_rate: input.gst_rate,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO raw_materials (
                id, name, unit, quantity_base, reorder_threshold_base,
                avg_cost_per_base, gst_rate, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&material.id)
        .bind(&material.name)
        .bind(material.unit)
        .bind(material.quantity_base)
        .bind(material.reorder_threshold_base)
        .bind(material.avg_cost_per_base)
        .bind(material.gst_rate)
        .bind(material.is_active)
        .bind(material.created_at)
        .bind(material.updated_at)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(material)
    }

    /// Gets a material by its ID (active or not).
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<RawMaterial>> {
        let material = sqlx::query_as::<_, RawMaterial>(&format!(
            "SELECT {MATERIAL_COLUMNS} FROM raw_materials WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(material)
    }

    /// Fetches an active material on an open connection.
    ///
    /// Used by the engine operations inside their exclusive scope, so the
    /// read and the subsequent write see the same state.
    pub(crate) async fn fetch_active(
        conn: &mut SqliteConnection,
        id: &str,
    ) -> Result<Option<RawMaterial>, sqlx::Error> {
        sqlx::query_as::<_, RawMaterial>(&format!(
            "SELECT {MATERIAL_COLUMNS} FROM raw_materials WHERE id = ?1 AND is_active = 1"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await
    }

    /// Lists active materials sorted by name.
    pub async fn list(&self) -> DbResult<Vec<RawMaterial>> {
        let materials = sqlx::query_as::<_, RawMaterial>(&format!(
            "SELECT {MATERIAL_COLUMNS} FROM raw_materials WHERE is_active = 1 ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(materials)
    }

    /// Updates registry fields of a material.
    ///
    /// `quantity_base` and `avg_cost_per_base` cannot be set through here;
    /// they belong to the ledger operations.
    pub async fn update(&self, id: &str, changes: MaterialUpdate) -> LedgerResult<RawMaterial> {
        let current = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Material", id))?;

        if let Some(name) = &changes.name {
            validation::validate_name(name)?;
        }
        if let Some(rate) = changes.gst_rate {
            validation::validate_rate(rate)?;
        }

        let unit = changes.unit.unwrap_or(current.unit);
        let reorder_threshold_base = changes
            .reorder_level
            .map(|level| unit.to_base(level))
            .unwrap_or(current.reorder_threshold_base);

        let name = changes
            .name
            .map(|n| n.trim().to_string())
            .unwrap_or(current.name);
        let gst_rate = changes.gst_rate.unwrap_or(current.gst_rate);
        let now = Utc::now();

        debug!(id = %id, "Updating material registry fields");

        let result = sqlx::query(
            r#"
            UPDATE raw_materials SET
                name = ?2,
                unit = ?3,
                reorder_threshold_base = ?4,
                gst_rate = ?5,
                updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&name)
        .bind(unit)
        .bind(reorder_threshold_base)
        .bind(gst_rate)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Material", id).into());
        }

        Ok(RawMaterial {
            id: current.id,
            name,
            unit,
            reorder_threshold_base,
            gst_rate,
            updated_at: now,
            ..current
        })
    }

    /// Soft-deletes a material by setting is_active = false.
    ///
    /// ## Why Soft Delete?
    /// Purchases and ledger rows keep referencing the material; removing
    /// the row would orphan the audit history.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting material");

        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE raw_materials SET is_active = 0, updated_at = ?2 WHERE id = ?1",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Material", id));
        }

        Ok(())
    }

    /// Materials at or below their reorder level.
    ///
    /// ## Arguments
    /// * `threshold` - optional base-unit level that overrides the
    ///   per-material threshold; with `None`, each material's own
    ///   `reorder_threshold_base` applies (0 disables the alert)
    pub async fn low_stock(&self, threshold: Option<f64>) -> DbResult<Vec<RawMaterial>> {
        let materials = match threshold {
            Some(level) => {
                sqlx::query_as::<_, RawMaterial>(&format!(
                    "SELECT {MATERIAL_COLUMNS} FROM raw_materials \
                     WHERE is_active = 1 AND quantity_base <= ?1 ORDER BY name"
                ))
                .bind(level)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, RawMaterial>(&format!(
                    "SELECT {MATERIAL_COLUMNS} FROM raw_materials \
                     WHERE is_active = 1 AND reorder_threshold_base > 0 \
                       AND quantity_base <= reorder_threshold_base ORDER BY name"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(materials)
    }

    /// Counts active materials (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM raw_materials WHERE is_active = 1")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_converts_reorder_level() {
        let db = test_db().await;
        let material = db
            .materials()
            .create(NewMaterial {
                name: "Flour".into(),
                unit: Unit::Kg,
                reorder_level: Some(2.0),
                gst_rate: 5.0,
            })
            .await
            .unwrap();

        assert_eq!(material.reorder_threshold_base, 2000.0);
        assert_eq!(material.quantity_base, 0.0);
        assert_eq!(material.avg_cost_per_base, 0.0);
        assert!(material.is_active);
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let db = test_db().await;
        let input = NewMaterial {
            name: "Sugar".into(),
            unit: Unit::G,
            reorder_level: None,
            gst_rate: 0.0,
        };
        db.materials().create(input.clone()).await.unwrap();

        let err = db.materials().create(input).await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::LedgerError::Store(DbError::UniqueViolation { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_keeps_stock_fields() {
        let db = test_db().await;
        let material = db
            .materials()
            .create(NewMaterial {
                name: "Ghee".into(),
                unit: Unit::Ml,
                reorder_level: Some(500.0),
                gst_rate: 12.0,
            })
            .await
            .unwrap();

        let updated = db
            .materials()
            .update(
                &material.id,
                MaterialUpdate {
                    name: Some("Desi Ghee".into()),
                    unit: Some(Unit::L),
                    reorder_level: Some(1.0),
                    gst_rate: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Desi Ghee");
        assert_eq!(updated.reorder_threshold_base, 1000.0);
        assert_eq!(updated.gst_rate, 12.0);
        assert_eq!(updated.quantity_base, 0.0);
    }

    #[tokio::test]
    async fn test_soft_delete_hides_from_list() {
        let db = test_db().await;
        let material = db
            .materials()
            .create(NewMaterial {
                name: "Cardamom".into(),
                unit: Unit::G,
                reorder_level: None,
                gst_rate: 0.0,
            })
            .await
            .unwrap();

        db.materials().soft_delete(&material.id).await.unwrap();

        assert!(db.materials().list().await.unwrap().is_empty());
        // Still reachable by id for history joins.
        assert!(db.materials().get_by_id(&material.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_low_stock_threshold_override() {
        let db = test_db().await;
        db.materials()
            .create(NewMaterial {
                name: "Pista".into(),
                unit: Unit::G,
                reorder_level: None, // own alert disabled
                gst_rate: 0.0,
            })
            .await
            .unwrap();

        // Own threshold is 0: not low by default...
        assert!(db.materials().low_stock(None).await.unwrap().is_empty());
        // ...but an explicit caller threshold catches the zero stock.
        assert_eq!(db.materials().low_stock(Some(10.0)).await.unwrap().len(), 1);
    }
}

//! # Domain Types
//!
//! Core domain types for the Khata ledger engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   RawMaterial   │   │    Purchase     │   │ InventoryTxn    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  quantity_base  │   │  quantity_base  │   │  kind           │       │
//! │  │  avg_cost/base  │   │  gross/base/tax │   │  delta_base (±) │       │
//! │  │  gst_rate       │   │  tax_rate       │   │  ref_id         │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   RecipeLine    │   │  ProductStock   │   │  Sale / Expense │       │
//! │  │  base_per_unit  │   │  stock_units    │   │  gross/base/tax │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ownership
//! `RawMaterial.quantity_base` and `avg_cost_per_base` are derived state,
//! owned exclusively by the ledger operations in khata-db. Nothing else
//! writes them; reports only read them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::units::Unit;

// =============================================================================
// Raw Material
// =============================================================================

/// A raw material tracked in the base unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct RawMaterial {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name (unique).
    pub name: String,

    /// Display unit for UI entry; storage is always the base unit.
    pub unit: Unit,

    /// Current stock in base units. Derived; mutated only by purchase,
    /// production-consume, wastage, and recomputation.
    pub quantity_base: f64,

    /// Alert threshold in base units (0 disables the alert).
    pub reorder_threshold_base: f64,

    /// Moving-average cost per base unit. Derived; never set by a caller.
    pub avg_cost_per_base: f64,

    /// Default GST percentage applied to purchases of this material.
    pub gst_rate: f64,

    /// Whether the material is active (soft delete).
    pub is_active: bool,

    /// When the material was registered.
    pub created_at: DateTime<Utc>,

    /// When the material was last updated.
    pub updated_at: DateTime<Utc>,
}

impl RawMaterial {
    /// Current valuation of the held stock (`quantity × average cost`).
    #[inline]
    pub fn stock_value(&self) -> f64 {
        self.quantity_base * self.avg_cost_per_base
    }

    /// Whether stock has fallen to or below the reorder threshold.
    pub fn is_low_stock(&self) -> bool {
        self.reorder_threshold_base > 0.0 && self.quantity_base <= self.reorder_threshold_base
    }
}

// =============================================================================
// Purchase
// =============================================================================

/// An inbound raw-material acquisition.
///
/// `gross_amount` is tax-inclusive; `base_amount`/`tax_amount` are derived
/// through GST decomposition and `tax_rate` records the rate actually
/// applied, for audit, even if the material default changes later.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: String,
    pub supplier: Option<String>,
    pub material_id: String,
    /// Acquired quantity, already normalized to base units.
    pub quantity_base: f64,
    /// Total paid, inclusive of GST.
    pub gross_amount: f64,
    /// Net amount excluding GST (derived).
    pub base_amount: f64,
    /// GST portion (derived).
    pub tax_amount: f64,
    /// Percentage rate applied to this purchase.
    pub tax_rate: f64,
    /// Opaque reference to an invoice attachment in external blob storage.
    pub invoice_ref: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Product Stock
// =============================================================================

/// Finished-goods stock for a product.
///
/// Products live in an external catalog service; the ledger only tracks the
/// two stock fields mutated by production and wastage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct ProductStock {
    pub id: String,
    pub name: String,
    /// Unit-level stock (packs/pieces).
    pub stock_units: f64,
    /// Optional produced mass in base units, for mass-tracked goods.
    pub stock_mass_base: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Recipe
// =============================================================================

/// How a recipe line scales with production volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum RecipeMode {
    /// Base units consumed per one produced unit (the only mode production
    /// consumes).
    PerUnit,
    /// Base units per kilogram of finished output (stored, not consumed).
    PerKg,
}

impl Default for RecipeMode {
    fn default() -> Self {
        RecipeMode::PerUnit
    }
}

/// One bill-of-materials line for a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct RecipeLine {
    pub id: String,
    pub product_id: String,
    pub material_id: String,
    /// Base units consumed per produced unit.
    pub base_per_unit: f64,
    pub mode: RecipeMode,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Inventory Transaction
// =============================================================================

/// The kind of stock-affecting event a ledger row records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    /// Raw material stock increased from a purchase.
    Purchase,
    /// Quantity delta after editing an existing purchase.
    PurchaseEdit,
    /// Full reversal (deletion) of a purchase.
    PurchaseReversal,
    /// Raw materials consumed for production.
    ProductionConsume,
    /// Finished product stock increased.
    ProductionOutput,
    /// Stock decreased due to damage/spoilage/etc.
    Wastage,
    /// Manual corrections (reserved).
    Adjustment,
}

/// An immutable, signed record of a stock change.
///
/// Append-only: rows are never updated or deleted. For every material, the
/// sum of `delta_base` across its rows must equal its current
/// `quantity_base`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct InventoryTransaction {
    pub id: String,
    pub kind: TxKind,
    pub material_id: Option<String>,
    pub product_id: Option<String>,
    /// Signed base-unit delta (+ for inflow, − for outflow).
    pub delta_base: f64,
    pub note: Option<String>,
    /// Wastage reason code; only set on `Wastage` rows.
    pub reason: Option<WastageReason>,
    /// Id of the originating purchase / production batch / wastage record.
    pub ref_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Wastage Reason
// =============================================================================

/// Closed set of wastage reason codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum WastageReason {
    Damage,
    Spoilage,
    Expiry,
    Missing,
    Other,
}

impl WastageReason {
    /// Normalizes free-text input into the closed set.
    ///
    /// Unrecognized reasons are accepted and flagged as `Other`; the raw
    /// text survives in the transaction note.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "damage" | "damaged" => WastageReason::Damage,
            "spoilage" | "spoiled" => WastageReason::Spoilage,
            "expiry" | "expired" => WastageReason::Expiry,
            "missing" | "lost" => WastageReason::Missing,
            _ => WastageReason::Other,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            WastageReason::Damage => "damage",
            WastageReason::Spoilage => "spoilage",
            WastageReason::Expiry => "expiry",
            WastageReason::Missing => "missing",
            WastageReason::Other => "other",
        }
    }
}

// =============================================================================
// Sale
// =============================================================================

/// An outward taxable supply (finished goods sale).
///
/// Consumed read-only by the financial aggregator; shares the GST
/// decomposition contract with purchases and expenses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,
    pub customer_name: Option<String>,
    pub invoice_number: Option<String>,
    /// Optional linkage to a product (generic invoices leave this unset).
    pub product_id: Option<String>,
    pub quantity: f64,
    pub unit: Option<Unit>,
    /// Total price inclusive of GST.
    pub gross_amount: f64,
    pub base_amount: f64,
    pub tax_amount: f64,
    pub tax_rate: f64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Expense
// =============================================================================

/// A non-inventory expense (advertising, utilities, rent, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub gross_amount: f64,
    pub base_amount: f64,
    pub tax_amount: f64,
    pub tax_rate: f64,
    pub invoice_ref: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn material(qty: f64, avg: f64, reorder: f64) -> RawMaterial {
        RawMaterial {
            id: "mat-1".to_string(),
            name: "Flour".to_string(),
            unit: Unit::Kg,
            quantity_base: qty,
            reorder_threshold_base: reorder,
            avg_cost_per_base: avg,
            gst_rate: 5.0,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_stock_value() {
        let m = material(10_000.0, 0.072, 0.0);
        assert!((m.stock_value() - 720.0).abs() < 1e-9);
    }

    #[test]
    fn test_low_stock() {
        assert!(material(500.0, 0.0, 1000.0).is_low_stock());
        assert!(material(1000.0, 0.0, 1000.0).is_low_stock());
        assert!(!material(1500.0, 0.0, 1000.0).is_low_stock());
        // Threshold 0 disables the alert even at zero stock.
        assert!(!material(0.0, 0.0, 0.0).is_low_stock());
    }

    #[test]
    fn test_wastage_reason_parse() {
        assert_eq!(WastageReason::parse("spoilage"), WastageReason::Spoilage);
        assert_eq!(WastageReason::parse("Expired"), WastageReason::Expiry);
        assert_eq!(WastageReason::parse("dropped the tray"), WastageReason::Other);
        assert_eq!(WastageReason::parse(""), WastageReason::Other);
    }

    #[test]
    fn test_tx_kind_serde_names() {
        let json = serde_json::to_string(&TxKind::ProductionConsume).unwrap();
        assert_eq!(json, "\"production_consume\"");
        let kind: TxKind = serde_json::from_str("\"purchase_reversal\"").unwrap();
        assert_eq!(kind, TxKind::PurchaseReversal);
    }

    #[test]
    fn test_recipe_mode_default() {
        assert_eq!(RecipeMode::default(), RecipeMode::PerUnit);
    }
}

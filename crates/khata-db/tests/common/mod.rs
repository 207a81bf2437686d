//! Shared helpers for the ledger integration tests.
//!
//! Every test runs against its own in-memory database, so tests are fully
//! isolated and never touch disk.

// Not every test binary uses every helper.
#![allow(dead_code)]

use khata_core::{Purchase, RawMaterial, TaxSpec, Unit};
use khata_db::{Database, DbConfig, NewMaterial, NewPurchase, NewRecipeLine};

/// Absolute tolerance for floating-point money/quantity assertions.
pub const EPS: f64 = 1e-9;

/// Creates a fresh, fully-migrated in-memory database.
pub async fn spawn_db() -> Database {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    Database::new(DbConfig::in_memory())
        .await
        .expect("in-memory database should initialize")
}

/// Registers a material with the given display unit and default GST rate.
pub async fn create_material(db: &Database, name: &str, unit: Unit, gst_rate: f64) -> RawMaterial {
    db.materials()
        .create(NewMaterial {
            name: name.to_string(),
            unit,
            reorder_level: None,
            gst_rate,
        })
        .await
        .expect("material should register")
}

/// Records a purchase of `quantity` grams at an explicit unified rate.
pub async fn purchase_grams(
    db: &Database,
    material_id: &str,
    quantity: f64,
    gross: f64,
    rate: Option<f64>,
) -> Purchase {
    db.purchases()
        .create(NewPurchase {
            supplier: Some("Test Supplier".to_string()),
            material_id: material_id.to_string(),
            quantity,
            unit: "g".to_string(),
            gross_amount: gross,
            tax: rate.map(TaxSpec::unified).unwrap_or_default(),
            invoice_ref: None,
            notes: None,
        })
        .await
        .expect("purchase should record")
}

/// Saves a single-line per-unit recipe for a product.
pub async fn single_line_recipe(
    db: &Database,
    product_id: &str,
    material_id: &str,
    base_per_unit: f64,
) {
    db.recipes()
        .save(
            product_id,
            vec![NewRecipeLine {
                material_id: material_id.to_string(),
                base_per_unit,
                mode: khata_core::RecipeMode::PerUnit,
            }],
        )
        .await
        .expect("recipe should save");
}

/// Asserts the ledger-consistency invariant for one material:
/// the sum of its transaction deltas equals its current stock.
pub async fn assert_ledger_consistent(db: &Database, material_id: &str) {
    let material = db
        .materials()
        .get_by_id(material_id)
        .await
        .expect("material query should succeed")
        .expect("material should exist");
    let ledger_total = db
        .transactions()
        .sum_deltas(material_id)
        .await
        .expect("ledger sum should succeed");

    assert!(
        (material.quantity_base - ledger_total).abs() < EPS,
        "ledger total {ledger_total} != stock {}",
        material.quantity_base
    );
}

//! Production engine integration tests: recipe-driven consumption,
//! all-or-nothing semantics, and finished-goods crediting.

mod common;

use common::{assert_ledger_consistent, create_material, purchase_grams, spawn_db, EPS};
use khata_core::{CoreError, RecipeMode, TxKind, Unit};
use khata_db::{LedgerError, NewRecipeLine};

/// A successful run deducts every line, credits the product, and tags all
/// ledger rows with one batch id.
#[tokio::test]
async fn produce_consumes_recipe_and_credits_stock() {
    let db = spawn_db().await;
    let flour = create_material(&db, "Flour", Unit::Kg, 0.0).await;
    let sugar = create_material(&db, "Sugar", Unit::Kg, 0.0).await;
    let product = db.products().create("Besan Ladoo").await.unwrap();

    purchase_grams(&db, &flour.id, 5000.0, 300.0, Some(0.0)).await;
    purchase_grams(&db, &sugar.id, 2000.0, 120.0, Some(0.0)).await;

    db.recipes()
        .save(
            &product.id,
            vec![
                NewRecipeLine {
                    material_id: flour.id.clone(),
                    base_per_unit: 200.0,
                    mode: RecipeMode::PerUnit,
                },
                NewRecipeLine {
                    material_id: sugar.id.clone(),
                    base_per_unit: 50.0,
                    mode: RecipeMode::PerUnit,
                },
            ],
        )
        .await
        .unwrap();

    let receipt = db
        .production()
        .produce(&product.id, 10.0, Some(2600.0))
        .await
        .unwrap();

    assert_eq!(receipt.consumed.len(), 2);
    assert!((receipt.product.stock_units - 10.0).abs() < EPS);
    assert!((receipt.product.stock_mass_base - 2600.0).abs() < EPS);

    let flour_row = db.materials().get_by_id(&flour.id).await.unwrap().unwrap();
    let sugar_row = db.materials().get_by_id(&sugar.id).await.unwrap().unwrap();
    assert!((flour_row.quantity_base - 3000.0).abs() < EPS);
    assert!((sugar_row.quantity_base - 1500.0).abs() < EPS);

    // Consume rows and the output row share the batch marker.
    let consumes = db
        .transactions()
        .list_by_kind(TxKind::ProductionConsume, 10)
        .await
        .unwrap();
    assert_eq!(consumes.len(), 2);
    for row in &consumes {
        assert_eq!(row.ref_id.as_deref(), Some(receipt.batch_id.as_str()));
    }

    let outputs = db
        .transactions()
        .list_by_kind(TxKind::ProductionOutput, 10)
        .await
        .unwrap();
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].ref_id.as_deref(), Some(receipt.batch_id.as_str()));
    assert!((outputs[0].delta_base - 2600.0).abs() < EPS);

    assert_ledger_consistent(&db, &flour.id).await;
    assert_ledger_consistent(&db, &sugar.id).await;
}

/// One short line fails the whole run: the sufficient line keeps its stock
/// and no ledger row is appended.
#[tokio::test]
async fn produce_is_atomic_across_lines() {
    let db = spawn_db().await;
    let flour = create_material(&db, "Flour", Unit::Kg, 0.0).await;
    let sugar = create_material(&db, "Sugar", Unit::Kg, 0.0).await;
    let product = db.products().create("Besan Ladoo").await.unwrap();

    // Flour can cover one unit; sugar cannot.
    purchase_grams(&db, &flour.id, 1000.0, 60.0, Some(0.0)).await;
    purchase_grams(&db, &sugar.id, 30.0, 5.0, Some(0.0)).await;

    db.recipes()
        .save(
            &product.id,
            vec![
                NewRecipeLine {
                    material_id: flour.id.clone(),
                    base_per_unit: 200.0,
                    mode: RecipeMode::PerUnit,
                },
                NewRecipeLine {
                    material_id: sugar.id.clone(),
                    base_per_unit: 50.0,
                    mode: RecipeMode::PerUnit,
                },
            ],
        )
        .await
        .unwrap();

    let before = db.transactions().count().await.unwrap();

    let err = db.production().produce(&product.id, 1.0, None).await.unwrap_err();
    match err {
        LedgerError::Domain(CoreError::InsufficientMaterial { material_id, .. }) => {
            assert_eq!(material_id, sugar.id);
        }
        other => panic!("expected InsufficientMaterial, got {other:?}"),
    }

    // No stock changed, no transaction recorded.
    let flour_row = db.materials().get_by_id(&flour.id).await.unwrap().unwrap();
    let sugar_row = db.materials().get_by_id(&sugar.id).await.unwrap().unwrap();
    assert!((flour_row.quantity_base - 1000.0).abs() < EPS);
    assert!((sugar_row.quantity_base - 30.0).abs() < EPS);
    assert_eq!(db.transactions().count().await.unwrap(), before);

    let product_row = db.products().get_by_id(&product.id).await.unwrap().unwrap();
    assert_eq!(product_row.stock_units, 0.0);
}

/// 150 g in stock cannot cover a 200 g-per-unit recipe line.
#[tokio::test]
async fn produce_fails_on_single_short_line() {
    let db = spawn_db().await;
    let flour = create_material(&db, "Flour", Unit::G, 0.0).await;
    let product = db.products().create("Roti Pack").await.unwrap();

    purchase_grams(&db, &flour.id, 150.0, 9.0, Some(0.0)).await;
    common::single_line_recipe(&db, &product.id, &flour.id, 200.0).await;

    let before = db.transactions().count().await.unwrap();

    let err = db.production().produce(&product.id, 1.0, None).await.unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Domain(CoreError::InsufficientMaterial { .. })
    ));

    let flour_row = db.materials().get_by_id(&flour.id).await.unwrap().unwrap();
    assert!((flour_row.quantity_base - 150.0).abs() < EPS);
    assert_eq!(db.transactions().count().await.unwrap(), before);
}

/// Zero or negative unit counts are rejected before anything loads.
#[tokio::test]
async fn produce_rejects_non_positive_units() {
    let db = spawn_db().await;
    let flour = create_material(&db, "Flour", Unit::Kg, 0.0).await;
    let product = db.products().create("Ladoo").await.unwrap();
    common::single_line_recipe(&db, &product.id, &flour.id, 100.0).await;

    for units in [0.0, -3.0] {
        let err = db
            .production()
            .produce(&product.id, units, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Domain(CoreError::Validation(_))
        ));
    }
}

/// Producing a product with no recipe rows fails with NoRecipeDefined.
#[tokio::test]
async fn produce_requires_recipe() {
    let db = spawn_db().await;
    let product = db.products().create("Mystery Box").await.unwrap();

    let err = db.production().produce(&product.id, 1.0, None).await.unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Domain(CoreError::NoRecipeDefined(_))
    ));
}

/// Unknown products fail with ProductNotFound before the recipe check.
#[tokio::test]
async fn produce_requires_product() {
    let db = spawn_db().await;

    let err = db
        .production()
        .produce("ghost-product", 1.0, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Domain(CoreError::ProductNotFound(_))
    ));
}

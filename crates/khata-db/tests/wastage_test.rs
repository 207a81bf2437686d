//! Wastage recorder integration tests: target selection, insufficiency
//! checks, reason normalization, and the listing view.

mod common;

use common::{assert_ledger_consistent, create_material, purchase_grams, spawn_db, EPS};
use khata_core::{CoreError, TxKind, Unit, WastageReason};
use khata_db::{LedgerError, WastageRequest};

/// Material wastage debits stock and appends a reason-coded ledger row.
#[tokio::test]
async fn material_wastage_debits_stock() {
    let db = spawn_db().await;
    let milk = create_material(&db, "Milk", Unit::L, 0.0).await;
    purchase_grams(&db, &milk.id, 2000.0, 100.0, Some(0.0)).await;

    let entry = db
        .wastage()
        .record(WastageRequest {
            material_id: Some(milk.id.clone()),
            quantity: 0.5,
            unit: Some("l".to_string()),
            reason: "spoilage".to_string(),
            notes: Some("left out overnight".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(entry.kind, TxKind::Wastage);
    assert!((entry.delta_base + 500.0).abs() < EPS);
    assert_eq!(entry.reason, Some(WastageReason::Spoilage));

    let milk_row = db.materials().get_by_id(&milk.id).await.unwrap().unwrap();
    assert!((milk_row.quantity_base - 1500.0).abs() < EPS);

    assert_ledger_consistent(&db, &milk.id).await;
}

/// Wasting more than is held fails and leaves stock untouched.
#[tokio::test]
async fn material_wastage_rejects_insufficient_stock() {
    let db = spawn_db().await;
    let milk = create_material(&db, "Milk", Unit::L, 0.0).await;
    purchase_grams(&db, &milk.id, 300.0, 20.0, Some(0.0)).await;

    let err = db
        .wastage()
        .record(WastageRequest {
            material_id: Some(milk.id.clone()),
            quantity: 1.0,
            unit: Some("l".to_string()),
            reason: "spoilage".to_string(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Domain(CoreError::InsufficientStock { .. })
    ));

    let milk_row = db.materials().get_by_id(&milk.id).await.unwrap().unwrap();
    assert!((milk_row.quantity_base - 300.0).abs() < EPS);
    assert_ledger_consistent(&db, &milk.id).await;
}

/// Piece wastage beyond the product's unit stock is rejected.
#[tokio::test]
async fn product_wastage_rejects_negative_units() {
    let db = spawn_db().await;
    let flour = create_material(&db, "Flour", Unit::Kg, 0.0).await;
    let product = db.products().create("Mathri").await.unwrap();

    // Build 50 units of finished stock through production.
    purchase_grams(&db, &flour.id, 1000.0, 60.0, Some(0.0)).await;
    common::single_line_recipe(&db, &product.id, &flour.id, 10.0).await;
    db.production().produce(&product.id, 50.0, None).await.unwrap();

    let err = db
        .wastage()
        .record(WastageRequest {
            product_id: Some(product.id.clone()),
            quantity: 60.0,
            unit: Some("pcs".to_string()),
            reason: "damage".to_string(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Domain(CoreError::NegativeInventory { .. })
    ));

    let product_row = db.products().get_by_id(&product.id).await.unwrap().unwrap();
    assert!((product_row.stock_units - 50.0).abs() < EPS);
}

/// Piece wastage within stock decrements units; mass wastage decrements
/// the product's tracked mass.
#[tokio::test]
async fn product_wastage_paths() {
    let db = spawn_db().await;
    let flour = create_material(&db, "Flour", Unit::Kg, 0.0).await;
    let product = db.products().create("Mathri").await.unwrap();

    purchase_grams(&db, &flour.id, 1000.0, 60.0, Some(0.0)).await;
    common::single_line_recipe(&db, &product.id, &flour.id, 10.0).await;
    db.production()
        .produce(&product.id, 50.0, Some(600.0))
        .await
        .unwrap();

    // Units path (default when no unit declared).
    db.wastage()
        .record(WastageRequest {
            product_id: Some(product.id.clone()),
            quantity: 5.0,
            reason: "damage".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    // Mass path.
    db.wastage()
        .record(WastageRequest {
            product_id: Some(product.id.clone()),
            quantity: 100.0,
            unit: Some("g".to_string()),
            reason: "spoilage".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    let product_row = db.products().get_by_id(&product.id).await.unwrap().unwrap();
    assert!((product_row.stock_units - 45.0).abs() < EPS);
    assert!((product_row.stock_mass_base - 500.0).abs() < EPS);
}

/// Both or neither target set is an error.
#[tokio::test]
async fn wastage_requires_exactly_one_target() {
    let db = spawn_db().await;
    let milk = create_material(&db, "Milk", Unit::L, 0.0).await;
    let product = db.products().create("Kheer").await.unwrap();

    let err = db
        .wastage()
        .record(WastageRequest {
            material_id: Some(milk.id.clone()),
            product_id: Some(product.id.clone()),
            quantity: 1.0,
            reason: "damage".to_string(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Domain(CoreError::AmbiguousWastageTarget)
    ));

    let err = db
        .wastage()
        .record(WastageRequest {
            quantity: 1.0,
            reason: "damage".to_string(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Domain(CoreError::AmbiguousWastageTarget)
    ));
}

/// Free-text reasons are accepted and normalized to `other`; the raw text
/// survives in the note. Listing returns the most recent rows first.
#[tokio::test]
async fn wastage_reason_normalization_and_listing() {
    let db = spawn_db().await;
    let milk = create_material(&db, "Milk", Unit::L, 0.0).await;
    purchase_grams(&db, &milk.id, 5000.0, 250.0, Some(0.0)).await;

    for (qty, reason) in [(100.0, "expiry"), (200.0, "dropped the can")] {
        db.wastage()
            .record(WastageRequest {
                material_id: Some(milk.id.clone()),
                quantity: qty,
                unit: Some("ml".to_string()),
                reason: reason.to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        // Distinct timestamps keep the recency ordering deterministic.
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let listed = db.wastage().list().await.unwrap();
    assert_eq!(listed.len(), 2);

    // Most recent first: the free-text reason, flagged as `other`.
    assert_eq!(listed[0].reason, Some(WastageReason::Other));
    assert!(listed[0]
        .note
        .as_deref()
        .unwrap_or_default()
        .contains("dropped the can"));
    assert_eq!(listed[1].reason, Some(WastageReason::Expiry));

    assert_ledger_consistent(&db, &milk.id).await;
}

//! Financial aggregator integration tests: summary, balance sheet,
//! profit & loss, and CSV export.

mod common;

use common::{create_material, purchase_grams, spawn_db, EPS};
use khata_core::{TaxSpec, Unit};
use khata_db::{ExportKind, NewExpense, NewSale};

/// Seeds one purchase, one expense, and one sale with known GST splits.
async fn seed_books(db: &khata_db::Database) -> String {
    let flour = create_material(db, "Flour", Unit::Kg, 0.0).await;
    // Purchase: gross 420 at 5% → base 400, tax 20.
    purchase_grams(db, &flour.id, 5000.0, 420.0, Some(5.0)).await;

    // Expense: gross 1180 at 18% → base 1000, tax 180.
    db.expenses()
        .record(NewExpense {
            category: Some("advertising".to_string()),
            gross_amount: 1180.0,
            tax: TaxSpec::unified(18.0),
            ..Default::default()
        })
        .await
        .unwrap();

    // Sale: gross 590 at 18% → base 500, tax 90.
    db.sales()
        .record(NewSale {
            customer_name: Some("Walk-in".to_string()),
            quantity: 1.0,
            gross_amount: 590.0,
            tax: TaxSpec::unified(18.0),
            ..Default::default()
        })
        .await
        .unwrap();

    flour.id
}

/// Summary aggregates the three books into the net GST position.
#[tokio::test]
async fn summary_computes_net_tax_position() {
    let db = spawn_db().await;
    seed_books(&db).await;

    let summary = db.reports().summary().await.unwrap();

    assert!((summary.purchases.gross - 420.0).abs() < EPS);
    assert!((summary.purchases.base - 400.0).abs() < EPS);
    assert!((summary.purchases.tax - 20.0).abs() < EPS);
    assert!((summary.expenses.tax - 180.0).abs() < EPS);
    assert!((summary.sales.tax - 90.0).abs() < EPS);

    // input = 20 + 180, output = 90 → net payable is a credit of 110.
    assert!((summary.input_tax - 200.0).abs() < EPS);
    assert!((summary.output_tax - 90.0).abs() < EPS);
    assert!((summary.net_tax_payable + 110.0).abs() < EPS);
}

/// The balance sheet values inventory at quantity × current average cost
/// and scopes the flows to the period.
#[tokio::test]
async fn balance_sheet_values_inventory() {
    let db = spawn_db().await;
    seed_books(&db).await;

    let sheet = db.reports().balance_sheet(None, None).await.unwrap();

    // 5000 g at avg 420/5000 = 0.084 → value equals the gross paid.
    assert!((sheet.inventory_value - 420.0).abs() < EPS);
    assert!((sheet.purchases_base - 400.0).abs() < EPS);
    assert!((sheet.sales_base - 500.0).abs() < EPS);
    assert!((sheet.expenses_base - 1000.0).abs() < EPS);
    assert!((sheet.net_tax_payable + 110.0).abs() < EPS);
    assert!(sheet.period_start < sheet.period_end);
}

/// An explicit period excluding all records zeroes the flows but keeps the
/// as-of-now inventory valuation.
#[tokio::test]
async fn balance_sheet_period_scoping() {
    let db = spawn_db().await;
    seed_books(&db).await;

    let ancient_start = chrono::DateTime::parse_from_rfc3339("2000-04-01T00:00:00Z")
        .unwrap()
        .with_timezone(&chrono::Utc);
    let ancient_end = chrono::DateTime::parse_from_rfc3339("2001-03-31T23:59:59Z")
        .unwrap()
        .with_timezone(&chrono::Utc);

    let sheet = db
        .reports()
        .balance_sheet(Some(ancient_start), Some(ancient_end))
        .await
        .unwrap();

    assert!((sheet.purchases_base - 0.0).abs() < EPS);
    assert!((sheet.sales_base - 0.0).abs() < EPS);
    // Inventory is always current, not historical.
    assert!((sheet.inventory_value - 420.0).abs() < EPS);
}

/// P&L prices period consumption at the current average cost, exposes the
/// per-material breakdown, and carries the approximation caveat.
#[tokio::test]
async fn profit_loss_estimates_cogs_from_consumption() {
    let db = spawn_db().await;
    let flour_id = seed_books(&db).await;

    let product = db.products().create("Besan Ladoo").await.unwrap();
    common::single_line_recipe(&db, &product.id, &flour_id, 200.0).await;
    db.production().produce(&product.id, 10.0, None).await.unwrap();

    let pnl = db.reports().profit_loss(None, None).await.unwrap();

    assert!((pnl.revenue_base - 500.0).abs() < EPS);
    assert!((pnl.revenue_gross - 590.0).abs() < EPS);
    assert!((pnl.operating_expenses_base - 1000.0).abs() < EPS);

    // 2000 g consumed at the current avg of 0.084 → 168.
    assert_eq!(pnl.cogs_breakdown.len(), 1);
    let line = &pnl.cogs_breakdown[0];
    assert_eq!(line.material_id, flour_id);
    assert_eq!(line.name, "Flour");
    assert!((line.consumed_base - 2000.0).abs() < EPS);
    assert!((line.cost - 168.0).abs() < EPS);
    assert!((pnl.cogs_estimated - 168.0).abs() < EPS);

    assert!((pnl.gross_profit - (500.0 - 168.0)).abs() < EPS);
    assert!((pnl.net_profit_before_tax - (500.0 - 168.0 - 1000.0)).abs() < EPS);

    // The current-cost approximation must be called out.
    assert!(pnl
        .notes
        .iter()
        .any(|note| note.contains("current average cost")));
}

/// A P&L window with no production has an empty breakdown and zero COGS.
#[tokio::test]
async fn profit_loss_without_consumption() {
    let db = spawn_db().await;
    seed_books(&db).await;

    let pnl = db.reports().profit_loss(None, None).await.unwrap();

    assert!(pnl.cogs_breakdown.is_empty());
    assert!((pnl.cogs_estimated - 0.0).abs() < EPS);
    assert!((pnl.gross_profit - 500.0).abs() < EPS);
}

/// Every export kind renders a header row plus its data rows.
#[tokio::test]
async fn csv_exports_render() {
    let db = spawn_db().await;
    seed_books(&db).await;

    let purchases = db.reports().export_csv(ExportKind::Purchases).await.unwrap();
    let mut lines = purchases.lines();
    assert_eq!(
        lines.next().unwrap(),
        "Date,Supplier,MaterialId,QuantityBase,Total,BaseAmount,GST,GstRate"
    );
    assert_eq!(lines.count(), 1);

    let inventory = db.reports().export_csv(ExportKind::Inventory).await.unwrap();
    assert!(inventory.starts_with("Name,QuantityBase,AvgCostPerBase,Value,GstRate"));
    assert!(inventory.contains("Flour"));

    let sales = db.reports().export_csv(ExportKind::Sales).await.unwrap();
    assert!(sales.contains("Walk-in"));

    let expenses = db.reports().export_csv(ExportKind::Expenses).await.unwrap();
    assert!(expenses.contains("advertising"));

    let sheet = db
        .reports()
        .export_csv(ExportKind::BalanceSheet)
        .await
        .unwrap();
    assert_eq!(sheet.lines().count(), 2);
}

/// Fields containing commas or quotes survive the round trip quoted.
#[tokio::test]
async fn csv_escapes_delimiters() {
    let db = spawn_db().await;

    db.expenses()
        .record(NewExpense {
            category: Some("repairs, electrical".to_string()),
            description: Some("fixed the \"big\" mixer".to_string()),
            gross_amount: 500.0,
            ..Default::default()
        })
        .await
        .unwrap();

    let csv_text = db.reports().export_csv(ExportKind::Expenses).await.unwrap();
    assert!(csv_text.contains("\"repairs, electrical\""));
    assert!(csv_text.contains("\"fixed the \"\"big\"\" mixer\""));
}

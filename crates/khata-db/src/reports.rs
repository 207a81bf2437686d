//! # Financial Aggregator
//!
//! Read-only views over the purchase/sale/expense record books, the
//! inventory ledger, and the current material valuation. Nothing here is
//! cached or persisted: every report is a live scan, so edits and
//! reversals are always reflected.
//!
//! ## Views
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  summary()        all-time GST position                                │
//! │                   input tax = purchase GST + expense GST               │
//! │                   output tax = sale GST                                │
//! │                   net payable = output − input                         │
//! │                                                                        │
//! │  balance_sheet()  period flows (default: current FY, Apr 1 – Mar 31)  │
//! │                   + inventory valuation Σ qty × avg cost, AS OF NOW    │
//! │                                                                        │
//! │  profit_loss()    period (default: trailing 30 days)                  │
//! │                   revenue − COGS − operating expenses                  │
//! │                   COGS ≈ consumed base × CURRENT average cost          │
//! │                   (approximation: no historical cost layers)           │
//! │                                                                        │
//! │  export_csv()     purchases | sales | expenses | inventory |           │
//! │                   balance sheet                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reports take no material locks: they run under SQLite's read isolation
//! and may overlap with writers freely.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use khata_core::{Expense, Period, Purchase, RawMaterial, Sale, DEFAULT_PNL_WINDOW_DAYS};

// =============================================================================
// Report Shapes
// =============================================================================

/// Gross / base / tax sums for one record book.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowTotals {
    pub gross: f64,
    pub base: f64,
    pub tax: f64,
}

/// All-time GST position across the three record books.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountsSummary {
    pub purchases: FlowTotals,
    pub expenses: FlowTotals,
    pub sales: FlowTotals,
    /// GST paid on purchases and expenses (claimable input credit).
    pub input_tax: f64,
    /// GST collected on sales.
    pub output_tax: f64,
    /// Liability if positive, credit if negative.
    pub net_tax_payable: f64,
}

/// Period-scoped snapshot of flows plus the current inventory valuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSheet {
    pub generated_at: DateTime<Utc>,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    /// Σ quantity_base × avg_cost_per_base over active materials. Always
    /// "as of now": wastage and consumption are already reflected in the
    /// material quantities.
    pub inventory_value: f64,
    pub purchases_base: f64,
    pub purchases_tax: f64,
    pub sales_base: f64,
    pub sales_tax: f64,
    pub expenses_base: f64,
    pub expenses_tax: f64,
    pub input_tax: f64,
    pub output_tax: f64,
    pub net_tax_payable: f64,
}

/// Per-material cost line in the P&L COGS breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CogsLine {
    pub material_id: String,
    pub name: String,
    /// Base units consumed by production in the period.
    pub consumed_base: f64,
    /// Current (not historical) average cost per base unit.
    pub avg_cost_per_base: f64,
    pub cost: f64,
}

/// Period-scoped profit & loss approximation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfitLoss {
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub revenue_gross: f64,
    /// Revenue net of GST.
    pub revenue_base: f64,
    pub output_tax: f64,
    pub operating_expenses_base: f64,
    pub input_tax_expenses: f64,
    /// Σ consumed × current average cost over the period's
    /// production_consume rows.
    pub cogs_estimated: f64,
    pub gross_profit: f64,
    pub net_profit_before_tax: f64,
    pub cogs_breakdown: Vec<CogsLine>,
    /// Caveats a reader must see before trusting the numbers.
    pub notes: Vec<String>,
}

/// What `export_csv` can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExportKind {
    Purchases,
    Sales,
    Expenses,
    Inventory,
    BalanceSheet,
}

impl ExportKind {
    /// Parses the export type names used by the HTTP surface.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "purchases" => Some(ExportKind::Purchases),
            "sales" => Some(ExportKind::Sales),
            "expenses" => Some(ExportKind::Expenses),
            "inventory" => Some(ExportKind::Inventory),
            "balanceSheet" => Some(ExportKind::BalanceSheet),
            _ => None,
        }
    }
}

// =============================================================================
// Reports Repository
// =============================================================================

/// Read-only financial aggregator.
#[derive(Debug, Clone)]
pub struct ReportsRepository {
    pool: SqlitePool,
}

impl ReportsRepository {
    /// Creates a new ReportsRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReportsRepository { pool }
    }

    // =========================================================================
    // Summary
    // =========================================================================

    /// All-time sums and the resulting net GST position.
    pub async fn summary(&self) -> DbResult<AccountsSummary> {
        let purchases = self.flow_totals("purchases", None).await?;
        let expenses = self.flow_totals("expenses", None).await?;
        let sales = self.flow_totals("sales", None).await?;

        let input_tax = purchases.tax + expenses.tax;
        let output_tax = sales.tax;

        Ok(AccountsSummary {
            purchases,
            expenses,
            sales,
            input_tax,
            output_tax,
            net_tax_payable: output_tax - input_tax,
        })
    }

    // =========================================================================
    // Balance Sheet
    // =========================================================================

    /// Balance-sheet style snapshot.
    ///
    /// Flows are restricted to the period (default: the current Indian
    /// fiscal year); the inventory valuation is always current.
    pub async fn balance_sheet(
        &self,
        period_start: Option<DateTime<Utc>>,
        period_end: Option<DateTime<Utc>>,
    ) -> DbResult<BalanceSheet> {
        let now = Utc::now();
        let period = Period::or_else(period_start, period_end, || Period::fiscal_year(now));

        debug!(start = %period.start, end = %period.end, "Computing balance sheet");

        let inventory_value: f64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity_base * avg_cost_per_base), 0.0) \
             FROM raw_materials WHERE is_active = 1",
        )
        .fetch_one(&self.pool)
        .await?;

        let purchases = self.flow_totals("purchases", Some(period)).await?;
        let expenses = self.flow_totals("expenses", Some(period)).await?;
        let sales = self.flow_totals("sales", Some(period)).await?;

        let input_tax = purchases.tax + expenses.tax;
        let output_tax = sales.tax;

        Ok(BalanceSheet {
            generated_at: now,
            period_start: period.start,
            period_end: period.end,
            inventory_value,
            purchases_base: purchases.base,
            purchases_tax: purchases.tax,
            sales_base: sales.base,
            sales_tax: sales.tax,
            expenses_base: expenses.base,
            expenses_tax: expenses.tax,
            input_tax,
            output_tax,
            net_tax_payable: output_tax - input_tax,
        })
    }

    // =========================================================================
    // Profit & Loss
    // =========================================================================

    /// Profit & loss over the period (default: trailing 30 days).
    ///
    /// COGS is estimated from the period's `production_consume` ledger rows
    /// priced at each material's CURRENT average cost; historical cost
    /// layers are not retained, and the response says so in `notes`.
    pub async fn profit_loss(
        &self,
        period_start: Option<DateTime<Utc>>,
        period_end: Option<DateTime<Utc>>,
    ) -> DbResult<ProfitLoss> {
        let now = Utc::now();
        let period = Period::or_else(period_start, period_end, || {
            Period::trailing_days(now, DEFAULT_PNL_WINDOW_DAYS)
        });

        debug!(start = %period.start, end = %period.end, "Computing profit & loss");

        let sales = self.flow_totals("sales", Some(period)).await?;
        let expenses = self.flow_totals("expenses", Some(period)).await?;

        // Consumption per material in the period, joined to the current
        // average cost. Consume deltas are negative, so the sum is negated.
        let rows: Vec<(String, String, f64, f64)> = sqlx::query_as(
            r#"
            SELECT t.material_id, m.name, m.avg_cost_per_base, SUM(-t.delta_base)
            FROM inventory_transactions t
            JOIN raw_materials m ON m.id = t.material_id
            WHERE t.kind = 'production_consume'
              AND t.material_id IS NOT NULL
              AND t.created_at >= ?1 AND t.created_at <= ?2
            GROUP BY t.material_id, m.name, m.avg_cost_per_base
            ORDER BY m.name
            "#,
        )
        .bind(period.start)
        .bind(period.end)
        .fetch_all(&self.pool)
        .await?;

        let cogs_breakdown: Vec<CogsLine> = rows
            .into_iter()
            .map(|(material_id, name, avg_cost_per_base, consumed_base)| CogsLine {
                cost: consumed_base * avg_cost_per_base,
                material_id,
                name,
                consumed_base,
                avg_cost_per_base,
            })
            .collect();
        let cogs_estimated: f64 = cogs_breakdown.iter().map(|line| line.cost).sum();

        let gross_profit = sales.base - cogs_estimated;
        let net_profit_before_tax = gross_profit - expenses.base;

        Ok(ProfitLoss {
            period_start: period.start,
            period_end: period.end,
            revenue_gross: sales.gross,
            revenue_base: sales.base,
            output_tax: sales.tax,
            operating_expenses_base: expenses.base,
            input_tax_expenses: expenses.tax,
            cogs_estimated,
            gross_profit,
            net_profit_before_tax,
            cogs_breakdown,
            notes: vec![
                "COGS is an approximation using current average cost per base unit; \
                 historical cost layers are not tracked."
                    .to_string(),
                "Revenue uses sales base amount (net of GST).".to_string(),
                "Operating expenses use base amount (exclusive of GST).".to_string(),
            ],
        })
    }

    // =========================================================================
    // CSV Export
    // =========================================================================

    /// Renders one record book or report as CSV.
    pub async fn export_csv(&self, kind: ExportKind) -> DbResult<String> {
        debug!(?kind, "Exporting CSV");

        match kind {
            ExportKind::Purchases => self.export_purchases().await,
            ExportKind::Sales => self.export_sales().await,
            ExportKind::Expenses => self.export_expenses().await,
            ExportKind::Inventory => self.export_inventory().await,
            ExportKind::BalanceSheet => self.export_balance_sheet().await,
        }
    }

    async fn export_purchases(&self) -> DbResult<String> {
        let rows: Vec<Purchase> = sqlx::query_as(
            "SELECT id, supplier, material_id, quantity_base, gross_amount, base_amount, \
                    tax_amount, tax_rate, invoice_ref, notes, created_at, updated_at \
             FROM purchases ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record([
            "Date",
            "Supplier",
            "MaterialId",
            "QuantityBase",
            "Total",
            "BaseAmount",
            "GST",
            "GstRate",
        ])?;
        for row in rows {
            wtr.write_record([
                row.created_at.to_rfc3339(),
                row.supplier.unwrap_or_default(),
                row.material_id,
                num(row.quantity_base),
                num(row.gross_amount),
                num(row.base_amount),
                num(row.tax_amount),
                num(row.tax_rate),
            ])?;
        }
        finish(wtr)
    }

    async fn export_sales(&self) -> DbResult<String> {
        let rows: Vec<Sale> = sqlx::query_as(
            "SELECT id, customer_name, invoice_number, product_id, quantity, unit, \
                    gross_amount, base_amount, tax_amount, tax_rate, notes, created_at \
             FROM sales ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record([
            "Date",
            "Customer",
            "Invoice",
            "Quantity",
            "Unit",
            "Total",
            "BaseAmount",
            "GST",
            "GstRate",
        ])?;
        for row in rows {
            wtr.write_record([
                row.created_at.to_rfc3339(),
                row.customer_name.unwrap_or_default(),
                row.invoice_number.unwrap_or_default(),
                num(row.quantity),
                row.unit.map(|u| u.to_string()).unwrap_or_default(),
                num(row.gross_amount),
                num(row.base_amount),
                num(row.tax_amount),
                num(row.tax_rate),
            ])?;
        }
        finish(wtr)
    }

    async fn export_expenses(&self) -> DbResult<String> {
        let rows: Vec<Expense> = sqlx::query_as(
            "SELECT id, category, description, gross_amount, base_amount, tax_amount, \
                    tax_rate, invoice_ref, notes, created_at \
             FROM expenses ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record([
            "Date",
            "Category",
            "Description",
            "Total",
            "BaseAmount",
            "GST",
        ])?;
        for row in rows {
            wtr.write_record([
                row.created_at.to_rfc3339(),
                row.category.unwrap_or_default(),
                row.description.unwrap_or_default(),
                num(row.gross_amount),
                num(row.base_amount),
                num(row.tax_amount),
            ])?;
        }
        finish(wtr)
    }

    async fn export_inventory(&self) -> DbResult<String> {
        let rows: Vec<RawMaterial> = sqlx::query_as(
            "SELECT id, name, unit, quantity_base, reorder_threshold_base, avg_cost_per_base, \
                    gst_rate, is_active, created_at, updated_at \
             FROM raw_materials WHERE is_active = 1 ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record(["Name", "QuantityBase", "AvgCostPerBase", "Value", "GstRate"])?;
        for row in rows {
            wtr.write_record([
                row.name.clone(),
                num(row.quantity_base),
                num(row.avg_cost_per_base),
                num(row.stock_value()),
                num(row.gst_rate),
            ])?;
        }
        finish(wtr)
    }

    async fn export_balance_sheet(&self) -> DbResult<String> {
        let sheet = self.balance_sheet(None, None).await?;

        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record([
            "Timestamp",
            "StartPeriod",
            "EndPeriod",
            "InventoryValue",
            "PurchasesBase",
            "SalesBase",
            "ExpensesBase",
            "InputGST",
            "OutputGST",
            "NetGstPayable",
        ])?;
        wtr.write_record([
            sheet.generated_at.to_rfc3339(),
            sheet.period_start.to_rfc3339(),
            sheet.period_end.to_rfc3339(),
            num(sheet.inventory_value),
            num(sheet.purchases_base),
            num(sheet.sales_base),
            num(sheet.expenses_base),
            num(sheet.input_tax),
            num(sheet.output_tax),
            num(sheet.net_tax_payable),
        ])?;
        finish(wtr)
    }

    // =========================================================================
    // Internal
    // =========================================================================

    /// Gross/base/tax sums for one record book, optionally period-scoped.
    ///
    /// `table` is one of this module's fixed table names, never user input.
    async fn flow_totals(&self, table: &str, period: Option<Period>) -> DbResult<FlowTotals> {
        let (gross, base, tax): (f64, f64, f64) = match period {
            Some(period) => {
                sqlx::query_as(&format!(
                    "SELECT COALESCE(SUM(gross_amount), 0.0), COALESCE(SUM(base_amount), 0.0), \
                            COALESCE(SUM(tax_amount), 0.0) \
                     FROM {table} WHERE created_at >= ?1 AND created_at <= ?2"
                ))
                .bind(period.start)
                .bind(period.end)
                .fetch_one(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(&format!(
                    "SELECT COALESCE(SUM(gross_amount), 0.0), COALESCE(SUM(base_amount), 0.0), \
                            COALESCE(SUM(tax_amount), 0.0) \
                     FROM {table}"
                ))
                .fetch_one(&self.pool)
                .await?
            }
        };

        Ok(FlowTotals { gross, base, tax })
    }
}

fn num(value: f64) -> String {
    format!("{value}")
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> DbResult<String> {
    let bytes = wtr
        .into_inner()
        .map_err(|e| DbError::Internal(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| DbError::Internal(e.to_string()))
}

// =============================================================================
// Unit Tests
// =============================================================================

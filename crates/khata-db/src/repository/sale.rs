//! # Sales Record Book
//!
//! Outward taxable supplies. Sales never touch the material store; they are
//! recorded for the financial aggregator and share the GST decomposition
//! contract with purchases and expenses, so output tax is derived exactly
//! the way input tax is.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult, LedgerResult};
use khata_core::{validation, Sale, TaxSpec, Unit};

/// Column list shared by the sale queries.
const SALE_COLUMNS: &str = "id, customer_name, invoice_number, product_id, quantity, unit, \
     gross_amount, base_amount, tax_amount, tax_rate, notes, created_at";

/// Input for recording a sale.
#[derive(Debug, Clone, Default)]
pub struct NewSale {
    pub customer_name: Option<String>,
    pub invoice_number: Option<String>,
    pub product_id: Option<String>,
    /// Sold quantity (1 for generic invoices).
    pub quantity: f64,
    pub unit: Option<Unit>,
    /// Total price inclusive of GST.
    pub gross_amount: f64,
    /// Optional explicit tax specification; ad-hoc sales default to 0%.
    pub tax: TaxSpec,
    pub notes: Option<String>,
}

/// Repository for the sales record book.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Records a sale with derived base/tax amounts.
    pub async fn record(&self, input: NewSale) -> LedgerResult<Sale> {
        validation::validate_amount(input.gross_amount)?;

        // No persisted default for ad-hoc sales: unspecified rate means 0.
        let (rate, parts) = input.tax.decompose(input.gross_amount, 0.0);
        validation::validate_rate(rate)?;

        let sale = Sale {
            id: Uuid::new_v4().to_string(),
            customer_name: input.customer_name,
            invoice_number: input.invoice_number,
            product_id: input.product_id,
            quantity: if input.quantity > 0.0 {
                input.quantity
            } else {
                1.0
            },
            unit: input.unit,
            gross_amount: input.gross_amount,
            base_amount: parts.base,
            tax_amount: parts.tax,
            tax_rate: rate,
            notes: input.notes,
            created_at: Utc::now(),
        };

        debug!(sale_id = %sale.id, gross = sale.gross_amount, rate, "Recording sale");

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, customer_name, invoice_number, product_id, quantity, unit,
                gross_amount, base_amount, tax_amount, tax_rate, notes, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.customer_name)
        .bind(&sale.invoice_number)
        .bind(&sale.product_id)
        .bind(sale.quantity)
        .bind(sale.unit)
        .bind(sale.gross_amount)
        .bind(sale.base_amount)
        .bind(sale.tax_amount)
        .bind(sale.tax_rate)
        .bind(&sale.notes)
        .bind(sale.created_at)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(sale)
    }

    /// Lists sales, most recent first.
    pub async fn list(&self) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_record_decomposes_gst() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let sale = db
            .sales()
            .record(NewSale {
                customer_name: Some("Walk-in".into()),
                quantity: 2.0,
                gross_amount: 590.0,
                tax: TaxSpec::unified(18.0),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!((sale.base_amount - 500.0).abs() < 1e-9);
        assert!((sale.tax_amount - 90.0).abs() < 1e-9);
        assert_eq!(sale.tax_rate, 18.0);
    }

    #[tokio::test]
    async fn test_record_defaults_to_untaxed() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let sale = db
            .sales()
            .record(NewSale {
                gross_amount: 250.0,
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(sale.base_amount, 250.0);
        assert_eq!(sale.tax_amount, 0.0);
        assert_eq!(sale.quantity, 1.0);
    }
}

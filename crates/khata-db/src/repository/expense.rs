//! # Expense Record Book
//!
//! Non-inventory expenses (advertising, utilities, rent). Recorded for the
//! financial aggregator; the GST portion counts toward input tax exactly
//! like purchase GST does, via the shared decomposition.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult, LedgerResult};
use khata_core::{validation, Expense, TaxSpec};

/// Column list shared by the expense queries.
const EXPENSE_COLUMNS: &str = "id, category, description, gross_amount, base_amount, \
     tax_amount, tax_rate, invoice_ref, notes, created_at";

/// Input for recording an expense.
#[derive(Debug, Clone, Default)]
pub struct NewExpense {
    pub category: Option<String>,
    pub description: Option<String>,
    /// Total paid, inclusive of GST.
    pub gross_amount: f64,
    /// Optional explicit tax specification; ad-hoc expenses default to 0%.
    pub tax: TaxSpec,
    pub invoice_ref: Option<String>,
    pub notes: Option<String>,
}

/// Repository for the expense record book.
#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    pool: SqlitePool,
}

impl ExpenseRepository {
    /// Creates a new ExpenseRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ExpenseRepository { pool }
    }

    /// Records an expense with derived base/tax amounts.
    pub async fn record(&self, input: NewExpense) -> LedgerResult<Expense> {
        validation::validate_amount(input.gross_amount)?;

        let (rate, parts) = input.tax.decompose(input.gross_amount, 0.0);
        validation::validate_rate(rate)?;

        let expense = Expense {
            id: Uuid::new_v4().to_string(),
            category: input.category,
            description: input.description,
            gross_amount: input.gross_amount,
            base_amount: parts.base,
            tax_amount: parts.tax,
            tax_rate: rate,
            invoice_ref: input.invoice_ref,
            notes: input.notes,
            created_at: Utc::now(),
        };

        debug!(expense_id = %expense.id, gross = expense.gross_amount, rate, "Recording expense");

        sqlx::query(
            r#"
            INSERT INTO expenses (
                id, category, description, gross_amount, base_amount,
                tax_amount, tax_rate, invoice_ref, notes, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&expense.id)
        .bind(&expense.category)
        .bind(&expense.description)
        .bind(expense.gross_amount)
        .bind(expense.base_amount)
        .bind(expense.tax_amount)
        .bind(expense.tax_rate)
        .bind(&expense.invoice_ref)
        .bind(&expense.notes)
        .bind(expense.created_at)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(expense)
    }

    /// Lists expenses, most recent first.
    pub async fn list(&self) -> DbResult<Vec<Expense>> {
        let expenses = sqlx::query_as::<_, Expense>(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(expenses)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

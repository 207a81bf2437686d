//! # khata-db: Ledger Engine for Khata
//!
//! This crate provides the persistence layer and the inventory/accounts
//! ledger operations, on SQLite with sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Khata Data Flow                                  │
//! │                                                                         │
//! │  Caller (create_purchase, produce, record_wastage, reports)            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     khata-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ + locks.rs    │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SqlitePool    │    │ Purchases     │    │ 001_init.sql │  │   │
//! │  │   │ Storage       │◄───│ Production    │    │ ...          │  │   │
//! │  │   │ selection     │    │ Wastage       │    │              │  │   │
//! │  │   └───────────────┘    │ Reports       │    └──────────────┘  │   │
//! │  │                        └───────────────┘                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database (file-backed or in-memory, chosen by DbConfig)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool, storage selection, Database handle
//! - [`migrations`] - Embedded database migrations
//! - [`locks`] - Per-material write serialization
//! - [`error`] - DbError / LedgerError
//! - [`repository`] - Registry CRUD and the ledger engine operations
//! - [`reports`] - Financial aggregator (summary, balance sheet, P&L, CSV)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use khata_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/khata.db")).await?;
//!
//! let purchase = db.purchases().create(new_purchase).await?;
//! let receipt = db.production().produce(&product_id, 10.0, None).await?;
//! let pnl = db.reports().profit_loss(None, None).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod locks;
pub mod migrations;
pub mod pool;
pub mod reports;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult, LedgerError, LedgerResult};
pub use pool::{Database, DbConfig, Storage};

// Repository re-exports for convenience
pub use repository::expense::{ExpenseRepository, NewExpense};
pub use repository::material::{MaterialRepository, MaterialUpdate, NewMaterial};
pub use repository::product::ProductRepository;
pub use repository::production::{ProductionEngine, ProductionReceipt};
pub use repository::purchase::{NewPurchase, PurchaseEdit, PurchaseRepository};
pub use repository::recipe::{NewRecipeLine, RecipeRepository};
pub use repository::sale::{NewSale, SaleRepository};
pub use repository::transaction::TransactionRepository;
pub use repository::wastage::{WastageRecorder, WastageRequest};

// Report re-exports
pub use reports::{
    AccountsSummary, BalanceSheet, CogsLine, ExportKind, ProfitLoss, ReportsRepository,
};

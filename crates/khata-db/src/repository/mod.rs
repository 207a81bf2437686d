//! # Repository Module
//!
//! Database repository implementations for the Khata ledger engine.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  Caller                                                                │
//! │       │                                                                 │
//! │       │  db.purchases().create(input)                                  │
//! │       ▼                                                                 │
//! │  PurchaseRepository                                                    │
//! │  ├── create(&self, input)     ← lock + transaction + ledger append    │
//! │  ├── edit(&self, id, changes)                                          │
//! │  └── reverse(&self, id)                                                │
//! │       │                                                                 │
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Engine repositories (purchase, production, wastage) own the per-      │
//! │  material exclusive scope and write the audit ledger in the same       │
//! │  database transaction as the stock mutation.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`material::MaterialRepository`] - Raw material registry + low stock
//! - [`purchase::PurchaseRepository`] - Purchase create/edit/reverse
//! - [`recipe::RecipeRepository`] - Per-product bill of materials
//! - [`product::ProductRepository`] - Finished-goods stock registry
//! - [`production::ProductionEngine`] - Recipe-driven production
//! - [`wastage::WastageRecorder`] - Reason-coded stock write-offs
//! - [`transaction::TransactionRepository`] - Append-only audit ledger
//! - [`sale::SaleRepository`] / [`expense::ExpenseRepository`] - Record books
//!   feeding the financial aggregator

pub mod expense;
pub mod material;
pub mod product;
pub mod production;
pub mod purchase;
pub mod recipe;
pub mod sale;
pub mod transaction;
pub mod wastage;

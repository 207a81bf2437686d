//! # khata-core: Pure Business Logic for the Khata Ledger Engine
//!
//! This crate is the **heart** of Khata. It contains all business logic
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Khata Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     Caller (API / admin UI)                     │   │
//! │  │  create_purchase, produce, record_wastage, reports, exports    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                ★ khata-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   units   │  │    tax    │  │   types   │  │ validation│  │   │
//! │  │   │  to_base  │  │ decompose │  │ materials │  │   rules   │  │   │
//! │  │   │  g/kg/ml  │  │ GST rates │  │ ledger tx │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    khata-db (Ledger Engine)                     │   │
//! │  │       SQLite queries, migrations, repositories, reports         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (RawMaterial, Purchase, InventoryTransaction, ...)
//! - [`units`] - Unit normalization into the single base unit
//! - [`tax`] - GST rate resolution and gross-amount decomposition
//! - [`period`] - Reporting period helpers (fiscal year, trailing window)
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **One Base Unit**: All quantities normalize to grams-equivalent before storage
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use khata_core::tax::decompose;
//! use khata_core::units::Unit;
//!
//! // Normalize a purchase entered in kilograms
//! let quantity_base = Unit::Kg.to_base(5.0); // 5000 g
//!
//! // Split a tax-inclusive total at 5% GST
//! let parts = decompose(420.0, 5.0);
//! assert!((parts.base - 400.0).abs() < 1e-9);
//! assert!((parts.tax - 20.0).abs() < 1e-9);
//! # let _ = quantity_base;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod period;
pub mod tax;
pub mod types;
pub mod units;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use khata_core::Unit` instead of
// `use khata_core::units::Unit`

pub use error::{CoreError, CoreResult, ValidationError};
pub use period::Period;
pub use tax::{decompose, TaxBreakdown, TaxSpec};
pub use types::*;
pub use units::Unit;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default reporting window, in days, for the profit & loss view.
pub const DEFAULT_PNL_WINDOW_DAYS: i64 = 30;

/// Maximum wastage rows returned by the wastage listing.
///
/// ## Business Reason
/// Wastage history grows without bound; the listing is a recent-activity
/// view, not an export (use the CSV export for full history).
pub const WASTAGE_LIST_LIMIT: u32 = 200;

//! # Error Types
//!
//! Domain-specific error types for khata-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  khata-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  khata-db errors (separate crate)                                      │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── LedgerError      - CoreError or DbError, from engine operations   │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → LedgerError → Caller              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (material id, available/requested)
//! 3. Errors are enum variants, never String
//! 4. Nothing is retried automatically: insufficiency and negative-inventory
//!    conditions go back to the caller for a decision

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic failures.
/// They should be caught and translated to user-friendly messages.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Raw material cannot be found (unknown id or soft-deleted).
    #[error("Material not found: {0}")]
    MaterialNotFound(String),

    /// Product cannot be found.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Purchase record cannot be found.
    #[error("Purchase not found: {0}")]
    PurchaseNotFound(String),

    /// Production was requested for a product with no recipe rows.
    #[error("No recipe defined for product {0}")]
    NoRecipeDefined(String),

    /// A production precheck found a recipe line the stock cannot cover.
    ///
    /// ## When This Occurs
    /// - `produce()` computed `needed = base_per_unit × units` for a line
    ///   and the referenced material holds less than that
    ///
    /// The whole production fails; no material is consumed.
    #[error(
        "Insufficient material {material_id}: available {available_base}, needed {needed_base}"
    )]
    InsufficientMaterial {
        material_id: String,
        available_base: f64,
        needed_base: f64,
    },

    /// Wastage was requested for more material stock than is held.
    #[error("Insufficient stock for {name}: available {available}, requested {requested}")]
    InsufficientStock {
        name: String,
        available: f64,
        requested: f64,
    },

    /// An edit, reversal, or product wastage would drive stock below zero.
    ///
    /// ## When This Occurs
    /// - Purchase edit shrinks a quantity that has already been consumed
    /// - Purchase reversal after the stock was used up
    /// - Product wastage larger than `stock_units` / `stock_mass_base`
    #[error("{entity}: operation would drive stock negative ({current} {delta:+})")]
    NegativeInventory {
        entity: String,
        current: f64,
        delta: f64,
    },

    /// Wastage must target exactly one of material or product.
    #[error("Wastage must reference exactly one of material or product")]
    AmbiguousWastageTarget,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Unit string is not one of g/kg/ml/l/pcs.
    #[error("Invalid unit: '{0}'")]
    InvalidUnit(String),

    /// Quantity must be a positive, finite number.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(f64),

    /// Monetary amount must be a positive, finite number.
    #[error("Invalid amount: {0}")]
    InvalidAmount(f64),

    /// Produced unit count must be positive.
    #[error("Invalid units produced: {0}")]
    InvalidUnits(f64),

    /// GST rate must lie in 0..=100 percent.
    #[error("Invalid GST rate: {0}")]
    InvalidRate(f64),

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientMaterial {
            material_id: "mat-1".to_string(),
            available_base: 150.0,
            needed_base: 200.0,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient material mat-1: available 150, needed 200"
        );
    }

    #[test]
    fn test_negative_inventory_message() {
        let err = CoreError::NegativeInventory {
            entity: "Flour".to_string(),
            current: 100.0,
            delta: -250.0,
        };
        assert_eq!(
            err.to_string(),
            "Flour: operation would drive stock negative (100 -250)"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::InvalidUnit("oz".to_string());
        assert_eq!(err.to_string(), "Invalid unit: 'oz'");

        let err = ValidationError::Required {
            field: "name".to_string(),
        };
        assert_eq!(err.to_string(), "name is required");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::InvalidQuantity(-3.0);
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}

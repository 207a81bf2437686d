//! # Unit Normalizer
//!
//! Converts user-entered quantities into the single internal base unit.
//!
//! ## Why One Base Unit?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Purchases arrive in kg, recipes are written in g, wastage might be    │
//! │  entered in ml. Storing mixed units invites silent 1000× errors.       │
//! │                                                                        │
//! │  Every quantity is converted ONCE, at the boundary:                    │
//! │                                                                        │
//! │    2.5 kg ──► to_base ──► 2500 g                                       │
//! │    750 ml ──► to_base ──►  750 (ml treated as grams-equivalent)        │
//! │     12 pcs ─► to_base ──►   12 (piece count stored directly)           │
//! │                                                                        │
//! │  The rest of the engine only ever sees base quantities.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

// =============================================================================
// Unit
// =============================================================================

/// A display unit for material quantities.
///
/// `G` is the canonical base unit; `Ml` is its volume analog (stored in the
/// same base field), and `Pcs` is a direct piece count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    /// Grams (base unit).
    G,
    /// Kilograms (×1000).
    Kg,
    /// Milliliters (base unit for liquids).
    Ml,
    /// Liters (×1000).
    L,
    /// Pieces (direct count).
    Pcs,
}

impl Unit {
    /// Multiplier from this unit to the base unit.
    #[inline]
    pub const fn base_factor(&self) -> f64 {
        match self {
            Unit::G | Unit::Ml | Unit::Pcs => 1.0,
            Unit::Kg | Unit::L => 1000.0,
        }
    }

    /// Converts a value in this unit to the base unit.
    ///
    /// ## Example
    /// ```rust
    /// use khata_core::units::Unit;
    ///
    /// assert_eq!(Unit::Kg.to_base(2.5), 2500.0);
    /// assert_eq!(Unit::G.to_base(40.0), 40.0);
    /// assert_eq!(Unit::Pcs.to_base(12.0), 12.0);
    /// ```
    #[inline]
    pub fn to_base(&self, value: f64) -> f64 {
        value * self.base_factor()
    }

    /// Whether this unit counts discrete pieces rather than mass/volume.
    #[inline]
    pub const fn is_piece(&self) -> bool {
        matches!(self, Unit::Pcs)
    }

    /// Canonical short name ("g", "kg", "ml", "l", "pcs").
    pub const fn as_str(&self) -> &'static str {
        match self {
            Unit::G => "g",
            Unit::Kg => "kg",
            Unit::Ml => "ml",
            Unit::L => "l",
            Unit::Pcs => "pcs",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Unit {
    type Err = ValidationError;

    /// Parses a unit string; anything outside the supported set fails with
    /// `ValidationError::InvalidUnit`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "g" => Ok(Unit::G),
            "kg" => Ok(Unit::Kg),
            "ml" => Ok(Unit::Ml),
            "l" => Ok(Unit::L),
            "pcs" => Ok(Unit::Pcs),
            other => Err(ValidationError::InvalidUnit(other.to_string())),
        }
    }
}

impl Default for Unit {
    fn default() -> Self {
        Unit::G
    }
}

/// Converts a (value, unit-string) pair to a base quantity.
///
/// This is the boundary function used before any stock mutation: it parses
/// the unit and applies the conversion in one step.
///
/// ## Example
/// ```rust
/// use khata_core::units::to_base;
///
/// assert_eq!(to_base(2.0, "kg").unwrap(), 2000.0);
/// assert!(to_base(2.0, "stone").is_err());
/// ```
pub fn to_base(value: f64, unit: &str) -> Result<f64, ValidationError> {
    let unit: Unit = unit.parse()?;
    Ok(unit.to_base(value))
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # Tax Decomposition Engine
//!
//! Splits a gross (tax-inclusive) amount into a net base amount and a GST
//! amount. This module is shared verbatim by purchases, sales, and expenses
//! so the three ledgers derive taxes identically.
//!
//! ## Decomposition
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  gross = ₹420, rate = 5%                                               │
//! │                                                                        │
//! │      base = gross / (1 + rate/100) = 420 / 1.05 = ₹400                 │
//! │      tax  = gross − base           = ₹20                               │
//! │                                                                        │
//! │  rate = 0 short-circuits: base = gross, tax = 0.                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rate resolution order
//! 1. Explicit IGST rate, if positive (inter-region; excludes CGST/SGST)
//! 2. Explicit CGST + SGST sum, if positive (intra-region split)
//! 3. Caller-supplied unified override rate (an explicit 0 means tax-free)
//! 4. The persisted default (material `gst_rate`, or 0 for ad-hoc records)

use serde::{Deserialize, Serialize};

// =============================================================================
// Tax Breakdown
// =============================================================================

/// Result of decomposing a gross amount.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaxBreakdown {
    /// Net amount excluding GST.
    pub base: f64,
    /// GST portion (`gross − base`).
    pub tax: f64,
}

/// Decomposes a tax-inclusive gross amount at the given percentage rate.
///
/// ## Example
/// ```rust
/// use khata_core::tax::decompose;
///
/// let parts = decompose(420.0, 5.0);
/// assert!((parts.base - 400.0).abs() < 1e-9);
/// assert!((parts.tax - 20.0).abs() < 1e-9);
///
/// let untaxed = decompose(300.0, 0.0);
/// assert_eq!(untaxed.base, 300.0);
/// assert_eq!(untaxed.tax, 0.0);
/// ```
pub fn decompose(gross: f64, rate_percent: f64) -> TaxBreakdown {
    if rate_percent == 0.0 {
        return TaxBreakdown {
            base: gross,
            tax: 0.0,
        };
    }
    let base = gross / (1.0 + rate_percent / 100.0);
    TaxBreakdown {
        base,
        tax: gross - base,
    }
}

// =============================================================================
// Tax Spec
// =============================================================================

/// Caller-supplied rate specification for a taxable record.
///
/// All fields are optional; [`TaxSpec::resolve`] applies the documented
/// priority order against a persisted default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaxSpec {
    /// Inter-region GST rate. If positive it alone determines the rate and
    /// the CGST/SGST split is forced to zero.
    pub igst: Option<f64>,
    /// Central GST rate (half of an intra-region split).
    pub cgst: Option<f64>,
    /// State GST rate (the other half).
    pub sgst: Option<f64>,
    /// Unified override rate. An explicit `Some(0.0)` means tax-free.
    pub rate: Option<f64>,
}

impl TaxSpec {
    /// A spec with only a unified override rate.
    pub fn unified(rate: f64) -> Self {
        TaxSpec {
            rate: Some(rate),
            ..Default::default()
        }
    }

    /// A spec with an intra-region CGST+SGST split.
    pub fn split(cgst: f64, sgst: f64) -> Self {
        TaxSpec {
            cgst: Some(cgst),
            sgst: Some(sgst),
            ..Default::default()
        }
    }

    /// A spec with an inter-region IGST rate.
    pub fn igst(rate: f64) -> Self {
        TaxSpec {
            igst: Some(rate),
            ..Default::default()
        }
    }

    /// Resolves the effective percentage rate against a persisted default.
    ///
    /// ## Resolution
    /// IGST (if > 0) → CGST+SGST (if the sum > 0) → override rate (explicit
    /// zero honored) → `default_rate`.
    pub fn resolve(&self, default_rate: f64) -> f64 {
        if let Some(igst) = self.igst {
            if igst > 0.0 {
                return igst;
            }
        }
        let split = self.cgst.unwrap_or(0.0) + self.sgst.unwrap_or(0.0);
        if split > 0.0 {
            return split;
        }
        if let Some(rate) = self.rate {
            return rate;
        }
        default_rate
    }

    /// Resolves the rate, then decomposes the gross amount at it.
    pub fn decompose(&self, gross: f64, default_rate: f64) -> (f64, TaxBreakdown) {
        let rate = self.resolve(default_rate);
        (rate, decompose(gross, rate))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

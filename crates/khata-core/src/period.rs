//! # Reporting Periods
//!
//! Calendar-range helpers for the financial reports. Periods are plain
//! ranges, not formal fiscal-close batches: the balance sheet defaults to
//! the current Indian fiscal year (Apr 1 – Mar 31) and profit & loss to the
//! trailing 30 days.

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// An inclusive calendar range used to scope report scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Period {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Period { start, end }
    }

    /// The Indian fiscal year containing `now`: Apr 1 00:00:00 through
    /// Mar 31 23:59:59 of the following calendar year.
    ///
    /// ## Example
    /// ```rust
    /// use chrono::{TimeZone, Utc};
    /// use khata_core::period::Period;
    ///
    /// let feb = Utc.with_ymd_and_hms(2026, 2, 10, 12, 0, 0).unwrap();
    /// let fy = Period::fiscal_year(feb);
    /// assert_eq!(fy.start, Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap());
    ///
    /// let aug = Utc.with_ymd_and_hms(2026, 8, 6, 12, 0, 0).unwrap();
    /// let fy = Period::fiscal_year(aug);
    /// assert_eq!(fy.start, Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap());
    /// ```
    pub fn fiscal_year(now: DateTime<Utc>) -> Self {
        // Jan/Feb/Mar fall in the fiscal year that started the previous April.
        let start_year = if now.month() >= 4 {
            now.year()
        } else {
            now.year() - 1
        };
        Period {
            start: Utc.with_ymd_and_hms(start_year, 4, 1, 0, 0, 0).unwrap(),
            end: Utc
                .with_ymd_and_hms(start_year + 1, 3, 31, 23, 59, 59)
                .unwrap(),
        }
    }

    /// The trailing window of `days` days ending at `now`.
    pub fn trailing_days(now: DateTime<Utc>, days: i64) -> Self {
        Period {
            start: now - Duration::days(days),
            end: now,
        }
    }

    /// Fills missing bounds: both given → as-is, otherwise the fallback.
    pub fn or_else(
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        fallback: impl FnOnce() -> Period,
    ) -> Self {
        match (start, end) {
            (Some(start), Some(end)) => Period { start, end },
            _ => fallback(),
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fiscal_year_after_april() {
        let now = Utc.with_ymd_and_hms(2026, 8, 6, 10, 0, 0).unwrap();
        let fy = Period::fiscal_year(now);
        assert_eq!(fy.start, Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap());
        assert_eq!(
            fy.end,
            Utc.with_ymd_and_hms(2027, 3, 31, 23, 59, 59).unwrap()
        );
        assert!(fy.contains(now));
    }

    #[test]
    fn test_fiscal_year_before_april() {
        let now = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        let fy = Period::fiscal_year(now);
        assert_eq!(fy.start, Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap());
        assert_eq!(
            fy.end,
            Utc.with_ymd_and_hms(2026, 3, 31, 23, 59, 59).unwrap()
        );
    }

    #[test]
    fn test_fiscal_year_april_first_boundary() {
        let now = Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap();
        let fy = Period::fiscal_year(now);
        assert_eq!(fy.start, now);
    }

    #[test]
    fn test_trailing_days() {
        let now = Utc.with_ymd_and_hms(2026, 8, 6, 10, 0, 0).unwrap();
        let window = Period::trailing_days(now, 30);
        assert_eq!(window.end, now);
        assert_eq!(window.start, now - Duration::days(30));
        assert!(window.contains(now - Duration::days(29)));
        assert!(!window.contains(now - Duration::days(31)));
    }

    #[test]
    fn test_or_else_requires_both_bounds() {
        let now = Utc.with_ymd_and_hms(2026, 8, 6, 10, 0, 0).unwrap();
        let explicit = Period::or_else(
            Some(now - Duration::days(7)),
            Some(now),
            || Period::fiscal_year(now),
        );
        assert_eq!(explicit.start, now - Duration::days(7));

        let fallback = Period::or_else(Some(now), None, || Period::trailing_days(now, 30));
        assert_eq!(fallback.start, now - Duration::days(30));
    }
}

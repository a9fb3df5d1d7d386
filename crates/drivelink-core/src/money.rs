//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely, and the
//! `ProfitLoss` summary derived from the revenue/expense ledgers.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A fleet ledger summed as floats drifts a little on every entry.        │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Amounts are stored and summed as i64 minor units; only the           │
//! │    profit margin is ever a float, and only for display.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use drivelink_core::money::Money;
//!
//! // Create from cents (preferred)
//! let fare = Money::from_cents(1099); // 10.99
//!
//! // Arithmetic operations
//! let total = fare + Money::from_cents(500); // 15.99
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for corrections and losses
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use drivelink_core::money::Money;
    ///
    /// let fare = Money::from_cents(1099); // Represents 10.99
    /// assert_eq!(fare.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Zero amount.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion (e.g. whole dollars/birr).
    #[inline]
    pub const fn major_units(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor_units(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Checks if the amount is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the amount is negative (a net loss).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for Money {
    /// Formats as a plain decimal (`1234` cents → `"12.34"`).
    ///
    /// Currency symbols belong to the presentation layer; this type only
    /// knows minor units.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major_units().abs(), self.minor_units())
    }
}

// =============================================================================
// Arithmetic
// =============================================================================

impl Add for Money {
    type Output = Money;

    #[inline]
    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    #[inline]
    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    #[inline]
    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        Money(iter.map(|m| m.0).sum())
    }
}

// =============================================================================
// Profit / Loss Summary
// =============================================================================

/// Profit/loss summary for one car over an optional date range.
///
/// ## Arithmetic Contract
/// ```text
/// profit        = total_revenue - total_expenses
/// profit_margin = total_revenue > 0 ? profit / total_revenue * 100 : 0
/// ```
/// The margin is the only floating-point value in the finance path and is
/// computed once, from integer totals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProfitLoss {
    pub total_revenue: Money,
    pub total_expenses: Money,
    pub profit: Money,
    /// Percentage, e.g. 60.0 for a 60% margin.
    pub profit_margin: f64,
}

impl ProfitLoss {
    /// Derives the summary from ledger totals.
    pub fn from_totals(total_revenue: Money, total_expenses: Money) -> Self {
        let profit = total_revenue - total_expenses;
        let profit_margin = if total_revenue.cents() > 0 {
            profit.cents() as f64 / total_revenue.cents() as f64 * 100.0
        } else {
            0.0
        };

        ProfitLoss {
            total_revenue,
            total_expenses,
            profit,
            profit_margin,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_arithmetic() {
        let a = Money::from_cents(1099);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1599);
        assert_eq!((a - b).cents(), 599);
        assert_eq!((b - a).cents(), -599);
        assert!((b - a).is_negative());
    }

    #[test]
    fn test_money_sum() {
        let total: Money = [100, 250, 399]
            .into_iter()
            .map(Money::from_cents)
            .sum();
        assert_eq!(total.cents(), 749);
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_cents(1234).to_string(), "12.34");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
    }

    #[test]
    fn test_profit_loss_arithmetic() {
        // 1000.00 revenue, 400.00 expenses → 600.00 profit, 60% margin
        let pl = ProfitLoss::from_totals(Money::from_cents(100_000), Money::from_cents(40_000));
        assert_eq!(pl.profit.cents(), 60_000);
        assert!((pl.profit_margin - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_profit_loss_zero_revenue() {
        let pl = ProfitLoss::from_totals(Money::zero(), Money::from_cents(5_000));
        assert_eq!(pl.profit.cents(), -5_000);
        assert_eq!(pl.profit_margin, 0.0);
    }

    #[test]
    fn test_profit_loss_negative_margin() {
        // Expenses exceed revenue: margin goes negative, not clamped.
        let pl = ProfitLoss::from_totals(Money::from_cents(50_000), Money::from_cents(75_000));
        assert_eq!(pl.profit.cents(), -25_000);
        assert!((pl.profit_margin - (-50.0)).abs() < f64::EPSILON);
    }
}

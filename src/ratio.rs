//! Covered/total pairs and their arithmetic.
//!
//! Ratios at the same level combine by adding both components. Percentages
//! are only ever derived, never averaged, so large files weigh more than
//! small ones.
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::Serialize;

use crate::error::{CovtreeError, Result};

/// Compute a coverage rate, returning 0.0 when the total is zero.
#[must_use]
pub fn rate(covered: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        covered as f64 / total as f64
    }
}

/// A `covered` out of `total` measurement. `covered <= total` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Ratio {
    covered: u64,
    total: u64,
}

impl Ratio {
    /// The identity for [`Ratio::combine`]: nothing measured.
    pub const UNSET: Ratio = Ratio {
        covered: 0,
        total: 0,
    };

    /// Create a ratio, rejecting `covered > total`.
    pub fn new(covered: u64, total: u64) -> Result<Self> {
        if covered > total {
            return Err(CovtreeError::InconsistentRatio { covered, total });
        }
        Ok(Self { covered, total })
    }

    /// A single countable element that was either hit or not: `1/1` or `0/1`.
    #[must_use]
    pub fn single(hit: bool) -> Self {
        Self {
            covered: u64::from(hit),
            total: 1,
        }
    }

    pub fn covered(&self) -> u64 {
        self.covered
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn missed(&self) -> u64 {
        self.total - self.covered
    }

    pub fn is_set(&self) -> bool {
        self.total > 0
    }

    /// Covered fraction in `0.0..=1.0`, or `None` when nothing was measured.
    #[must_use]
    pub fn covered_percentage(&self) -> Option<f64> {
        self.is_set().then(|| rate(self.covered, self.total))
    }

    /// `1 - covered_percentage`, or `None` when nothing was measured.
    #[must_use]
    pub fn missed_percentage(&self) -> Option<f64> {
        self.covered_percentage().map(|p| 1.0 - p)
    }

    /// Covered percentage scaled to `0.0..=100.0`.
    #[must_use]
    pub fn percentage_points(&self) -> Option<f64> {
        self.covered_percentage().map(|p| p * 100.0)
    }

    /// Component-wise sum. Combining with an unset ratio returns the other
    /// operand unchanged.
    #[must_use]
    pub fn combine(self, other: Ratio) -> Ratio {
        Ratio {
            covered: self.covered + other.covered,
            total: self.total + other.total,
        }
    }
}

impl Add for Ratio {
    type Output = Ratio;

    fn add(self, rhs: Ratio) -> Ratio {
        self.combine(rhs)
    }
}

impl AddAssign for Ratio {
    fn add_assign(&mut self, rhs: Ratio) {
        *self = self.combine(rhs);
    }
}

impl Sum for Ratio {
    fn sum<I: Iterator<Item = Ratio>>(iter: I) -> Ratio {
        iter.fold(Ratio::UNSET, Ratio::combine)
    }
}

impl<'a> Sum<&'a Ratio> for Ratio {
    fn sum<I: Iterator<Item = &'a Ratio>>(iter: I) -> Ratio {
        iter.copied().sum()
    }
}

impl std::fmt::Display for Ratio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.percentage_points() {
            Some(pct) => write!(f, "{}/{} ({pct:.1}%)", self.covered, self.total),
            None => f.write_str("n/a"),
        }
    }
}

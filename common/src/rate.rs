//! Directed, dated exchange-rate observations.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::currency::CurrencyCode;
use crate::identifiers::RateId;
use crate::time;

/// Default number of fractional digits kept for rate factors.
pub const DEFAULT_DECIMAL_SCALE: u32 = 4;

/// Largest scale a `Decimal` can represent.
pub const MAX_DECIMAL_SCALE: u32 = 28;

/// Compute the reciprocal of a factor at the given scale.
///
/// A zero factor has a zero reciprocal.
pub fn reciprocal_factor(factor: Decimal, scale: u32) -> Decimal {
    if factor.is_zero() {
        return Decimal::ZERO;
    }
    (Decimal::ONE / factor).round_dp(scale)
}

/// Identity of a rate observation: at most one record exists per key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RateKey {
    /// Currency being converted from.
    pub from: CurrencyCode,
    /// Currency being converted to.
    pub to: CurrencyCode,
    /// Calendar date of the observation.
    pub date: NaiveDate,
}

impl RateKey {
    /// Create a new rate key.
    pub fn new(from: CurrencyCode, to: CurrencyCode, date: NaiveDate) -> Self {
        Self { from, to, date }
    }

    /// Key of the inverse-direction observation on the same date.
    pub fn reciprocal(&self) -> Self {
        Self {
            from: self.to.clone(),
            to: self.from.clone(),
            date: self.date,
        }
    }

    /// Whether both ends name the same currency.
    pub fn is_self_rate(&self) -> bool {
        self.from == self.to
    }
}

impl fmt::Display for RateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} ({})", self.from, self.to, self.date)
    }
}

/// A rate observation that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRate {
    /// Currency being converted from.
    pub from: CurrencyCode,
    /// Currency being converted to.
    pub to: CurrencyCode,
    /// 1 unit of `from` equals `factor` units of `to`.
    pub factor: Decimal,
    /// Observation date; today when absent.
    pub date: Option<NaiveDate>,
}

impl NewRate {
    /// Create a rate observation dated today.
    pub fn new(from: CurrencyCode, to: CurrencyCode, factor: Decimal) -> Self {
        Self {
            from,
            to,
            factor,
            date: None,
        }
    }

    /// Set the observation date.
    pub fn on(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Resolve the storage key, defaulting the date to today.
    pub fn key(&self) -> RateKey {
        RateKey::new(
            self.from.clone(),
            self.to.clone(),
            self.date.unwrap_or_else(time::today),
        )
    }
}

/// A stored rate observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateRecord {
    /// Record identity, stable across updates.
    pub id: RateId,
    /// Currency being converted from.
    pub from: CurrencyCode,
    /// Currency being converted to.
    pub to: CurrencyCode,
    /// 1 unit of `from` equals `factor` units of `to`.
    pub factor: Decimal,
    /// Calendar date of the observation.
    pub date: NaiveDate,
}

impl RateRecord {
    /// Create a new record with a fresh identity.
    pub fn new(key: RateKey, factor: Decimal) -> Self {
        Self {
            id: RateId::new(),
            from: key.from,
            to: key.to,
            factor,
            date: key.date,
        }
    }

    /// Storage key of this record.
    pub fn key(&self) -> RateKey {
        RateKey::new(self.from.clone(), self.to.clone(), self.date)
    }
}

impl fmt::Display for RateRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} {} ({})", self.from, self.to, self.factor, self.date)
    }
}

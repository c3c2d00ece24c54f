//! Currency types for Ratebook.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RatebookError;

/// Maximum length of a currency code.
pub const MAX_CODE_LEN: usize = 3;

/// Short uppercase currency identifier (e.g. `USD`).
///
/// Codes are normalized to uppercase on construction, so `"eur"` and `"EUR"`
/// name the same currency.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Parse and validate a currency code.
    pub fn parse(code: &str) -> Result<Self, RatebookError> {
        let code = code.trim().to_uppercase();

        if code.is_empty()
            || code.len() > MAX_CODE_LEN
            || !code.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(RatebookError::InvalidCurrencyCode(code));
        }

        Ok(Self(code))
    }

    /// Get the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CurrencyCode {
    type Err = RatebookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = RatebookError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

impl AsRef<str> for CurrencyCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A currency known to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    /// Unique currency code.
    pub code: CurrencyCode,
    /// Display name.
    pub name: String,
    /// Display symbol, may be empty.
    pub symbol: String,
    /// Whether this is the base currency.
    pub is_base: bool,
}

impl Currency {
    /// Create a new, non-base currency.
    pub fn new(code: CurrencyCode, name: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            code,
            name: name.into(),
            symbol: symbol.into(),
            is_base: false,
        }
    }

    /// Mark this currency as the base currency.
    pub fn as_base(mut self) -> Self {
        self.is_base = true;
        self
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)
    }
}

//! Conversion requests and results.

use ratebook_common::{Currency, CurrencyCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A request to convert an amount of a resolved currency into a target code.
///
/// The target is a raw code; it is resolved against the store at conversion
/// time and an unknown code yields an unreachable result.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub source: Currency,
    pub target: String,
    pub amount: Decimal,
}

impl ConversionRequest {
    /// Convert one unit of `source` into `target`.
    pub fn new(source: Currency, target: impl Into<String>) -> Self {
        Self {
            source,
            target: target.into(),
            amount: Decimal::ONE,
        }
    }

    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.amount = amount;
        self
    }
}

/// Outcome of a conversion.
///
/// When no path exists `path` and `factor` are `None` and `amount` echoes the
/// input amount unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversion {
    /// Currencies visited, source first and target last.
    pub path: Option<Vec<CurrencyCode>>,
    /// Product of the edge factors along `path`.
    pub factor: Option<Decimal>,
    /// Converted amount, or the input amount if unreachable.
    pub amount: Decimal,
}

impl Conversion {
    pub fn found(path: Vec<CurrencyCode>, factor: Decimal, amount: Decimal) -> Self {
        Self {
            path: Some(path),
            factor: Some(factor),
            amount,
        }
    }

    pub fn unreachable(amount: Decimal) -> Self {
        Self {
            path: None,
            factor: None,
            amount,
        }
    }

    pub fn is_reachable(&self) -> bool {
        self.path.is_some()
    }

    /// Number of edges traversed. Zero for a self-conversion.
    pub fn hops(&self) -> Option<usize> {
        self.path
            .as_ref()
            .map(|path| path.len().saturating_sub(1))
    }

    pub fn into_parts(self) -> (Option<Vec<CurrencyCode>>, Option<Decimal>, Decimal) {
        (self.path, self.factor, self.amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn code(s: &str) -> CurrencyCode {
        CurrencyCode::parse(s).unwrap()
    }

    #[test]
    fn test_request_defaults_to_one_unit() {
        let request = ConversionRequest::new(Currency::new(code("EUR"), "Euro", "€"), "usd");
        assert_eq!(request.amount, Decimal::ONE);
        assert_eq!(request.target, "usd");

        let request = request.with_amount(dec!(12));
        assert_eq!(request.amount, dec!(12));
    }

    #[test]
    fn test_unreachable_echoes_amount() {
        let conversion = Conversion::unreachable(dec!(42.5));
        assert!(!conversion.is_reachable());
        assert_eq!(conversion.hops(), None);
        assert_eq!(conversion.into_parts(), (None, None, dec!(42.5)));
    }

    #[test]
    fn test_hops() {
        let direct = Conversion::found(vec![code("EUR"), code("USD")], dec!(1.2), dec!(1.2));
        assert_eq!(direct.hops(), Some(1));

        let identity = Conversion::found(vec![code("EUR")], Decimal::ONE, dec!(5));
        assert_eq!(identity.hops(), Some(0));
    }

    #[test]
    fn test_serialization() {
        let conversion = Conversion::found(
            vec![code("GBP"), code("EUR"), code("USD")],
            dec!(1.32),
            dec!(13.2),
        );

        let json = serde_json::to_string(&conversion).unwrap();
        assert!(json.contains("\"GBP\""));

        let parsed: Conversion = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, conversion);

        let missing: Conversion =
            serde_json::from_str(&serde_json::to_string(&Conversion::unreachable(dec!(1))).unwrap())
                .unwrap();
        assert_eq!(missing.path, None);
    }
}

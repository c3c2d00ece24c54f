//! Fewest-hop path search over a [`ConversionGraph`].

use std::collections::{HashSet, VecDeque};

use ratebook_common::CurrencyCode;
use rust_decimal::Decimal;

use crate::conversion::Conversion;
use crate::error::{FxError, FxResult};
use crate::graph::ConversionGraph;

/// A partial path waiting in the search queue.
///
/// `factor` is `None` once the running product has left the decimal range.
struct Frontier {
    code: CurrencyCode,
    path: Vec<CurrencyCode>,
    factor: Option<Decimal>,
}

/// Breadth-first search for the path with the fewest edges.
///
/// Among equally short paths the one found first wins, and neighbours are
/// expanded in ascending code order, so results are deterministic for a
/// given graph. Each currency is expanded at most once, which bounds the
/// search on cyclic graphs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConversionPathFinder;

impl ConversionPathFinder {
    pub fn new() -> Self {
        Self
    }

    /// Find a path from `source` to `target` and apply it to `amount`.
    ///
    /// A missing path is not an error. Overflow is reported only when the
    /// chosen path itself overflows.
    pub fn find(
        &self,
        graph: &ConversionGraph,
        source: &CurrencyCode,
        target: &CurrencyCode,
        amount: Decimal,
    ) -> FxResult<Conversion> {
        let mut queue = VecDeque::new();
        let mut visited = HashSet::new();

        queue.push_back(Frontier {
            code: source.clone(),
            path: vec![source.clone()],
            factor: Some(Decimal::ONE),
        });

        while let Some(Frontier { code, path, factor }) = queue.pop_front() {
            if &code == target {
                let factor = factor.ok_or_else(|| overflow(&path))?;
                let converted = amount.checked_mul(factor).ok_or_else(|| overflow(&path))?;
                return Ok(Conversion::found(path, factor, converted));
            }

            if !visited.insert(code.clone()) {
                continue;
            }

            for (neighbor, weight) in graph.neighbors(&code) {
                if visited.contains(neighbor) {
                    continue;
                }

                let mut next_path = path.clone();
                next_path.push(neighbor.clone());

                queue.push_back(Frontier {
                    code: neighbor.clone(),
                    path: next_path,
                    factor: factor.and_then(|f| f.checked_mul(weight)),
                });
            }
        }

        Ok(Conversion::unreachable(amount))
    }
}

fn overflow(path: &[CurrencyCode]) -> FxError {
    let path = path
        .iter()
        .map(CurrencyCode::as_str)
        .collect::<Vec<_>>()
        .join(" -> ");
    FxError::FactorOverflow { path }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ratebook_common::{RateKey, RateRecord};
    use rust_decimal_macros::dec;

    fn code(s: &str) -> CurrencyCode {
        CurrencyCode::parse(s).unwrap()
    }

    fn graph(edges: &[(&str, &str, Decimal)]) -> ConversionGraph {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        ConversionGraph::from_rates(edges.iter().map(|(from, to, factor)| {
            RateRecord::new(RateKey::new(code(from), code(to), date), *factor)
        }))
    }

    fn codes(path: &[&str]) -> Vec<CurrencyCode> {
        path.iter().map(|c| code(c)).collect()
    }

    #[test]
    fn test_self_conversion_is_identity() {
        let g = graph(&[]);
        let conversion = ConversionPathFinder::new()
            .find(&g, &code("EUR"), &code("EUR"), dec!(7))
            .unwrap();

        assert_eq!(conversion.path, Some(codes(&["EUR"])));
        assert_eq!(conversion.factor, Some(Decimal::ONE));
        assert_eq!(conversion.amount, dec!(7));
    }

    #[test]
    fn test_multi_hop_multiplies_factors() {
        let g = graph(&[("GBP", "EUR", dec!(1.1)), ("EUR", "USD", dec!(1.2))]);
        let conversion = ConversionPathFinder::new()
            .find(&g, &code("GBP"), &code("USD"), dec!(10))
            .unwrap();

        assert_eq!(conversion.path, Some(codes(&["GBP", "EUR", "USD"])));
        assert_eq!(conversion.factor, Some(dec!(1.32)));
        assert_eq!(conversion.amount, dec!(13.2));
    }

    #[test]
    fn test_prefers_fewest_hops() {
        let g = graph(&[
            ("AAA", "BBB", dec!(2)),
            ("BBB", "CCC", dec!(2)),
            ("CCC", "DDD", dec!(2)),
            ("AAA", "DDD", dec!(3)),
        ]);
        let conversion = ConversionPathFinder::new()
            .find(&g, &code("AAA"), &code("DDD"), Decimal::ONE)
            .unwrap();

        assert_eq!(conversion.path, Some(codes(&["AAA", "DDD"])));
        assert_eq!(conversion.factor, Some(dec!(3)));
    }

    #[test]
    fn test_ties_break_by_code_order() {
        let g = graph(&[
            ("AAA", "CCC", dec!(3)),
            ("AAA", "BBB", dec!(2)),
            ("CCC", "DDD", dec!(5)),
            ("BBB", "DDD", dec!(7)),
        ]);
        let conversion = ConversionPathFinder::new()
            .find(&g, &code("AAA"), &code("DDD"), Decimal::ONE)
            .unwrap();

        assert_eq!(conversion.path, Some(codes(&["AAA", "BBB", "DDD"])));
        assert_eq!(conversion.factor, Some(dec!(14)));
    }

    #[test]
    fn test_unreachable_target() {
        let g = graph(&[("EUR", "USD", dec!(1.2))]);
        let conversion = ConversionPathFinder::new()
            .find(&g, &code("USD"), &code("EUR"), dec!(3))
            .unwrap();

        assert_eq!(conversion, Conversion::unreachable(dec!(3)));
    }

    #[test]
    fn test_cycles_terminate() {
        let g = graph(&[
            ("AAA", "BBB", dec!(1)),
            ("BBB", "CCC", dec!(1)),
            ("CCC", "AAA", dec!(1)),
        ]);
        let conversion = ConversionPathFinder::new()
            .find(&g, &code("AAA"), &code("ZZZ"), Decimal::ONE)
            .unwrap();

        assert!(!conversion.is_reachable());
    }

    #[test]
    fn test_zero_factor_propagates() {
        let g = graph(&[("VEF", "USD", Decimal::ZERO), ("USD", "EUR", dec!(0.8333))]);
        let conversion = ConversionPathFinder::new()
            .find(&g, &code("VEF"), &code("EUR"), dec!(1000))
            .unwrap();

        assert_eq!(conversion.factor, Some(Decimal::ZERO));
        assert_eq!(conversion.amount, Decimal::ZERO);
    }

    #[test]
    fn test_overflow_on_chosen_path() {
        let g = graph(&[("AAA", "BBB", Decimal::MAX), ("BBB", "CCC", dec!(10))]);
        let result = ConversionPathFinder::new().find(&g, &code("AAA"), &code("CCC"), Decimal::ONE);

        match result {
            Err(FxError::FactorOverflow { path }) => assert_eq!(path, "AAA -> BBB -> CCC"),
            other => panic!("expected overflow, got {:?}", other),
        }
    }

    #[test]
    fn test_overflow_off_path_is_ignored() {
        let g = graph(&[
            ("AAA", "BBB", Decimal::MAX),
            ("BBB", "CCC", dec!(10)),
            ("AAA", "DDD", dec!(2)),
        ]);
        let conversion = ConversionPathFinder::new()
            .find(&g, &code("AAA"), &code("DDD"), Decimal::ONE)
            .unwrap();

        assert_eq!(conversion.factor, Some(dec!(2)));
    }

    #[test]
    fn test_amount_overflow() {
        let g = graph(&[("AAA", "BBB", dec!(10))]);
        let result = ConversionPathFinder::new().find(&g, &code("AAA"), &code("BBB"), Decimal::MAX);

        assert!(matches!(result, Err(FxError::FactorOverflow { .. })));
    }
}

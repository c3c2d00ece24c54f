//! Conversion graph built from the latest rate per directed pair.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::NaiveDate;
use ratebook_common::{CurrencyCode, RateId, RateRecord};
use ratebook_store::RateStore;
use rust_decimal::Decimal;
use tracing::{debug, instrument};

use crate::error::FxResult;

/// Edge weight plus the identity of the record it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Edge {
    factor: Decimal,
    date: NaiveDate,
    id: RateId,
}

impl Edge {
    fn from_record(record: &RateRecord) -> Self {
        Self {
            factor: record.factor,
            date: record.date,
            id: record.id,
        }
    }

    /// Later date wins; equal dates fall back to the later-created record.
    fn supersedes(&self, other: &Edge) -> bool {
        (self.date, self.id) > (other.date, other.id)
    }
}

/// Directed, weighted graph of currencies.
///
/// Nodes are every currency that appears in a rate; each ordered pair has at
/// most one edge. Neighbours iterate in ascending code order, which fixes the
/// tie-break between equally short conversion paths.
#[derive(Debug, Clone, Default)]
pub struct ConversionGraph {
    nodes: BTreeSet<CurrencyCode>,
    edges: BTreeMap<CurrencyCode, BTreeMap<CurrencyCode, Edge>>,
}

impl ConversionGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph keeping the latest record per ordered pair.
    pub fn from_rates<I>(rates: I) -> Self
    where
        I: IntoIterator<Item = RateRecord>,
    {
        let mut graph = Self::new();
        for rate in rates {
            graph.insert(&rate);
        }
        graph
    }

    /// Add a rate, replacing the pair's edge only if this record is newer.
    ///
    /// Returns whether the record became the pair's edge.
    pub fn insert(&mut self, rate: &RateRecord) -> bool {
        self.nodes.insert(rate.from.clone());
        self.nodes.insert(rate.to.clone());

        let edge = Edge::from_record(rate);
        let outgoing = self.edges.entry(rate.from.clone()).or_default();

        match outgoing.get(&rate.to) {
            Some(current) if !edge.supersedes(current) => false,
            _ => {
                outgoing.insert(rate.to.clone(), edge);
                true
            }
        }
    }

    /// Outgoing edges of `code` as `(neighbour, factor)`, in code order.
    pub fn neighbors<'a>(
        &'a self,
        code: &CurrencyCode,
    ) -> impl Iterator<Item = (&'a CurrencyCode, Decimal)> + 'a {
        self.edges
            .get(code)
            .into_iter()
            .flat_map(|outgoing| outgoing.iter().map(|(to, edge)| (to, edge.factor)))
    }

    /// Factor of the edge `from -> to`, if present.
    pub fn factor(&self, from: &CurrencyCode, to: &CurrencyCode) -> Option<Decimal> {
        self.edges.get(from)?.get(to).map(|edge| edge.factor)
    }

    /// Whether `code` appears in any rate.
    pub fn contains(&self, code: &CurrencyCode) -> bool {
        self.nodes.contains(code)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Reads the latest rate per ordered pair and assembles a fresh graph.
///
/// Reverse edges are not synthesized: the graph holds exactly the directed
/// records in the store.
pub struct RateGraphBuilder {
    store: Arc<dyn RateStore>,
}

impl RateGraphBuilder {
    /// Create a builder reading from `store`.
    pub fn new(store: Arc<dyn RateStore>) -> Self {
        Self { store }
    }

    /// Build a graph snapshot from the store.
    #[instrument(skip(self))]
    pub async fn build(&self) -> FxResult<ConversionGraph> {
        let rates = self.store.latest_rates_by_pair().await?;
        let graph = ConversionGraph::from_rates(rates);

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Conversion graph built"
        );

        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratebook_common::{Currency, NewRate, RateKey};
    use ratebook_store::MemoryStore;
    use rust_decimal_macros::dec;

    fn code(s: &str) -> CurrencyCode {
        CurrencyCode::parse(s).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, d).unwrap()
    }

    fn record(from: &str, to: &str, factor: Decimal, d: u32) -> RateRecord {
        RateRecord::new(RateKey::new(code(from), code(to), day(d)), factor)
    }

    #[test]
    fn test_latest_record_per_pair_wins() {
        let graph = ConversionGraph::from_rates(vec![
            record("EUR", "USD", dec!(1.3), 3),
            record("EUR", "USD", dec!(1.1), 1),
            record("EUR", "USD", dec!(1.2), 2),
        ]);

        assert_eq!(graph.factor(&code("EUR"), &code("USD")), Some(dec!(1.3)));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_equal_dates_prefer_later_record() {
        let older = record("EUR", "USD", dec!(1.1), 1);
        let newer = record("EUR", "USD", dec!(1.2), 1);
        let (first, second) = if older.id < newer.id {
            (older, newer)
        } else {
            (newer, older)
        };
        let expected = second.factor;

        let mut graph = ConversionGraph::new();
        assert!(graph.insert(&second));
        assert!(!graph.insert(&first));

        assert_eq!(graph.factor(&code("EUR"), &code("USD")), Some(expected));
    }

    #[test]
    fn test_edges_are_directed() {
        let graph = ConversionGraph::from_rates(vec![record("EUR", "USD", dec!(1.2), 1)]);

        assert!(graph.contains(&code("USD")));
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.factor(&code("USD"), &code("EUR")), None);
        assert_eq!(graph.neighbors(&code("USD")).count(), 0);
    }

    #[test]
    fn test_neighbors_in_code_order() {
        let graph = ConversionGraph::from_rates(vec![
            record("EUR", "USD", dec!(1.2), 1),
            record("EUR", "CAD", dec!(1.5), 1),
            record("EUR", "JPY", dec!(160), 1),
        ]);

        let neighbors: Vec<_> = graph
            .neighbors(&code("EUR"))
            .map(|(c, _)| c.to_string())
            .collect();
        assert_eq!(neighbors, vec!["CAD", "JPY", "USD"]);
    }

    #[tokio::test]
    async fn test_builder_reads_latest_rates() {
        let store = Arc::new(MemoryStore::new());
        for c in ["EUR", "USD"] {
            store.upsert_currency(Currency::new(code(c), c, "")).await.unwrap();
        }
        store
            .upsert_rate(NewRate::new(code("EUR"), code("USD"), dec!(1.1)).on(day(1)))
            .await
            .unwrap();
        store
            .upsert_rate(NewRate::new(code("EUR"), code("USD"), dec!(1.25)).on(day(2)))
            .await
            .unwrap();

        let graph = RateGraphBuilder::new(store).build().await.unwrap();

        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.factor(&code("EUR"), &code("USD")), Some(dec!(1.25)));
        assert_eq!(graph.factor(&code("USD"), &code("EUR")), Some(dec!(0.8)));
    }
}

//! Store boundary and unit-of-work traits.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use ratebook_common::{Currency, CurrencyCode, NewRate, RateKey, RateRecord, Result};

/// Durable storage of currencies and directed rate observations.
///
/// Every mutation is atomic: the write and the invariant maintenance it
/// triggers commit together or not at all.
#[async_trait]
pub trait RateStore: Send + Sync {
    /// Get a currency by code.
    async fn get_currency(&self, code: &CurrencyCode) -> Result<Option<Currency>>;

    /// List all currencies ordered by code.
    async fn list_currencies(&self) -> Result<Vec<Currency>>;

    /// Get the base currency, if any currency exists.
    async fn find_base(&self) -> Result<Option<Currency>>;

    /// Create or update a currency, keeping exactly one base currency.
    async fn upsert_currency(&self, currency: Currency) -> Result<Currency>;

    /// Delete a currency and every rate referencing it.
    ///
    /// Returns `false` when the currency did not exist.
    async fn delete_currency(&self, code: &CurrencyCode) -> Result<bool>;

    /// Get the rate stored under an exact key.
    async fn get_rate(&self, key: &RateKey) -> Result<Option<RateRecord>>;

    /// Most recent rate for an ordered pair.
    async fn latest_rate(&self, from: &CurrencyCode, to: &CurrencyCode) -> Result<Option<RateRecord>>;

    /// One record per ordered pair with history: the one with the latest date.
    async fn latest_rates_by_pair(&self) -> Result<Vec<RateRecord>>;

    /// Every record for an ordered pair, newest first.
    async fn rate_history(&self, from: &CurrencyCode, to: &CurrencyCode) -> Result<Vec<RateRecord>>;

    /// Create or update a rate and synchronize its reciprocal.
    async fn upsert_rate(&self, rate: NewRate) -> Result<RateRecord>;

    /// Upsert a batch of rates as a single unit of work.
    async fn ingest_rates(&self, rates: Vec<NewRate>) -> Result<Vec<RateRecord>>;

    /// Delete a rate and its reciprocal.
    ///
    /// Returns `false` when no rate was stored under the key.
    async fn delete_rate(&self, key: &RateKey) -> Result<bool>;
}

/// Currency reads and writes inside a unit of work.
#[async_trait]
pub trait CurrencyTx: Send {
    /// Serialize currency mutations for the rest of the unit of work.
    async fn lock_currencies(&mut self) -> Result<()> {
        Ok(())
    }

    async fn find_currency(&mut self, code: &CurrencyCode) -> Result<Option<Currency>>;

    /// Current base currency other than `code`.
    async fn find_base_excluding(&mut self, code: &CurrencyCode) -> Result<Option<Currency>>;

    /// Currency with the lowest code other than `code`.
    async fn first_by_code_excluding(&mut self, code: &CurrencyCode) -> Result<Option<Currency>>;

    /// Clear the base flag on every currency except `code`; returns how many changed.
    async fn demote_others(&mut self, code: &CurrencyCode) -> Result<u64>;

    async fn set_base(&mut self, code: &CurrencyCode, is_base: bool) -> Result<()>;

    async fn write_currency(&mut self, currency: &Currency) -> Result<()>;

    async fn remove_currency(&mut self, code: &CurrencyCode) -> Result<bool>;
}

/// Rate reads and writes inside a unit of work.
#[async_trait]
pub trait RateTx: Send {
    /// Serialize mutations of a rate and its reciprocal for the rest of the unit of work.
    async fn lock_pair(&mut self, _key: &RateKey) -> Result<()> {
        Ok(())
    }

    async fn find_rate(&mut self, key: &RateKey) -> Result<Option<RateRecord>>;

    /// Insert or update the record under `key`, keeping the identity of an existing record.
    async fn write_rate(&mut self, key: &RateKey, factor: Decimal) -> Result<RateRecord>;

    async fn remove_rate(&mut self, key: &RateKey) -> Result<Option<RateRecord>>;

    /// Remove every rate whose `from` or `to` is `code`; returns how many were removed.
    async fn remove_rates_touching(&mut self, code: &CurrencyCode) -> Result<u64>;
}

/// A transactional unit of work. Dropping it without `commit` discards its writes.
#[async_trait]
pub trait UnitOfWork: CurrencyTx + RateTx {
    async fn commit(self) -> Result<()>;
}

/// Key used to serialize writers touching either direction of a pair on a date.
pub(crate) fn pair_lock_key(key: &RateKey) -> (CurrencyCode, CurrencyCode, NaiveDate) {
    if key.from <= key.to {
        (key.from.clone(), key.to.clone(), key.date)
    } else {
        (key.to.clone(), key.from.clone(), key.date)
    }
}

/// Pair a batch with its input positions, sorted so pair locks are always
/// acquired in the same order.
pub(crate) fn in_lock_order(rates: Vec<NewRate>) -> Vec<(usize, NewRate)> {
    let mut ordered: Vec<(usize, NewRate)> = rates.into_iter().enumerate().collect();
    ordered.sort_by_cached_key(|(position, rate)| (pair_lock_key(&rate.key()), *position));
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn code(s: &str) -> CurrencyCode {
        CurrencyCode::parse(s).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[test]
    fn test_pair_lock_key_ignores_direction() {
        let forward = RateKey::new(code("USD"), code("EUR"), day(1));
        assert_eq!(pair_lock_key(&forward), pair_lock_key(&forward.reciprocal()));
        assert_eq!(pair_lock_key(&forward).0, code("EUR"));
    }

    #[test]
    fn test_opposite_batches_lock_in_same_order() {
        let first = vec![
            NewRate::new(code("USD"), code("JPY"), dec!(150)).on(day(1)),
            NewRate::new(code("EUR"), code("USD"), dec!(1.2)).on(day(1)),
        ];
        let second = vec![
            NewRate::new(code("USD"), code("EUR"), dec!(0.8)).on(day(1)),
            NewRate::new(code("JPY"), code("USD"), dec!(0.0067)).on(day(1)),
        ];

        let locks = |batch: Vec<NewRate>| -> Vec<_> {
            in_lock_order(batch)
                .iter()
                .map(|(_, rate)| pair_lock_key(&rate.key()))
                .collect()
        };

        assert_eq!(locks(first), locks(second));
    }

    #[test]
    fn test_lock_order_keeps_positions() {
        let batch = vec![
            NewRate::new(code("USD"), code("JPY"), dec!(150)).on(day(1)),
            NewRate::new(code("EUR"), code("USD"), dec!(1.2)).on(day(1)),
            NewRate::new(code("EUR"), code("USD"), dec!(1.3)).on(day(1)),
        ];

        let positions: Vec<usize> = in_lock_order(batch).iter().map(|(p, _)| *p).collect();
        assert_eq!(positions, vec![1, 2, 0]);
    }
}

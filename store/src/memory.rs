//! In-memory store.

use std::collections::btree_map::Range;
use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::instrument;

use ratebook_common::{
    Currency, CurrencyCode, NewRate, RateKey, RateRecord, RatebookError, Result,
    DEFAULT_DECIMAL_SCALE,
};

use crate::commands::StoreCommands;
use crate::traits::{CurrencyTx, RateStore, RateTx, UnitOfWork};

/// Table contents of the in-memory store.
#[derive(Debug, Clone, Default)]
struct Tables {
    currencies: BTreeMap<CurrencyCode, Currency>,
    rates: BTreeMap<RateKey, RateRecord>,
}

impl Tables {
    fn pair_history(&self, from: &CurrencyCode, to: &CurrencyCode) -> Range<'_, RateKey, RateRecord> {
        let first = RateKey::new(from.clone(), to.clone(), NaiveDate::MIN);
        let last = RateKey::new(from.clone(), to.clone(), NaiveDate::MAX);
        self.rates.range(first..=last)
    }
}

/// Thread-safe in-memory store.
///
/// Writers are serialized and work on a private copy of the tables, which is
/// published on commit. Readers never observe a half-applied mutation.
///
/// Each mutation copies both tables, so it costs O(total rows). Meant for
/// tests and small embedded datasets.
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
    writer: Mutex<()>,
    commands: StoreCommands,
    #[cfg(any(test, feature = "test-utils"))]
    fail_after: parking_lot::Mutex<Option<usize>>,
}

impl MemoryStore {
    /// Create an empty store with the default decimal scale.
    pub fn new() -> Self {
        Self::with_scale(DEFAULT_DECIMAL_SCALE)
    }

    /// Create an empty store keeping factors at `scale` fractional digits.
    pub fn with_scale(scale: u32) -> Self {
        Self {
            tables: Arc::new(RwLock::new(Tables::default())),
            writer: Mutex::new(()),
            commands: StoreCommands::new(scale),
            #[cfg(any(test, feature = "test-utils"))]
            fail_after: parking_lot::Mutex::new(None),
        }
    }

    /// Number of stored rate records.
    pub fn rate_count(&self) -> usize {
        self.tables.read().rates.len()
    }

    /// Every stored rate record, ordered by key.
    pub fn all_rates(&self) -> Vec<RateRecord> {
        self.tables.read().rates.values().cloned().collect()
    }

    /// Make the next unit of work fail on its `writes + 1`-th write.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn fail_after_writes(&self, writes: usize) {
        *self.fail_after.lock() = Some(writes);
    }

    fn begin(&self) -> MemoryUnitOfWork {
        MemoryUnitOfWork {
            working: self.tables.read().clone(),
            published: Arc::clone(&self.tables),
            #[cfg(any(test, feature = "test-utils"))]
            writes: 0,
            #[cfg(any(test, feature = "test-utils"))]
            fail_after: self.fail_after.lock().take(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateStore for MemoryStore {
    async fn get_currency(&self, code: &CurrencyCode) -> Result<Option<Currency>> {
        Ok(self.tables.read().currencies.get(code).cloned())
    }

    async fn list_currencies(&self) -> Result<Vec<Currency>> {
        Ok(self.tables.read().currencies.values().cloned().collect())
    }

    async fn find_base(&self) -> Result<Option<Currency>> {
        Ok(self
            .tables
            .read()
            .currencies
            .values()
            .find(|c| c.is_base)
            .cloned())
    }

    #[instrument(skip(self, currency), fields(code = %currency.code))]
    async fn upsert_currency(&self, currency: Currency) -> Result<Currency> {
        let _writer = self.writer.lock().await;
        let mut tx = self.begin();
        let saved = self.commands.save_currency(&mut tx, currency).await?;
        tx.commit().await?;
        Ok(saved)
    }

    #[instrument(skip(self))]
    async fn delete_currency(&self, code: &CurrencyCode) -> Result<bool> {
        let _writer = self.writer.lock().await;
        let mut tx = self.begin();
        let deleted = self.commands.delete_currency(&mut tx, code).await?;
        tx.commit().await?;
        Ok(deleted)
    }

    async fn get_rate(&self, key: &RateKey) -> Result<Option<RateRecord>> {
        Ok(self.tables.read().rates.get(key).cloned())
    }

    async fn latest_rate(&self, from: &CurrencyCode, to: &CurrencyCode) -> Result<Option<RateRecord>> {
        Ok(self.tables.read().pair_history(from, to).next_back().map(|(_, r)| r.clone()))
    }

    async fn latest_rates_by_pair(&self) -> Result<Vec<RateRecord>> {
        let tables = self.tables.read();
        let mut latest: BTreeMap<(&CurrencyCode, &CurrencyCode), &RateRecord> = BTreeMap::new();

        // Keys are ordered by (from, to, date), so the last record per pair wins.
        for record in tables.rates.values() {
            latest.insert((&record.from, &record.to), record);
        }

        Ok(latest.into_values().cloned().collect())
    }

    async fn rate_history(&self, from: &CurrencyCode, to: &CurrencyCode) -> Result<Vec<RateRecord>> {
        Ok(self.tables.read().pair_history(from, to).rev().map(|(_, r)| r.clone()).collect())
    }

    #[instrument(skip(self, rate), fields(from = %rate.from, to = %rate.to))]
    async fn upsert_rate(&self, rate: NewRate) -> Result<RateRecord> {
        let _writer = self.writer.lock().await;
        let mut tx = self.begin();
        let saved = self.commands.save_rate(&mut tx, rate).await?;
        tx.commit().await?;
        Ok(saved)
    }

    #[instrument(skip(self, rates), fields(count = rates.len()))]
    async fn ingest_rates(&self, rates: Vec<NewRate>) -> Result<Vec<RateRecord>> {
        let _writer = self.writer.lock().await;
        let mut tx = self.begin();
        let mut saved = Vec::with_capacity(rates.len());
        for rate in rates {
            saved.push(self.commands.save_rate(&mut tx, rate).await?);
        }
        tx.commit().await?;
        Ok(saved)
    }

    #[instrument(skip(self))]
    async fn delete_rate(&self, key: &RateKey) -> Result<bool> {
        let _writer = self.writer.lock().await;
        let mut tx = self.begin();
        let deleted = self.commands.delete_rate(&mut tx, key).await?;
        tx.commit().await?;
        Ok(deleted)
    }
}

/// Unit of work over a private copy of the tables.
struct MemoryUnitOfWork {
    working: Tables,
    published: Arc<RwLock<Tables>>,
    #[cfg(any(test, feature = "test-utils"))]
    writes: usize,
    #[cfg(any(test, feature = "test-utils"))]
    fail_after: Option<usize>,
}

impl MemoryUnitOfWork {
    #[cfg(any(test, feature = "test-utils"))]
    fn record_write(&mut self) -> Result<()> {
        if self.fail_after.is_some_and(|limit| self.writes >= limit) {
            return Err(RatebookError::Database("injected write failure".to_string()));
        }
        self.writes += 1;
        Ok(())
    }

    #[cfg(not(any(test, feature = "test-utils")))]
    fn record_write(&mut self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl CurrencyTx for MemoryUnitOfWork {
    async fn find_currency(&mut self, code: &CurrencyCode) -> Result<Option<Currency>> {
        Ok(self.working.currencies.get(code).cloned())
    }

    async fn find_base_excluding(&mut self, code: &CurrencyCode) -> Result<Option<Currency>> {
        Ok(self
            .working
            .currencies
            .values()
            .find(|c| c.is_base && &c.code != code)
            .cloned())
    }

    async fn first_by_code_excluding(&mut self, code: &CurrencyCode) -> Result<Option<Currency>> {
        Ok(self
            .working
            .currencies
            .values()
            .find(|c| &c.code != code)
            .cloned())
    }

    async fn demote_others(&mut self, code: &CurrencyCode) -> Result<u64> {
        let mut demoted = 0;
        for currency in self.working.currencies.values_mut() {
            if currency.is_base && &currency.code != code {
                currency.is_base = false;
                demoted += 1;
            }
        }
        if demoted > 0 {
            self.record_write()?;
        }
        Ok(demoted)
    }

    async fn set_base(&mut self, code: &CurrencyCode, is_base: bool) -> Result<()> {
        self.record_write()?;
        let currency = self
            .working
            .currencies
            .get_mut(code)
            .ok_or_else(|| RatebookError::CurrencyNotFound(code.clone()))?;
        currency.is_base = is_base;
        Ok(())
    }

    async fn write_currency(&mut self, currency: &Currency) -> Result<()> {
        self.record_write()?;
        self.working
            .currencies
            .insert(currency.code.clone(), currency.clone());
        Ok(())
    }

    async fn remove_currency(&mut self, code: &CurrencyCode) -> Result<bool> {
        self.record_write()?;
        Ok(self.working.currencies.remove(code).is_some())
    }
}

#[async_trait]
impl RateTx for MemoryUnitOfWork {
    async fn find_rate(&mut self, key: &RateKey) -> Result<Option<RateRecord>> {
        Ok(self.working.rates.get(key).cloned())
    }

    async fn write_rate(&mut self, key: &RateKey, factor: Decimal) -> Result<RateRecord> {
        self.record_write()?;
        let record = self
            .working
            .rates
            .entry(key.clone())
            .and_modify(|r| r.factor = factor)
            .or_insert_with(|| RateRecord::new(key.clone(), factor));
        Ok(record.clone())
    }

    async fn remove_rate(&mut self, key: &RateKey) -> Result<Option<RateRecord>> {
        self.record_write()?;
        Ok(self.working.rates.remove(key))
    }

    async fn remove_rates_touching(&mut self, code: &CurrencyCode) -> Result<u64> {
        self.record_write()?;
        let before = self.working.rates.len();
        self.working
            .rates
            .retain(|key, _| &key.from != code && &key.to != code);
        Ok((before - self.working.rates.len()) as u64)
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn commit(self) -> Result<()> {
        *self.published.write() = self.working;
        Ok(())
    }
}

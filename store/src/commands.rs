//! Mutation pipeline shared by every store backend.
//!
//! Each command performs the primary write and then calls the invariant
//! hooks explicitly, all against the same unit of work.

use rust_decimal::Decimal;
use tracing::debug;

use ratebook_common::{
    reciprocal_factor, Currency, CurrencyCode, NewRate, RateKey, RateRecord, RatebookError,
    Result,
};

use crate::reciprocal::ReciprocalRateMaintainer;
use crate::registry::BaseCurrencyRegistry;
use crate::traits::UnitOfWork;

/// Store mutations with their invariant maintenance.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreCommands {
    registry: BaseCurrencyRegistry,
    maintainer: ReciprocalRateMaintainer,
}

impl StoreCommands {
    /// Create commands storing factors at the given decimal scale.
    pub fn new(scale: u32) -> Self {
        Self {
            registry: BaseCurrencyRegistry::new(),
            maintainer: ReciprocalRateMaintainer::new(scale),
        }
    }

    /// Decimal scale used for stored factors.
    pub fn scale(&self) -> u32 {
        self.maintainer.scale()
    }

    /// Save a currency, adjusting base flags.
    pub async fn save_currency<T>(&self, tx: &mut T, mut currency: Currency) -> Result<Currency>
    where
        T: UnitOfWork + ?Sized,
    {
        tx.lock_currencies().await?;
        self.registry.on_save(tx, &mut currency).await?;
        tx.write_currency(&currency).await?;
        Ok(currency)
    }

    /// Delete a currency with its rates, reassigning the base if needed.
    pub async fn delete_currency<T>(&self, tx: &mut T, code: &CurrencyCode) -> Result<bool>
    where
        T: UnitOfWork + ?Sized,
    {
        tx.lock_currencies().await?;

        let Some(existing) = tx.find_currency(code).await? else {
            return Ok(false);
        };

        let removed_rates = tx.remove_rates_touching(code).await?;
        tx.remove_currency(code).await?;
        debug!(currency = %code, removed_rates, "Currency removed");

        self.registry.on_delete(tx, &existing).await?;
        Ok(true)
    }

    /// Save a rate and synchronize its reciprocal.
    pub async fn save_rate<T>(&self, tx: &mut T, rate: NewRate) -> Result<RateRecord>
    where
        T: UnitOfWork + ?Sized,
    {
        let key = rate.key();
        self.check_endpoints(tx, &key).await?;
        let factor = self.check_factor(&key, rate.factor)?;

        tx.lock_pair(&key).await?;
        let saved = tx.write_rate(&key, factor).await?;
        self.maintainer.on_save(tx, &saved).await?;
        Ok(saved)
    }

    /// Delete a rate and its reciprocal.
    pub async fn delete_rate<T>(&self, tx: &mut T, key: &RateKey) -> Result<bool>
    where
        T: UnitOfWork + ?Sized,
    {
        tx.lock_pair(key).await?;

        if tx.remove_rate(key).await?.is_none() {
            return Ok(false);
        }

        self.maintainer.on_delete(tx, key).await?;
        Ok(true)
    }

    /// Round `factor` to the store scale.
    ///
    /// Zero stays zero; any other factor must keep a non-zero value and a
    /// non-zero reciprocal once rounded.
    fn check_factor(&self, key: &RateKey, factor: Decimal) -> Result<Decimal> {
        let scale = self.scale();
        let normalized = factor.round_dp(scale);

        if !factor.is_zero()
            && (normalized.is_zero() || reciprocal_factor(normalized, scale).is_zero())
        {
            return Err(RatebookError::UnrepresentableFactor {
                from: key.from.clone(),
                to: key.to.clone(),
                factor,
                scale,
            });
        }

        Ok(normalized)
    }

    async fn check_endpoints<T>(&self, tx: &mut T, key: &RateKey) -> Result<()>
    where
        T: UnitOfWork + ?Sized,
    {
        if key.is_self_rate() {
            return Err(RatebookError::SameCurrencyRate(key.from.clone()));
        }

        for code in [&key.from, &key.to] {
            if tx.find_currency(code).await?.is_none() {
                return Err(RatebookError::CurrencyNotFound(code.clone()));
            }
        }

        Ok(())
    }
}

//! Base currency invariant: exactly one currency is base whenever any exist.

use tracing::{debug, info};

use ratebook_common::{Currency, Result};

use crate::traits::CurrencyTx;

/// Keeps exactly one currency marked as base across creates, updates and deletes.
///
/// Both hooks must run inside the unit of work of the triggering mutation.
/// When the base currency is deleted, the remaining currency with the lowest
/// code is promoted.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaseCurrencyRegistry;

impl BaseCurrencyRegistry {
    /// Create a new registry.
    pub fn new() -> Self {
        Self
    }

    /// Adjust base flags before `currency` is written.
    ///
    /// Saving a base currency demotes every other one. Saving a non-base
    /// currency while no other currency is base promotes it instead.
    pub async fn on_save<T>(&self, tx: &mut T, currency: &mut Currency) -> Result<()>
    where
        T: CurrencyTx + ?Sized,
    {
        if currency.is_base {
            let demoted = tx.demote_others(&currency.code).await?;
            if demoted > 0 {
                info!(base = %currency.code, demoted, "Base currency changed");
            }
        } else if tx.find_base_excluding(&currency.code).await?.is_none() {
            info!(base = %currency.code, "No other base currency, promoting");
            currency.is_base = true;
        }

        Ok(())
    }

    /// Reassign the base flag after `deleted` has been removed.
    pub async fn on_delete<T>(&self, tx: &mut T, deleted: &Currency) -> Result<()>
    where
        T: CurrencyTx + ?Sized,
    {
        if !deleted.is_base {
            return Ok(());
        }

        match tx.first_by_code_excluding(&deleted.code).await? {
            Some(successor) => {
                tx.set_base(&successor.code, true).await?;
                info!(
                    deleted = %deleted.code,
                    base = %successor.code,
                    "Base currency deleted, promoted successor"
                );
            }
            None => {
                debug!(deleted = %deleted.code, "Last currency deleted, no base remains");
            }
        }

        Ok(())
    }
}

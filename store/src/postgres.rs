//! PostgreSQL store.

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row, Transaction};
use tracing::{info, instrument};

use ratebook_common::{
    Currency, CurrencyCode, NewRate, RateId, RateKey, RateRecord, RatebookError, Result,
};

use crate::commands::StoreCommands;
use crate::config::StoreConfig;
use crate::traits::{in_lock_order, pair_lock_key, CurrencyTx, RateStore, RateTx, UnitOfWork};

const CURRENCY_COLUMNS: &str = "SELECT code, name, symbol, is_base FROM currencies";
const RATE_COLUMNS: &str = "SELECT id, from_currency, to_currency, factor, date FROM rates";

fn db_error(err: sqlx::Error) -> RatebookError {
    RatebookError::Database(err.to_string())
}

fn currency_from_row(row: &PgRow) -> Result<Currency> {
    let code: String = row.try_get("code").map_err(db_error)?;
    Ok(Currency {
        code: CurrencyCode::parse(&code)?,
        name: row.try_get("name").map_err(db_error)?,
        symbol: row.try_get("symbol").map_err(db_error)?,
        is_base: row.try_get("is_base").map_err(db_error)?,
    })
}

fn rate_from_row(row: &PgRow) -> Result<RateRecord> {
    let from: String = row.try_get("from_currency").map_err(db_error)?;
    let to: String = row.try_get("to_currency").map_err(db_error)?;
    Ok(RateRecord {
        id: RateId::from_uuid(row.try_get("id").map_err(db_error)?),
        from: CurrencyCode::parse(&from)?,
        to: CurrencyCode::parse(&to)?,
        factor: row.try_get("factor").map_err(db_error)?,
        date: row.try_get("date").map_err(db_error)?,
    })
}

/// Store backed by a PostgreSQL database.
pub struct PgStore {
    pool: PgPool,
    commands: StoreCommands,
}

impl PgStore {
    /// Connect using the given configuration.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        config.validate()?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.database_url)
            .await
            .map_err(db_error)?;

        info!(max_connections = config.max_connections, "Connected to rate store");

        Ok(Self::with_pool(pool, config.decimal_scale))
    }

    /// Wrap an existing pool.
    pub fn with_pool(pool: PgPool, scale: u32) -> Self {
        Self {
            pool,
            commands: StoreCommands::new(scale),
        }
    }

    /// Apply the embedded schema migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| RatebookError::Database(e.to_string()))
    }

    async fn begin(&self) -> Result<PgUnitOfWork> {
        let tx = self.pool.begin().await.map_err(db_error)?;
        Ok(PgUnitOfWork { tx })
    }

    async fn fetch_rates(&self, sql: &str, from: &CurrencyCode, to: &CurrencyCode) -> Result<Vec<RateRecord>> {
        sqlx::query(sql)
            .bind(from.as_str())
            .bind(to.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?
            .iter()
            .map(rate_from_row)
            .collect()
    }
}

#[async_trait]
impl RateStore for PgStore {
    async fn get_currency(&self, code: &CurrencyCode) -> Result<Option<Currency>> {
        sqlx::query(&format!("{CURRENCY_COLUMNS} WHERE code = $1"))
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .as_ref()
            .map(currency_from_row)
            .transpose()
    }

    async fn list_currencies(&self) -> Result<Vec<Currency>> {
        sqlx::query(&format!("{CURRENCY_COLUMNS} ORDER BY code"))
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?
            .iter()
            .map(currency_from_row)
            .collect()
    }

    async fn find_base(&self) -> Result<Option<Currency>> {
        sqlx::query(&format!("{CURRENCY_COLUMNS} WHERE is_base LIMIT 1"))
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .as_ref()
            .map(currency_from_row)
            .transpose()
    }

    #[instrument(skip(self, currency), fields(code = %currency.code))]
    async fn upsert_currency(&self, currency: Currency) -> Result<Currency> {
        let mut tx = self.begin().await?;
        let saved = self.commands.save_currency(&mut tx, currency).await?;
        tx.commit().await?;
        Ok(saved)
    }

    #[instrument(skip(self))]
    async fn delete_currency(&self, code: &CurrencyCode) -> Result<bool> {
        let mut tx = self.begin().await?;
        let deleted = self.commands.delete_currency(&mut tx, code).await?;
        tx.commit().await?;
        Ok(deleted)
    }

    async fn get_rate(&self, key: &RateKey) -> Result<Option<RateRecord>> {
        sqlx::query(&format!(
            "{RATE_COLUMNS} WHERE from_currency = $1 AND to_currency = $2 AND date = $3"
        ))
        .bind(key.from.as_str())
        .bind(key.to.as_str())
        .bind(key.date)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .as_ref()
        .map(rate_from_row)
        .transpose()
    }

    async fn latest_rate(&self, from: &CurrencyCode, to: &CurrencyCode) -> Result<Option<RateRecord>> {
        let sql = format!(
            "{RATE_COLUMNS} WHERE from_currency = $1 AND to_currency = $2 \
             ORDER BY date DESC, id DESC LIMIT 1"
        );
        Ok(self.fetch_rates(&sql, from, to).await?.into_iter().next())
    }

    async fn latest_rates_by_pair(&self) -> Result<Vec<RateRecord>> {
        sqlx::query(
            "SELECT DISTINCT ON (from_currency, to_currency) \
             id, from_currency, to_currency, factor, date FROM rates \
             ORDER BY from_currency, to_currency, date DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?
        .iter()
        .map(rate_from_row)
        .collect()
    }

    async fn rate_history(&self, from: &CurrencyCode, to: &CurrencyCode) -> Result<Vec<RateRecord>> {
        let sql = format!(
            "{RATE_COLUMNS} WHERE from_currency = $1 AND to_currency = $2 ORDER BY date DESC"
        );
        self.fetch_rates(&sql, from, to).await
    }

    #[instrument(skip(self, rate), fields(from = %rate.from, to = %rate.to))]
    async fn upsert_rate(&self, rate: NewRate) -> Result<RateRecord> {
        let mut tx = self.begin().await?;
        let saved = self.commands.save_rate(&mut tx, rate).await?;
        tx.commit().await?;
        Ok(saved)
    }

    #[instrument(skip(self, rates), fields(count = rates.len()))]
    async fn ingest_rates(&self, rates: Vec<NewRate>) -> Result<Vec<RateRecord>> {
        // Overlapping batches must take pair locks in one order or they deadlock.
        let ordered = in_lock_order(rates);

        let mut tx = self.begin().await?;
        let mut saved = Vec::with_capacity(ordered.len());
        for (position, rate) in ordered {
            saved.push((position, self.commands.save_rate(&mut tx, rate).await?));
        }
        tx.commit().await?;

        saved.sort_unstable_by_key(|(position, _)| *position);
        Ok(saved.into_iter().map(|(_, record)| record).collect())
    }

    #[instrument(skip(self))]
    async fn delete_rate(&self, key: &RateKey) -> Result<bool> {
        let mut tx = self.begin().await?;
        let deleted = self.commands.delete_rate(&mut tx, key).await?;
        tx.commit().await?;
        Ok(deleted)
    }
}

/// Unit of work over a database transaction; rolled back when dropped.
struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl CurrencyTx for PgUnitOfWork {
    async fn lock_currencies(&mut self) -> Result<()> {
        sqlx::query("LOCK TABLE currencies IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *self.tx)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn find_currency(&mut self, code: &CurrencyCode) -> Result<Option<Currency>> {
        sqlx::query(&format!("{CURRENCY_COLUMNS} WHERE code = $1"))
            .bind(code.as_str())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_error)?
            .as_ref()
            .map(currency_from_row)
            .transpose()
    }

    async fn find_base_excluding(&mut self, code: &CurrencyCode) -> Result<Option<Currency>> {
        sqlx::query(&format!("{CURRENCY_COLUMNS} WHERE is_base AND code <> $1 LIMIT 1"))
            .bind(code.as_str())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_error)?
            .as_ref()
            .map(currency_from_row)
            .transpose()
    }

    async fn first_by_code_excluding(&mut self, code: &CurrencyCode) -> Result<Option<Currency>> {
        sqlx::query(&format!("{CURRENCY_COLUMNS} WHERE code <> $1 ORDER BY code LIMIT 1"))
            .bind(code.as_str())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_error)?
            .as_ref()
            .map(currency_from_row)
            .transpose()
    }

    async fn demote_others(&mut self, code: &CurrencyCode) -> Result<u64> {
        let result = sqlx::query("UPDATE currencies SET is_base = FALSE WHERE is_base AND code <> $1")
            .bind(code.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected())
    }

    async fn set_base(&mut self, code: &CurrencyCode, is_base: bool) -> Result<()> {
        let result = sqlx::query("UPDATE currencies SET is_base = $2 WHERE code = $1")
            .bind(code.as_str())
            .bind(is_base)
            .execute(&mut *self.tx)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(RatebookError::CurrencyNotFound(code.clone()));
        }
        Ok(())
    }

    async fn write_currency(&mut self, currency: &Currency) -> Result<()> {
        sqlx::query(
            "INSERT INTO currencies (code, name, symbol, is_base) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (code) DO UPDATE SET \
             name = EXCLUDED.name, symbol = EXCLUDED.symbol, is_base = EXCLUDED.is_base",
        )
        .bind(currency.code.as_str())
        .bind(&currency.name)
        .bind(&currency.symbol)
        .bind(currency.is_base)
        .execute(&mut *self.tx)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn remove_currency(&mut self, code: &CurrencyCode) -> Result<bool> {
        let result = sqlx::query("DELETE FROM currencies WHERE code = $1")
            .bind(code.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl RateTx for PgUnitOfWork {
    async fn lock_pair(&mut self, key: &RateKey) -> Result<()> {
        let (low, high, date) = pair_lock_key(key);
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(format!("{low}:{high}:{date}"))
            .execute(&mut *self.tx)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn find_rate(&mut self, key: &RateKey) -> Result<Option<RateRecord>> {
        sqlx::query(&format!(
            "{RATE_COLUMNS} WHERE from_currency = $1 AND to_currency = $2 AND date = $3"
        ))
        .bind(key.from.as_str())
        .bind(key.to.as_str())
        .bind(key.date)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error)?
        .as_ref()
        .map(rate_from_row)
        .transpose()
    }

    async fn write_rate(&mut self, key: &RateKey, factor: Decimal) -> Result<RateRecord> {
        let row = sqlx::query(
            "INSERT INTO rates (id, from_currency, to_currency, factor, date) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (from_currency, to_currency, date) DO UPDATE SET factor = EXCLUDED.factor \
             RETURNING id, from_currency, to_currency, factor, date",
        )
        .bind(*RateId::new().as_uuid())
        .bind(key.from.as_str())
        .bind(key.to.as_str())
        .bind(factor)
        .bind(key.date)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_error)?;

        rate_from_row(&row)
    }

    async fn remove_rate(&mut self, key: &RateKey) -> Result<Option<RateRecord>> {
        sqlx::query(
            "DELETE FROM rates WHERE from_currency = $1 AND to_currency = $2 AND date = $3 \
             RETURNING id, from_currency, to_currency, factor, date",
        )
        .bind(key.from.as_str())
        .bind(key.to.as_str())
        .bind(key.date)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error)?
        .as_ref()
        .map(rate_from_row)
        .transpose()
    }

    async fn remove_rates_touching(&mut self, code: &CurrencyCode) -> Result<u64> {
        let result = sqlx::query("DELETE FROM rates WHERE from_currency = $1 OR to_currency = $1")
            .bind(code.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(self) -> Result<()> {
        self.tx.commit().await.map_err(db_error)
    }
}

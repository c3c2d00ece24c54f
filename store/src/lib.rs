//! Ratebook Store
//!
//! Storage boundary for currencies and directed rate observations, with the
//! invariants every mutation must preserve:
//!
//! - exactly one base currency whenever any currency exists
//! - every rate `(A, B, date, f)` has a reciprocal `(B, A, date, 1/f)`
//!
//! Both invariants are maintained by explicit hooks that run inside the unit
//! of work of the triggering mutation.
//!
//! # Example
//!
//! ```rust,ignore
//! use ratebook_store::{MemoryStore, RateStore};
//! use ratebook_common::{Currency, CurrencyCode, NewRate};
//!
//! let store = MemoryStore::new();
//! let eur = CurrencyCode::parse("EUR")?;
//! let usd = CurrencyCode::parse("USD")?;
//! store.upsert_currency(Currency::new(eur.clone(), "Euro", "€")).await?;
//! store.upsert_currency(Currency::new(usd.clone(), "US Dollar", "$")).await?;
//!
//! // Also stores USD -> EUR = 0.8333
//! store.upsert_rate(NewRate::new(eur, usd, dec!(1.2))).await?;
//! ```

pub mod commands;
pub mod config;
pub mod memory;
pub mod postgres;
pub mod reciprocal;
pub mod registry;
pub mod traits;

pub use commands::StoreCommands;
pub use config::StoreConfig;
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use reciprocal::{ReciprocalRateMaintainer, ReciprocalSync};
pub use registry::BaseCurrencyRegistry;
pub use traits::{CurrencyTx, RateStore, RateTx, UnitOfWork};

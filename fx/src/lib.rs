//! Ratebook FX
//!
//! Converts amounts between currencies by chaining stored exchange rates.
//!
//! Each conversion builds a directed graph from the latest rate per ordered
//! currency pair and runs a breadth-first search for the path with the
//! fewest hops. Reverse edges come from the reciprocal rates the store keeps
//! in sync, not from the graph itself.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ratebook_fx::{ConversionRequest, FxEngine};
//! use ratebook_store::MemoryStore;
//!
//! let engine = FxEngine::new(Arc::new(MemoryStore::new()));
//!
//! let conversion = engine
//!     .convert(ConversionRequest::new(gbp, "USD").with_amount(dec!(100)))
//!     .await?;
//!
//! if let Some(path) = &conversion.path {
//!     println!("{} via {:?}", conversion.amount, path);
//! }
//! ```

pub mod conversion;
pub mod engine;
pub mod error;
pub mod graph;
pub mod path;

pub use conversion::{Conversion, ConversionRequest};
pub use engine::FxEngine;
pub use error::{FxError, FxResult};
pub use graph::{ConversionGraph, RateGraphBuilder};
pub use path::ConversionPathFinder;

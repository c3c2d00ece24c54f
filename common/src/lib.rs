//! Ratebook Common Types
//!
//! Shared types used across Ratebook: currency codes and records, directed
//! rate observations, and the common error type.

pub mod currency;
pub mod error;
pub mod identifiers;
pub mod rate;
pub mod time;

pub use currency::*;
pub use error::*;
pub use identifiers::*;
pub use rate::*;

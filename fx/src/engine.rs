//! Conversion facade over a [`RateStore`].

use std::sync::Arc;

use ratebook_common::{Currency, CurrencyCode};
use ratebook_store::RateStore;
use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};

use crate::conversion::{Conversion, ConversionRequest};
use crate::error::FxResult;
use crate::graph::RateGraphBuilder;
use crate::path::ConversionPathFinder;

/// Converts amounts between currencies using the latest stored rates.
///
/// Every conversion reads a fresh graph snapshot; nothing is cached between
/// calls.
pub struct FxEngine {
    store: Arc<dyn RateStore>,
    builder: RateGraphBuilder,
    finder: ConversionPathFinder,
}

impl FxEngine {
    /// Create an engine reading from `store`.
    pub fn new(store: Arc<dyn RateStore>) -> Self {
        Self {
            builder: RateGraphBuilder::new(store.clone()),
            finder: ConversionPathFinder::new(),
            store,
        }
    }

    /// Convert `request.amount` of the source currency into the target code.
    ///
    /// An unknown or malformed target, or a target with no path from the
    /// source, yields an unreachable result carrying the input amount.
    #[instrument(skip(self, request), fields(
        source = %request.source.code,
        target = %request.target,
        amount = %request.amount
    ))]
    pub async fn convert(&self, request: ConversionRequest) -> FxResult<Conversion> {
        let Some(target) = self.resolve(&request.target).await? else {
            warn!("Conversion target is not a known currency");
            return Ok(Conversion::unreachable(request.amount));
        };

        self.convert_between(&request.source.code, &target.code, request.amount)
            .await
    }

    /// Convert between two raw currency codes.
    pub async fn convert_codes(
        &self,
        source: &str,
        target: &str,
        amount: Decimal,
    ) -> FxResult<Conversion> {
        let Some(source) = self.resolve(source).await? else {
            warn!(source, "Conversion source is not a known currency");
            return Ok(Conversion::unreachable(amount));
        };

        self.convert(ConversionRequest::new(source, target).with_amount(amount))
            .await
    }

    /// Convert into the current base currency.
    ///
    /// Unreachable if no base currency exists.
    #[instrument(skip(self, source, amount), fields(source = %source.code, amount = %amount))]
    pub async fn convert_to_base(&self, source: &Currency, amount: Decimal) -> FxResult<Conversion> {
        let Some(base) = self.base_currency().await? else {
            warn!("No base currency defined");
            return Ok(Conversion::unreachable(amount));
        };

        self.convert_between(&source.code, &base.code, amount).await
    }

    /// The currency currently flagged as base, if any.
    pub async fn base_currency(&self) -> FxResult<Option<Currency>> {
        Ok(self.store.find_base().await?)
    }

    async fn resolve(&self, code: &str) -> FxResult<Option<Currency>> {
        let Ok(code) = CurrencyCode::parse(code) else {
            debug!(code, "Malformed currency code");
            return Ok(None);
        };

        Ok(self.store.get_currency(&code).await?)
    }

    async fn convert_between(
        &self,
        source: &CurrencyCode,
        target: &CurrencyCode,
        amount: Decimal,
    ) -> FxResult<Conversion> {
        let graph = self.builder.build().await?;
        let conversion = self.finder.find(&graph, source, target, amount)?;

        match (conversion.hops(), conversion.factor) {
            (Some(hops), Some(factor)) => info!(
                hops,
                factor = %factor,
                converted = %conversion.amount,
                "Conversion completed"
            ),
            _ => info!("No conversion path"),
        }

        Ok(conversion)
    }
}

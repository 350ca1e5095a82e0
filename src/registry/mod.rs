//! Named collection of venue connectors with cross-venue operations.
//!
//! Fan-out calls are dispatched concurrently with
//! [`futures_util::future::join_all`]; a failing venue is logged and left
//! out rather than failing the whole call.

pub mod aggregation;
pub mod portfolio;

use crate::core::config::{ExchangeConfig, RegistryConfig};
use crate::core::errors::ExchangeError;
use crate::core::traits::ExchangeConnector;
use crate::core::types::{
    AggregatedSnapshot, ApiResponse, BalanceEntry, BestPrice, ExchangeInfo, MarketSnapshot,
    OrderBookSnapshot, OrderRequest, OrderResult, OrderSide, PortfolioValue, ProbeReport,
    RoutingDecision, TradeFill,
};
use crate::exchanges::{binance, coinbase, kucoin};
use futures_util::future::join_all;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub type SharedConnector = Arc<dyn ExchangeConnector>;

fn unknown_venue(name: &str) -> ExchangeError {
    ExchangeError::Configuration(format!("Exchange {} not available", name))
}

/// Build the connector for a supported venue name
pub fn create_connector(
    name: &str,
    config: ExchangeConfig,
) -> Result<SharedConnector, ExchangeError> {
    let connector: SharedConnector = match name {
        "binance" => Arc::new(binance::build_connector(config)?),
        "coinbase" => Arc::new(coinbase::build_connector(config)?),
        "kucoin" => Arc::new(kucoin::build_connector(config)?),
        other => return Err(unknown_venue(other)),
    };
    Ok(connector)
}

pub struct ExchangeRegistry {
    exchanges: BTreeMap<String, SharedConnector>,
    enabled: Vec<String>,
    default_exchange: String,
}

impl std::fmt::Debug for ExchangeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeRegistry")
            .field("exchanges", &self.exchanges.keys().collect::<Vec<_>>())
            .field("enabled", &self.enabled)
            .field("default_exchange", &self.default_exchange)
            .finish()
    }
}

impl ExchangeRegistry {
    /// Build a connector for every enabled venue
    pub fn from_config(config: &RegistryConfig) -> Result<Self, ExchangeError> {
        let mut builder = RegistryBuilder::new().default_exchange(&config.default_exchange);
        for name in &config.enabled {
            let exchange_config = config.exchange(name);
            info!(
                exchange = %name,
                sandbox = exchange_config.sandbox,
                authenticated = exchange_config.has_credentials(),
                "Registering exchange"
            );
            builder = builder.with_exchange(create_connector(name, exchange_config)?);
        }
        Ok(builder.build())
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn get(&self, name: &str) -> Option<SharedConnector> {
        self.exchanges.get(&name.to_lowercase()).cloned()
    }

    pub fn get_default(&self) -> Option<SharedConnector> {
        self.get(&self.default_exchange)
    }

    pub fn default_exchange(&self) -> &str {
        &self.default_exchange
    }

    /// Names of the registered venues
    pub fn available_exchanges(&self) -> Vec<String> {
        self.exchanges.keys().cloned().collect()
    }

    pub fn enabled_exchanges(&self) -> &[String] {
        &self.enabled
    }

    fn resolve(&self, name: Option<&str>) -> Result<SharedConnector, ExchangeError> {
        let name = name.unwrap_or(&self.default_exchange);
        self.get(name).ok_or_else(|| unknown_venue(name))
    }

    /// Market data from `exchange`, or the default venue
    pub async fn get_market_data(
        &self,
        symbol: &str,
        exchange: Option<&str>,
    ) -> ApiResponse<MarketSnapshot> {
        match self.resolve(exchange) {
            Ok(venue) => venue.get_market_data(symbol).await,
            Err(e) => ApiResponse::failure(e),
        }
    }

    pub async fn get_order_book(
        &self,
        symbol: &str,
        depth: Option<u32>,
        exchange: Option<&str>,
    ) -> ApiResponse<OrderBookSnapshot> {
        match self.resolve(exchange) {
            Ok(venue) => venue.get_order_book(symbol, depth).await,
            Err(e) => ApiResponse::failure(e),
        }
    }

    pub async fn get_balances(&self, exchange: &str) -> ApiResponse<Vec<BalanceEntry>> {
        match self.resolve(Some(exchange)) {
            Ok(venue) => venue.get_balances().await,
            Err(e) => ApiResponse::failure(e),
        }
    }

    /// Balances of every venue that answered
    pub async fn get_all_balances(&self) -> BTreeMap<String, Vec<BalanceEntry>> {
        self.fan_out_balances().await.0
    }

    /// Concurrent balance fetch split into answers and per-venue failures
    async fn fan_out_balances(
        &self,
    ) -> (BTreeMap<String, Vec<BalanceEntry>>, BTreeMap<String, String>) {
        let outcomes = join_all(self.exchanges.iter().map(|(name, venue)| async move {
            (name.clone(), venue.get_balances().await)
        }))
        .await;

        let mut balances = BTreeMap::new();
        let mut failures = BTreeMap::new();
        for (name, response) in outcomes {
            match response.into_result() {
                Ok(entries) => {
                    balances.insert(name, entries);
                }
                Err(error) => {
                    warn!(exchange = %name, %error, "Failed to fetch balances");
                    failures.insert(name, error.to_string());
                }
            }
        }
        (balances, failures)
    }

    /// Route to the venue named by `order.exchange`
    pub async fn place_order(&self, order: &OrderRequest) -> ApiResponse<OrderResult> {
        match self.resolve(Some(&order.exchange)) {
            Ok(venue) => venue.place_order(order).await,
            Err(e) => ApiResponse::failure(e),
        }
    }

    pub async fn cancel_order(
        &self,
        order_id: &str,
        symbol: &str,
        exchange: &str,
    ) -> ApiResponse<()> {
        match self.resolve(Some(exchange)) {
            Ok(venue) => venue.cancel_order(order_id, symbol).await,
            Err(e) => ApiResponse::failure(e),
        }
    }

    pub async fn get_order_status(
        &self,
        order_id: &str,
        symbol: &str,
        exchange: &str,
    ) -> ApiResponse<OrderResult> {
        match self.resolve(Some(exchange)) {
            Ok(venue) => venue.get_order_status(order_id, symbol).await,
            Err(e) => ApiResponse::failure(e),
        }
    }

    pub async fn get_open_orders(
        &self,
        symbol: Option<&str>,
        exchange: &str,
    ) -> ApiResponse<Vec<OrderResult>> {
        match self.resolve(Some(exchange)) {
            Ok(venue) => venue.get_open_orders(symbol).await,
            Err(e) => ApiResponse::failure(e),
        }
    }

    pub async fn cancel_all_orders(&self, symbol: &str, exchange: &str) -> ApiResponse<Vec<String>> {
        match self.resolve(Some(exchange)) {
            Ok(venue) => venue.cancel_all_orders(symbol).await,
            Err(e) => ApiResponse::failure(e),
        }
    }

    pub async fn get_trade_history(
        &self,
        symbol: &str,
        limit: Option<u32>,
        exchange: &str,
    ) -> ApiResponse<Vec<TradeFill>> {
        match self.resolve(Some(exchange)) {
            Ok(venue) => venue.get_trade_history(symbol, limit).await,
            Err(e) => ApiResponse::failure(e),
        }
    }

    #[instrument(skip(self))]
    pub async fn test_all_connections(&self) -> BTreeMap<String, ProbeReport> {
        let outcomes = join_all(self.exchanges.iter().map(|(name, venue)| async move {
            let response = venue.test_connection().await;
            (name.clone(), probe_report(venue.as_ref(), &response))
        }))
        .await;
        outcomes.into_iter().collect()
    }

    #[instrument(skip(self))]
    pub async fn test_all_authentication(&self) -> BTreeMap<String, ProbeReport> {
        let outcomes = join_all(self.exchanges.iter().map(|(name, venue)| async move {
            let response = venue.test_auth().await;
            (name.clone(), probe_report(venue.as_ref(), &response))
        }))
        .await;
        outcomes.into_iter().collect()
    }

    /// Market data from `venues` (all registered when `None`) folded into
    /// one snapshot. `None` only when every venue failed.
    #[instrument(skip(self))]
    pub async fn get_aggregated_market_data(
        &self,
        symbol: &str,
        venues: Option<&[&str]>,
    ) -> Option<AggregatedSnapshot> {
        let names: Vec<String> = match venues {
            Some(venues) => venues.iter().map(|name| name.to_lowercase()).collect(),
            None => self.available_exchanges(),
        };

        let outcomes = join_all(names.into_iter().map(|name| async move {
            let response = match self.get(&name) {
                Some(venue) => venue.get_market_data(symbol).await,
                None => ApiResponse::failure(unknown_venue(&name)),
            };
            (name, response)
        }))
        .await;

        aggregation::aggregate(symbol, outcomes)
    }

    /// Cheapest venue for a buy, richest for a sell
    pub async fn find_best_price(&self, symbol: &str, side: OrderSide) -> Option<BestPrice> {
        let aggregated = self.get_aggregated_market_data(symbol, None).await?;
        aggregation::best_price(&aggregated, side)
    }

    /// Recommend a venue for `order` from one aggregated fan-out
    #[instrument(skip(self, order), fields(symbol = %order.symbol, side = %order.side))]
    pub async fn smart_order_routing(&self, order: &OrderRequest) -> Option<RoutingDecision> {
        let aggregated = self.get_aggregated_market_data(&order.symbol, None).await?;
        aggregation::routing_decision(&aggregated, order.side)
    }

    /// USD value of all balances. Venues whose balances fail are recorded
    /// in `failures` and left out; assets without a price are skipped.
    /// `None` when no venue returned balances.
    #[instrument(skip(self))]
    pub async fn get_total_portfolio_value(&self) -> Option<PortfolioValue> {
        let (balances, failures) = self.fan_out_balances().await;
        if balances.is_empty() {
            warn!(failed = failures.len(), "No venue returned balances");
            return None;
        }

        let valued = join_all(balances.into_iter().filter_map(|(name, balances)| {
            let venue = self.get(&name)?;
            Some(async move {
                let portfolio = portfolio::value_balances(venue.as_ref(), balances).await;
                (name, portfolio)
            })
        }))
        .await;

        let total_usd: Decimal = valued.iter().map(|(_, portfolio)| portfolio.usd).sum();
        Some(PortfolioValue {
            total_usd,
            exchanges: valued.into_iter().collect(),
            failures,
        })
    }

    pub fn get_exchange_info(&self) -> BTreeMap<String, ExchangeInfo> {
        self.exchanges
            .iter()
            .map(|(name, venue)| {
                let status = venue.status();
                let info = ExchangeInfo {
                    name: name.clone(),
                    display_name: venue.display_name().to_string(),
                    enabled: self.enabled.contains(name),
                    configured: venue.validate_credentials(),
                    authenticated: status.authenticated,
                    sandbox: venue.is_sandbox(),
                    status: status.state,
                    rate_limit_remaining: Some(venue.rate_limit_status().remaining),
                    last_error: status.error,
                };
                (name.clone(), info)
            })
            .collect()
    }

    /// Drop every connector
    pub fn shutdown(&mut self) {
        info!(count = self.exchanges.len(), "Shutting down exchange registry");
        self.exchanges.clear();
    }
}

fn probe_report(venue: &dyn ExchangeConnector, response: &ApiResponse<()>) -> ProbeReport {
    ProbeReport {
        success: response.is_success(),
        status: venue.status().state,
        message: response.error().map(ToString::to_string),
    }
}

/// Assemble a registry from ready-made connectors
#[derive(Default)]
pub struct RegistryBuilder {
    exchanges: BTreeMap<String, SharedConnector>,
    enabled: Vec<String>,
    default_exchange: Option<String>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register under the connector's own name; the first one registered is
    /// the default unless [`Self::default_exchange`] says otherwise.
    #[must_use]
    pub fn with_exchange(mut self, connector: SharedConnector) -> Self {
        let name = connector.name().to_lowercase();
        if !self.enabled.contains(&name) {
            self.enabled.push(name.clone());
        }
        self.exchanges.insert(name, connector);
        self
    }

    #[must_use]
    pub fn default_exchange(mut self, name: &str) -> Self {
        self.default_exchange = Some(name.to_lowercase());
        self
    }

    pub fn build(self) -> ExchangeRegistry {
        let default_exchange = self
            .default_exchange
            .or_else(|| self.enabled.first().cloned())
            .unwrap_or_default();
        ExchangeRegistry {
            exchanges: self.exchanges,
            enabled: self.enabled,
            default_exchange,
        }
    }
}

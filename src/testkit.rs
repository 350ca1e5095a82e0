//! Test doubles shared by the unit tests

use crate::core::config::ExchangeConfig;
use crate::core::errors::ExchangeError;
use crate::core::kernel::{HttpRequest, HttpResponse, RestClient};
use crate::core::traits::{AccountInfo, ConnectionProbe, MarketDataSource, OrderPlacer};
use crate::core::types::{
    ApiResponse, BalanceEntry, ConnectionState, ConnectionStatus, MarketSnapshot,
    OrderBookSnapshot, OrderRequest, OrderResult, OrderStatus, RateLimitStatus, TradeFill,
};
use async_trait::async_trait;
use reqwest::Method;
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::Duration;

pub(crate) fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).unwrap()
}

pub(crate) fn binance_config() -> ExchangeConfig {
    ExchangeConfig::new("A".repeat(64), "b".repeat(64))
}

pub(crate) fn coinbase_config() -> ExchangeConfig {
    // base64 of 48 'k' bytes
    ExchangeConfig::new(
        "c".repeat(32),
        "a2tr".repeat(16),
    )
    .with_passphrase("coinbase-pass".into())
}

pub(crate) fn kucoin_config() -> ExchangeConfig {
    ExchangeConfig::new(
        "5f3e9a1b2c4d6e8f0a1b2c3d".into(),
        "12345678-abcd-ef01-2345-6789abcdef01".into(),
    )
    .with_passphrase("kucoin-pass".into())
}

type Route = (Method, String);

/// Canned transport keyed by method and URL path
#[derive(Default)]
pub(crate) struct MockRest {
    routes: HashMap<Route, Result<HttpResponse, ExchangeError>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockRest {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(self, method: Method, path: &str, status: u16, body: Value) -> Self {
        self.respond_with_headers(method, path, status, body, &[])
    }

    pub(crate) fn respond_with_headers(
        mut self,
        method: Method,
        path: &str,
        status: u16,
        body: Value,
        headers: &[(&str, &str)],
    ) -> Self {
        let response = HttpResponse {
            status,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_lowercase(), (*v).to_string()))
                .collect(),
            body: body.to_string(),
        };
        self.routes.insert((method, path.to_string()), Ok(response));
        self
    }

    pub(crate) fn fail(mut self, method: Method, path: &str, error: ExchangeError) -> Self {
        self.routes.insert((method, path.to_string()), Err(error));
        self
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl RestClient for MockRest {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ExchangeError> {
        let path = url::Url::parse(&request.url)
            .map(|url| url.path().to_string())
            .map_err(|e| ExchangeError::Network(e.to_string()))?;
        let key = (request.method.clone(), path);
        self.requests.lock().unwrap().push(request);

        self.routes.get(&key).cloned().unwrap_or_else(|| {
            Err(ExchangeError::Network(format!(
                "no canned response for {} {}",
                key.0, key.1
            )))
        })
    }
}

/// Scripted venue for registry tests. Symbols without a price fail with a
/// protocol error, as do balances when none were set.
pub(crate) struct FakeVenue {
    name: String,
    prices: HashMap<String, Decimal>,
    balances: Option<Vec<BalanceEntry>>,
    healthy: bool,
    calls: Mutex<Vec<String>>,
}

impl FakeVenue {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            prices: HashMap::new(),
            balances: None,
            healthy: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_price(mut self, symbol: &str, price: &str) -> Self {
        self.prices.insert(symbol.to_string(), dec(price));
        self
    }

    pub(crate) fn with_balances(mut self, balances: Vec<BalanceEntry>) -> Self {
        self.balances = Some(balances);
        self
    }

    pub(crate) fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn down(&self) -> ExchangeError {
        ExchangeError::Network(format!("{} unreachable", self.name))
    }
}

#[async_trait]
impl MarketDataSource for FakeVenue {
    async fn get_market_data(&self, symbol: &str) -> ApiResponse<MarketSnapshot> {
        self.record(format!("market_data {}", symbol));
        match self.prices.get(symbol) {
            Some(price) => ApiResponse::success(MarketSnapshot {
                symbol: symbol.to_string(),
                price: *price,
                volume_24h: Decimal::ZERO,
                change_24h: Decimal::ZERO,
                change_percent_24h: Decimal::ZERO,
                high_24h: *price,
                low_24h: *price,
                timestamp: 0,
                exchange: self.name.clone(),
            }),
            None => ApiResponse::failure(ExchangeError::venue("404", "unknown symbol")),
        }
    }

    async fn get_order_book(
        &self,
        symbol: &str,
        _depth: Option<u32>,
    ) -> ApiResponse<OrderBookSnapshot> {
        self.record(format!("order_book {}", symbol));
        let mut book = OrderBookSnapshot::new(symbol.to_string(), Vec::new(), Vec::new(), 0);
        book.exchange = self.name.clone();
        ApiResponse::success(book)
    }

    async fn get_server_time(&self) -> ApiResponse<i64> {
        if self.healthy {
            ApiResponse::success(0)
        } else {
            ApiResponse::failure(self.down())
        }
    }
}

#[async_trait]
impl OrderPlacer for FakeVenue {
    async fn place_order(&self, order: &OrderRequest) -> ApiResponse<OrderResult> {
        self.record(format!("place_order {}", order.symbol));
        ApiResponse::success(OrderResult {
            order_id: format!("{}-1", self.name),
            symbol: order.symbol.clone(),
            side: order.side,
            status: OrderStatus::New,
            quantity: order.quantity,
            executed_quantity: Decimal::ZERO,
            price: order.price.unwrap_or_default(),
            average_price: None,
            timestamp: 0,
            exchange: self.name.clone(),
        })
    }

    async fn cancel_order(&self, order_id: &str, _symbol: &str) -> ApiResponse<()> {
        self.record(format!("cancel_order {}", order_id));
        ApiResponse::success(())
    }

    async fn get_order_status(&self, order_id: &str, _symbol: &str) -> ApiResponse<OrderResult> {
        self.record(format!("order_status {}", order_id));
        ApiResponse::failure(ExchangeError::venue("-2013", "Order does not exist."))
    }

    async fn get_open_orders(&self, symbol: Option<&str>) -> ApiResponse<Vec<OrderResult>> {
        self.record(format!("open_orders {}", symbol.unwrap_or("*")));
        ApiResponse::success(Vec::new())
    }

    async fn cancel_all_orders(&self, symbol: &str) -> ApiResponse<Vec<String>> {
        self.record(format!("cancel_all {}", symbol));
        ApiResponse::success(vec![format!("{}-1", self.name)])
    }
}

#[async_trait]
impl AccountInfo for FakeVenue {
    async fn get_balances(&self) -> ApiResponse<Vec<BalanceEntry>> {
        self.record("balances".to_string());
        match &self.balances {
            Some(balances) => ApiResponse::success(balances.clone()),
            None => ApiResponse::failure(ExchangeError::Configuration(format!(
                "{} API credentials are not configured",
                self.name
            ))),
        }
    }

    async fn get_trade_history(
        &self,
        symbol: &str,
        _limit: Option<u32>,
    ) -> ApiResponse<Vec<TradeFill>> {
        self.record(format!("trades {}", symbol));
        ApiResponse::success(Vec::new())
    }
}

#[async_trait]
impl ConnectionProbe for FakeVenue {
    fn name(&self) -> &str {
        &self.name
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn is_sandbox(&self) -> bool {
        false
    }

    fn is_configured(&self) -> bool {
        self.balances.is_some()
    }

    fn validate_credentials(&self) -> bool {
        self.balances.is_some()
    }

    fn status(&self) -> ConnectionStatus {
        ConnectionStatus {
            state: if self.healthy {
                ConnectionState::Connected
            } else {
                ConnectionState::Error
            },
            connected: self.healthy,
            ..ConnectionStatus::default()
        }
    }

    fn rate_limit_status(&self) -> RateLimitStatus {
        RateLimitStatus {
            remaining: 100,
            wait_time: Duration::ZERO,
        }
    }

    async fn test_connection(&self) -> ApiResponse<()> {
        if self.healthy {
            ApiResponse::success(())
        } else {
            ApiResponse::failure(self.down())
        }
    }

    async fn test_auth(&self) -> ApiResponse<()> {
        self.get_balances().await.map(|_| ())
    }
}

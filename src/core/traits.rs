use crate::core::{
    config::ExchangeConfig,
    errors::ExchangeError,
    kernel::{HttpResponse, Signer},
    types::{
        ApiResponse, BalanceEntry, ConnectionStatus, MarketSnapshot, OrderBookSnapshot,
        OrderContext, OrderRequest, OrderResult, RateLimitInfo, RateLimitStatus, TradeFill,
    },
};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Map, Value};

/// Endpoint path with optional `{symbol}` / `{orderId}` placeholders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointTemplate(pub &'static str);

impl EndpointTemplate {
    pub fn resolve(&self, symbol: Option<&str>, order_id: Option<&str>) -> String {
        let mut path = self.0.to_string();
        if let Some(symbol) = symbol {
            path = path.replace("{symbol}", symbol);
        }
        if let Some(order_id) = order_id {
            path = path.replace("{orderId}", order_id);
        }
        path
    }

    pub fn has_symbol(&self) -> bool {
        self.0.contains("{symbol}")
    }

    pub fn has_order_id(&self) -> bool {
        self.0.contains("{orderId}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeEndpoints {
    pub base_url: &'static str,
    pub sandbox_url: Option<&'static str>,
    pub ticker: EndpointTemplate,
    pub order_book: EndpointTemplate,
    pub balances: EndpointTemplate,
    pub place_order: EndpointTemplate,
    pub cancel_order: EndpointTemplate,
    pub order_status: EndpointTemplate,
    pub server_time: EndpointTemplate,
    pub open_orders: EndpointTemplate,
    /// Cancels every open order of one symbol
    pub cancel_all: EndpointTemplate,
    pub fills: EndpointTemplate,
    /// Query parameter carrying the symbol when a path has no placeholder
    pub symbol_param: &'static str,
}

/// Published request budget of a venue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeLimits {
    pub requests_per_minute: u32,
    pub orders_per_second: Option<u32>,
    /// Venues reporting consumed weight need the ceiling to derive "remaining"
    pub weight_per_minute: Option<u32>,
}

/// Venue-specific behaviour composed under [`crate::core::client::ExchangeClient`].
///
/// Everything here is synchronous and pure: signing, symbol translation,
/// request shaping and payload parsing. Transport, retries and rate limiting
/// live in the client.
pub trait ExchangeAdapter: Send + Sync + 'static {
    /// Lowercase registry key, e.g. `binance`
    fn name(&self) -> &'static str;

    fn display_name(&self) -> &'static str;

    fn endpoints(&self) -> ExchangeEndpoints;

    fn limits(&self) -> ExchangeLimits;

    /// Build the signer for authenticated calls
    fn signer(&self, config: &ExchangeConfig) -> Result<Box<dyn Signer>, ExchangeError>;

    fn to_venue_symbol(&self, canonical: &str) -> Result<String, ExchangeError>;

    fn to_canonical_symbol(&self, venue_symbol: &str) -> Result<String, ExchangeError>;

    fn supports_symbol(&self, canonical: &str) -> bool {
        self.to_venue_symbol(canonical).is_ok()
    }

    fn parse_market_data(&self, payload: &Value, symbol: &str)
        -> Result<MarketSnapshot, ExchangeError>;

    fn parse_order_book(
        &self,
        payload: &Value,
        symbol: &str,
    ) -> Result<OrderBookSnapshot, ExchangeError>;

    fn parse_balances(&self, payload: &Value) -> Result<Vec<BalanceEntry>, ExchangeError>;

    fn parse_order(
        &self,
        payload: &Value,
        context: &OrderContext<'_>,
    ) -> Result<OrderResult, ExchangeError>;

    /// Server time in epoch milliseconds
    fn parse_server_time(&self, payload: &Value) -> Result<i64, ExchangeError>;

    /// Venue parameter names and casing for a new order
    fn order_params(
        &self,
        order: &OrderRequest,
        venue_symbol: &str,
    ) -> Result<Map<String, Value>, ExchangeError>;

    /// Open orders; `symbol` is the canonical filter the caller asked for,
    /// if any. Orders listed without a filter carry their own venue symbol.
    fn parse_open_orders(
        &self,
        payload: &Value,
        symbol: Option<&str>,
    ) -> Result<Vec<OrderResult>, ExchangeError>;

    /// Ids of the orders a cancel-all removed
    fn parse_canceled_ids(&self, payload: &Value) -> Result<Vec<String>, ExchangeError>;

    fn parse_fills(&self, payload: &Value, symbol: &str) -> Result<Vec<TradeFill>, ExchangeError>;

    /// Extra filters for the open-orders listing
    fn open_orders_params(&self) -> Map<String, Value> {
        Map::new()
    }

    fn fills_params(&self, _limit: Option<u32>) -> Map<String, Value> {
        Map::new()
    }

    fn order_book_params(&self, _depth: Option<u32>) -> Map<String, Value> {
        Map::new()
    }

    /// Whether parameters travel in the query string rather than a JSON body
    fn params_in_query(&self, method: &Method) -> bool {
        *method == Method::GET || *method == Method::DELETE
    }

    /// Strip a response envelope; venues without one return the payload as-is
    fn unwrap_envelope(&self, payload: Value) -> Result<Value, ExchangeError> {
        Ok(payload)
    }

    fn rate_limit_info(&self, _response: &HttpResponse) -> Option<RateLimitInfo> {
        None
    }
}

#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn get_market_data(&self, symbol: &str) -> ApiResponse<MarketSnapshot>;

    async fn get_order_book(&self, symbol: &str, depth: Option<u32>)
        -> ApiResponse<OrderBookSnapshot>;

    /// Venue clock in epoch milliseconds
    async fn get_server_time(&self) -> ApiResponse<i64>;
}

#[async_trait]
pub trait OrderPlacer: Send + Sync {
    async fn place_order(&self, order: &OrderRequest) -> ApiResponse<OrderResult>;

    async fn cancel_order(&self, order_id: &str, symbol: &str) -> ApiResponse<()>;

    async fn get_order_status(&self, order_id: &str, symbol: &str) -> ApiResponse<OrderResult>;

    /// Open orders of one symbol, or of the whole account
    async fn get_open_orders(&self, symbol: Option<&str>) -> ApiResponse<Vec<OrderResult>>;

    /// Cancel every open order of `symbol`, returning the cancelled ids
    async fn cancel_all_orders(&self, symbol: &str) -> ApiResponse<Vec<String>>;
}

#[async_trait]
pub trait AccountInfo: Send + Sync {
    async fn get_balances(&self) -> ApiResponse<Vec<BalanceEntry>>;

    /// Most recent fills of `symbol`, newest venue page only
    async fn get_trade_history(
        &self,
        symbol: &str,
        limit: Option<u32>,
    ) -> ApiResponse<Vec<TradeFill>>;
}

/// Connectivity probes and the connection state they drive
#[async_trait]
pub trait ConnectionProbe: Send + Sync {
    fn name(&self) -> &str;

    fn display_name(&self) -> &str;

    fn is_sandbox(&self) -> bool;

    /// Credentials are present (not necessarily valid)
    fn is_configured(&self) -> bool;

    /// Credential shape check, no network call
    fn validate_credentials(&self) -> bool;

    fn status(&self) -> ConnectionStatus;

    fn rate_limit_status(&self) -> RateLimitStatus;

    /// Unauthenticated reachability probe
    async fn test_connection(&self) -> ApiResponse<()>;

    /// Authenticated probe
    async fn test_auth(&self) -> ApiResponse<()>;
}

/// Everything the registry needs from one venue
pub trait ExchangeConnector: MarketDataSource + OrderPlacer + AccountInfo + ConnectionProbe {}

impl<T> ExchangeConnector for T where T: MarketDataSource + OrderPlacer + AccountInfo + ConnectionProbe
{}

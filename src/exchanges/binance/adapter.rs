use super::conversions;
use super::signer::BinanceSigner;
use super::types::{
    BinanceAccount, BinanceDepth, BinanceOrder, BinanceServerTime, BinanceTicker24hr, BinanceTrade,
};
use crate::core::config::ExchangeConfig;
use crate::core::errors::ExchangeError;
use crate::core::kernel::{HttpResponse, Signer};
use crate::core::traits::{EndpointTemplate, ExchangeAdapter, ExchangeEndpoints, ExchangeLimits};
use crate::core::types::{
    BalanceEntry, MarketSnapshot, OrderBookSnapshot, OrderContext, OrderRequest, OrderResult,
    RateLimitInfo, TradeFill,
};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

const ENDPOINTS: ExchangeEndpoints = ExchangeEndpoints {
    base_url: "https://api.binance.com",
    sandbox_url: Some("https://testnet.binance.vision"),
    ticker: EndpointTemplate("/api/v3/ticker/24hr"),
    order_book: EndpointTemplate("/api/v3/depth"),
    balances: EndpointTemplate("/api/v3/account"),
    place_order: EndpointTemplate("/api/v3/order"),
    cancel_order: EndpointTemplate("/api/v3/order"),
    order_status: EndpointTemplate("/api/v3/order"),
    server_time: EndpointTemplate("/api/v3/time"),
    open_orders: EndpointTemplate("/api/v3/openOrders"),
    cancel_all: EndpointTemplate("/api/v3/openOrders"),
    fills: EndpointTemplate("/api/v3/myTrades"),
    symbol_param: "symbol",
};

const LIMITS: ExchangeLimits = ExchangeLimits {
    requests_per_minute: 1200,
    orders_per_second: Some(10),
    weight_per_minute: Some(6000),
};

fn decode<T: DeserializeOwned>(payload: &Value, what: &str) -> Result<T, ExchangeError> {
    T::deserialize(payload).map_err(|e| ExchangeError::parse(&format!("Binance {}", what), e))
}

/// Binance spot
#[derive(Debug, Clone, Copy, Default)]
pub struct BinanceAdapter;

impl ExchangeAdapter for BinanceAdapter {
    fn name(&self) -> &'static str {
        "binance"
    }

    fn display_name(&self) -> &'static str {
        "Binance"
    }

    fn endpoints(&self) -> ExchangeEndpoints {
        ENDPOINTS
    }

    fn limits(&self) -> ExchangeLimits {
        LIMITS
    }

    fn signer(&self, config: &ExchangeConfig) -> Result<Box<dyn Signer>, ExchangeError> {
        Ok(Box::new(BinanceSigner::new(
            config.api_key().to_string(),
            config.secret_key().to_string(),
        )))
    }

    /// Binance uses the canonical form; separators are dropped
    fn to_venue_symbol(&self, canonical: &str) -> Result<String, ExchangeError> {
        let symbol: String = canonical
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | '/'))
            .collect::<String>()
            .to_uppercase();
        if symbol.is_empty() || !symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ExchangeError::Configuration(format!(
                "Unsupported Binance symbol: {}",
                canonical
            )));
        }
        Ok(symbol)
    }

    fn to_canonical_symbol(&self, venue_symbol: &str) -> Result<String, ExchangeError> {
        self.to_venue_symbol(venue_symbol)
    }

    fn parse_market_data(
        &self,
        payload: &Value,
        symbol: &str,
    ) -> Result<MarketSnapshot, ExchangeError> {
        let ticker: BinanceTicker24hr = decode(payload, "ticker")?;
        conversions::convert_ticker(ticker, symbol)
    }

    fn parse_order_book(
        &self,
        payload: &Value,
        symbol: &str,
    ) -> Result<OrderBookSnapshot, ExchangeError> {
        let depth: BinanceDepth = decode(payload, "depth")?;
        conversions::convert_depth(depth, symbol)
    }

    fn parse_balances(&self, payload: &Value) -> Result<Vec<BalanceEntry>, ExchangeError> {
        let account: BinanceAccount = decode(payload, "account")?;
        conversions::convert_account(account)
    }

    fn parse_order(
        &self,
        payload: &Value,
        context: &OrderContext<'_>,
    ) -> Result<OrderResult, ExchangeError> {
        let order: BinanceOrder = decode(payload, "order")?;
        conversions::convert_order(order, context)
    }

    fn parse_server_time(&self, payload: &Value) -> Result<i64, ExchangeError> {
        let time: BinanceServerTime = decode(payload, "server time")?;
        Ok(time.server_time)
    }

    fn parse_open_orders(
        &self,
        payload: &Value,
        symbol: Option<&str>,
    ) -> Result<Vec<OrderResult>, ExchangeError> {
        let orders: Vec<BinanceOrder> = decode(payload, "open orders")?;
        orders
            .into_iter()
            .map(|order| {
                let canonical = match symbol {
                    Some(symbol) => symbol.to_string(),
                    None => self.to_canonical_symbol(&order.symbol)?,
                };
                let context = OrderContext {
                    symbol: &canonical,
                    request: None,
                };
                conversions::convert_order(order, &context)
            })
            .collect()
    }

    fn parse_canceled_ids(&self, payload: &Value) -> Result<Vec<String>, ExchangeError> {
        let entries: Vec<Value> = decode(payload, "cancel-all reply")?;
        Ok(conversions::canceled_ids(&entries))
    }

    fn parse_fills(&self, payload: &Value, symbol: &str) -> Result<Vec<TradeFill>, ExchangeError> {
        let trades: Vec<BinanceTrade> = decode(payload, "trades")?;
        trades
            .into_iter()
            .map(|trade| conversions::convert_trade(trade, symbol))
            .collect()
    }

    fn fills_params(&self, limit: Option<u32>) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("limit".into(), conversions::trades_limit(limit).into());
        params
    }

    fn order_params(
        &self,
        order: &OrderRequest,
        venue_symbol: &str,
    ) -> Result<Map<String, Value>, ExchangeError> {
        conversions::order_params(order, venue_symbol)
    }

    fn order_book_params(&self, depth: Option<u32>) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("limit".into(), conversions::depth_limit(depth).into());
        params
    }

    /// The signature covers the query string, so every method sends its
    /// parameters there.
    fn params_in_query(&self, _method: &Method) -> bool {
        true
    }

    fn rate_limit_info(&self, response: &HttpResponse) -> Option<RateLimitInfo> {
        let used: u32 = response.header("x-mbx-used-weight-1m")?.parse().ok()?;
        let ceiling = LIMITS.weight_per_minute.unwrap_or(LIMITS.requests_per_minute);
        Some(RateLimitInfo {
            used: Some(used),
            remaining: ceiling.saturating_sub(used),
        })
    }
}

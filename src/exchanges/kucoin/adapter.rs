use super::conversions;
use super::signer::KucoinSigner;
use super::types::{
    KucoinAccount, KucoinCancelAll, KucoinFill, KucoinOrder, KucoinOrderAck, KucoinOrderBook,
    KucoinPage, KucoinStats,
};
use crate::core::config::ExchangeConfig;
use crate::core::errors::ExchangeError;
use crate::core::kernel::{HttpResponse, Signer};
use crate::core::traits::{EndpointTemplate, ExchangeAdapter, ExchangeEndpoints, ExchangeLimits};
use crate::core::types::{
    BalanceEntry, MarketSnapshot, OrderBookSnapshot, OrderContext, OrderRequest, OrderResult,
    RateLimitInfo, TradeFill,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

const ENDPOINTS: ExchangeEndpoints = ExchangeEndpoints {
    base_url: "https://api.kucoin.com",
    sandbox_url: Some("https://openapi-sandbox.kucoin.com"),
    ticker: EndpointTemplate("/api/v1/market/stats"),
    order_book: EndpointTemplate("/api/v1/market/orderbook/level2_20"),
    balances: EndpointTemplate("/api/v1/accounts"),
    place_order: EndpointTemplate("/api/v1/orders"),
    cancel_order: EndpointTemplate("/api/v1/orders/{orderId}"),
    order_status: EndpointTemplate("/api/v1/orders/{orderId}"),
    server_time: EndpointTemplate("/api/v1/timestamp"),
    open_orders: EndpointTemplate("/api/v1/orders"),
    cancel_all: EndpointTemplate("/api/v1/orders"),
    fills: EndpointTemplate("/api/v1/fills"),
    symbol_param: "symbol",
};

const LIMITS: ExchangeLimits = ExchangeLimits {
    requests_per_minute: 600,
    // 45 orders per 10 seconds
    orders_per_second: Some(4),
    weight_per_minute: None,
};

fn decode<T: DeserializeOwned>(payload: &Value, what: &str) -> Result<T, ExchangeError> {
    T::deserialize(payload).map_err(|e| ExchangeError::parse(&format!("KuCoin {}", what), e))
}

/// KuCoin spot
#[derive(Debug, Clone, Copy, Default)]
pub struct KucoinAdapter;

impl ExchangeAdapter for KucoinAdapter {
    fn name(&self) -> &'static str {
        "kucoin"
    }

    fn display_name(&self) -> &'static str {
        "KuCoin"
    }

    fn endpoints(&self) -> ExchangeEndpoints {
        ENDPOINTS
    }

    fn limits(&self) -> ExchangeLimits {
        LIMITS
    }

    fn signer(&self, config: &ExchangeConfig) -> Result<Box<dyn Signer>, ExchangeError> {
        let passphrase = config.passphrase().ok_or_else(|| {
            ExchangeError::Configuration("KuCoin requires an API passphrase".to_string())
        })?;
        Ok(Box::new(KucoinSigner::new(
            config.api_key().to_string(),
            config.secret_key().to_string(),
            passphrase.to_string(),
        )))
    }

    fn to_venue_symbol(&self, canonical: &str) -> Result<String, ExchangeError> {
        conversions::to_venue_symbol(canonical)
    }

    fn to_canonical_symbol(&self, venue_symbol: &str) -> Result<String, ExchangeError> {
        conversions::from_venue_symbol(venue_symbol)
    }

    fn parse_market_data(
        &self,
        payload: &Value,
        symbol: &str,
    ) -> Result<MarketSnapshot, ExchangeError> {
        let stats: KucoinStats = decode(payload, "market stats")?;
        conversions::convert_stats(stats, symbol)
    }

    fn parse_order_book(
        &self,
        payload: &Value,
        symbol: &str,
    ) -> Result<OrderBookSnapshot, ExchangeError> {
        let book: KucoinOrderBook = decode(payload, "order book")?;
        conversions::convert_book(book, symbol)
    }

    fn parse_balances(&self, payload: &Value) -> Result<Vec<BalanceEntry>, ExchangeError> {
        let accounts: Vec<KucoinAccount> = decode(payload, "accounts")?;
        conversions::convert_accounts(accounts)
    }

    /// Placement answers `{orderId}`, the order detail endpoint the full record
    fn parse_order(
        &self,
        payload: &Value,
        context: &OrderContext<'_>,
    ) -> Result<OrderResult, ExchangeError> {
        if payload.get("id").is_some() {
            let order: KucoinOrder = decode(payload, "order")?;
            conversions::convert_order(order, context)
        } else {
            let ack: KucoinOrderAck = decode(payload, "order acknowledgement")?;
            conversions::convert_order_ack(ack, context)
        }
    }

    fn parse_server_time(&self, payload: &Value) -> Result<i64, ExchangeError> {
        payload
            .as_i64()
            .ok_or_else(|| ExchangeError::Parse(format!("KuCoin timestamp: {}", payload)))
    }

    fn parse_open_orders(
        &self,
        payload: &Value,
        symbol: Option<&str>,
    ) -> Result<Vec<OrderResult>, ExchangeError> {
        let page: KucoinPage<KucoinOrder> = decode(payload, "order list")?;
        let context = OrderContext {
            symbol: symbol.unwrap_or_default(),
            request: None,
        };
        page.items
            .into_iter()
            .map(|order| conversions::convert_order(order, &context))
            .collect()
    }

    fn parse_canceled_ids(&self, payload: &Value) -> Result<Vec<String>, ExchangeError> {
        let reply: KucoinCancelAll = decode(payload, "cancel-all reply")?;
        Ok(reply.cancelled_order_ids)
    }

    fn parse_fills(&self, payload: &Value, _symbol: &str) -> Result<Vec<TradeFill>, ExchangeError> {
        let page: KucoinPage<KucoinFill> = decode(payload, "fills")?;
        page.items.into_iter().map(conversions::convert_fill).collect()
    }

    fn open_orders_params(&self) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("status".into(), "active".into());
        params
    }

    fn fills_params(&self, limit: Option<u32>) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("pageSize".into(), conversions::fills_page_size(limit).into());
        params
    }

    fn order_params(
        &self,
        order: &OrderRequest,
        venue_symbol: &str,
    ) -> Result<Map<String, Value>, ExchangeError> {
        conversions::order_params(order, venue_symbol)
    }

    fn unwrap_envelope(&self, payload: Value) -> Result<Value, ExchangeError> {
        conversions::unwrap_envelope(payload)
    }

    fn rate_limit_info(&self, response: &HttpResponse) -> Option<RateLimitInfo> {
        let remaining: u32 = response.header("gw-ratelimit-remaining")?.parse().ok()?;
        let used = response
            .header("gw-ratelimit-limit")
            .and_then(|limit| limit.parse::<u32>().ok())
            .map(|limit| limit.saturating_sub(remaining));
        Some(RateLimitInfo { used, remaining })
    }
}

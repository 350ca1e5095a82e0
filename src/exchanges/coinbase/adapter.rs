use super::conversions;
use super::signer::CoinbaseSigner;
use super::types::{
    CoinbaseAccount, CoinbaseBook, CoinbaseFill, CoinbaseOrder, CoinbaseTicker, CoinbaseTime,
};
use crate::core::config::ExchangeConfig;
use crate::core::errors::ExchangeError;
use crate::core::kernel::Signer;
use crate::core::traits::{EndpointTemplate, ExchangeAdapter, ExchangeEndpoints, ExchangeLimits};
use crate::core::types::{
    BalanceEntry, MarketSnapshot, OrderBookSnapshot, OrderContext, OrderRequest, OrderResult,
    TradeFill,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

const ENDPOINTS: ExchangeEndpoints = ExchangeEndpoints {
    base_url: "https://api.exchange.coinbase.com",
    sandbox_url: Some("https://api-public.sandbox.exchange.coinbase.com"),
    ticker: EndpointTemplate("/products/{symbol}/ticker"),
    order_book: EndpointTemplate("/products/{symbol}/book"),
    balances: EndpointTemplate("/accounts"),
    place_order: EndpointTemplate("/orders"),
    cancel_order: EndpointTemplate("/orders/{orderId}"),
    order_status: EndpointTemplate("/orders/{orderId}"),
    server_time: EndpointTemplate("/time"),
    open_orders: EndpointTemplate("/orders"),
    cancel_all: EndpointTemplate("/orders"),
    fills: EndpointTemplate("/fills"),
    symbol_param: "product_id",
};

const LIMITS: ExchangeLimits = ExchangeLimits {
    requests_per_minute: 600,
    orders_per_second: Some(5),
    weight_per_minute: None,
};

fn decode<T: DeserializeOwned>(payload: &Value, what: &str) -> Result<T, ExchangeError> {
    T::deserialize(payload).map_err(|e| ExchangeError::parse(&format!("Coinbase {}", what), e))
}

/// Coinbase Exchange (formerly Coinbase Pro)
#[derive(Debug, Clone, Copy, Default)]
pub struct CoinbaseAdapter;

impl ExchangeAdapter for CoinbaseAdapter {
    fn name(&self) -> &'static str {
        "coinbase"
    }

    fn display_name(&self) -> &'static str {
        "Coinbase"
    }

    fn endpoints(&self) -> ExchangeEndpoints {
        ENDPOINTS
    }

    fn limits(&self) -> ExchangeLimits {
        LIMITS
    }

    fn signer(&self, config: &ExchangeConfig) -> Result<Box<dyn Signer>, ExchangeError> {
        let passphrase = config.passphrase().ok_or_else(|| {
            ExchangeError::Configuration("Coinbase requires an API passphrase".to_string())
        })?;
        Ok(Box::new(CoinbaseSigner::new(
            config.api_key().to_string(),
            config.secret_key().to_string(),
            passphrase.to_string(),
        )))
    }

    fn to_venue_symbol(&self, canonical: &str) -> Result<String, ExchangeError> {
        conversions::to_product_id(canonical)
    }

    fn to_canonical_symbol(&self, venue_symbol: &str) -> Result<String, ExchangeError> {
        conversions::from_product_id(venue_symbol)
    }

    fn parse_market_data(
        &self,
        payload: &Value,
        symbol: &str,
    ) -> Result<MarketSnapshot, ExchangeError> {
        let ticker: CoinbaseTicker = decode(payload, "ticker")?;
        conversions::convert_ticker(ticker, symbol)
    }

    fn parse_order_book(
        &self,
        payload: &Value,
        symbol: &str,
    ) -> Result<OrderBookSnapshot, ExchangeError> {
        let book: CoinbaseBook = decode(payload, "order book")?;
        conversions::convert_book(book, symbol)
    }

    fn parse_balances(&self, payload: &Value) -> Result<Vec<BalanceEntry>, ExchangeError> {
        let accounts: Vec<CoinbaseAccount> = decode(payload, "accounts")?;
        conversions::convert_accounts(accounts)
    }

    fn parse_order(
        &self,
        payload: &Value,
        context: &OrderContext<'_>,
    ) -> Result<OrderResult, ExchangeError> {
        let order: CoinbaseOrder = decode(payload, "order")?;
        conversions::convert_order(order, context)
    }

    fn parse_server_time(&self, payload: &Value) -> Result<i64, ExchangeError> {
        let time: CoinbaseTime = decode(payload, "time")?;
        Ok((time.epoch * 1000.0).round() as i64)
    }

    /// `/orders` defaults to the open, pending and active statuses
    fn parse_open_orders(
        &self,
        payload: &Value,
        symbol: Option<&str>,
    ) -> Result<Vec<OrderResult>, ExchangeError> {
        let orders: Vec<CoinbaseOrder> = decode(payload, "orders")?;
        let context = OrderContext {
            symbol: symbol.unwrap_or_default(),
            request: None,
        };
        orders
            .into_iter()
            .map(|order| conversions::convert_order(order, &context))
            .collect()
    }

    fn parse_canceled_ids(&self, payload: &Value) -> Result<Vec<String>, ExchangeError> {
        decode(payload, "cancel-all reply")
    }

    fn parse_fills(&self, payload: &Value, _symbol: &str) -> Result<Vec<TradeFill>, ExchangeError> {
        let fills: Vec<CoinbaseFill> = decode(payload, "fills")?;
        fills.into_iter().map(conversions::convert_fill).collect()
    }

    fn fills_params(&self, limit: Option<u32>) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("limit".into(), conversions::fills_limit(limit).into());
        params
    }

    fn order_params(
        &self,
        order: &OrderRequest,
        venue_symbol: &str,
    ) -> Result<Map<String, Value>, ExchangeError> {
        conversions::order_params(order, venue_symbol)
    }

    /// Level 1 is the inside quote only, level 2 the top 50 aggregated
    fn order_book_params(&self, depth: Option<u32>) -> Map<String, Value> {
        let level = if depth == Some(1) { 1 } else { 2 };
        let mut params = Map::new();
        params.insert("level".into(), level.into());
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{OrderSide, OrderStatus};
    use crate::testkit::dec;
    use serde_json::json;

    #[test]
    fn test_symbol_round_trip() {
        let adapter = CoinbaseAdapter;
        for symbol in ["BTCUSDT", "ETHUSDT", "ETHBTC", "SOLEUR", "ADAUSDC"] {
            let venue = adapter.to_venue_symbol(symbol).unwrap();
            assert_eq!(adapter.to_canonical_symbol(&venue).unwrap(), symbol);
        }
        assert!(!adapter.supports_symbol("BTCUSD"));
    }

    #[test]
    fn test_signer_requires_passphrase() {
        let config = ExchangeConfig::new("c".repeat(32), "a2tr".repeat(16));
        assert!(matches!(
            CoinbaseAdapter.signer(&config),
            Err(ExchangeError::Configuration(_))
        ));
        assert!(CoinbaseAdapter
            .signer(&config.with_passphrase("p".into()))
            .is_ok());
    }

    #[test]
    fn test_parse_accounts() {
        let payload = json!([
            {"id": "1", "currency": "BTC", "balance": "1.1", "available": "1.0", "hold": "0.1", "profile_id": "p"},
            {"id": "2", "currency": "USD", "balance": "0.0", "available": "0", "hold": "0", "profile_id": "p"}
        ]);
        let balances = CoinbaseAdapter.parse_balances(&payload).unwrap();
        assert_eq!(balances.len(), 1);
        assert_eq!(balances[0].free, dec("1.0"));
        assert_eq!(balances[0].locked, dec("0.1"));
        assert_eq!(balances[0].total, dec("1.1"));
    }

    #[test]
    fn test_parse_book_with_order_counts() {
        let payload = json!({
            "sequence": 3,
            "bids": [["295.96", "4.39088265", 2], ["295.97", "1", 1]],
            "asks": [["295.98", "0.5", 3]]
        });
        let book = CoinbaseAdapter.parse_order_book(&payload, "ETHUSDT").unwrap();
        assert_eq!(book.best_bid().unwrap().price, dec("295.97"));
        assert_eq!(book.best_ask().unwrap().quantity, dec("0.5"));
    }

    #[test]
    fn test_parse_open_limit_order() {
        let payload = json!({
            "id": "d0c5340b-6d6c-49d9-b567-48c4bfca13d2",
            "price": "0.10000000",
            "size": "0.01000000",
            "product_id": "BTC-USD",
            "side": "buy",
            "type": "limit",
            "created_at": "2016-12-08T20:02:28.53864Z",
            "filled_size": "0.00000000",
            "executed_value": "0.0000000000000000",
            "status": "pending"
        });
        let context = OrderContext {
            symbol: "BTCUSDT",
            request: None,
        };
        let order = CoinbaseAdapter.parse_order(&payload, &context).unwrap();
        assert_eq!(order.order_id, "d0c5340b-6d6c-49d9-b567-48c4bfca13d2");
        assert_eq!(order.status, OrderStatus::New);
        assert_eq!(order.side, OrderSide::Buy);
        assert_eq!(order.quantity, dec("0.01"));
        assert_eq!(order.symbol, "BTCUSDT");
    }

    #[test]
    fn test_parse_open_orders_and_cancel_all() {
        let payload = json!([
            {"id": "a1", "product_id": "ETH-BTC", "side": "sell", "status": "open", "size": "2", "price": "0.06", "filled_size": "0"},
            {"id": "b2", "product_id": "BTC-USD", "side": "buy", "status": "active", "size": "0.1", "price": "30000", "filled_size": "0"}
        ]);
        let orders = CoinbaseAdapter.parse_open_orders(&payload, None).unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].symbol, "ETHBTC");
        assert_eq!(orders[1].symbol, "BTCUSDT");
        assert!(orders.iter().all(|o| o.status == OrderStatus::New));

        let ids = CoinbaseAdapter
            .parse_canceled_ids(&json!(["a1", "b2"]))
            .unwrap();
        assert_eq!(ids, vec!["a1", "b2"]);
    }

    #[test]
    fn test_parse_server_time() {
        let payload = json!({"iso": "2015-01-07T23:47:25.201Z", "epoch": 1420674445.201});
        assert_eq!(
            CoinbaseAdapter.parse_server_time(&payload).unwrap(),
            1_420_674_445_201
        );
    }
}

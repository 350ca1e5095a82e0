use crate::core::errors::ExchangeError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Quote currencies recognised when splitting a canonical symbol.
/// Longer codes come first so `BTCUSDT` is not read as `BTCUSD` + `T`.
/// A longer code loses to a later one when it would leave a base under
/// three letters, so `BNBUSD` is `BNB` + `USD` rather than `BN` + `BUSD`.
/// Two-letter bases still parse when no other split exists (`OPUSDT`).
const QUOTE_ASSETS: [&str; 13] = [
    "FDUSD", "USDT", "USDC", "BUSD", "TUSD", "DAI", "USD", "EUR", "GBP", "BTC", "ETH", "BNB",
    "KCS",
];

/// Canonical trading pair, written `BASEQUOTE` (e.g. `BTCUSDT`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    pub base: String,
    pub quote: String,
}

impl Symbol {
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Result<Self, ExchangeError> {
        let base = base.into().to_uppercase();
        let quote = quote.into().to_uppercase();

        if base.is_empty() || quote.is_empty() {
            return Err(ExchangeError::Configuration(
                "Base and quote assets cannot be empty".to_string(),
            ));
        }

        Ok(Self { base, quote })
    }

    /// Split a canonical symbol on its quote-currency suffix
    pub fn parse(canonical: &str) -> Result<Self, ExchangeError> {
        let upper = canonical.trim().to_uppercase();
        let mut splits = QUOTE_ASSETS.iter().filter_map(|quote| {
            upper
                .strip_suffix(quote)
                .filter(|base| !base.is_empty())
                .map(|base| (base, *quote))
        });
        let first = splits.next();
        let (base, quote) = first
            .filter(|(base, _)| base.len() >= 3)
            .or_else(|| splits.find(|(base, _)| base.len() >= 3))
            .or(first)
            .ok_or_else(|| {
                ExchangeError::Configuration(format!("Unrecognised symbol: {}", canonical))
            })?;
        Ok(Self {
            base: base.to_string(),
            quote: quote.to_string(),
        })
    }

    pub fn canonical(&self) -> String {
        format!("{}{}", self.base, self.quote)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.base, self.quote)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Market,
    Limit,
    StopLoss,
    TakeProfit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::upper_case_acronyms)]
pub enum TimeInForce {
    GTC,
    IOC,
    FOK,
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GTC => write!(f, "GTC"),
            Self::IOC => write!(f, "IOC"),
            Self::FOK => write!(f, "FOK"),
        }
    }
}

/// Canonical order lifecycle; every venue status maps onto one of these
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub price: Decimal,
    pub volume_24h: Decimal,
    pub change_24h: Decimal,
    pub change_percent_24h: Decimal,
    pub high_24h: Decimal,
    pub low_24h: Decimal,
    /// Epoch milliseconds
    pub timestamp: i64,
    pub exchange: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookEntry {
    pub price: Decimal,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub symbol: String,
    /// Highest price first
    pub bids: Vec<OrderBookEntry>,
    /// Lowest price first
    pub asks: Vec<OrderBookEntry>,
    pub timestamp: i64,
    pub exchange: String,
}

impl OrderBookSnapshot {
    pub fn new(
        symbol: String,
        mut bids: Vec<OrderBookEntry>,
        mut asks: Vec<OrderBookEntry>,
        timestamp: i64,
    ) -> Self {
        bids.sort_by(|a, b| b.price.cmp(&a.price));
        asks.sort_by(|a, b| a.price.cmp(&b.price));
        Self {
            symbol,
            bids,
            asks,
            timestamp,
            exchange: String::new(),
        }
    }

    pub fn best_bid(&self) -> Option<&OrderBookEntry> {
        self.bids.first()
    }

    pub fn best_ask(&self) -> Option<&OrderBookEntry> {
        self.asks.first()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceEntry {
    pub asset: String,
    pub free: Decimal,
    pub locked: Decimal,
    pub total: Decimal,
}

impl BalanceEntry {
    pub fn new(asset: impl Into<String>, free: Decimal, locked: Decimal) -> Self {
        Self {
            asset: asset.into(),
            free,
            locked,
            total: free + locked,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Canonical symbol, e.g. `BTCUSDT`
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub time_in_force: Option<TimeInForce>,
    /// Target venue name
    pub exchange: String,
}

impl OrderRequest {
    pub fn market(exchange: &str, symbol: &str, side: OrderSide, quantity: Decimal) -> Self {
        Self {
            symbol: symbol.to_string(),
            side,
            order_type: OrderType::Market,
            quantity,
            price: None,
            stop_price: None,
            time_in_force: None,
            exchange: exchange.to_string(),
        }
    }

    pub fn limit(
        exchange: &str,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
        price: Decimal,
    ) -> Self {
        Self {
            order_type: OrderType::Limit,
            price: Some(price),
            ..Self::market(exchange, symbol, side, quantity)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResult {
    pub order_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub status: OrderStatus,
    pub quantity: Decimal,
    pub executed_quantity: Decimal,
    pub price: Decimal,
    pub average_price: Option<Decimal>,
    pub timestamp: i64,
    pub exchange: String,
}

/// One execution from the account's trade history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeFill {
    pub trade_id: String,
    pub order_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub price: Decimal,
    pub quantity: Decimal,
    pub fee: Decimal,
    pub fee_asset: Option<String>,
    pub is_maker: bool,
    pub timestamp: i64,
    pub exchange: String,
}

/// What a parser knows about the order it is decoding. Venues whose
/// responses omit fields (KuCoin placement only returns an id) fill the
/// gaps from here.
#[derive(Debug, Clone, Copy)]
pub struct OrderContext<'a> {
    pub symbol: &'a str,
    pub request: Option<&'a OrderRequest>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Uninitialized,
    Connected,
    Authenticated,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub connected: bool,
    pub authenticated: bool,
    /// Epoch milliseconds of the last successful probe
    pub last_ping: Option<i64>,
    pub error: Option<String>,
    pub rate_limit_remaining: Option<u32>,
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self {
            state: ConnectionState::Uninitialized,
            connected: false,
            authenticated: false,
            last_ping: None,
            error: None,
            rate_limit_remaining: None,
        }
    }
}

/// Rate-limit telemetry attached to a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitInfo {
    pub used: Option<u32>,
    pub remaining: u32,
}

/// Local view of the request budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub remaining: u32,
    pub wait_time: Duration,
}

/// Uniform result of every exchange operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse<T> {
    pub result: Result<T, ExchangeError>,
    pub rate_limit: Option<RateLimitInfo>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            result: Ok(data),
            rate_limit: None,
        }
    }

    pub fn failure(error: ExchangeError) -> Self {
        Self {
            result: Err(error),
            rate_limit: None,
        }
    }

    #[must_use]
    pub fn with_rate_limit(mut self, rate_limit: Option<RateLimitInfo>) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn data(&self) -> Option<&T> {
        self.result.as_ref().ok()
    }

    pub fn error(&self) -> Option<&ExchangeError> {
        self.result.as_ref().err()
    }

    pub fn into_result(self) -> Result<T, ExchangeError> {
        self.result
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        ApiResponse {
            result: self.result.map(f),
            rate_limit: self.rate_limit,
        }
    }

    pub fn and_then<U>(self, f: impl FnOnce(T) -> Result<U, ExchangeError>) -> ApiResponse<U> {
        ApiResponse {
            result: self.result.and_then(f),
            rate_limit: self.rate_limit,
        }
    }
}

impl<T> From<Result<T, ExchangeError>> for ApiResponse<T> {
    fn from(result: Result<T, ExchangeError>) -> Self {
        Self {
            result,
            rate_limit: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub exchange: String,
    pub price: Decimal,
}

/// Cross-venue view of one symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedSnapshot {
    pub symbol: String,
    pub exchanges: BTreeMap<String, MarketSnapshot>,
    /// Venues that failed, with the error text
    pub failures: BTreeMap<String, String>,
    pub avg_price: Decimal,
    /// (max - min) / mean, in percent
    pub price_spread: Decimal,
    /// Venue quoting the highest price (best place to sell)
    pub best_bid: PriceQuote,
    /// Venue quoting the lowest price (best place to buy)
    pub best_ask: PriceQuote,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BestPrice {
    pub exchange: String,
    pub price: Decimal,
    pub data: MarketSnapshot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub recommended_exchange: String,
    pub price: Decimal,
    pub reasoning: String,
    pub spread: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangePortfolio {
    pub usd: Decimal,
    pub assets: Vec<BalanceEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioValue {
    pub total_usd: Decimal,
    pub exchanges: BTreeMap<String, ExchangePortfolio>,
    /// Venues whose balances could not be fetched, with the error text
    pub failures: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeInfo {
    pub name: String,
    pub display_name: String,
    pub enabled: bool,
    pub configured: bool,
    pub authenticated: bool,
    pub sandbox: bool,
    pub status: ConnectionState,
    pub rate_limit_remaining: Option<u32>,
    pub last_error: Option<String>,
}

/// Outcome of a connectivity or authentication probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeReport {
    pub success: bool,
    pub status: ConnectionState,
    pub message: Option<String>,
}

/// Helpers shared by the venue parsers
pub mod conversion {
    use super::OrderBookEntry;
    use crate::core::errors::ExchangeError;
    use rust_decimal::Decimal;
    use serde_json::Value;
    use std::str::FromStr;

    /// Parse a venue decimal string. Empty strings count as zero.
    pub fn parse_decimal(field: &str, raw: &str) -> Result<Decimal, ExchangeError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(Decimal::ZERO);
        }
        Decimal::from_str(raw)
            .or_else(|_| Decimal::from_scientific(raw))
            .map_err(|e| ExchangeError::Parse(format!("Invalid {} '{}': {}", field, raw, e)))
    }

    pub fn parse_optional_decimal(
        field: &str,
        raw: Option<&str>,
    ) -> Result<Option<Decimal>, ExchangeError> {
        raw.map(|value| parse_decimal(field, value)).transpose()
    }

    /// Decimal from a JSON string or number
    pub fn decimal_from_value(value: &Value) -> Option<Decimal> {
        match value {
            Value::String(s) => parse_decimal("value", s).ok(),
            Value::Number(n) => {
                let text = n.to_string();
                Decimal::from_str(&text)
                    .or_else(|_| Decimal::from_scientific(&text))
                    .ok()
            }
            _ => None,
        }
    }

    /// `[[price, quantity, ...], ...]` levels as used by every venue here
    pub fn parse_price_levels(levels: &[Vec<Value>]) -> Result<Vec<OrderBookEntry>, ExchangeError> {
        levels
            .iter()
            .map(|level| {
                let price = level.first().and_then(decimal_from_value);
                let quantity = level.get(1).and_then(decimal_from_value);
                match (price, quantity) {
                    (Some(price), Some(quantity)) => Ok(OrderBookEntry { price, quantity }),
                    _ => Err(ExchangeError::Parse(format!(
                        "Malformed order book level: {:?}",
                        level
                    ))),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::dec;

    #[test]
    fn test_symbol_parse_prefers_longest_quote() {
        let symbol = Symbol::parse("btcusdt").unwrap();
        assert_eq!(symbol.base, "BTC");
        assert_eq!(symbol.quote, "USDT");
        assert_eq!(symbol.canonical(), "BTCUSDT");

        assert_eq!(Symbol::parse("ETHBTC").unwrap().quote, "BTC");
        assert_eq!(Symbol::parse("BTCUSD").unwrap().quote, "USD");
        assert!(Symbol::parse("USDT").is_err());
        assert!(Symbol::parse("FOOBAR").is_err());
    }

    #[test]
    fn test_symbol_parse_keeps_three_letter_bases() {
        let bnb = Symbol::parse("BNBUSD").unwrap();
        assert_eq!((bnb.base.as_str(), bnb.quote.as_str()), ("BNB", "USD"));
        let arb = Symbol::parse("ARBUSD").unwrap();
        assert_eq!((arb.base.as_str(), arb.quote.as_str()), ("ARB", "USD"));

        assert_eq!(Symbol::parse("ETHBUSD").unwrap().quote, "BUSD");
        assert_eq!(Symbol::parse("BTCTUSD").unwrap().quote, "TUSD");
        assert_eq!(Symbol::parse("ETHUSDT").unwrap().quote, "USDT");
        // No longer base available, the short split stands
        let op = Symbol::parse("OPUSDT").unwrap();
        assert_eq!((op.base.as_str(), op.quote.as_str()), ("OP", "USDT"));
    }

    #[test]
    fn test_order_book_sorted_on_construction() {
        let entry = |price, quantity| OrderBookEntry { price, quantity };
        let book = OrderBookSnapshot::new(
            "BTCUSDT".into(),
            vec![entry(dec("99"), dec("1")), entry(dec("100"), dec("2"))],
            vec![entry(dec("102"), dec("1")), entry(dec("101"), dec("3"))],
            0,
        );
        assert_eq!(book.best_bid().unwrap().price, dec("100"));
        assert_eq!(book.best_ask().unwrap().price, dec("101"));
    }

    #[test]
    fn test_balance_total() {
        let balance = BalanceEntry::new("BTC", dec("0.5"), dec("0.25"));
        assert_eq!(balance.total, dec("0.75"));
    }

    #[test]
    fn test_api_response_combinators_keep_rate_limit() {
        let info = RateLimitInfo {
            used: Some(10),
            remaining: 1190,
        };
        let response = ApiResponse::success(2).with_rate_limit(Some(info));
        let mapped = response.map(|v| v * 2);
        assert_eq!(mapped.data(), Some(&4));
        assert_eq!(mapped.rate_limit, Some(info));

        let failed = mapped.and_then(|_| -> Result<i32, _> {
            Err(ExchangeError::Parse("bad".into()))
        });
        assert!(!failed.is_success());
        assert_eq!(failed.rate_limit, Some(info));
        assert!(matches!(failed.error(), Some(ExchangeError::Parse(_))));
    }

    #[test]
    fn test_price_levels_accept_strings_and_numbers() {
        let levels = vec![
            vec![serde_json::json!("100.5"), serde_json::json!("2"), serde_json::json!(3)],
            vec![serde_json::json!(99), serde_json::json!(1.5)],
        ];
        let entries = conversion::parse_price_levels(&levels).unwrap();
        assert_eq!(entries[0].price, dec("100.5"));
        assert_eq!(entries[1].quantity, dec("1.5"));

        let bad = vec![vec![serde_json::json!("x")]];
        assert!(conversion::parse_price_levels(&bad).is_err());
    }

    #[test]
    fn test_parse_decimal_edge_cases() {
        assert_eq!(conversion::parse_decimal("p", "").unwrap(), Decimal::ZERO);
        assert_eq!(conversion::parse_decimal("p", "1e-3").unwrap(), dec("0.001"));
        assert!(conversion::parse_decimal("p", "abc").is_err());
    }
}

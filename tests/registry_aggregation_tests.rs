//! Registry fan-out across three venues, each backed by its own mock server.

use crossx::core::config::{ExchangeConfig, RegistryConfig};
use crossx::{ExchangeRegistry, OrderRequest, OrderSide};
use mockito::{Matcher, Server, ServerGuard};
use rust_decimal::Decimal;
use serde_json::json;
use std::collections::BTreeMap;
use std::str::FromStr;

fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).unwrap()
}

struct Venues {
    binance: ServerGuard,
    coinbase: ServerGuard,
    kucoin: ServerGuard,
}

impl Venues {
    async fn start() -> Self {
        Self {
            binance: Server::new_async().await,
            coinbase: Server::new_async().await,
            kucoin: Server::new_async().await,
        }
    }

    fn registry(&self) -> ExchangeRegistry {
        let config = RegistryConfig {
            enabled: vec!["binance".into(), "coinbase".into(), "kucoin".into()],
            default_exchange: "binance".into(),
            exchanges: BTreeMap::new(),
        }
        .with_exchange(
            "binance",
            ExchangeConfig::read_only().base_url(self.binance.url()),
        )
        .with_exchange(
            "coinbase",
            ExchangeConfig::read_only().base_url(self.coinbase.url()),
        )
        .with_exchange(
            "kucoin",
            ExchangeConfig::read_only().base_url(self.kucoin.url()),
        );
        ExchangeRegistry::from_config(&config).unwrap()
    }

    async fn binance_price(&mut self, price: &str) {
        self.binance
            .mock("GET", "/api/v3/ticker/24hr")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                json!({
                    "symbol": "BTCUSDT",
                    "priceChange": "0",
                    "priceChangePercent": "0",
                    "lastPrice": price,
                    "highPrice": price,
                    "lowPrice": price,
                    "volume": "1",
                    "closeTime": 1700000000000_i64
                })
                .to_string(),
            )
            .create_async()
            .await;
    }

    async fn coinbase_price(&mut self, price: &str) {
        self.coinbase
            .mock("GET", "/products/BTC-USD/ticker")
            .with_status(200)
            .with_body(json!({"price": price, "volume": "1"}).to_string())
            .create_async()
            .await;
    }

    async fn kucoin_price(&mut self, price: &str) {
        self.kucoin
            .mock("GET", "/api/v1/market/stats")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!({"code": "200000", "data": {"symbol": "BTC-USDT", "last": price}}).to_string())
            .create_async()
            .await;
    }
}

#[tokio::test]
async fn test_aggregated_prices_across_venues() {
    let mut venues = Venues::start().await;
    venues.binance_price("100").await;
    venues.coinbase_price("101").await;
    venues.kucoin_price("99").await;
    let registry = venues.registry();

    let aggregated = registry
        .get_aggregated_market_data("BTCUSDT", None)
        .await
        .unwrap();
    assert_eq!(aggregated.exchanges.len(), 3);
    assert_eq!(aggregated.avg_price, dec("100"));
    assert_eq!(aggregated.price_spread, dec("2"));
    assert_eq!(aggregated.best_bid.exchange, "coinbase");
    assert_eq!(aggregated.best_ask.exchange, "kucoin");

    let order = OrderRequest::market("binance", "BTCUSDT", OrderSide::Buy, dec("0.1"));
    let decision = registry.smart_order_routing(&order).await.unwrap();
    assert_eq!(decision.recommended_exchange, "kucoin");
    assert_eq!(decision.price, dec("99"));
    assert_eq!(
        decision.reasoning,
        "Best buy price found on kucoin (significant spread detected: 2.00%)"
    );
}

#[tokio::test]
async fn test_one_venue_down() {
    let mut venues = Venues::start().await;
    venues.binance_price("100").await;
    venues.kucoin_price("104").await;
    venues
        .coinbase
        .mock("GET", "/products/BTC-USD/ticker")
        .with_status(503)
        .with_body(r#"{"message":"service unavailable"}"#)
        .create_async()
        .await;
    let registry = venues.registry();

    let aggregated = registry
        .get_aggregated_market_data("BTCUSDT", None)
        .await
        .unwrap();
    assert_eq!(aggregated.exchanges.len(), 2);
    assert_eq!(aggregated.avg_price, dec("102"));
    assert!(aggregated.failures["coinbase"].contains("service unavailable"));

    let best = registry
        .find_best_price("BTCUSDT", OrderSide::Sell)
        .await
        .unwrap();
    assert_eq!(best.exchange, "kucoin");
}

#[tokio::test]
async fn test_every_venue_down() {
    let mut venues = Venues::start().await;
    for server in [&mut venues.binance, &mut venues.coinbase, &mut venues.kucoin] {
        server
            .mock("GET", Matcher::Any)
            .with_status(500)
            .create_async()
            .await;
    }
    let registry = venues.registry();

    assert!(registry
        .get_aggregated_market_data("BTCUSDT", None)
        .await
        .is_none());
    let reports = registry.test_all_connections().await;
    assert_eq!(reports.len(), 3);
    assert!(reports.values().all(|report| !report.success));
}

#[tokio::test]
async fn test_read_only_venues_report_unconfigured() {
    let venues = Venues::start().await;
    let registry = venues.registry();

    let info = registry.get_exchange_info();
    assert_eq!(info.len(), 3);
    assert!(info.values().all(|venue| !venue.configured && venue.enabled));
    assert_eq!(info["kucoin"].display_name, "KuCoin");

    // Every balance call fails on credentials, so there is nothing to value
    assert!(registry.get_total_portfolio_value().await.is_none());
}

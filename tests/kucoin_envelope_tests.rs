//! KuCoin envelope handling and passphrase signing over real HTTP.

use crossx::core::config::ExchangeConfig;
use crossx::core::kernel::RetryPolicy;
use crossx::core::traits::{AccountInfo, MarketDataSource, OrderPlacer};
use crossx::exchanges::kucoin::{build_connector, KucoinClient};
use crossx::{ExchangeError, OrderRequest, OrderSide, OrderStatus};
use mockito::{Matcher, Server};
use rust_decimal::Decimal;
use serde_json::json;
use std::str::FromStr;

const API_KEY: &str = "5f3e9a1b2c4d6e8f0a1b2c3d";
const SECRET: &str = "12345678-abcd-ef01-2345-6789abcdef01";
// base64(HMAC-SHA256(SECRET, "kucoin-pass"))
const SIGNED_PASSPHRASE: &str = "bGKALi5l+6Ysy0tw3TCDA1JVk6/tIgVSMGabFFrJ8xM=";

fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).unwrap()
}

fn client(server: &Server) -> KucoinClient {
    let config = ExchangeConfig::new(API_KEY.to_string(), SECRET.to_string())
        .with_passphrase("kucoin-pass".to_string())
        .base_url(server.url());
    build_connector(config)
        .unwrap()
        .with_retry_policy(RetryPolicy::none())
}

#[tokio::test]
async fn test_stats_are_unwrapped() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/v1/market/stats")
        .match_query(Matcher::UrlEncoded("symbol".into(), "BTC-USDT".into()))
        .with_status(200)
        .with_header("gw-ratelimit-limit", "2000")
        .with_header("gw-ratelimit-remaining", "1990")
        .with_body(
            json!({
                "code": "200000",
                "data": {
                    "time": 1700000000000_i64,
                    "symbol": "BTC-USDT",
                    "last": "37000.5",
                    "vol": "1200.5",
                    "changePrice": "370",
                    "changeRate": "0.0101",
                    "high": "37500",
                    "low": "36500"
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let response = client(&server).get_market_data("BTCUSDT").await;
    mock.assert_async().await;
    let rate_limit = response.rate_limit.unwrap();
    assert_eq!(rate_limit.used, Some(10));
    assert_eq!(rate_limit.remaining, 1990);

    let snapshot = response.into_result().unwrap();
    assert_eq!(snapshot.price, dec("37000.5"));
    assert_eq!(snapshot.change_percent_24h, dec("1.01"));
    assert_eq!(snapshot.exchange, "kucoin");
}

#[tokio::test]
async fn test_error_code_on_http_200() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/v1/accounts")
        .match_header("kc-api-key", API_KEY)
        .match_header("kc-api-passphrase", SIGNED_PASSPHRASE)
        .match_header("kc-api-key-version", "2")
        .match_header("kc-api-timestamp", Matcher::Regex(r"^\d{13}$".into()))
        .with_status(200)
        .with_body(r#"{"code":"400003","msg":"KC-API-KEY not exists"}"#)
        .create_async()
        .await;

    let response = client(&server).get_balances().await;
    mock.assert_async().await;
    assert_eq!(
        response.error(),
        Some(&ExchangeError::Protocol {
            status: None,
            code: Some("400003".into()),
            message: "KC-API-KEY not exists".into(),
        })
    );
}

#[tokio::test]
async fn test_order_ack_is_completed_from_request() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/v1/orders")
        .match_body(Matcher::PartialJson(json!({
            "symbol": "ETH-USDT",
            "side": "sell",
            "type": "limit",
            "size": "2",
            "price": "2100"
        })))
        .with_status(200)
        .with_body(r#"{"code":"200000","data":{"orderId":"5bd6e9286d99522a52e458de"}}"#)
        .create_async()
        .await;

    let order = OrderRequest::limit("kucoin", "ETHUSDT", OrderSide::Sell, dec("2"), dec("2100"));
    let result = client(&server).place_order(&order).await.into_result().unwrap();
    mock.assert_async().await;
    assert_eq!(result.order_id, "5bd6e9286d99522a52e458de");
    assert_eq!(result.status, OrderStatus::New);
    assert_eq!(result.quantity, dec("2"));
    assert_eq!(result.price, dec("2100"));
}

#[tokio::test]
async fn test_order_detail_status_from_flags() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/v1/orders/5c35c02703aa673ceec2a168")
        .with_status(200)
        .with_body(
            json!({
                "code": "200000",
                "data": {
                    "id": "5c35c02703aa673ceec2a168",
                    "symbol": "BTC-USDT",
                    "side": "buy",
                    "price": "10",
                    "size": "2",
                    "dealSize": "0",
                    "dealFunds": "0",
                    "isActive": false,
                    "cancelExist": true,
                    "createdAt": 1547026471000_i64
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let result = client(&server)
        .get_order_status("5c35c02703aa673ceec2a168", "BTCUSDT")
        .await
        .into_result()
        .unwrap();
    assert_eq!(result.status, OrderStatus::Canceled);
    assert_eq!(result.timestamp, 1_547_026_471_000);
}

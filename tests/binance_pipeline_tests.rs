//! Binance client driven through the real `reqwest` transport against a
//! local mock server.

use crossx::core::config::ExchangeConfig;
use crossx::core::kernel::RetryPolicy;
use crossx::core::traits::{AccountInfo, ConnectionProbe, MarketDataSource, OrderPlacer};
use crossx::exchanges::binance::{build_connector, BinanceClient};
use crossx::{ConnectionState, ExchangeError, OrderRequest, OrderSide, OrderStatus};
use mockito::{Matcher, Server};
use rust_decimal::Decimal;
use std::str::FromStr;

const API_KEY: &str = "vmPUZE6mv9SD5VNHk4HlWFsOr6aKE2zvsw0MuIgwCIPy6utIco14y7Ju91duEh8A";
const SECRET: &str = "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j";

fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).unwrap()
}

fn client(server: &Server) -> BinanceClient {
    let config = ExchangeConfig::new(API_KEY.to_string(), SECRET.to_string()).base_url(server.url());
    build_connector(config)
        .unwrap()
        .with_retry_policy(RetryPolicy::none())
}

#[tokio::test]
async fn test_public_ticker() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/v3/ticker/24hr")
        .match_query(Matcher::UrlEncoded("symbol".into(), "BTCUSDT".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_header("x-mbx-used-weight-1m", "41")
        .with_body(
            r#"{"symbol":"BTCUSDT","priceChange":"512.10","priceChangePercent":"1.23",
                "lastPrice":"42150.55","highPrice":"42500.00","lowPrice":"41200.00",
                "volume":"18234.1","closeTime":1700000000000}"#,
        )
        .create_async()
        .await;

    let response = client(&server).get_market_data("BTCUSDT").await;
    mock.assert_async().await;

    let snapshot = response.data().unwrap();
    assert_eq!(snapshot.price, dec("42150.55"));
    assert_eq!(snapshot.exchange, "binance");
    assert_eq!(response.rate_limit.unwrap().remaining, 6000 - 41);
}

#[tokio::test]
async fn test_signed_limit_order() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/v3/order")
        .match_header("x-mbx-apikey", API_KEY)
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("symbol".into(), "ETHUSDT".into()),
            Matcher::UrlEncoded("side".into(), "BUY".into()),
            Matcher::UrlEncoded("type".into(), "LIMIT".into()),
            Matcher::UrlEncoded("timeInForce".into(), "GTC".into()),
            Matcher::UrlEncoded("recvWindow".into(), "5000".into()),
            Matcher::Regex("signature=[0-9a-f]{64}$".into()),
        ]))
        .with_status(200)
        .with_body(
            r#"{"symbol":"ETHUSDT","orderId":4021,"status":"NEW","side":"BUY","type":"LIMIT",
                "origQty":"0.5","executedQty":"0","cummulativeQuoteQty":"0",
                "price":"1800","transactTime":1700000000123}"#,
        )
        .create_async()
        .await;

    let order = OrderRequest::limit("binance", "ETHUSDT", OrderSide::Buy, dec("0.5"), dec("1800"));
    let result = client(&server).place_order(&order).await;
    mock.assert_async().await;

    let result = result.into_result().unwrap();
    assert_eq!(result.order_id, "4021");
    assert_eq!(result.status, OrderStatus::New);
    assert_eq!(result.exchange, "binance");
}

#[tokio::test]
async fn test_venue_error_body_becomes_protocol_error() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/v3/account")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body(r#"{"code":-2015,"msg":"Invalid API-key, IP, or permissions for action."}"#)
        .create_async()
        .await;

    let client = client(&server);
    let response = client.get_balances().await;
    assert_eq!(
        response.error(),
        Some(&ExchangeError::Protocol {
            status: Some(401),
            code: Some("-2015".into()),
            message: "Invalid API-key, IP, or permissions for action.".into(),
        })
    );

    assert!(!client.test_auth().await.is_success());
    assert_eq!(client.status().state, ConnectionState::Error);
}

#[tokio::test]
async fn test_connection_probe() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/v3/time")
        .with_status(200)
        .with_body(r#"{"serverTime":1700000000000}"#)
        .create_async()
        .await;

    let client = client(&server);
    assert_eq!(client.get_server_time().await.into_result().unwrap(), 1_700_000_000_000);
    assert!(client.test_connection().await.is_success());
    assert_eq!(client.status().state, ConnectionState::Connected);
}

#[tokio::test]
async fn test_read_only_client_rejects_signed_calls_locally() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/v3/account")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let config = ExchangeConfig::read_only().base_url(server.url());
    let client = build_connector(config).unwrap();
    assert!(matches!(
        client.get_balances().await.error(),
        Some(ExchangeError::Configuration(_))
    ));
    mock.assert_async().await;
}

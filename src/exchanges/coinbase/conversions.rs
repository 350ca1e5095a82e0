use super::types::{CoinbaseAccount, CoinbaseBook, CoinbaseFill, CoinbaseOrder, CoinbaseTicker};
use crate::core::errors::ExchangeError;
use crate::core::types::{
    conversion, BalanceEntry, MarketSnapshot, OrderBookSnapshot, OrderContext, OrderRequest,
    OrderResult, OrderSide, OrderStatus, OrderType, Symbol, TradeFill,
};
use rust_decimal::Decimal;
use serde_json::{Map, Value};

/// `BTCUSDT` -> `BTC-USD`; USDT pairs trade on the USD books.
pub fn to_product_id(canonical: &str) -> Result<String, ExchangeError> {
    let symbol = Symbol::parse(canonical)?;
    match symbol.quote.as_str() {
        "USDT" => Ok(format!("{}-USD", symbol.base)),
        // would collide with the USDT mapping above
        "USD" => Err(ExchangeError::Configuration(format!(
            "Coinbase symbol {} is ambiguous, use {}USDT",
            canonical, symbol.base
        ))),
        quote => Ok(format!("{}-{}", symbol.base, quote)),
    }
}

pub fn from_product_id(product_id: &str) -> Result<String, ExchangeError> {
    let (base, quote) = product_id
        .split_once('-')
        .filter(|(base, quote)| !base.is_empty() && !quote.is_empty())
        .ok_or_else(|| {
            ExchangeError::Parse(format!("Malformed Coinbase product id: {}", product_id))
        })?;
    let quote = if quote.eq_ignore_ascii_case("USD") {
        "USDT"
    } else {
        quote
    };
    Ok(format!("{}{}", base, quote).to_uppercase())
}

pub fn convert_order_status(status: &str) -> OrderStatus {
    match status {
        "done" | "settled" => OrderStatus::Filled,
        "cancelled" | "canceled" => OrderStatus::Canceled,
        "rejected" => OrderStatus::Rejected,
        // pending, open, active and anything undocumented
        _ => OrderStatus::New,
    }
}

fn parse_order_side(side: &str) -> Result<OrderSide, ExchangeError> {
    match side {
        "buy" => Ok(OrderSide::Buy),
        "sell" => Ok(OrderSide::Sell),
        other => Err(ExchangeError::Parse(format!("Unknown order side: {}", other))),
    }
}

fn parse_time(raw: Option<&str>) -> i64 {
    raw.and_then(|t| chrono::DateTime::parse_from_rfc3339(t).ok())
        .map_or_else(
            || chrono::Utc::now().timestamp_millis(),
            |t| t.timestamp_millis(),
        )
}

fn text(value: Decimal) -> Value {
    Value::String(value.normalize().to_string())
}

/// Market buys are expressed in quote currency (`funds`). When the caller
/// supplies a reference price the base quantity is converted, otherwise the
/// quantity is taken as the quote amount.
pub fn order_params(
    order: &OrderRequest,
    product_id: &str,
) -> Result<Map<String, Value>, ExchangeError> {
    let mut params = Map::new();
    params.insert("product_id".into(), Value::String(product_id.to_string()));
    params.insert("side".into(), Value::String(order.side.to_string()));

    match order.order_type {
        OrderType::Market => {
            params.insert("type".into(), "market".into());
            match order.side {
                OrderSide::Buy => {
                    let funds = order
                        .price
                        .map_or(order.quantity, |price| order.quantity * price);
                    params.insert("funds".into(), text(funds));
                }
                OrderSide::Sell => {
                    params.insert("size".into(), text(order.quantity));
                }
            }
        }
        OrderType::Limit => {
            let price = order.price.ok_or_else(|| {
                ExchangeError::Configuration("Limit orders require a price".to_string())
            })?;
            params.insert("type".into(), "limit".into());
            params.insert("size".into(), text(order.quantity));
            params.insert("price".into(), text(price));
        }
        OrderType::StopLoss | OrderType::TakeProfit => {
            let stop_price = order.stop_price.ok_or_else(|| {
                ExchangeError::Configuration("Stop orders require a stop price".to_string())
            })?;
            let direction = if order.order_type == OrderType::StopLoss {
                "loss"
            } else {
                "entry"
            };
            params.insert("type".into(), "stop".into());
            params.insert("size".into(), text(order.quantity));
            params.insert("stop".into(), direction.into());
            params.insert("stop_price".into(), text(stop_price));
            if let Some(price) = order.price {
                params.insert("price".into(), text(price));
            }
        }
    }

    if order.order_type != OrderType::Market {
        if let Some(tif) = order.time_in_force {
            params.insert("time_in_force".into(), Value::String(tif.to_string()));
        }
    }

    Ok(params)
}

/// The ticker carries no 24h delta. Change is approximated as
/// `(high - low) / 2`, which is a range estimate, not a true delta.
pub fn convert_ticker(ticker: CoinbaseTicker, symbol: &str) -> Result<MarketSnapshot, ExchangeError> {
    let price = conversion::parse_decimal("price", &ticker.price)?;
    let high = conversion::parse_optional_decimal("high", ticker.high.as_deref())?.unwrap_or(price);
    let low = conversion::parse_optional_decimal("low", ticker.low.as_deref())?.unwrap_or(price);
    let volume = conversion::parse_optional_decimal("volume", ticker.volume.as_deref())?
        .unwrap_or_default();

    let change = (high - low) / Decimal::TWO;
    let change_percent = if price.is_zero() {
        Decimal::ZERO
    } else {
        change / price * Decimal::ONE_HUNDRED
    };

    Ok(MarketSnapshot {
        symbol: symbol.to_string(),
        price,
        volume_24h: volume,
        change_24h: change,
        change_percent_24h: change_percent,
        high_24h: high,
        low_24h: low,
        timestamp: parse_time(ticker.time.as_deref()),
        exchange: String::new(),
    })
}

pub fn convert_book(book: CoinbaseBook, symbol: &str) -> Result<OrderBookSnapshot, ExchangeError> {
    Ok(OrderBookSnapshot::new(
        symbol.to_string(),
        conversion::parse_price_levels(&book.bids)?,
        conversion::parse_price_levels(&book.asks)?,
        parse_time(book.time.as_deref()),
    ))
}

pub fn convert_accounts(accounts: Vec<CoinbaseAccount>) -> Result<Vec<BalanceEntry>, ExchangeError> {
    let mut balances = Vec::new();
    for account in accounts {
        let free = conversion::parse_decimal("available", &account.available)?;
        let locked = conversion::parse_decimal("hold", &account.hold)?;
        if !(free + locked).is_zero() {
            balances.push(BalanceEntry::new(account.currency, free, locked));
        }
    }
    Ok(balances)
}

pub fn convert_order(
    order: CoinbaseOrder,
    context: &OrderContext<'_>,
) -> Result<OrderResult, ExchangeError> {
    let quantity = [&order.size, &order.specified_funds, &order.funds]
        .into_iter()
        .find_map(|field| field.as_deref())
        .map(|raw| conversion::parse_decimal("size", raw))
        .transpose()?
        .or_else(|| context.request.map(|r| r.quantity))
        .unwrap_or_default();
    let executed = conversion::parse_optional_decimal("filled_size", order.filled_size.as_deref())?
        .unwrap_or_default();
    let executed_value =
        conversion::parse_optional_decimal("executed_value", order.executed_value.as_deref())?;
    let average_price = match executed_value {
        Some(value) if !executed.is_zero() => Some(value / executed),
        _ => None,
    };
    let price = conversion::parse_optional_decimal("price", order.price.as_deref())?
        .or_else(|| context.request.and_then(|r| r.price))
        .unwrap_or_default();

    // a finished order may have been canceled rather than filled
    let status = match (order.status.as_str(), order.done_reason.as_deref()) {
        ("done", Some("canceled" | "cancelled")) => OrderStatus::Canceled,
        (status, _) => convert_order_status(status),
    };

    let symbol = match order.product_id.as_deref() {
        Some(product_id) => from_product_id(product_id)?,
        None => context.symbol.to_string(),
    };

    Ok(OrderResult {
        order_id: order.id,
        symbol,
        side: parse_order_side(&order.side)?,
        status,
        quantity,
        executed_quantity: executed,
        price,
        average_price,
        timestamp: parse_time(order.created_at.as_deref()),
        exchange: String::new(),
    })
}

/// `/fills` page size: 100 by default, 1000 at most
pub fn fills_limit(limit: Option<u32>) -> u32 {
    limit.unwrap_or(100).clamp(1, 1000)
}

/// Fees are charged in the quote currency
pub fn convert_fill(fill: CoinbaseFill) -> Result<TradeFill, ExchangeError> {
    let fee_asset = fill
        .product_id
        .split_once('-')
        .map(|(_, quote)| quote.to_string());
    Ok(TradeFill {
        trade_id: fill.trade_id.to_string(),
        order_id: fill.order_id,
        symbol: from_product_id(&fill.product_id)?,
        side: parse_order_side(&fill.side)?,
        price: conversion::parse_decimal("price", &fill.price)?,
        quantity: conversion::parse_decimal("size", &fill.size)?,
        fee: conversion::parse_decimal("fee", &fill.fee)?,
        fee_asset,
        is_maker: fill.liquidity.as_deref() == Some("M"),
        timestamp: parse_time(fill.created_at.as_deref()),
        exchange: String::new(),
    })
}

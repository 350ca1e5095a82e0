use super::types::{BinanceAccount, BinanceDepth, BinanceOrder, BinanceTicker24hr, BinanceTrade};
use crate::core::errors::ExchangeError;
use crate::core::types::{
    conversion, BalanceEntry, MarketSnapshot, OrderBookSnapshot, OrderContext, OrderRequest,
    OrderResult, OrderSide, OrderStatus, OrderType, TimeInForce, TradeFill,
};
use rust_decimal::Decimal;
use serde_json::{Map, Value};

/// Depths accepted by `/api/v3/depth`
const DEPTH_LIMITS: [u32; 8] = [5, 10, 20, 50, 100, 500, 1000, 5000];

/// `/api/v3/myTrades` page size ceiling
const MAX_TRADES_LIMIT: u32 = 1000;

pub fn convert_order_status(status: &str) -> OrderStatus {
    match status {
        "PARTIALLY_FILLED" => OrderStatus::PartiallyFilled,
        "FILLED" => OrderStatus::Filled,
        "CANCELED" | "PENDING_CANCEL" | "EXPIRED" | "EXPIRED_IN_MATCH" => OrderStatus::Canceled,
        "REJECTED" => OrderStatus::Rejected,
        // NEW and anything undocumented
        _ => OrderStatus::New,
    }
}

pub fn convert_order_side(side: OrderSide) -> &'static str {
    match side {
        OrderSide::Buy => "BUY",
        OrderSide::Sell => "SELL",
    }
}

fn parse_order_side(side: &str) -> Result<OrderSide, ExchangeError> {
    match side {
        "BUY" => Ok(OrderSide::Buy),
        "SELL" => Ok(OrderSide::Sell),
        other => Err(ExchangeError::Parse(format!("Unknown order side: {}", other))),
    }
}

pub fn convert_order_type(order_type: OrderType) -> &'static str {
    match order_type {
        OrderType::Market => "MARKET",
        OrderType::Limit => "LIMIT",
        OrderType::StopLoss => "STOP_LOSS_LIMIT",
        OrderType::TakeProfit => "TAKE_PROFIT_LIMIT",
    }
}

/// Smallest supported depth that covers the request
pub fn depth_limit(depth: Option<u32>) -> u32 {
    let wanted = depth.unwrap_or(100);
    DEPTH_LIMITS
        .iter()
        .copied()
        .find(|limit| *limit >= wanted)
        .unwrap_or(5000)
}

fn text(value: Decimal) -> Value {
    Value::String(value.normalize().to_string())
}

pub fn order_params(
    order: &OrderRequest,
    venue_symbol: &str,
) -> Result<Map<String, Value>, ExchangeError> {
    let mut params = Map::new();
    params.insert("symbol".into(), Value::String(venue_symbol.to_string()));
    params.insert("side".into(), convert_order_side(order.side).into());
    params.insert("type".into(), convert_order_type(order.order_type).into());
    params.insert("quantity".into(), text(order.quantity));

    if order.order_type != OrderType::Market {
        let price = order.price.ok_or_else(|| {
            ExchangeError::Configuration(format!("{:?} orders require a price", order.order_type))
        })?;
        params.insert("price".into(), text(price));
        let tif = order.time_in_force.unwrap_or(TimeInForce::GTC);
        params.insert("timeInForce".into(), Value::String(tif.to_string()));
    }

    if matches!(order.order_type, OrderType::StopLoss | OrderType::TakeProfit) {
        let stop = order.stop_price.ok_or_else(|| {
            ExchangeError::Configuration(format!(
                "{:?} orders require a stop price",
                order.order_type
            ))
        })?;
        params.insert("stopPrice".into(), text(stop));
    }

    Ok(params)
}

pub fn convert_ticker(ticker: BinanceTicker24hr, symbol: &str) -> Result<MarketSnapshot, ExchangeError> {
    Ok(MarketSnapshot {
        symbol: symbol.to_string(),
        price: conversion::parse_decimal("lastPrice", &ticker.last_price)?,
        volume_24h: conversion::parse_decimal("volume", &ticker.volume)?,
        change_24h: conversion::parse_decimal("priceChange", &ticker.price_change)?,
        change_percent_24h: conversion::parse_decimal(
            "priceChangePercent",
            &ticker.price_change_percent,
        )?,
        high_24h: conversion::parse_decimal("highPrice", &ticker.high_price)?,
        low_24h: conversion::parse_decimal("lowPrice", &ticker.low_price)?,
        timestamp: ticker.close_time,
        exchange: String::new(),
    })
}

pub fn convert_depth(depth: BinanceDepth, symbol: &str) -> Result<OrderBookSnapshot, ExchangeError> {
    Ok(OrderBookSnapshot::new(
        symbol.to_string(),
        conversion::parse_price_levels(&depth.bids)?,
        conversion::parse_price_levels(&depth.asks)?,
        chrono::Utc::now().timestamp_millis(),
    ))
}

/// Non-zero balances only
pub fn convert_account(account: BinanceAccount) -> Result<Vec<BalanceEntry>, ExchangeError> {
    let mut balances = Vec::new();
    for balance in account.balances {
        let free = conversion::parse_decimal("free", &balance.free)?;
        let locked = conversion::parse_decimal("locked", &balance.locked)?;
        if !(free + locked).is_zero() {
            balances.push(BalanceEntry::new(balance.asset, free, locked));
        }
    }
    Ok(balances)
}

pub fn convert_order(
    order: BinanceOrder,
    context: &OrderContext<'_>,
) -> Result<OrderResult, ExchangeError> {
    let quantity = conversion::parse_decimal("origQty", &order.orig_qty)?;
    let executed = conversion::parse_decimal("executedQty", &order.executed_qty)?;
    let quote = conversion::parse_optional_decimal(
        "cummulativeQuoteQty",
        order.cummulative_quote_qty.as_deref(),
    )?;
    let average_price = match quote {
        Some(quote) if !executed.is_zero() => Some(quote / executed),
        _ => None,
    };
    let price = conversion::parse_optional_decimal("price", order.price.as_deref())?
        .unwrap_or_default();

    Ok(OrderResult {
        order_id: order.order_id.to_string(),
        symbol: context.symbol.to_string(),
        side: parse_order_side(&order.side)?,
        status: convert_order_status(&order.status),
        quantity,
        executed_quantity: executed,
        price,
        average_price,
        timestamp: order
            .transact_time
            .or(order.update_time)
            .or(order.time)
            .unwrap_or_else(|| chrono::Utc::now().timestamp_millis()),
        exchange: String::new(),
    })
}

pub fn trades_limit(limit: Option<u32>) -> u32 {
    limit.unwrap_or(500).clamp(1, MAX_TRADES_LIMIT)
}

pub fn convert_trade(trade: BinanceTrade, symbol: &str) -> Result<TradeFill, ExchangeError> {
    Ok(TradeFill {
        trade_id: trade.id.to_string(),
        order_id: trade.order_id.to_string(),
        symbol: symbol.to_string(),
        side: if trade.is_buyer {
            OrderSide::Buy
        } else {
            OrderSide::Sell
        },
        price: conversion::parse_decimal("price", &trade.price)?,
        quantity: conversion::parse_decimal("qty", &trade.qty)?,
        fee: conversion::parse_decimal("commission", &trade.commission)?,
        fee_asset: Some(trade.commission_asset),
        is_maker: trade.is_maker,
        timestamp: trade.time,
        exchange: String::new(),
    })
}

/// Order ids from a `DELETE /api/v3/openOrders` reply. OCO lists report
/// their legs under `orders`.
pub fn canceled_ids(entries: &[Value]) -> Vec<String> {
    let mut ids = Vec::new();
    for entry in entries {
        if let Some(id) = entry.get("orderId") {
            ids.push(match id {
                Value::String(id) => id.clone(),
                other => other.to_string(),
            });
        } else if let Some(legs) = entry.get("orders").and_then(Value::as_array) {
            ids.extend(canceled_ids(legs));
        }
    }
    ids
}

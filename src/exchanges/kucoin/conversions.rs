use super::types::{
    KucoinAccount, KucoinEnvelope, KucoinFill, KucoinOrder, KucoinOrderAck, KucoinOrderBook,
    KucoinStats,
};
use crate::core::errors::ExchangeError;
use crate::core::kernel::signer::generate_nonce;
use crate::core::types::{
    conversion, BalanceEntry, MarketSnapshot, OrderBookSnapshot, OrderContext, OrderRequest,
    OrderResult, OrderSide, OrderStatus, OrderType, Symbol, TradeFill,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Success code of the `{code, data, msg}` envelope
pub const SUCCESS_CODE: &str = "200000";

/// `BTCUSDT` -> `BTC-USDT`
pub fn to_venue_symbol(canonical: &str) -> Result<String, ExchangeError> {
    let symbol = Symbol::parse(canonical)?;
    Ok(format!("{}-{}", symbol.base, symbol.quote))
}

pub fn from_venue_symbol(venue_symbol: &str) -> Result<String, ExchangeError> {
    let (base, quote) = venue_symbol
        .split_once('-')
        .filter(|(base, quote)| !base.is_empty() && !quote.is_empty())
        .ok_or_else(|| {
            ExchangeError::Parse(format!("Malformed KuCoin symbol: {}", venue_symbol))
        })?;
    Ok(format!("{}{}", base, quote).to_uppercase())
}

/// Strip the envelope, turning a non-success code into a protocol error
pub fn unwrap_envelope(payload: Value) -> Result<Value, ExchangeError> {
    let envelope = KucoinEnvelope::deserialize(payload)
        .map_err(|e| ExchangeError::parse("KuCoin response envelope", e))?;
    if envelope.code == SUCCESS_CODE {
        Ok(envelope.data)
    } else {
        Err(ExchangeError::venue(
            envelope.code,
            envelope.msg.unwrap_or_else(|| "Unknown error".to_string()),
        ))
    }
}

pub fn convert_order_status(status: &str) -> OrderStatus {
    match status {
        "done" | "filled" => OrderStatus::Filled,
        "cancelled" | "canceled" | "cancel" => OrderStatus::Canceled,
        "partial" | "partially_filled" => OrderStatus::PartiallyFilled,
        "rejected" => OrderStatus::Rejected,
        // active, open and anything undocumented
        _ => OrderStatus::New,
    }
}

/// Order detail responses carry flags instead of a status string
fn derive_status(order: &KucoinOrder, executed: Decimal, quantity: Decimal) -> OrderStatus {
    if let Some(status) = order.status.as_deref() {
        return convert_order_status(status);
    }
    match (order.is_active, order.cancel_exist) {
        (Some(true), _) if executed.is_zero() => OrderStatus::New,
        (Some(true), _) => OrderStatus::PartiallyFilled,
        (_, Some(true)) => OrderStatus::Canceled,
        (Some(false), _) if !quantity.is_zero() && executed < quantity => {
            OrderStatus::PartiallyFilled
        }
        (Some(false), _) => OrderStatus::Filled,
        (None, _) => OrderStatus::New,
    }
}

fn parse_order_side(side: &str) -> Result<OrderSide, ExchangeError> {
    match side {
        "buy" => Ok(OrderSide::Buy),
        "sell" => Ok(OrderSide::Sell),
        other => Err(ExchangeError::Parse(format!("Unknown order side: {}", other))),
    }
}

fn text(value: Decimal) -> Value {
    Value::String(value.normalize().to_string())
}

/// Stop orders are limit or market orders with a `stop` trigger attached
pub fn order_params(
    order: &OrderRequest,
    venue_symbol: &str,
) -> Result<Map<String, Value>, ExchangeError> {
    let mut params = Map::new();
    params.insert("clientOid".into(), Value::String(generate_nonce(32)));
    params.insert("symbol".into(), Value::String(venue_symbol.to_string()));
    params.insert("side".into(), Value::String(order.side.to_string()));

    let is_stop = matches!(order.order_type, OrderType::StopLoss | OrderType::TakeProfit);
    let has_limit_price = order.order_type == OrderType::Limit || (is_stop && order.price.is_some());

    if has_limit_price {
        let price = order.price.ok_or_else(|| {
            ExchangeError::Configuration("Limit orders require a price".to_string())
        })?;
        params.insert("type".into(), "limit".into());
        params.insert("price".into(), text(price));
        if let Some(tif) = order.time_in_force {
            params.insert("timeInForce".into(), Value::String(tif.to_string()));
        }
    } else {
        params.insert("type".into(), "market".into());
    }
    params.insert("size".into(), text(order.quantity));

    if is_stop {
        let stop_price = order.stop_price.ok_or_else(|| {
            ExchangeError::Configuration("Stop orders require a stop price".to_string())
        })?;
        let direction = match (order.order_type, order.side) {
            (OrderType::StopLoss, OrderSide::Sell) | (OrderType::TakeProfit, OrderSide::Buy) => {
                "loss"
            }
            _ => "entry",
        };
        params.insert("stop".into(), direction.into());
        params.insert("stopPrice".into(), text(stop_price));
    }

    Ok(params)
}

pub fn convert_stats(stats: KucoinStats, symbol: &str) -> Result<MarketSnapshot, ExchangeError> {
    let field = |name: &str, raw: &Option<String>| -> Result<Decimal, ExchangeError> {
        Ok(conversion::parse_optional_decimal(name, raw.as_deref())?.unwrap_or_default())
    };
    let price = conversion::parse_decimal(
        "last",
        stats
            .last
            .as_deref()
            .ok_or_else(|| ExchangeError::Parse("KuCoin stats without a last price".into()))?,
    )?;

    Ok(MarketSnapshot {
        symbol: symbol.to_string(),
        price,
        volume_24h: field("vol", &stats.vol)?,
        change_24h: field("changePrice", &stats.change_price)?,
        change_percent_24h: field("changeRate", &stats.change_rate)? * Decimal::ONE_HUNDRED,
        high_24h: field("high", &stats.high)?,
        low_24h: field("low", &stats.low)?,
        timestamp: stats
            .time
            .unwrap_or_else(|| chrono::Utc::now().timestamp_millis()),
        exchange: String::new(),
    })
}

pub fn convert_book(book: KucoinOrderBook, symbol: &str) -> Result<OrderBookSnapshot, ExchangeError> {
    Ok(OrderBookSnapshot::new(
        symbol.to_string(),
        conversion::parse_price_levels(&book.bids)?,
        conversion::parse_price_levels(&book.asks)?,
        book.time
            .unwrap_or_else(|| chrono::Utc::now().timestamp_millis()),
    ))
}

/// Sum the main and trade accounts of each currency, dropping empty ones
pub fn convert_accounts(accounts: Vec<KucoinAccount>) -> Result<Vec<BalanceEntry>, ExchangeError> {
    let mut totals: BTreeMap<String, (Decimal, Decimal)> = BTreeMap::new();
    for account in accounts {
        let free = conversion::parse_decimal("available", &account.available)?;
        let locked = conversion::parse_decimal("holds", &account.holds)?;
        let entry = totals.entry(account.currency).or_default();
        entry.0 += free;
        entry.1 += locked;
    }
    Ok(totals
        .into_iter()
        .filter(|(_, (free, locked))| !(*free + *locked).is_zero())
        .map(|(asset, (free, locked))| BalanceEntry::new(asset, free, locked))
        .collect())
}

/// Placement only returns the order id; the rest comes from the request
pub fn convert_order_ack(
    ack: KucoinOrderAck,
    context: &OrderContext<'_>,
) -> Result<OrderResult, ExchangeError> {
    let request = context.request.ok_or_else(|| {
        ExchangeError::Parse("KuCoin order acknowledgement without a request".to_string())
    })?;
    Ok(OrderResult {
        order_id: ack.order_id,
        symbol: context.symbol.to_string(),
        side: request.side,
        status: OrderStatus::New,
        quantity: request.quantity,
        executed_quantity: Decimal::ZERO,
        price: request.price.unwrap_or_default(),
        average_price: None,
        timestamp: chrono::Utc::now().timestamp_millis(),
        exchange: String::new(),
    })
}

pub fn convert_order(
    order: KucoinOrder,
    context: &OrderContext<'_>,
) -> Result<OrderResult, ExchangeError> {
    let quantity = conversion::parse_optional_decimal("size", order.size.as_deref())?
        .unwrap_or_default();
    let executed = conversion::parse_optional_decimal("dealSize", order.deal_size.as_deref())?
        .unwrap_or_default();
    let funds = conversion::parse_optional_decimal("dealFunds", order.deal_funds.as_deref())?;
    let average_price = match funds {
        Some(funds) if !executed.is_zero() => Some(funds / executed),
        _ => None,
    };
    let price = conversion::parse_optional_decimal("price", order.price.as_deref())?
        .unwrap_or_default();
    let status = derive_status(&order, executed, quantity);

    let symbol = match order.symbol.as_deref() {
        Some(symbol) => from_venue_symbol(symbol)?,
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
        timestamp: order
            .created_at
            .unwrap_or_else(|| chrono::Utc::now().timestamp_millis()),
        exchange: String::new(),
    })
}

/// `/api/v1/fills` accepts pages of 10 to 500 entries
pub fn fills_page_size(limit: Option<u32>) -> u32 {
    limit.unwrap_or(100).clamp(10, 500)
}

pub fn convert_fill(fill: KucoinFill) -> Result<TradeFill, ExchangeError> {
    Ok(TradeFill {
        trade_id: fill.trade_id,
        order_id: fill.order_id,
        symbol: from_venue_symbol(&fill.symbol)?,
        side: parse_order_side(&fill.side)?,
        price: conversion::parse_decimal("price", &fill.price)?,
        quantity: conversion::parse_decimal("size", &fill.size)?,
        fee: conversion::parse_decimal("fee", &fill.fee)?,
        fee_asset: fill.fee_currency,
        is_maker: fill.liquidity.as_deref() == Some("maker"),
        timestamp: fill.created_at,
        exchange: String::new(),
    })
}

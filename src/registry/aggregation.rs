//! Cross-venue arithmetic over market snapshots.
//!
//! Last traded price stands in for both sides of the book: the venue
//! quoting the highest price is reported as the best bid and the lowest as
//! the best ask.

use crate::core::types::{
    AggregatedSnapshot, ApiResponse, BestPrice, MarketSnapshot, OrderSide, PriceQuote,
    RoutingDecision,
};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::warn;

/// Spread (in percent) above which routing advice calls it out
pub const SIGNIFICANT_SPREAD_PCT: Decimal = Decimal::ONE;

/// Fold per-venue outcomes into one snapshot. Failed venues are recorded
/// and excluded; `None` when no venue produced data.
pub fn aggregate(
    symbol: &str,
    outcomes: Vec<(String, ApiResponse<MarketSnapshot>)>,
) -> Option<AggregatedSnapshot> {
    let mut exchanges = BTreeMap::new();
    let mut failures = BTreeMap::new();
    let mut best_bid: Option<PriceQuote> = None;
    let mut best_ask: Option<PriceQuote> = None;
    let mut sum = Decimal::ZERO;

    for (venue, response) in outcomes {
        let snapshot = match response.into_result() {
            Ok(snapshot) => snapshot,
            Err(error) => {
                warn!(exchange = %venue, %symbol, %error, "Skipping venue in aggregation");
                failures.insert(venue, error.to_string());
                continue;
            }
        };
        let price = snapshot.price;
        sum += price;
        if best_bid.as_ref().map_or(true, |best| price > best.price) {
            best_bid = Some(PriceQuote {
                exchange: venue.clone(),
                price,
            });
        }
        if best_ask.as_ref().map_or(true, |best| price < best.price) {
            best_ask = Some(PriceQuote {
                exchange: venue.clone(),
                price,
            });
        }
        exchanges.insert(venue, snapshot);
    }

    let (best_bid, best_ask) = (best_bid?, best_ask?);
    let avg_price = sum / Decimal::from(exchanges.len());
    let price_spread = if avg_price.is_zero() {
        Decimal::ZERO
    } else {
        (best_bid.price - best_ask.price) / avg_price * Decimal::ONE_HUNDRED
    };

    Some(AggregatedSnapshot {
        symbol: symbol.to_string(),
        exchanges,
        failures,
        avg_price,
        price_spread,
        best_bid,
        best_ask,
        timestamp: chrono::Utc::now().timestamp_millis(),
    })
}

/// Cheapest venue for a buy, richest for a sell
pub fn best_price(aggregated: &AggregatedSnapshot, side: OrderSide) -> Option<BestPrice> {
    let quote = match side {
        OrderSide::Buy => &aggregated.best_ask,
        OrderSide::Sell => &aggregated.best_bid,
    };
    aggregated.exchanges.get(&quote.exchange).map(|data| BestPrice {
        exchange: quote.exchange.clone(),
        price: quote.price,
        data: data.clone(),
    })
}

pub fn routing_decision(aggregated: &AggregatedSnapshot, side: OrderSide) -> Option<RoutingDecision> {
    let best = best_price(aggregated, side)?;
    let mut reasoning = format!("Best {} price found on {}", side, best.exchange);
    if aggregated.price_spread > SIGNIFICANT_SPREAD_PCT {
        reasoning.push_str(&format!(
            " (significant spread detected: {:.2}%)",
            aggregated.price_spread.round_dp(2)
        ));
    }
    Some(RoutingDecision {
        recommended_exchange: best.exchange,
        price: best.price,
        reasoning,
        spread: aggregated.price_spread,
    })
}

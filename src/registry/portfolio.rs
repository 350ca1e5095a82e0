use crate::core::traits::ExchangeConnector;
use crate::core::types::{BalanceEntry, ExchangePortfolio};
use futures_util::future::join_all;
use rust_decimal::Decimal;
use tracing::debug;

/// Assets counted at face value
pub const USD_EQUIVALENTS: [&str; 3] = ["USD", "USDT", "USDC"];

/// Quote asset used to price everything else
pub const PRICING_QUOTE: &str = "USDT";

pub fn is_usd_equivalent(asset: &str) -> bool {
    USD_EQUIVALENTS.contains(&asset)
}

/// USD value of one balance on `venue`, `None` when it cannot be priced
async fn value_of(venue: &dyn ExchangeConnector, balance: &BalanceEntry) -> Option<Decimal> {
    if is_usd_equivalent(&balance.asset) {
        return Some(balance.total);
    }
    let symbol = format!("{}{}", balance.asset, PRICING_QUOTE);
    match venue.get_market_data(&symbol).await.into_result() {
        Ok(snapshot) => Some(balance.total * snapshot.price),
        Err(error) => {
            debug!(exchange = venue.name(), %symbol, %error, "Skipping unpriced asset");
            None
        }
    }
}

/// Value every balance of one venue, pricing assets concurrently
pub async fn value_balances(
    venue: &dyn ExchangeConnector,
    balances: Vec<BalanceEntry>,
) -> ExchangePortfolio {
    let values = join_all(balances.iter().map(|balance| value_of(venue, balance))).await;
    let usd = values.into_iter().flatten().sum();
    ExchangePortfolio {
        usd,
        assets: balances,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{dec, FakeVenue};

    #[tokio::test]
    async fn test_stablecoins_at_face_value() {
        let venue = FakeVenue::new("a");
        let portfolio = value_balances(
            &venue,
            vec![
                BalanceEntry::new("USDT", dec("100"), dec("50")),
                BalanceEntry::new("USDC", dec("25"), Decimal::ZERO),
                BalanceEntry::new("USD", dec("5"), Decimal::ZERO),
            ],
        )
        .await;
        assert_eq!(portfolio.usd, dec("180"));
        assert_eq!(portfolio.assets.len(), 3);
        assert!(venue.calls().is_empty());
    }

    #[tokio::test]
    async fn test_priced_and_unpriceable_assets() {
        let venue = FakeVenue::new("a").with_price("BTCUSDT", "30000");
        let portfolio = value_balances(
            &venue,
            vec![
                BalanceEntry::new("BTC", dec("0.5"), Decimal::ZERO),
                BalanceEntry::new("DOGEFOO", dec("1000"), Decimal::ZERO),
                BalanceEntry::new("USDT", dec("10"), Decimal::ZERO),
            ],
        )
        .await;
        assert_eq!(portfolio.usd, dec("15010"));
        let calls = venue.calls();
        assert!(calls.contains(&"market_data BTCUSDT".to_string()));
        assert!(calls.contains(&"market_data DOGEFOOUSDT".to_string()));
    }
}

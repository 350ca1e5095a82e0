use anyhow::Context;
use crossx::{ExchangeRegistry, RegistryConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    // Credentials come from the environment (or `.env`); venues without
    // them are registered read-only.
    #[cfg(feature = "env-file")]
    let config = RegistryConfig::from_env_file(".env");
    #[cfg(not(feature = "env-file"))]
    let config = RegistryConfig::from_env();
    let config = config.context("loading exchange configuration")?;
    let registry = ExchangeRegistry::from_config(&config)?;

    println!("Testing connectivity...");
    for (name, report) in registry.test_all_connections().await {
        match report.message {
            None => println!("  {:<10} ok ({:?})", name, report.status),
            Some(error) => println!("  {:<10} failed: {}", name, error),
        }
    }

    match registry.get_aggregated_market_data("BTCUSDT", None).await {
        Some(aggregated) => {
            println!(
                "BTCUSDT across {} venues: mean {}, spread {:.3}%",
                aggregated.exchanges.len(),
                aggregated.avg_price.round_dp(2),
                aggregated.price_spread
            );
            println!(
                "  highest {} on {}, lowest {} on {}",
                aggregated.best_bid.price,
                aggregated.best_bid.exchange,
                aggregated.best_ask.price,
                aggregated.best_ask.exchange
            );
            for (venue, error) in &aggregated.failures {
                println!("  {} skipped: {}", venue, error);
            }
        }
        None => println!("No venue returned BTCUSDT market data"),
    }

    for (name, info) in registry.get_exchange_info() {
        println!(
            "{} ({}): configured={} sandbox={} status={:?}",
            info.display_name, name, info.configured, info.sandbox, info.status
        );
    }

    Ok(())
}

pub mod core;
pub mod exchanges;
pub mod registry;

#[cfg(test)]
pub(crate) mod testkit;

pub use core::client::ExchangeClient;
pub use core::config::{ExchangeConfig, RegistryConfig};
pub use core::{errors::ExchangeError, traits::ExchangeConnector, types::*};
pub use exchanges::binance::BinanceClient;
pub use exchanges::coinbase::CoinbaseClient;
pub use exchanges::kucoin::KucoinClient;
pub use registry::ExchangeRegistry;

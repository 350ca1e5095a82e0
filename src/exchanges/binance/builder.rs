use super::adapter::BinanceAdapter;
use crate::core::client::ExchangeClient;
use crate::core::config::ExchangeConfig;
use crate::core::errors::ExchangeError;

pub type BinanceClient = ExchangeClient<BinanceAdapter>;

/// Create a Binance client on the default `reqwest` transport
pub fn build_connector(config: ExchangeConfig) -> Result<BinanceClient, ExchangeError> {
    ExchangeClient::new(BinanceAdapter, config)
}

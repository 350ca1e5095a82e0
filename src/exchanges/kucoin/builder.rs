use super::adapter::KucoinAdapter;
use crate::core::client::ExchangeClient;
use crate::core::config::ExchangeConfig;
use crate::core::errors::ExchangeError;

pub type KucoinClient = ExchangeClient<KucoinAdapter>;

/// Create a KuCoin client on the default `reqwest` transport
pub fn build_connector(config: ExchangeConfig) -> Result<KucoinClient, ExchangeError> {
    ExchangeClient::new(KucoinAdapter, config)
}

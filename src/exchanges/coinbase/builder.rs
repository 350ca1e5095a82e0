use super::adapter::CoinbaseAdapter;
use crate::core::client::ExchangeClient;
use crate::core::config::ExchangeConfig;
use crate::core::errors::ExchangeError;

pub type CoinbaseClient = ExchangeClient<CoinbaseAdapter>;

/// Create a Coinbase client on the default `reqwest` transport
pub fn build_connector(config: ExchangeConfig) -> Result<CoinbaseClient, ExchangeError> {
    ExchangeClient::new(CoinbaseAdapter, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::ConnectionProbe;

    #[test]
    fn test_build_connector() {
        let config = ExchangeConfig::new("c".repeat(32), "a2tr".repeat(16))
            .with_passphrase("pass".into());
        let client = build_connector(config).unwrap();
        assert_eq!(client.display_name(), "Coinbase");
        assert!(client.validate_credentials());
        assert_eq!(client.base_url(), "https://api.exchange.coinbase.com");
    }
}

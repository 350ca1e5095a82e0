use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::env;
use tracing::debug;

/// Credentials and endpoint selection for a single exchange.
///
/// Secrets are wrapped in [`Secret`] so they never leak through `Debug`,
/// serialization or tracing fields.
#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    pub api_key: Secret<String>,
    pub secret_key: Secret<String>,
    pub passphrase: Option<Secret<String>>,
    pub sandbox: bool,
    pub base_url: Option<String>,
}

// Never expose secrets in serialization
impl Serialize for ExchangeConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("ExchangeConfig", 5)?;
        state.serialize_field("api_key", "[REDACTED]")?;
        state.serialize_field("secret_key", "[REDACTED]")?;
        state.serialize_field(
            "passphrase",
            &self.passphrase.as_ref().map(|_| "[REDACTED]"),
        )?;
        state.serialize_field("sandbox", &self.sandbox)?;
        state.serialize_field("base_url", &self.base_url)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for ExchangeConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Helper {
            api_key: String,
            secret_key: String,
            #[serde(default)]
            passphrase: Option<String>,
            #[serde(default, alias = "testnet")]
            sandbox: bool,
            #[serde(default)]
            base_url: Option<String>,
        }

        let helper = Helper::deserialize(deserializer)?;
        Ok(Self {
            api_key: Secret::new(helper.api_key),
            secret_key: Secret::new(helper.secret_key),
            passphrase: helper.passphrase.map(Secret::new),
            sandbox: helper.sandbox,
            base_url: helper.base_url,
        })
    }
}

impl ExchangeConfig {
    #[must_use]
    pub fn new(api_key: String, secret_key: String) -> Self {
        Self {
            api_key: Secret::new(api_key),
            secret_key: Secret::new(secret_key),
            passphrase: None,
            sandbox: false,
            base_url: None,
        }
    }

    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `{EXCHANGE}_API_KEY`
    /// - `{EXCHANGE}_SECRET_KEY` (or `{EXCHANGE}_API_SECRET`)
    /// - `{EXCHANGE}_PASSPHRASE` (optional, required by Coinbase and KuCoin)
    /// - `{EXCHANGE}_SANDBOX` or `{EXCHANGE}_TESTNET` (optional, defaults to false)
    /// - `{EXCHANGE}_BASE_URL` (optional)
    pub fn from_env(exchange_prefix: &str) -> Result<Self, ConfigError> {
        let prefix = exchange_prefix.to_uppercase();
        let api_key_var = format!("{}_API_KEY", prefix);
        let secret_key_var = format!("{}_SECRET_KEY", prefix);

        let api_key = env::var(&api_key_var)
            .map_err(|_| ConfigError::MissingEnvironmentVariable(api_key_var))?;

        let secret_key = env::var(&secret_key_var)
            .or_else(|_| env::var(format!("{}_API_SECRET", prefix)))
            .map_err(|_| ConfigError::MissingEnvironmentVariable(secret_key_var))?;

        let passphrase = env::var(format!("{}_PASSPHRASE", prefix))
            .ok()
            .filter(|value| !value.is_empty())
            .map(Secret::new);

        let sandbox = env::var(format!("{}_SANDBOX", prefix))
            .or_else(|_| env::var(format!("{}_TESTNET", prefix)))
            .map(|value| parse_flag(&value))
            .unwrap_or(false);

        let base_url = env::var(format!("{}_BASE_URL", prefix)).ok();

        debug!(
            exchange = %prefix,
            sandbox,
            has_passphrase = passphrase.is_some(),
            base_url = base_url.as_deref().unwrap_or("default"),
            "Loaded exchange credentials from environment"
        );

        Ok(Self {
            api_key: Secret::new(api_key),
            secret_key: Secret::new(secret_key),
            passphrase,
            sandbox,
            base_url,
        })
    }

    /// Load a `.env` file (if it exists) and then read the configuration
    /// from the environment.
    ///
    /// **Security Warning**: Never commit .env files to version control!
    #[cfg(feature = "env-file")]
    pub fn from_env_file(exchange_prefix: &str) -> Result<Self, ConfigError> {
        Self::from_env_file_with_path(exchange_prefix, ".env")
    }

    #[cfg(feature = "env-file")]
    pub fn from_env_file_with_path(
        exchange_prefix: &str,
        env_file_path: &str,
    ) -> Result<Self, ConfigError> {
        load_env_file(env_file_path)?;
        Self::from_env(exchange_prefix)
    }

    /// Configuration for public endpoints only (market data)
    #[must_use]
    pub fn read_only() -> Self {
        Self::new(String::new(), String::new())
    }

    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.api_key.expose_secret().is_empty() && !self.secret_key.expose_secret().is_empty()
    }

    #[must_use]
    pub fn with_passphrase(mut self, passphrase: String) -> Self {
        self.passphrase = Some(Secret::new(passphrase));
        self
    }

    #[must_use]
    pub const fn sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self
    }

    #[must_use]
    pub fn base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Get API key (use carefully - exposes secret)
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    /// Get secret key (use carefully - exposes secret)
    pub fn secret_key(&self) -> &str {
        self.secret_key.expose_secret()
    }

    pub fn passphrase(&self) -> Option<&str> {
        self.passphrase.as_ref().map(|p| p.expose_secret().as_str())
    }
}

/// Which venues the registry builds and which one is the default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub enabled: Vec<String>,
    pub default_exchange: String,
    #[serde(default)]
    pub exchanges: BTreeMap<String, ExchangeConfig>,
}

pub const SUPPORTED_EXCHANGES: [&str; 3] = ["binance", "coinbase", "kucoin"];

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            enabled: SUPPORTED_EXCHANGES.iter().map(|s| (*s).to_string()).collect(),
            default_exchange: "binance".to_string(),
            exchanges: BTreeMap::new(),
        }
    }
}

impl RegistryConfig {
    /// Read `EXCHANGES_ENABLED` (comma separated) and `DEFAULT_EXCHANGE`,
    /// then per-venue credentials via [`ExchangeConfig::from_env`].
    ///
    /// Venues without credentials fall back to a read-only configuration so
    /// public market data keeps working.
    pub fn from_env() -> Result<Self, ConfigError> {
        let enabled = match env::var("EXCHANGES_ENABLED") {
            Ok(list) => parse_exchange_list(&list)?,
            Err(_) => Self::default().enabled,
        };

        let default_exchange = env::var("DEFAULT_EXCHANGE")
            .map(|name| name.trim().to_lowercase())
            .unwrap_or_else(|_| "binance".to_string());

        let mut exchanges = BTreeMap::new();
        for name in &enabled {
            let config = match ExchangeConfig::from_env(name) {
                Ok(config) => config,
                Err(ConfigError::MissingEnvironmentVariable(var)) => {
                    debug!(exchange = %name, missing = %var, "No credentials, using read-only config");
                    let sandbox = env::var(format!("{}_SANDBOX", name.to_uppercase()))
                        .map(|value| parse_flag(&value))
                        .unwrap_or(false);
                    ExchangeConfig::read_only().sandbox(sandbox)
                }
                Err(e) => return Err(e),
            };
            exchanges.insert(name.clone(), config);
        }

        debug!(
            enabled = ?enabled,
            default_exchange = %default_exchange,
            "Loaded registry configuration from environment"
        );

        Ok(Self {
            enabled,
            default_exchange,
            exchanges,
        })
    }

    #[cfg(feature = "env-file")]
    pub fn from_env_file(env_file_path: &str) -> Result<Self, ConfigError> {
        load_env_file(env_file_path)?;
        Self::from_env()
    }

    #[must_use]
    pub fn with_exchange(mut self, name: &str, config: ExchangeConfig) -> Self {
        let name = name.to_lowercase();
        if !self.enabled.contains(&name) {
            self.enabled.push(name.clone());
        }
        self.exchanges.insert(name, config);
        self
    }

    /// Configuration for `name`, read-only when nothing was provided
    pub fn exchange(&self, name: &str) -> ExchangeConfig {
        self.exchanges
            .get(name)
            .cloned()
            .unwrap_or_else(ExchangeConfig::read_only)
    }
}

fn parse_exchange_list(list: &str) -> Result<Vec<String>, ConfigError> {
    let mut enabled = Vec::new();
    for name in list.split(',').map(|s| s.trim().to_lowercase()) {
        if name.is_empty() {
            continue;
        }
        if !SUPPORTED_EXCHANGES.contains(&name.as_str()) {
            return Err(ConfigError::InvalidConfiguration(format!(
                "Unsupported exchange in EXCHANGES_ENABLED: {}",
                name
            )));
        }
        if !enabled.contains(&name) {
            enabled.push(name);
        }
    }
    Ok(enabled)
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}

#[cfg(feature = "env-file")]
fn load_env_file(env_file_path: &str) -> Result<(), ConfigError> {
    match dotenv::from_path(env_file_path) {
        Ok(()) => {
            debug!(path = env_file_path, "Loaded .env file");
            Ok(())
        }
        Err(dotenv::Error::Io(io_err)) if io_err.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = env_file_path, "No .env file found");
            Ok(())
        }
        Err(e) => Err(ConfigError::InvalidConfiguration(format!(
            "Failed to load .env file '{}': {}",
            env_file_path, e
        ))),
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvironmentVariable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_redacts_secrets() {
        let config = ExchangeConfig::new("key-123".into(), "secret-456".into())
            .with_passphrase("pass-789".into())
            .sandbox(true);
        let json = serde_json::to_string(&config).unwrap();

        assert!(!json.contains("key-123"));
        assert!(!json.contains("secret-456"));
        assert!(!json.contains("pass-789"));
        assert!(json.contains("[REDACTED]"));
        assert!(json.contains("\"sandbox\":true"));

        let debug = format!("{:?}", config);
        assert!(!debug.contains("secret-456"));
    }

    #[test]
    fn test_deserialize_accepts_testnet_alias() {
        let config: ExchangeConfig = serde_json::from_str(
            r#"{"api_key":"k","secret_key":"s","testnet":true,"passphrase":"p"}"#,
        )
        .unwrap();
        assert!(config.sandbox);
        assert_eq!(config.passphrase(), Some("p"));
        assert!(config.has_credentials());
    }

    #[test]
    fn test_read_only_has_no_credentials() {
        let config = ExchangeConfig::read_only();
        assert!(!config.has_credentials());
        assert!(config.passphrase().is_none());
    }

    #[test]
    fn test_from_env_reads_prefixed_variables() {
        env::set_var("CROSSXTEST_API_KEY", "abc");
        env::set_var("CROSSXTEST_API_SECRET", "def");
        env::set_var("CROSSXTEST_PASSPHRASE", "ghi");
        env::set_var("CROSSXTEST_SANDBOX", "true");

        let config = ExchangeConfig::from_env("crossxtest").unwrap();
        assert_eq!(config.api_key(), "abc");
        assert_eq!(config.secret_key(), "def");
        assert_eq!(config.passphrase(), Some("ghi"));
        assert!(config.sandbox);
        assert!(config.base_url.is_none());
    }

    #[test]
    fn test_from_env_missing_key() {
        let err = ExchangeConfig::from_env("crossxmissing").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingEnvironmentVariable(var) if var == "CROSSXMISSING_API_KEY"
        ));
    }

    #[test]
    fn test_exchange_list_parsing() {
        assert_eq!(
            parse_exchange_list(" Binance, kucoin,,binance ").unwrap(),
            vec!["binance".to_string(), "kucoin".to_string()]
        );
        assert!(parse_exchange_list("binance,kraken").is_err());
    }

    #[test]
    fn test_registry_config_defaults() {
        let config = RegistryConfig::default();
        assert_eq!(config.enabled, vec!["binance", "coinbase", "kucoin"]);
        assert_eq!(config.default_exchange, "binance");
        assert!(!config.exchange("kucoin").has_credentials());

        let config = RegistryConfig {
            enabled: vec![],
            ..RegistryConfig::default()
        }
        .with_exchange("KuCoin", ExchangeConfig::new("k".into(), "s".into()));
        assert_eq!(config.enabled, vec!["kucoin"]);
        assert!(config.exchange("kucoin").has_credentials());
    }
}

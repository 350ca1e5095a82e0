use crate::core::errors::ExchangeError;
use base64::engine::general_purpose;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

type HmacSha256 = Hmac<Sha256>;

/// Headers to attach and the final query string (without leading `?`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignedRequest {
    pub headers: Vec<(String, String)>,
    pub query: String,
}

pub type SignatureResult = Result<SignedRequest, ExchangeError>;

/// Signer trait for request authentication
///
/// Each venue implements its own scheme: where the timestamp goes, what
/// string is hashed and which headers carry the result.
pub trait Signer: Send + Sync {
    /// Sign a request
    ///
    /// # Arguments
    /// * `method` - HTTP method (GET, POST, etc.)
    /// * `endpoint` - Resolved API path, e.g. `/api/v3/order`
    /// * `query_string` - Encoded query string (without leading '?')
    /// * `body` - Raw request body bytes
    /// * `timestamp` - Request timestamp in milliseconds
    fn sign_request(
        &self,
        method: &str,
        endpoint: &str,
        query_string: &str,
        body: &[u8],
        timestamp: u64,
    ) -> SignatureResult;
}

fn mac(secret: &[u8]) -> Result<HmacSha256, ExchangeError> {
    HmacSha256::new_from_slice(secret)
        .map_err(|e| ExchangeError::Configuration(format!("Invalid secret key: {}", e)))
}

/// HMAC-SHA256 with a raw secret, hex output
pub fn sign_hex(message: &str, secret: &str) -> Result<String, ExchangeError> {
    let mut mac = mac(secret.as_bytes())?;
    mac.update(message.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// HMAC-SHA256 with a raw secret, base64 output
pub fn sign_base64(message: &str, secret: &str) -> Result<String, ExchangeError> {
    let mut mac = mac(secret.as_bytes())?;
    mac.update(message.as_bytes());
    Ok(general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

/// HMAC-SHA256 with a base64-encoded secret, base64 output
pub fn sign_base64_secret(message: &str, base64_secret: &str) -> Result<String, ExchangeError> {
    let key = general_purpose::STANDARD
        .decode(base64_secret)
        .map_err(|e| ExchangeError::Configuration(format!("Secret is not valid base64: {}", e)))?;
    let mut mac = mac(&key)?;
    mac.update(message.as_bytes());
    Ok(general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

pub fn sha256_hex(message: &str) -> String {
    hex::encode(Sha256::digest(message.as_bytes()))
}

/// Random alphanumeric string, used for client order ids
pub fn generate_nonce(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// `application/x-www-form-urlencoded` encoding of a parameter map.
/// Nulls are skipped and arrays repeat their key.
pub fn encode_params(params: &Map<String, Value>) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items {
                    serializer.append_pair(key, &param_text(item));
                }
            }
            other => {
                serializer.append_pair(key, &param_text(other));
            }
        }
    }
    serializer.finish()
}

fn param_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

fn is_base64_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=')
}

/// Shape check for an API key. Never touches the network.
pub fn validate_key_format(key: &str, venue: &str) -> bool {
    let alnum = key.chars().all(|c| c.is_ascii_alphanumeric());
    match venue {
        "binance" => key.len() >= 64 && alnum,
        "coinbase" => key.len() >= 32 && alnum,
        "kucoin" => key.len() >= 24 && alnum,
        _ => key.len() >= 16,
    }
}

/// Shape check for an API secret. Never touches the network.
pub fn validate_secret_format(secret: &str, venue: &str) -> bool {
    match venue {
        "binance" | "coinbase" => secret.len() >= 64 && secret.chars().all(is_base64_char),
        "kucoin" => {
            secret.len() >= 36
                && secret
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-')
        }
        _ => secret.len() >= 16,
    }
}

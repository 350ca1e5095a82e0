use crate::core::kernel::signer::sign_base64_secret;
use crate::core::kernel::{SignatureResult, SignedRequest, Signer};

/// Header signing: `timestamp + METHOD + path[?query] + body`, HMAC'ed with
/// the base64-decoded secret. Timestamp is in seconds.
pub struct CoinbaseSigner {
    api_key: String,
    secret_key: String,
    passphrase: String,
}

impl CoinbaseSigner {
    pub fn new(api_key: String, secret_key: String, passphrase: String) -> Self {
        Self {
            api_key,
            secret_key,
            passphrase,
        }
    }
}

impl Signer for CoinbaseSigner {
    fn sign_request(
        &self,
        method: &str,
        endpoint: &str,
        query_string: &str,
        body: &[u8],
        timestamp: u64,
    ) -> SignatureResult {
        let timestamp = (timestamp / 1000).to_string();
        let request_path = if query_string.is_empty() {
            endpoint.to_string()
        } else {
            format!("{}?{}", endpoint, query_string)
        };
        let body = std::str::from_utf8(body).unwrap_or_default();
        let message = format!(
            "{}{}{}{}",
            timestamp,
            method.to_uppercase(),
            request_path,
            body
        );
        let signature = sign_base64_secret(&message, &self.secret_key)?;

        Ok(SignedRequest {
            headers: vec![
                ("CB-ACCESS-KEY".to_string(), self.api_key.clone()),
                ("CB-ACCESS-SIGN".to_string(), signature),
                ("CB-ACCESS-TIMESTAMP".to_string(), timestamp),
                ("CB-ACCESS-PASSPHRASE".to_string(), self.passphrase.clone()),
            ],
            query: query_string.to_string(),
        })
    }
}

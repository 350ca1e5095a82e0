use crate::core::kernel::signer::sign_base64;
use crate::core::kernel::{SignatureResult, SignedRequest, Signer};

/// KuCoin key version 2: the passphrase is itself HMAC'ed with the secret
/// and the prehash string is `timestamp + METHOD + path[?query] + body`.
pub struct KucoinSigner {
    api_key: String,
    secret_key: String,
    passphrase: String,
}

impl KucoinSigner {
    pub fn new(api_key: String, secret_key: String, passphrase: String) -> Self {
        Self {
            api_key,
            secret_key,
            passphrase,
        }
    }
}

impl Signer for KucoinSigner {
    fn sign_request(
        &self,
        method: &str,
        endpoint: &str,
        query_string: &str,
        body: &[u8],
        timestamp: u64,
    ) -> SignatureResult {
        let timestamp = timestamp.to_string();
        let request_path = if query_string.is_empty() {
            endpoint.to_string()
        } else {
            format!("{}?{}", endpoint, query_string)
        };
        let body = std::str::from_utf8(body).unwrap_or_default();
        let prehash = format!(
            "{}{}{}{}",
            timestamp,
            method.to_uppercase(),
            request_path,
            body
        );
        let signature = sign_base64(&prehash, &self.secret_key)?;
        let passphrase = sign_base64(&self.passphrase, &self.secret_key)?;

        Ok(SignedRequest {
            headers: vec![
                ("KC-API-KEY".to_string(), self.api_key.clone()),
                ("KC-API-SIGN".to_string(), signature),
                ("KC-API-TIMESTAMP".to_string(), timestamp),
                ("KC-API-PASSPHRASE".to_string(), passphrase),
                ("KC-API-KEY-VERSION".to_string(), "2".to_string()),
            ],
            query: query_string.to_string(),
        })
    }
}

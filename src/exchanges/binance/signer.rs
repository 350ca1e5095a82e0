use crate::core::kernel::signer::sign_hex;
use crate::core::kernel::{SignatureResult, SignedRequest, Signer};

/// Receive window sent with every signed request, in milliseconds
pub const RECV_WINDOW: u64 = 5000;

/// Query-string signing: `recvWindow` and `timestamp` are appended to the
/// parameters, the whole query string is HMAC'ed (hex) and the signature is
/// appended back. The key travels in `X-MBX-APIKEY`.
pub struct BinanceSigner {
    api_key: String,
    secret_key: String,
}

impl BinanceSigner {
    pub fn new(api_key: String, secret_key: String) -> Self {
        Self {
            api_key,
            secret_key,
        }
    }
}

impl Signer for BinanceSigner {
    fn sign_request(
        &self,
        _method: &str,
        _endpoint: &str,
        query_string: &str,
        _body: &[u8],
        timestamp: u64,
    ) -> SignatureResult {
        let auth_params = format!("recvWindow={}&timestamp={}", RECV_WINDOW, timestamp);
        let payload = if query_string.is_empty() {
            auth_params
        } else {
            format!("{}&{}", query_string, auth_params)
        };

        let signature = sign_hex(&payload, &self.secret_key)?;

        Ok(SignedRequest {
            headers: vec![("X-MBX-APIKEY".to_string(), self.api_key.clone())],
            query: format!("{}&signature={}", payload, signature),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_documented_signature() {
        let signer = BinanceSigner::new(
            "vmPUZE6mv9SD5VNHk4HlWFsOr6aKE2zvsw0MuIgwCIPy6utIco14y7Ju91duEh8A".into(),
            "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j".into(),
        );
        let signed = signer
            .sign_request(
                "POST",
                "/api/v3/order",
                "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1",
                b"",
                1_499_827_319_559,
            )
            .unwrap();

        assert_eq!(
            signed.query,
            "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1\
             &recvWindow=5000&timestamp=1499827319559\
             &signature=c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
        assert_eq!(signed.headers.len(), 1);
        assert_eq!(signed.headers[0].0, "X-MBX-APIKEY");
    }

    #[test]
    fn test_empty_query() {
        let signer = BinanceSigner::new("key".into(), "secret".into());
        let signed = signer
            .sign_request("GET", "/api/v3/account", "", b"", 1)
            .unwrap();
        assert!(signed.query.starts_with("recvWindow=5000&timestamp=1&signature="));
    }
}

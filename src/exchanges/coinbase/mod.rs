//! Coinbase Exchange REST integration
//!
//! Requests are authenticated with `CB-ACCESS-*` headers; the signature is
//! an HMAC-SHA256 over `timestamp + method + path + body` keyed with the
//! base64-decoded secret.

pub mod adapter;
pub mod builder;
pub mod conversions;
pub mod signer;
pub mod types;

pub use adapter::CoinbaseAdapter;
pub use builder::{build_connector, CoinbaseClient};
pub use signer::CoinbaseSigner;

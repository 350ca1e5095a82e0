//! Binance spot REST integration
//!
//! Signed endpoints use query-string signing: `recvWindow` and `timestamp`
//! are appended to the parameters and the HMAC-SHA256 of the whole query
//! string is sent as `signature`.

pub mod adapter;
pub mod builder;
pub mod conversions;
pub mod signer;
pub mod types;

pub use adapter::BinanceAdapter;
pub use builder::{build_connector, BinanceClient};
pub use signer::BinanceSigner;

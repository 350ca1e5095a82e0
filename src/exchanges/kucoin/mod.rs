//! KuCoin spot REST integration
//!
//! Every response arrives in a `{code, data, msg}` envelope; only code
//! `200000` carries data. Authentication uses key version 2, where the
//! passphrase header is an HMAC of the passphrase itself.

pub mod adapter;
pub mod builder;
pub mod conversions;
pub mod signer;
pub mod types;

pub use adapter::KucoinAdapter;
pub use builder::{build_connector, KucoinClient};
pub use signer::KucoinSigner;

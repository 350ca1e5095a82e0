//! Transport kernel shared by every exchange
//!
//! The kernel holds no venue logic. It provides:
//! - `RestClient`: the HTTP transport seam (`ReqwestRest` in production)
//! - `Signer`: pluggable request authentication plus the HMAC/hash helpers
//!   the venue signers are built from
//! - `SlidingWindowLimiter` / `OrderThrottle`: local request budgets
//! - `with_retry`: bounded exponential backoff
//!
//! ```rust,no_run
//! use crossx::core::kernel::{with_retry, RestClient, HttpRequest, ReqwestRest, RetryPolicy};
//! use reqwest::Method;
//!
//! # async fn example() -> Result<(), crossx::ExchangeError> {
//! let rest = ReqwestRest::new("binance")?;
//! let request = HttpRequest {
//!     method: Method::GET,
//!     url: "https://api.binance.com/api/v3/time".to_string(),
//!     headers: vec![],
//!     body: None,
//! };
//! let response = with_retry(RetryPolicy::default(), || rest.execute(request.clone())).await?;
//! println!("{}", response.body);
//! # Ok(())
//! # }
//! ```
pub mod rate_limit;
pub mod rest;
pub mod retry;
pub mod signer;

pub use rate_limit::{OrderThrottle, SlidingWindowLimiter};
pub use rest::{HttpRequest, HttpResponse, ReqwestRest, RestClient, RestClientBuilder, RestClientConfig};
pub use retry::{with_retry, RetryPolicy};
pub use signer::{SignatureResult, SignedRequest, Signer};

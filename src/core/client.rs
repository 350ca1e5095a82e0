use crate::core::{
    config::ExchangeConfig,
    errors::ExchangeError,
    kernel::{
        signer::{encode_params, timestamp_ms, validate_key_format, validate_secret_format},
        with_retry, HttpRequest, HttpResponse, OrderThrottle, RestClient,
        RestClientBuilder, RestClientConfig, RetryPolicy, Signer, SlidingWindowLimiter,
    },
    traits::{
        AccountInfo, ConnectionProbe, EndpointTemplate, ExchangeAdapter, MarketDataSource,
        OrderPlacer,
    },
    types::{
        ApiResponse, BalanceEntry, ConnectionState, ConnectionStatus, MarketSnapshot,
        OrderBookSnapshot, OrderContext, OrderRequest, OrderResult, RateLimitInfo,
        RateLimitStatus, TradeFill,
    },
};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Map, Value};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, instrument, warn};

/// Generic request pipeline composed with one venue adapter.
///
/// Every call goes through the same steps: local rate-limit gate, URL and
/// parameter construction, optional signing, transport with bounded retry,
/// then error mapping and envelope unwrapping. Payload semantics are left
/// to the adapter's parsers.
pub struct ExchangeClient<A: ExchangeAdapter> {
    adapter: A,
    config: ExchangeConfig,
    rest: Arc<dyn RestClient>,
    limiter: SlidingWindowLimiter,
    order_throttle: Option<OrderThrottle>,
    retry: RetryPolicy,
    status: RwLock<ConnectionStatus>,
}

impl<A: ExchangeAdapter> std::fmt::Debug for ExchangeClient<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeClient")
            .field("exchange", &self.adapter.name())
            .field("config", &self.config)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl<A: ExchangeAdapter> ExchangeClient<A> {
    /// Client backed by the production `reqwest` transport
    pub fn new(adapter: A, config: ExchangeConfig) -> Result<Self, ExchangeError> {
        let rest = RestClientBuilder::new(RestClientConfig::new(adapter.name().to_string()))
            .build()?;
        Ok(Self::with_rest(adapter, config, Arc::new(rest)))
    }

    pub fn with_rest(adapter: A, config: ExchangeConfig, rest: Arc<dyn RestClient>) -> Self {
        let limits = adapter.limits();
        Self {
            limiter: SlidingWindowLimiter::per_minute(limits.requests_per_minute),
            order_throttle: limits.orders_per_second.map(OrderThrottle::per_second),
            retry: RetryPolicy::default(),
            status: RwLock::new(ConnectionStatus::default()),
            adapter,
            config,
            rest,
        }
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_rate_limiter(mut self, limiter: SlidingWindowLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    /// Config override, then sandbox URL when requested, then production
    pub fn base_url(&self) -> &str {
        let endpoints = self.adapter.endpoints();
        if let Some(url) = &self.config.base_url {
            return url.trim_end_matches('/');
        }
        if self.config.sandbox {
            if let Some(sandbox) = endpoints.sandbox_url {
                return sandbox;
            }
            debug!(exchange = self.adapter.name(), "No sandbox URL, using production");
        }
        endpoints.base_url
    }

    /// Run one call through the pipeline and return the unwrapped payload
    #[instrument(skip(self, params), fields(exchange = %self.adapter.name(), method = %method, endpoint = %path))]
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        params: Map<String, Value>,
        signed: bool,
    ) -> ApiResponse<Value> {
        if !self.limiter.try_acquire() {
            let retry_after = self.limiter.wait_time();
            warn!(?retry_after, "Local request budget exhausted");
            return ApiResponse::failure(ExchangeError::RateLimited { retry_after })
                .with_rate_limit(Some(RateLimitInfo {
                    used: None,
                    remaining: 0,
                }));
        }

        let signer = if signed {
            match self.authenticated_signer() {
                Ok(signer) => Some(signer),
                Err(e) => return ApiResponse::failure(e),
            }
        } else {
            None
        };

        let outcome = with_retry(self.retry, || async {
            let request = self.build_request(&method, path, &params, signer.as_deref())?;
            debug!(url = %request.url, "Sending request");
            self.rest.execute(request).await
        })
        .await;

        let response = match outcome {
            Ok(response) => response,
            Err(e) => return ApiResponse::failure(e),
        };

        let rate_limit = self
            .adapter
            .rate_limit_info(&response)
            .or_else(|| {
                Some(RateLimitInfo {
                    used: None,
                    remaining: self.limiter.remaining(),
                })
            });
        if let Some(info) = rate_limit {
            self.update_status(|status| status.rate_limit_remaining = Some(info.remaining));
        }

        ApiResponse::from(self.decode(&response)).with_rate_limit(rate_limit)
    }

    fn authenticated_signer(&self) -> Result<Box<dyn Signer>, ExchangeError> {
        let name = self.adapter.name();
        if !self.config.has_credentials() {
            return Err(ExchangeError::Configuration(format!(
                "{} API credentials are not configured",
                self.adapter.display_name()
            )));
        }
        if !validate_key_format(self.config.api_key(), name) {
            return Err(ExchangeError::Configuration(format!(
                "Invalid API key format for {}",
                self.adapter.display_name()
            )));
        }
        if !validate_secret_format(self.config.secret_key(), name) {
            return Err(ExchangeError::Configuration(format!(
                "Invalid API secret format for {}",
                self.adapter.display_name()
            )));
        }
        self.adapter.signer(&self.config)
    }

    fn build_request(
        &self,
        method: &Method,
        path: &str,
        params: &Map<String, Value>,
        signer: Option<&dyn Signer>,
    ) -> Result<HttpRequest, ExchangeError> {
        let (query, body) = if self.adapter.params_in_query(method) {
            (encode_params(params), String::new())
        } else if params.is_empty() {
            (String::new(), String::new())
        } else {
            (String::new(), serde_json::to_string(params)?)
        };

        let (headers, query) = match signer {
            Some(signer) => {
                let signed = signer.sign_request(
                    method.as_str(),
                    path,
                    &query,
                    body.as_bytes(),
                    timestamp_ms(),
                )?;
                (signed.headers, signed.query)
            }
            None => (Vec::new(), query),
        };

        let url = if query.is_empty() {
            format!("{}{}", self.base_url(), path)
        } else {
            format!("{}{}?{}", self.base_url(), path, query)
        };

        Ok(HttpRequest {
            method: method.clone(),
            url,
            headers,
            body: (!body.is_empty()).then_some(body),
        })
    }

    fn decode(&self, response: &HttpResponse) -> Result<Value, ExchangeError> {
        if !response.is_success() {
            return Err(protocol_error(response));
        }
        let payload = if response.body.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&response.body).map_err(|e| {
                ExchangeError::Parse(format!(
                    "{} returned invalid JSON: {}",
                    self.adapter.display_name(),
                    e
                ))
            })?
        };
        self.adapter.unwrap_envelope(payload)
    }

    /// Path and parameters for a per-symbol endpoint
    fn symbol_call(
        &self,
        template: EndpointTemplate,
        venue_symbol: &str,
        mut params: Map<String, Value>,
    ) -> (String, Map<String, Value>) {
        if template.has_symbol() {
            (template.resolve(Some(venue_symbol), None), params)
        } else {
            params.insert(
                self.adapter.endpoints().symbol_param.to_string(),
                Value::String(venue_symbol.to_string()),
            );
            (template.resolve(None, None), params)
        }
    }

    /// Path and parameters for an existing-order endpoint
    fn order_call(
        &self,
        template: EndpointTemplate,
        order_id: &str,
        venue_symbol: &str,
    ) -> (String, Map<String, Value>) {
        if template.has_order_id() {
            (template.resolve(Some(venue_symbol), Some(order_id)), Map::new())
        } else {
            let mut params = Map::new();
            params.insert(
                self.adapter.endpoints().symbol_param.to_string(),
                Value::String(venue_symbol.to_string()),
            );
            params.insert("orderId".to_string(), Value::String(order_id.to_string()));
            (template.resolve(None, None), params)
        }
    }

    fn update_status(&self, f: impl FnOnce(&mut ConnectionStatus)) {
        let mut status = self.status.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut status);
    }

    fn record_probe_failure(&self, error: &ExchangeError) {
        warn!(exchange = self.adapter.name(), %error, "Probe failed");
        self.update_status(|status| {
            status.state = ConnectionState::Error;
            status.connected = false;
            status.authenticated = false;
            status.error = Some(error.to_string());
        });
    }
}

fn protocol_error(response: &HttpResponse) -> ExchangeError {
    let parsed: Option<Value> = serde_json::from_str(&response.body).ok();
    let field = |name: &str| parsed.as_ref().and_then(|v| v.get(name));

    let code = field("code").and_then(|code| match code {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    });
    let message = field("msg")
        .or_else(|| field("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| {
            let text = response.body.trim();
            if text.is_empty() {
                format!("HTTP {}", response.status)
            } else {
                text.to_string()
            }
        });

    ExchangeError::Protocol {
        status: Some(response.status),
        code,
        message,
    }
}

/// Resolve a canonical symbol or bail out of the calling operation
macro_rules! venue_symbol {
    ($self:ident, $symbol:expr) => {
        match $self.adapter.to_venue_symbol($symbol) {
            Ok(symbol) => symbol,
            Err(e) => return ApiResponse::failure(e),
        }
    };
}

#[async_trait]
impl<A: ExchangeAdapter> MarketDataSource for ExchangeClient<A> {
    #[instrument(skip(self), fields(exchange = %self.adapter.name()))]
    async fn get_market_data(&self, symbol: &str) -> ApiResponse<MarketSnapshot> {
        let venue_symbol = venue_symbol!(self, symbol);
        let (path, params) =
            self.symbol_call(self.adapter.endpoints().ticker, &venue_symbol, Map::new());

        self.request(Method::GET, &path, params, false)
            .await
            .and_then(|payload| {
                let mut snapshot = self.adapter.parse_market_data(&payload, symbol)?;
                snapshot.exchange = self.adapter.name().to_string();
                Ok(snapshot)
            })
    }

    #[instrument(skip(self), fields(exchange = %self.adapter.name()))]
    async fn get_order_book(
        &self,
        symbol: &str,
        depth: Option<u32>,
    ) -> ApiResponse<OrderBookSnapshot> {
        let venue_symbol = venue_symbol!(self, symbol);
        let (path, params) = self.symbol_call(
            self.adapter.endpoints().order_book,
            &venue_symbol,
            self.adapter.order_book_params(depth),
        );

        self.request(Method::GET, &path, params, false)
            .await
            .and_then(|payload| {
                let mut book = self.adapter.parse_order_book(&payload, symbol)?;
                book.exchange = self.adapter.name().to_string();
                Ok(book)
            })
    }

    #[instrument(skip(self), fields(exchange = %self.adapter.name()))]
    async fn get_server_time(&self) -> ApiResponse<i64> {
        let path = self.adapter.endpoints().server_time.resolve(None, None);
        self.request(Method::GET, &path, Map::new(), false)
            .await
            .and_then(|payload| self.adapter.parse_server_time(&payload))
    }
}

#[async_trait]
impl<A: ExchangeAdapter> OrderPlacer for ExchangeClient<A> {
    #[instrument(skip(self, order), fields(exchange = %self.adapter.name(), symbol = %order.symbol, side = %order.side))]
    async fn place_order(&self, order: &OrderRequest) -> ApiResponse<OrderResult> {
        let venue_symbol = venue_symbol!(self, &order.symbol);
        if let Some(throttle) = &self.order_throttle {
            if let Err(e) = throttle.check(self.adapter.name()) {
                return ApiResponse::failure(e);
            }
        }
        let params = match self.adapter.order_params(order, &venue_symbol) {
            Ok(params) => params,
            Err(e) => return ApiResponse::failure(e),
        };
        let path = self.adapter.endpoints().place_order.resolve(None, None);

        self.request(Method::POST, &path, params, true)
            .await
            .and_then(|payload| {
                let context = OrderContext {
                    symbol: &order.symbol,
                    request: Some(order),
                };
                let mut result = self.adapter.parse_order(&payload, &context)?;
                result.exchange = self.adapter.name().to_string();
                Ok(result)
            })
    }

    #[instrument(skip(self), fields(exchange = %self.adapter.name()))]
    async fn cancel_order(&self, order_id: &str, symbol: &str) -> ApiResponse<()> {
        let venue_symbol = venue_symbol!(self, symbol);
        if let Some(throttle) = &self.order_throttle {
            if let Err(e) = throttle.check(self.adapter.name()) {
                return ApiResponse::failure(e);
            }
        }
        let (path, params) =
            self.order_call(self.adapter.endpoints().cancel_order, order_id, &venue_symbol);

        self.request(Method::DELETE, &path, params, true)
            .await
            .map(|_| ())
    }

    #[instrument(skip(self), fields(exchange = %self.adapter.name()))]
    async fn get_order_status(&self, order_id: &str, symbol: &str) -> ApiResponse<OrderResult> {
        let venue_symbol = venue_symbol!(self, symbol);
        let (path, params) =
            self.order_call(self.adapter.endpoints().order_status, order_id, &venue_symbol);

        self.request(Method::GET, &path, params, true)
            .await
            .and_then(|payload| {
                let context = OrderContext {
                    symbol,
                    request: None,
                };
                let mut result = self.adapter.parse_order(&payload, &context)?;
                result.exchange = self.adapter.name().to_string();
                Ok(result)
            })
    }

    #[instrument(skip(self), fields(exchange = %self.adapter.name()))]
    async fn get_open_orders(&self, symbol: Option<&str>) -> ApiResponse<Vec<OrderResult>> {
        let template = self.adapter.endpoints().open_orders;
        let params = self.adapter.open_orders_params();
        let (path, params) = match symbol {
            Some(symbol) => {
                let venue_symbol = venue_symbol!(self, symbol);
                self.symbol_call(template, &venue_symbol, params)
            }
            None => (template.resolve(None, None), params),
        };

        self.request(Method::GET, &path, params, true)
            .await
            .and_then(|payload| {
                let mut orders = self.adapter.parse_open_orders(&payload, symbol)?;
                for order in &mut orders {
                    order.exchange = self.adapter.name().to_string();
                }
                Ok(orders)
            })
    }

    #[instrument(skip(self), fields(exchange = %self.adapter.name()))]
    async fn cancel_all_orders(&self, symbol: &str) -> ApiResponse<Vec<String>> {
        let venue_symbol = venue_symbol!(self, symbol);
        if let Some(throttle) = &self.order_throttle {
            if let Err(e) = throttle.check(self.adapter.name()) {
                return ApiResponse::failure(e);
            }
        }
        let (path, params) =
            self.symbol_call(self.adapter.endpoints().cancel_all, &venue_symbol, Map::new());

        self.request(Method::DELETE, &path, params, true)
            .await
            .and_then(|payload| self.adapter.parse_canceled_ids(&payload))
    }
}

#[async_trait]
impl<A: ExchangeAdapter> AccountInfo for ExchangeClient<A> {
    #[instrument(skip(self), fields(exchange = %self.adapter.name()))]
    async fn get_balances(&self) -> ApiResponse<Vec<BalanceEntry>> {
        let path = self.adapter.endpoints().balances.resolve(None, None);
        self.request(Method::GET, &path, Map::new(), true)
            .await
            .and_then(|payload| self.adapter.parse_balances(&payload))
    }

    #[instrument(skip(self), fields(exchange = %self.adapter.name()))]
    async fn get_trade_history(
        &self,
        symbol: &str,
        limit: Option<u32>,
    ) -> ApiResponse<Vec<TradeFill>> {
        let venue_symbol = venue_symbol!(self, symbol);
        let (path, params) = self.symbol_call(
            self.adapter.endpoints().fills,
            &venue_symbol,
            self.adapter.fills_params(limit),
        );

        self.request(Method::GET, &path, params, true)
            .await
            .and_then(|payload| {
                let mut fills = self.adapter.parse_fills(&payload, symbol)?;
                for fill in &mut fills {
                    fill.exchange = self.adapter.name().to_string();
                }
                Ok(fills)
            })
    }
}

#[async_trait]
impl<A: ExchangeAdapter> ConnectionProbe for ExchangeClient<A> {
    fn name(&self) -> &str {
        self.adapter.name()
    }

    fn display_name(&self) -> &str {
        self.adapter.display_name()
    }

    fn is_sandbox(&self) -> bool {
        self.config.sandbox
    }

    fn is_configured(&self) -> bool {
        self.config.has_credentials()
    }

    fn validate_credentials(&self) -> bool {
        self.config.has_credentials()
            && validate_key_format(self.config.api_key(), self.adapter.name())
            && validate_secret_format(self.config.secret_key(), self.adapter.name())
    }

    fn status(&self) -> ConnectionStatus {
        self.status
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn rate_limit_status(&self) -> RateLimitStatus {
        RateLimitStatus {
            remaining: self.limiter.remaining(),
            wait_time: self.limiter.wait_time(),
        }
    }

    async fn test_connection(&self) -> ApiResponse<()> {
        let response = self.get_server_time().await;
        match response.error() {
            None => self.update_status(|status| {
                status.connected = true;
                if !status.authenticated {
                    status.state = ConnectionState::Connected;
                }
                status.last_ping = Some(chrono::Utc::now().timestamp_millis());
                status.error = None;
            }),
            Some(error) => self.record_probe_failure(error),
        }
        response.map(|_| ())
    }

    async fn test_auth(&self) -> ApiResponse<()> {
        let response = self.get_balances().await;
        match response.error() {
            None => self.update_status(|status| {
                status.state = ConnectionState::Authenticated;
                status.connected = true;
                status.authenticated = true;
                status.last_ping = Some(chrono::Utc::now().timestamp_millis());
                status.error = None;
            }),
            Some(error) => self.record_probe_failure(error),
        }
        response.map(|_| ())
    }
}

//! Validate a buy-now order and forward it to the order server.

use std::time::Duration;

use reqwest::{Client, Method};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::BuyNowConfig;
use crate::error::{BuyNowError, BuyNowResult};

/// An incoming request as the endpoint sees it.
#[derive(Debug, Clone)]
pub struct BuyNowEvent {
    pub method: Method,
    /// Raw body. `None` and `""` both mean "no fields".
    pub body: Option<String>,
}

impl BuyNowEvent {
    pub fn post(body: impl Into<String>) -> Self {
        Self {
            method: Method::POST,
            body: Some(body.into()),
        }
    }
}

/// What the endpoint answers with.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

impl HandlerResponse {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body_string(&self) -> String {
        self.body.to_string()
    }
}

/// Forwards validated orders to `{upstream}/buy-now`.
#[derive(Debug, Clone)]
pub struct BuyNowProxy {
    client: Client,
    upstream: String,
}

impl BuyNowProxy {
    pub fn new(config: &BuyNowConfig) -> BuyNowResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BuyNowError::Config {
                message: format!("failed to create HTTP client: {}", e),
            })?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: &BuyNowConfig) -> Self {
        Self {
            client,
            upstream: config.buy_now_url(),
        }
    }

    pub fn upstream(&self) -> &str {
        &self.upstream
    }

    /// Handle one request. Never fails: every error becomes a JSON response.
    pub async fn handle(&self, event: BuyNowEvent) -> HandlerResponse {
        match self.forward(event).await {
            Ok(response) => response,
            Err(e) => {
                if e.status() >= 500 {
                    warn!(error = %e, "buy-now failed");
                } else {
                    debug!(error = %e, "buy-now rejected");
                }
                e.into_response()
            }
        }
    }

    async fn forward(&self, event: BuyNowEvent) -> BuyNowResult<HandlerResponse> {
        if event.method != Method::POST {
            return Err(BuyNowError::MethodNotAllowed);
        }

        let amount = parse_amount(event.body.as_deref())?;
        info!(amount = %amount, upstream = %self.upstream, "forwarding buy-now order");

        let response = self
            .client
            .post(&self.upstream)
            .json(&json!({ "amountUSD": amount }))
            .send()
            .await?;

        let ok = response.status().is_success();
        let upstream_status = response.status().as_u16();
        let body: Value = response.json().await?;

        info!(upstream_status, "buy-now order answered");

        Ok(HandlerResponse {
            status: if ok { 200 } else { 500 },
            headers: cors_headers(),
            body,
        })
    }
}

fn cors_headers() -> Vec<(String, String)> {
    vec![
        ("Content-Type".to_string(), "application/json".to_string()),
        ("Access-Control-Allow-Origin".to_string(), "*".to_string()),
        (
            "Access-Control-Allow-Headers".to_string(),
            "Content-Type".to_string(),
        ),
    ]
}

/// Pull `amountUSD` out of the raw body, forwarding the value as given.
fn parse_amount(body: Option<&str>) -> BuyNowResult<Value> {
    let raw = match body {
        Some(b) if !b.trim().is_empty() => b,
        _ => "{}",
    };
    let parsed: Value = serde_json::from_str(raw).map_err(|_| BuyNowError::InvalidBody)?;

    match parsed.get("amountUSD") {
        Some(amount) if is_truthy(amount) => Ok(amount.clone()),
        _ => Err(BuyNowError::MissingAmount),
    }
}

/// `null`, `false`, `0` and `""` count as absent.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

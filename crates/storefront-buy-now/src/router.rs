//! HTTP surface: mounts the buy-now handler on an axum router.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::error::{BuyNowError, BuyNowResult};
use crate::handler::{BuyNowEvent, BuyNowProxy, HandlerResponse};

/// Path the storefront page posts orders to.
pub const BUY_NOW_PATH: &str = "/.netlify/functions/buy-now";

/// Router answering every method on [`BUY_NOW_PATH`].
pub fn router(proxy: Arc<BuyNowProxy>) -> Router {
    Router::new()
        .route(BUY_NOW_PATH, any(buy_now))
        .with_state(proxy)
}

async fn buy_now(State(proxy): State<Arc<BuyNowProxy>>, method: Method, body: Bytes) -> Response {
    // Non-UTF-8 bodies cannot be JSON.
    let body = match String::from_utf8(body.to_vec()) {
        Ok(text) => Some(text),
        Err(_) if method == Method::POST => {
            return to_axum(BuyNowError::InvalidBody.into_response());
        }
        Err(_) => None,
    };
    to_axum(proxy.handle(BuyNowEvent { method, body }).await)
}

fn to_axum(response: HandlerResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut out = (status, response.body_string()).into_response();
    let headers = out.headers_mut();
    for (name, value) in &response.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => warn!(header = %name, "dropping unrepresentable response header"),
        }
    }
    out
}

/// Bind `addr` and serve until the task is dropped or the listener fails.
pub async fn serve(proxy: BuyNowProxy, addr: SocketAddr) -> BuyNowResult<()> {
    let listener = TcpListener::bind(addr).await.map_err(|e| BuyNowError::Config {
        message: format!("failed to bind {}: {}", addr, e),
    })?;
    let local = listener.local_addr().map_err(|e| BuyNowError::Config {
        message: e.to_string(),
    })?;
    info!(addr = %local, path = BUY_NOW_PATH, upstream = %proxy.upstream(), "buy-now endpoint listening");

    axum::serve(listener, router(Arc::new(proxy)))
        .await
        .map_err(|e| BuyNowError::Config {
            message: format!("server error: {}", e),
        })
}

//! Buy-now endpoint for the storefront.
//!
//! Accepts `POST {"amountUSD": ...}`, forwards the amount to the order
//! server's `/buy-now`, and mirrors the JSON answer back with CORS headers.
//!
//! | Request | Response |
//! |---------|----------|
//! | not `POST` | `405 {"error":"Method not allowed"}` |
//! | body not JSON | `400 {"error":"Invalid JSON body"}` |
//! | `amountUSD` missing or falsy | `400 {"error":"Missing amountUSD"}` |
//! | upstream 2xx | `200` + upstream body |
//! | upstream non-2xx | `500` + upstream body |
//! | upstream unreachable / non-JSON | `500 {"error": <message>}` |

pub mod config;
pub mod error;
pub mod handler;
pub mod router;

pub use config::{BuyNowConfig, DEFAULT_UPSTREAM_URL};
pub use error::{BuyNowError, BuyNowResult};
pub use handler::{BuyNowEvent, BuyNowProxy, HandlerResponse};
pub use router::{router, serve, BUY_NOW_PATH};

//! Error types for the buy-now endpoint.

use serde_json::json;

use crate::handler::HandlerResponse;

/// Buy-now errors. Each maps to exactly one HTTP status.
#[derive(Debug, thiserror::Error)]
pub enum BuyNowError {
    /// Anything but `POST`.
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Body is not JSON.
    #[error("Invalid JSON body")]
    InvalidBody,

    /// `amountUSD` absent or falsy.
    #[error("Missing amountUSD")]
    MissingAmount,

    /// The order server could not be reached or answered with a non-JSON body.
    #[error("{message}")]
    Upstream { message: String },

    /// Endpoint could not be set up.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl BuyNowError {
    pub fn status(&self) -> u16 {
        match self {
            Self::MethodNotAllowed => 405,
            Self::InvalidBody | Self::MissingAmount => 400,
            Self::Upstream { .. } | Self::Config { .. } => 500,
        }
    }

    /// `{ "error": <message> }` with a JSON content type.
    pub fn into_response(self) -> HandlerResponse {
        HandlerResponse {
            status: self.status(),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: json!({ "error": self.to_string() }),
        }
    }
}

impl From<reqwest::Error> for BuyNowError {
    fn from(err: reqwest::Error) -> Self {
        Self::Upstream {
            message: err.to_string(),
        }
    }
}

/// Result type for buy-now operations.
pub type BuyNowResult<T> = Result<T, BuyNowError>;

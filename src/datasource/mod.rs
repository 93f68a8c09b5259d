//! Quote sources for the current price of a security code.

use crate::domain::Decimal;
use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use tracing::warn;

pub mod mock;
pub mod yahoo;

pub use mock::MockQuoteSource;
pub use yahoo::HttpQuoteSource;

/// Source of current prices keyed by numeric security code (e.g. "2330").
#[async_trait]
pub trait QuoteSource: Send + Sync + fmt::Debug {
    /// Fetch the latest price for one code.
    async fn fetch_price(&self, code: &str) -> Result<Decimal, QuoteError>;

    /// Look up every code concurrently.
    ///
    /// Never fails as a whole: codes that could not be priced are reported in
    /// `diagnostics` and left out of `prices`.
    async fn lookup_prices(&self, codes: &BTreeSet<String>) -> QuoteLookup {
        let results = join_all(codes.iter().map(|code| async move {
            (code.clone(), self.fetch_price(code).await)
        }))
        .await;

        let mut lookup = QuoteLookup::default();
        for (code, result) in results {
            match result {
                Ok(price) => {
                    lookup.prices.insert(code, price);
                }
                Err(reason) => {
                    warn!(code = %code, error = %reason, "Quote unavailable");
                    lookup.diagnostics.push(QuoteDiagnostic { code, reason });
                }
            }
        }
        lookup
    }
}

/// Result of a batch lookup.
#[derive(Debug, Clone, Default)]
pub struct QuoteLookup {
    pub prices: HashMap<String, Decimal>,
    pub diagnostics: Vec<QuoteDiagnostic>,
}

/// A code whose price could not be obtained, and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteDiagnostic {
    pub code: String,
    #[serde(serialize_with = "serialize_reason")]
    pub reason: QuoteError,
}

fn serialize_reason<S: serde::Serializer>(reason: &QuoteError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(reason)
}

/// Error type for quote lookups.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QuoteError {
    /// Connection failure or per-call timeout
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("HTTP error {status}: {message}")]
    HttpError { status: u16, message: String },
    /// Invalid JSON or a response without a price
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Rate limited")]
    RateLimited,
    /// No listing under any venue suffix
    #[error("No quote for {0}")]
    NotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_error_display() {
        let err = QuoteError::NetworkError("connection timeout".to_string());
        assert_eq!(err.to_string(), "Network error: connection timeout");

        let err = QuoteError::HttpError {
            status: 429,
            message: "Too many requests".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP error 429: Too many requests");

        assert_eq!(QuoteError::RateLimited.to_string(), "Rate limited");
        assert_eq!(
            QuoteError::NotFound("9999".to_string()).to_string(),
            "No quote for 9999"
        );
    }

    #[test]
    fn test_diagnostic_serializes_reason_as_text() {
        let diag = QuoteDiagnostic {
            code: "2330".to_string(),
            reason: QuoteError::RateLimited,
        };
        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["code"], "2330");
        assert_eq!(json["reason"], "Rate limited");
    }
}

//! Quote client for Yahoo-chart-compatible HTTP endpoints.

use super::{QuoteError, QuoteSource};
use crate::config::DEFAULT_QUOTE_API_URL;
use crate::domain::Decimal;
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

/// Venue suffixes tried in order: main board, then OTC.
const LOOKUP_SUFFIXES: [&str; 2] = [".TW", ".TWO"];

/// Quote source backed by `{base}/v8/finance/chart/{ticker}`.
#[derive(Debug, Clone)]
pub struct HttpQuoteSource {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpQuoteSource {
    pub fn new(base_url: String, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// Create with the default Yahoo host and a 3 second timeout.
    pub fn default_url() -> Self {
        Self::new(DEFAULT_QUOTE_API_URL.to_string(), Duration::from_millis(3000))
    }

    async fn get_chart(&self, ticker: &str) -> Result<serde_json::Value, QuoteError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, ticker);
        // Retries stay within a small multiple of the per-call timeout.
        let backoff = ExponentialBackoff {
            initial_interval: Duration::from_millis(100),
            max_elapsed_time: Some(self.timeout * 2),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self
                .client
                .get(&url)
                .timeout(self.timeout)
                .send()
                .await
                .map_err(|e| backoff::Error::transient(QuoteError::NetworkError(e.to_string())))?;

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(backoff::Error::transient(QuoteError::RateLimited));
            }
            if status == StatusCode::NOT_FOUND {
                return Err(backoff::Error::permanent(QuoteError::NotFound(
                    ticker.to_string(),
                )));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(QuoteError::HttpError {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(QuoteError::HttpError {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| backoff::Error::permanent(QuoteError::ParseError(e.to_string())))
        })
        .await
    }
}

impl Default for HttpQuoteSource {
    fn default() -> Self {
        Self::default_url()
    }
}

#[async_trait]
impl QuoteSource for HttpQuoteSource {
    async fn fetch_price(&self, code: &str) -> Result<Decimal, QuoteError> {
        for suffix in LOOKUP_SUFFIXES {
            let ticker = format!("{}{}", code, suffix);
            debug!(ticker = %ticker, "Fetching quote");
            match self.get_chart(&ticker).await.and_then(|body| parse_chart(&body, &ticker)) {
                Ok(price) => return Ok(price),
                Err(QuoteError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(QuoteError::NotFound(code.to_string()))
    }
}

/// Extract `chart.result[0].meta.regularMarketPrice`.
///
/// An empty or null result (how the endpoint reports unknown tickers) maps
/// to `NotFound` so the caller moves on to the next suffix.
fn parse_chart(body: &serde_json::Value, ticker: &str) -> Result<Decimal, QuoteError> {
    let result = match body.pointer("/chart/result/0") {
        Some(result) if !result.is_null() => result,
        _ => return Err(QuoteError::NotFound(ticker.to_string())),
    };

    let price = result
        .pointer("/meta/regularMarketPrice")
        .ok_or_else(|| QuoteError::ParseError("Missing regularMarketPrice".to_string()))?;
    let number = match price {
        serde_json::Value::Number(number) => number,
        other => {
            return Err(QuoteError::ParseError(format!("Non-numeric price: {}", other)));
        }
    };

    let price = Decimal::from_str_canonical(&number.to_string())
        .map_err(|e| QuoteError::ParseError(format!("Invalid price {}: {}", number, e)))?;
    if !price.is_positive() {
        return Err(QuoteError::ParseError(format!("Non-positive price {}", price)));
    }
    Ok(price)
}

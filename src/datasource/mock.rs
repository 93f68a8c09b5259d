//! Mock quote source for testing without network calls.

use super::{QuoteError, QuoteSource};
use crate::domain::Decimal;
use async_trait::async_trait;
use std::collections::HashMap;

/// Quote source that serves predefined prices and failures.
#[derive(Debug, Clone, Default)]
pub struct MockQuoteSource {
    prices: HashMap<String, Decimal>,
    failures: HashMap<String, QuoteError>,
}

impl MockQuoteSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `price` for `code`.
    pub fn with_price(mut self, code: &str, price: Decimal) -> Self {
        self.prices.insert(code.to_string(), price);
        self
    }

    /// Fail lookups of `code` with `error`.
    pub fn with_failure(mut self, code: &str, error: QuoteError) -> Self {
        self.failures.insert(code.to_string(), error);
        self
    }
}

#[async_trait]
impl QuoteSource for MockQuoteSource {
    async fn fetch_price(&self, code: &str) -> Result<Decimal, QuoteError> {
        if let Some(error) = self.failures.get(code) {
            return Err(error.clone());
        }
        self.prices
            .get(code)
            .copied()
            .ok_or_else(|| QuoteError::NotFound(code.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[tokio::test]
    async fn test_lookup_splits_prices_and_diagnostics() {
        let source = MockQuoteSource::new()
            .with_price("2330", Decimal::from_i64(585))
            .with_failure("2317", QuoteError::RateLimited);

        let codes: BTreeSet<String> = ["2330", "2317", "9999"]
            .into_iter()
            .map(String::from)
            .collect();
        let lookup = source.lookup_prices(&codes).await;

        assert_eq!(lookup.prices.len(), 1);
        assert_eq!(lookup.prices["2330"], Decimal::from_i64(585));

        let mut failed: Vec<_> = lookup.diagnostics.iter().map(|d| d.code.as_str()).collect();
        failed.sort();
        assert_eq!(failed, vec!["2317", "9999"]);
    }

    #[tokio::test]
    async fn test_empty_lookup() {
        let lookup = MockQuoteSource::new().lookup_prices(&BTreeSet::new()).await;
        assert!(lookup.prices.is_empty());
        assert!(lookup.diagnostics.is_empty());
    }
}

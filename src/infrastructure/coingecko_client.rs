//! CoinGecko quote provider.
//!
//! One batched `simple/price` call per sync: symbols are lowercased into
//! coin ids on the way out and keyed back by upper-case symbol on the way
//! in. Ids CoinGecko does not quote simply stay absent from the result.

use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::domain::repositories::quote_provider::{QuoteError, QuoteProvider};

pub struct CoinGeckoClient {
    client: Client,
    api_base: String,
}

impl CoinGeckoClient {
    /// Build a client with the given API base and per-request timeout.
    pub fn new(api_base: &str, timeout: Duration) -> Result<Self, QuoteError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QuoteError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl QuoteProvider for CoinGeckoClient {
    fn name(&self) -> &str {
        "CoinGecko"
    }

    async fn fetch_prices(&self, symbols: &[String]) -> Result<HashMap<String, f64>, QuoteError> {
        let url = format!(
            "{}/simple/price?ids={}&vs_currencies=usd",
            self.api_base,
            ids_param(symbols)
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| QuoteError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(QuoteError::Status(status.as_u16()));
        }

        let body: HashMap<String, HashMap<String, f64>> = response
            .json()
            .await
            .map_err(|e| QuoteError::Malformed(e.to_string()))?;

        let quotes = map_quotes(symbols, &body);
        debug!("CoinGecko quoted {}/{} symbols", quotes.len(), symbols.len());
        Ok(quotes)
    }
}

/// Comma-joined lowercase coin ids for the batched call.
fn ids_param(symbols: &[String]) -> String {
    symbols
        .iter()
        .map(|s| s.to_lowercase())
        .collect::<Vec<_>>()
        .join(",")
}

/// Key the usd prices back by upper-case symbol. Entries without a usd quote
/// are dropped.
fn map_quotes(
    symbols: &[String],
    body: &HashMap<String, HashMap<String, f64>>,
) -> HashMap<String, f64> {
    let mut quotes = HashMap::new();
    for symbol in symbols {
        if let Some(price) = body
            .get(&symbol.to_lowercase())
            .and_then(|entry| entry.get("usd"))
        {
            quotes.insert(symbol.clone(), *price);
        }
    }
    quotes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_param_lowercases_and_joins() {
        let symbols = vec!["BTC".to_string(), "ETH".to_string()];
        assert_eq!(ids_param(&symbols), "btc,eth");
    }

    #[test]
    fn map_quotes_keys_by_uppercase_symbol() {
        let symbols = vec!["BTC".to_string(), "ETH".to_string()];
        let mut body = HashMap::new();
        body.insert(
            "btc".to_string(),
            HashMap::from([("usd".to_string(), 35000.0)]),
        );
        let quotes = map_quotes(&symbols, &body);
        assert_eq!(quotes.get("BTC"), Some(&35000.0));
        assert!(!quotes.contains_key("ETH"));
    }

    #[test]
    fn map_quotes_skips_entries_without_usd() {
        let symbols = vec!["BTC".to_string()];
        let mut body = HashMap::new();
        body.insert(
            "btc".to_string(),
            HashMap::from([("eur".to_string(), 32000.0)]),
        );
        assert!(map_quotes(&symbols, &body).is_empty());
    }
}

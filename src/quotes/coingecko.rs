//! CoinGecko Quote Provider
//!
//! Fetches cryptocurrency prices from the CoinGecko API.
//! - Public API: 10-30 calls/minute (no API key)
//!
//! CoinGecko reports prices as USD per unit of asset; the rate table
//! convention is units of asset per 1 USD, so every price is inverted
//! on ingest.
//!
//! API documentation: https://docs.coingecko.com/

use super::{create_client, FetchError, RateSource, RateTable};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

const BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// Fixed asset set: (CoinGecko ID, ticker symbol)
pub const SUPPORTED_ASSETS: &[(&str, &str)] = &[
    ("bitcoin", "BTC"),
    ("ethereum", "ETH"),
    ("binancecoin", "BNB"),
    ("ripple", "XRP"),
    ("cardano", "ADA"),
    ("solana", "SOL"),
    ("dogecoin", "DOGE"),
    ("litecoin", "LTC"),
];

/// Per-coin entry in the simple/price response
#[derive(Debug, Deserialize)]
struct CoinPrice {
    usd: Option<f64>,
}

/// Map a CoinGecko ID to its ticker symbol
pub fn coin_id_to_symbol(id: &str) -> Option<&'static str> {
    SUPPORTED_ASSETS
        .iter()
        .find(|(coin_id, _)| *coin_id == id)
        .map(|(_, symbol)| *symbol)
}

/// Map a ticker symbol to its CoinGecko ID
pub fn symbol_to_coin_id(symbol: &str) -> Option<&'static str> {
    let upper = symbol.to_uppercase();
    SUPPORTED_ASSETS
        .iter()
        .find(|(_, sym)| *sym == upper)
        .map(|(coin_id, _)| *coin_id)
}

/// Cryptocurrency rate source (USD-denominated prices, inverted)
pub struct CoinGeckoSource {
    base_url: String,
}

impl Default for CoinGeckoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CoinGeckoSource {
    pub fn new() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
        }
    }
}

#[async_trait]
impl RateSource for CoinGeckoSource {
    fn name(&self) -> &'static str {
        "COINGECKO"
    }

    async fn fetch(&self) -> Result<RateTable, FetchError> {
        let ids: Vec<&str> = SUPPORTED_ASSETS.iter().map(|(id, _)| *id).collect();
        let url = format!(
            "{}/simple/price?ids={}&vs_currencies=usd",
            self.base_url,
            ids.join(",")
        );
        log::debug!("Fetching {} crypto prices from CoinGecko", ids.len());

        let client = create_client()?;
        let response = client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| FetchError::Network(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("CoinGecko API error: {} - {}", status, body);
            return Err(FetchError::ProviderRejected(format!("HTTP {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Network(format!("Failed to read response: {}", e)))?;

        parse_simple_price(&body)
    }
}

/// Decode the simple/price body and invert into units-per-USD
fn parse_simple_price(body: &str) -> Result<RateTable, FetchError> {
    let data: HashMap<String, CoinPrice> = serde_json::from_str(body)
        .map_err(|e| FetchError::MalformedResponse(format!("Invalid JSON: {}", e)))?;

    let mut table = RateTable::new();
    for (id, price) in data {
        let Some(symbol) = coin_id_to_symbol(&id) else {
            continue;
        };

        let usd = price
            .usd
            .ok_or_else(|| FetchError::MalformedResponse(format!("No USD price for {}", id)))?;

        // A zero price is a provider data fault, not a division to attempt
        if usd == 0.0 {
            return Err(FetchError::MalformedResponse(format!(
                "Zero USD price for {}",
                id
            )));
        }

        table.insert(symbol, 1.0 / usd);
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_mapping() {
        assert_eq!(symbol_to_coin_id("BTC"), Some("bitcoin"));
        assert_eq!(symbol_to_coin_id("eth"), Some("ethereum"));
        assert_eq!(symbol_to_coin_id("UNKNOWN"), None);
        assert_eq!(coin_id_to_symbol("dogecoin"), Some("DOGE"));
        assert_eq!(coin_id_to_symbol("tether"), None);
    }

    #[test]
    fn test_parse_inverts_usd_prices() {
        let body = r#"{"bitcoin": {"usd": 50000.0}, "ethereum": {"usd": 2500.0}}"#;

        let table = parse_simple_price(body).unwrap();
        assert!((table.get("BTC").unwrap() - 0.00002).abs() < 1e-12);
        assert!((table.get("ETH").unwrap() - 0.0004).abs() < 1e-12);
    }

    #[test]
    fn test_parse_rejects_zero_price() {
        let body = r#"{"bitcoin": {"usd": 0.0}}"#;
        assert!(matches!(
            parse_simple_price(body),
            Err(FetchError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_parse_rejects_missing_usd_field() {
        let body = r#"{"bitcoin": {"eur": 45000.0}}"#;
        assert!(matches!(
            parse_simple_price(body),
            Err(FetchError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_parse_skips_unknown_ids() {
        let body = r#"{"bitcoin": {"usd": 50000.0}, "tether": {"usd": 1.0}}"#;

        let table = parse_simple_price(body).unwrap();
        assert!(table.contains("BTC"));
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    #[ignore] // Requires network
    async fn test_fetch_crypto_rates() {
        let source = CoinGeckoSource::new();
        let table = source.fetch().await.unwrap();
        assert!(table.get("BTC").unwrap() > 0.0);
    }
}

//! exchangerate.host Fallback Provider
//!
//! Keyless fallback for fiat rates, tried when the primary provider fails.
//! Same table shape as the primary, different field names.
//!
//! API documentation: https://exchangerate.host/#/#docs

use super::{create_client, FetchError, RateSource, RateTable};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

const BASE_URL: &str = "https://api.exchangerate.host";

/// Response of the `/latest?base=USD` endpoint
#[derive(Debug, Deserialize)]
struct LatestResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    rates: HashMap<String, f64>,
}

/// Secondary fiat rate source (USD base, no API key)
pub struct ExchangerateHostSource {
    base_url: String,
}

impl Default for ExchangerateHostSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ExchangerateHostSource {
    pub fn new() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
        }
    }
}

#[async_trait]
impl RateSource for ExchangerateHostSource {
    fn name(&self) -> &'static str {
        "EXCHANGERATE-HOST"
    }

    async fn fetch(&self) -> Result<RateTable, FetchError> {
        let url = format!("{}/latest?base=USD", self.base_url);
        log::debug!("Fetching fiat rates from {}", url);

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
            log::error!("exchangerate.host error: {} - {}", status, body);
            return Err(FetchError::ProviderRejected(format!("HTTP {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Network(format!("Failed to read response: {}", e)))?;

        parse_latest(&body)
    }
}

/// Decode the response body into a rate table
fn parse_latest(body: &str) -> Result<RateTable, FetchError> {
    let data: LatestResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::MalformedResponse(format!("Invalid JSON: {}", e)))?;

    if !data.success {
        return Err(FetchError::ProviderRejected(
            "Success flag not set".to_string(),
        ));
    }

    if data.rates.is_empty() {
        return Err(FetchError::MalformedResponse(
            "No rates in response".to_string(),
        ));
    }

    let mut table = RateTable::new();
    for (code, rate) in data.rates {
        table.insert(code, rate);
    }

    Ok(table)
}

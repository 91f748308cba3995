//! ExchangeRate-API Fiat Provider
//!
//! Ruft Fiat-Wechselkurse von exchangerate-api.com ab (v6, USD-Basis):
//! - API-Key erforderlich (freier Tier reicht für tägliche Abrufe)
//! - Antwort enthält die komplette Kurstabelle in einer Anfrage
//!
//! API documentation: https://www.exchangerate-api.com/docs

use super::{create_client, FetchError, RateSource, RateTable};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

const BASE_URL: &str = "https://v6.exchangerate-api.com/v6";

/// Antwort des `/latest/USD` Endpunkts
#[derive(Debug, Deserialize)]
struct LatestResponse {
    result: String,
    #[serde(default)]
    conversion_rates: HashMap<String, f64>,
    #[serde(rename = "error-type", default)]
    error_type: Option<String>,
}

/// Primäre Fiat-Kursquelle (USD-Basis)
pub struct ExchangeRateApiSource {
    base_url: String,
    api_key: String,
}

impl ExchangeRateApiSource {
    /// Provider erstellen; Key aus Parameter oder `EXCHANGERATE_API_KEY`
    pub fn new(api_key: Option<String>) -> Self {
        let api_key = api_key
            .or_else(|| std::env::var("EXCHANGERATE_API_KEY").ok())
            .unwrap_or_default();

        Self {
            base_url: BASE_URL.to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl RateSource for ExchangeRateApiSource {
    fn name(&self) -> &'static str {
        "EXCHANGERATE-API"
    }

    async fn fetch(&self) -> Result<RateTable, FetchError> {
        if self.api_key.is_empty() {
            return Err(FetchError::ProviderRejected(
                "ExchangeRate-API key required".to_string(),
            ));
        }

        let url = format!("{}/{}/latest/USD", self.base_url, self.api_key);
        log::debug!("Fetching fiat rates from exchangerate-api.com");

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
            log::error!("ExchangeRate-API error: {} - {}", status, body);
            return Err(FetchError::ProviderRejected(format!("HTTP {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Network(format!("Failed to read response: {}", e)))?;

        parse_latest(&body)
    }
}

/// JSON-Antwort in eine Kurstabelle umsetzen
fn parse_latest(body: &str) -> Result<RateTable, FetchError> {
    let data: LatestResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::MalformedResponse(format!("Invalid JSON: {}", e)))?;

    if data.result != "success" {
        let reason = data.error_type.unwrap_or(data.result);
        return Err(FetchError::ProviderRejected(reason));
    }

    if data.conversion_rates.is_empty() {
        return Err(FetchError::MalformedResponse(
            "No conversion rates in response".to_string(),
        ));
    }

    let mut table = RateTable::new();
    for (code, rate) in data.conversion_rates {
        table.insert(code, rate);
    }

    Ok(table)
}

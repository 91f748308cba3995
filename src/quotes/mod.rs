//! Rate Provider Framework
//!
//! Erweiterbare Architektur für verschiedene Kursquellen:
//! - ExchangeRate-API (Fiat-Wechselkurse, USD-Basis - API-Key erforderlich)
//! - exchangerate.host (Fiat-Wechselkurse - Fallback, kein Key)
//! - CoinGecko (Kryptowährungen)
//!
//! Jede Quelle liefert eine partielle [`RateTable`] oder einen typisierten
//! [`FetchError`]; die Priorisierung und das Zusammenführen übernimmt der
//! Aggregator in `crate::rates`.

pub mod coingecko;
pub mod exchangerate_api;
pub mod exchangerate_host;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Request-Timeout für alle Provider
const FETCH_TIMEOUT_SECS: u64 = 10;

/// Fehler beim Abruf einer Kursquelle
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("provider rejected request: {0}")]
    ProviderRejected(String),
}

/// Kurstabelle: Währungs-/Asset-Code → Einheiten pro 1 USD
///
/// Invariante: jeder gespeicherte Kurs ist strikt positiv.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RateTable {
    rates: HashMap<String, f64>,
}

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kurs eintragen; nicht-positive oder nicht-endliche Werte werden verworfen
    pub fn insert(&mut self, code: impl Into<String>, rate: f64) {
        let code = code.into();
        if rate.is_finite() && rate > 0.0 {
            self.rates.insert(code, rate);
        } else {
            log::warn!("Dropping invalid rate for {}: {}", code, rate);
        }
    }

    pub fn get(&self, code: &str) -> Option<f64> {
        self.rates.get(code).copied()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.rates.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.rates.keys().map(|s| s.as_str())
    }

    /// Tabelle einmischen; bei Code-Kollision gewinnt der Eintrag aus `other`
    pub fn merge(&mut self, other: RateTable) {
        self.rates.extend(other.rates);
    }
}

/// Gemeinsame Fähigkeit aller Kursquellen
///
/// Ein Abruf ist zustandslos gegenüber dem Programm: eine HTTP-Anfrage mit
/// Timeout, Ergebnis oder Fehler, kein geteilter Zustand.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Anzeigename des Providers
    fn name(&self) -> &'static str;

    /// Aktuelle Kurse abrufen
    async fn fetch(&self) -> Result<RateTable, FetchError>;
}

/// HTTP-Client mit Timeout erstellen
pub(crate) fn create_client() -> Result<reqwest::Client, FetchError> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(FETCH_TIMEOUT_SECS))
        .build()
        .map_err(|e| FetchError::Network(format!("Failed to create HTTP client: {}", e)))
}

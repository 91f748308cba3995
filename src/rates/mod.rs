//! Rate aggregation
//!
//! Orchestriert die Kursquellen in Prioritätsreihenfolge und führt die
//! Ergebnisse zu einem konsistenten Snapshot zusammen:
//! - Fiat-Tier: erste erfolgreiche Quelle gewinnt (primär, dann Fallback)
//! - Krypto-Tier: wird in eine lebende Fiat-Basis eingemischt
//! - Statische Offline-Tabelle, wenn alle Fiat-Quellen ausfallen
//!
//! Der Snapshot wird bei jedem Refresh als Ganzes ersetzt; Leser halten
//! einen `Arc` und sehen nie eine halb zusammengeführte Tabelle.

use crate::quotes::{coingecko, exchangerate_api, exchangerate_host, RateSource, RateTable};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Unterstützte Fiat-Währungen
pub const SUPPORTED_CURRENCIES: &[&str] = &[
    "USD", "EUR", "GBP", "RUB", "JPY", "CNY", "AUD", "CAD", "CHF", "NZD", "BRL", "INR", "ZAR",
    "MXN", "SGD", "HKD", "KRW", "TRY", "NOK", "SEK",
];

/// Static fallback rates, used only when no fiat provider is reachable
static OFFLINE_RATES: Lazy<RateTable> = Lazy::new(|| {
    let mut table = RateTable::new();
    for &(code, rate) in &[
        ("USD", 1.0),
        ("EUR", 0.93),
        ("GBP", 0.80),
        ("RUB", 90.0),
        ("JPY", 150.0),
        ("CNY", 7.20),
        ("AUD", 1.50),
        ("CAD", 1.35),
        ("CHF", 0.90),
        ("NZD", 1.65),
        ("BRL", 5.20),
        ("INR", 83.0),
        ("ZAR", 18.5),
        ("MXN", 17.0),
        ("SGD", 1.35),
        ("HKD", 7.80),
        ("KRW", 1350.0),
        ("TRY", 32.0),
        ("NOK", 10.5),
        ("SEK", 10.8),
        ("BTC", 0.000014),
        ("ETH", 0.00027),
        ("BNB", 0.0015),
        ("XRP", 1.92),
        ("ADA", 2.22),
        ("SOL", 0.006),
        ("DOGE", 6.25),
        ("LTC", 0.012),
    ] {
        table.insert(code, rate);
    }
    table
});

/// Die statische Offline-Tabelle (deckt alle unterstützten Codes ab)
pub fn offline_table() -> &'static RateTable {
    &OFFLINE_RATES
}

/// All codes offered to the presentation layer (fiat + crypto)
pub fn supported_codes() -> Vec<&'static str> {
    SUPPORTED_CURRENCIES
        .iter()
        .copied()
        .chain(coingecko::SUPPORTED_ASSETS.iter().map(|(_, symbol)| *symbol))
        .collect()
}

pub fn is_supported(code: &str) -> bool {
    supported_codes().iter().any(|&c| c == code)
}

/// Case-insensitive substring filter over the supported codes.
///
/// Returns the full list when nothing matches; the selection widget falls
/// back to it instead of going empty.
pub fn search_codes(term: &str) -> Vec<&'static str> {
    let term = term.trim().to_uppercase();
    if term.is_empty() {
        return supported_codes();
    }

    let filtered: Vec<&'static str> = supported_codes()
        .into_iter()
        .filter(|code| code.contains(term.as_str()))
        .collect();

    if filtered.is_empty() {
        supported_codes()
    } else {
        filtered
    }
}

/// Fehler bei Kursauflösung und Konvertierung
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RateError {
    #[error("unknown currency: {0}")]
    UnknownCurrency(String),
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}

/// Ob ein Snapshot von lebenden Quellen stammt oder aus dem Fallback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Freshness {
    Live,
    Offline,
}

/// Konsistente Kurstabelle mit Zeitstempel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateSnapshot {
    pub table: RateTable,
    pub timestamp: Option<DateTime<Utc>>,
    pub freshness: Freshness,
}

impl RateSnapshot {
    /// Snapshot aus lebenden Quellen, gestempelt mit jetzt
    pub fn live(table: RateTable) -> Self {
        Self {
            table,
            timestamp: Some(Utc::now()),
            freshness: Freshness::Live,
        }
    }

    /// Snapshot aus der statischen Offline-Tabelle
    pub fn offline() -> Self {
        Self {
            table: offline_table().clone(),
            timestamp: None,
            freshness: Freshness::Offline,
        }
    }

    pub fn is_live(&self) -> bool {
        self.freshness == Freshness::Live
    }

    /// Kurs für einen Code; typisierter Fehler, wenn er fehlt
    pub fn rate(&self, code: &str) -> Result<f64, RateError> {
        self.table
            .get(code)
            .ok_or_else(|| RateError::UnknownCurrency(code.to_string()))
    }

    /// Label neben Konvertierungsergebnissen ("offline" für den Fallback)
    pub fn timestamp_label(&self) -> String {
        match self.timestamp {
            Some(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => "offline".to_string(),
        }
    }
}

/// Orchestriert die Quellen und besitzt den aktuellen Snapshot
pub struct RateAggregator {
    fiat_sources: Vec<Box<dyn RateSource>>,
    crypto_sources: Vec<Box<dyn RateSource>>,
    snapshot: RwLock<Arc<RateSnapshot>>,
}

impl RateAggregator {
    /// Standard-Verdrahtung: exchangerate-api.com, exchangerate.host, CoinGecko
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_sources(
            vec![
                Box::new(exchangerate_api::ExchangeRateApiSource::new(api_key)),
                Box::new(exchangerate_host::ExchangerateHostSource::new()),
            ],
            vec![Box::new(coingecko::CoinGeckoSource::new())],
        )
    }

    /// Eigene Quellen-Verdrahtung (Tests, alternative Deployments)
    pub fn with_sources(
        fiat_sources: Vec<Box<dyn RateSource>>,
        crypto_sources: Vec<Box<dyn RateSource>>,
    ) -> Self {
        Self {
            fiat_sources,
            crypto_sources,
            snapshot: RwLock::new(Arc::new(RateSnapshot::offline())),
        }
    }

    /// Aktueller Snapshot (billiger Arc-Clone)
    pub fn snapshot(&self) -> Arc<RateSnapshot> {
        self.snapshot
            .read()
            .expect("snapshot lock poisoned")
            .clone()
    }

    /// Alle Tiers abfragen und einen neuen Snapshot installieren
    ///
    /// Quellfehler werden hier vollständig absorbiert; der einzige nach
    /// außen sichtbare Fehlerzustand ist `Freshness::Offline`.
    pub async fn refresh(&self) -> Arc<RateSnapshot> {
        let snapshot = Arc::new(self.build_snapshot().await);
        *self.snapshot.write().expect("snapshot lock poisoned") = snapshot.clone();
        snapshot
    }

    async fn build_snapshot(&self) -> RateSnapshot {
        let Some(mut table) = fetch_first(&self.fiat_sources).await else {
            log::warn!("All fiat sources failed, falling back to offline rates");
            return RateSnapshot::offline();
        };

        // Krypto-Ausfall ist nicht fatal; die Fiat-Tabelle allein bleibt live
        if let Some(crypto) = fetch_first(&self.crypto_sources).await {
            table.merge(crypto);
        }

        log::info!("Refreshed {} live rates", table.len());
        RateSnapshot::live(table)
    }
}

/// Quellen in Prioritätsreihenfolge abfragen; erster Erfolg gewinnt
async fn fetch_first(sources: &[Box<dyn RateSource>]) -> Option<RateTable> {
    for source in sources {
        match source.fetch().await {
            Ok(table) if !table.is_empty() => {
                log::debug!("{} returned {} rates", source.name(), table.len());
                return Some(table);
            }
            Ok(_) => log::warn!("{} returned an empty table", source.name()),
            Err(e) => log::warn!("{} failed: {}", source.name(), e),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quotes::FetchError;
    use async_trait::async_trait;

    struct StaticSource {
        name: &'static str,
        result: Result<RateTable, FetchError>,
    }

    #[async_trait]
    impl RateSource for StaticSource {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn fetch(&self) -> Result<RateTable, FetchError> {
            self.result.clone()
        }
    }

    fn table(pairs: &[(&str, f64)]) -> RateTable {
        let mut t = RateTable::new();
        for &(code, rate) in pairs {
            t.insert(code, rate);
        }
        t
    }

    fn ok_source(name: &'static str, pairs: &[(&str, f64)]) -> Box<dyn RateSource> {
        Box::new(StaticSource {
            name,
            result: Ok(table(pairs)),
        })
    }

    fn failing_source(name: &'static str) -> Box<dyn RateSource> {
        Box::new(StaticSource {
            name,
            result: Err(FetchError::Network("connection refused".to_string())),
        })
    }

    #[tokio::test]
    async fn test_refresh_uses_primary_fiat_source() {
        let aggregator = RateAggregator::with_sources(
            vec![
                ok_source("PRIMARY", &[("USD", 1.0), ("EUR", 0.93)]),
                ok_source("FALLBACK", &[("USD", 1.0), ("EUR", 0.5)]),
            ],
            vec![failing_source("CRYPTO")],
        );

        let snapshot = aggregator.refresh().await;
        assert_eq!(snapshot.freshness, Freshness::Live);
        assert_eq!(snapshot.table.get("EUR"), Some(0.93));
        assert_eq!(snapshot.table.get("USD"), Some(1.0));
    }

    #[tokio::test]
    async fn test_refresh_falls_back_to_secondary_fiat_source() {
        let aggregator = RateAggregator::with_sources(
            vec![
                failing_source("PRIMARY"),
                ok_source("FALLBACK", &[("USD", 1.0), ("EUR", 0.5)]),
            ],
            vec![failing_source("CRYPTO")],
        );

        let snapshot = aggregator.refresh().await;
        assert!(snapshot.is_live());
        assert_eq!(snapshot.table.get("EUR"), Some(0.5));
    }

    #[tokio::test]
    async fn test_refresh_goes_offline_when_all_fiat_sources_fail() {
        // Crypto success must not rescue a missing fiat base
        let aggregator = RateAggregator::with_sources(
            vec![failing_source("PRIMARY"), failing_source("FALLBACK")],
            vec![ok_source("CRYPTO", &[("BTC", 0.00002)])],
        );

        let snapshot = aggregator.refresh().await;
        assert_eq!(snapshot.freshness, Freshness::Offline);
        assert_eq!(snapshot.table, *offline_table());
        assert_eq!(snapshot.timestamp_label(), "offline");
    }

    #[tokio::test]
    async fn test_crypto_failure_keeps_fiat_table_live() {
        let aggregator = RateAggregator::with_sources(
            vec![ok_source("PRIMARY", &[("USD", 1.0), ("EUR", 0.93)])],
            vec![failing_source("CRYPTO")],
        );

        let snapshot = aggregator.refresh().await;
        assert!(snapshot.is_live());
        assert!(snapshot.timestamp.is_some());
        assert!(!snapshot.table.contains("BTC"));
    }

    #[tokio::test]
    async fn test_crypto_entries_overwrite_fiat_on_collision() {
        let aggregator = RateAggregator::with_sources(
            vec![ok_source("PRIMARY", &[("USD", 1.0), ("BTC", 1.0)])],
            vec![ok_source("CRYPTO", &[("BTC", 0.00002)])],
        );

        let snapshot = aggregator.refresh().await;
        assert_eq!(snapshot.table.get("BTC"), Some(0.00002));
    }

    #[tokio::test]
    async fn test_snapshot_starts_offline_before_first_refresh() {
        let aggregator = RateAggregator::with_sources(vec![], vec![]);
        let snapshot = aggregator.snapshot();
        assert_eq!(snapshot.freshness, Freshness::Offline);
        assert_eq!(snapshot.table, *offline_table());
    }

    #[test]
    fn test_offline_table_covers_all_supported_codes() {
        for code in supported_codes() {
            assert!(
                offline_table().get(code).is_some(),
                "Missing offline rate for {}",
                code
            );
        }
        assert_eq!(offline_table().get("USD"), Some(1.0));
    }

    #[test]
    fn test_search_codes() {
        assert_eq!(search_codes("BT"), vec!["BTC"]);
        assert_eq!(search_codes("usd"), vec!["USD"]);
        assert!(search_codes("U").contains(&"AUD"));

        // No match and empty input fall back to the full list
        assert_eq!(search_codes("QQQ").len(), supported_codes().len());
        assert_eq!(search_codes("  ").len(), supported_codes().len());
    }

    #[test]
    fn test_is_supported() {
        assert!(is_supported("EUR"));
        assert!(is_supported("DOGE"));
        assert!(!is_supported("XYZ"));
    }
}

//! Synthetic rate history
//!
//! No historical rate API is integrated; chart data is a simulated series
//! anchored on the current cross rate. Walking backward from today, each
//! earlier point is the later point perturbed by bounded multiplicative
//! noise. Callers must treat the output as a placeholder for display, not
//! as historical truth.

use crate::rates::{RateError, RateSnapshot};
use chrono::{Duration, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Number of simulated days in a series
pub const SERIES_DAYS: usize = 30;

/// Relative bound of the daily perturbation
const DAILY_NOISE: f64 = 0.02;

/// One simulated day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub rate: f64,
}

/// Simulated 30-day series for a currency pair, in ascending date order,
/// ending today with the exact current cross rate
pub fn synthesize(
    from: &str,
    to: &str,
    snapshot: &RateSnapshot,
) -> Result<Vec<SeriesPoint>, RateError> {
    let anchor = snapshot.rate(to)? / snapshot.rate(from)?;
    let today = Utc::now().date_naive();
    Ok(random_walk(anchor, today, &mut rand::thread_rng()))
}

/// Walk backward from the anchor one simulated day at a time, then reverse
/// into ascending date order
fn random_walk(anchor: f64, today: NaiveDate, rng: &mut impl Rng) -> Vec<SeriesPoint> {
    let mut points = Vec::with_capacity(SERIES_DAYS);
    points.push(SeriesPoint {
        date: today,
        rate: anchor,
    });

    for i in 1..SERIES_DAYS {
        let next_rate = points[i - 1].rate;
        let noise: f64 = rng.gen_range(-DAILY_NOISE..DAILY_NOISE);
        points.push(SeriesPoint {
            date: today - Duration::days(i as i64),
            rate: next_rate * (1.0 + noise),
        });
    }

    points.reverse();
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quotes::RateTable;
    use crate::rates::Freshness;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn snapshot(pairs: &[(&str, f64)]) -> RateSnapshot {
        let mut table = RateTable::new();
        for &(code, rate) in pairs {
            table.insert(code, rate);
        }
        RateSnapshot {
            table,
            timestamp: None,
            freshness: Freshness::Offline,
        }
    }

    #[test]
    fn test_series_shape() {
        let snap = snapshot(&[("USD", 1.0), ("EUR", 0.9)]);
        let series = synthesize("USD", "EUR", &snap).unwrap();

        assert_eq!(series.len(), SERIES_DAYS);
        for window in series.windows(2) {
            assert_eq!(window[1].date, window[0].date + Duration::days(1));
        }
        for point in &series {
            assert!(point.rate > 0.0);
        }
    }

    #[test]
    fn test_series_ends_with_exact_cross_rate() {
        let snap = snapshot(&[("USD", 1.0), ("EUR", 0.9), ("BTC", 0.00002)]);
        let series = synthesize("BTC", "EUR", &snap).unwrap();

        let anchor = 0.9 / 0.00002;
        assert_eq!(series.last().unwrap().rate, anchor);
        assert_eq!(series.last().unwrap().date, Utc::now().date_naive());
    }

    #[test]
    fn test_unknown_currency() {
        let snap = snapshot(&[("USD", 1.0)]);
        assert!(matches!(
            synthesize("USD", "XYZ", &snap),
            Err(RateError::UnknownCurrency(_))
        ));
    }

    #[test]
    fn test_walk_is_bounded_and_deterministic_per_seed() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();

        let a = random_walk(1.25, today, &mut StdRng::seed_from_u64(7));
        let b = random_walk(1.25, today, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);

        // Each step stays within the ±2% band of its successor
        for window in a.windows(2) {
            let step = window[0].rate / window[1].rate;
            assert!((step - 1.0).abs() <= DAILY_NOISE + 1e-12);
        }
        assert_eq!(a.last().unwrap().rate, 1.25);
        assert_eq!(a.first().unwrap().date, today - Duration::days(29));
    }
}

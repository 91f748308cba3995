//! Exchange rate aggregation and currency conversion core.
//!
//! The presentation layer drives three operations:
//! - [`rates::RateAggregator::refresh`] - query the providers in priority
//!   order and install a consistent snapshot
//! - [`currency::convert`] - USD-pivot conversion against a snapshot
//! - [`history::synthesize`] - simulated 30-day series for a pair

pub mod currency;
pub mod history;
pub mod quotes;
pub mod rates;

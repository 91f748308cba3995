//! Currency conversion module
//!
//! Converts amounts between any two supported codes by routing through
//! the USD pivot of the aggregated rate table:
//! - `usd = amount / rate(from)`
//! - `converted = usd * rate(to)`
//!
//! Rounding and display precision are presentation concerns; results keep
//! full floating-point precision.

use crate::rates::{RateError, RateSnapshot};
use serde::{Deserialize, Serialize};

/// Conversion request as received from the presentation layer.
///
/// The amount arrives as raw user input and is validated here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRequest {
    pub amount: String,
    pub from: String,
    pub to: String,
}

/// Successful conversion, stamped with the snapshot it was computed from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    pub amount: f64,
    pub from: String,
    pub to: String,
    pub converted_amount: f64,
    pub snapshot_timestamp: String,
}

/// Convert a request against a snapshot
pub fn convert(
    request: &ConversionRequest,
    snapshot: &RateSnapshot,
) -> Result<ConversionResult, RateError> {
    let amount = parse_amount(&request.amount)?;
    let converted_amount = convert_amount(amount, &request.from, &request.to, snapshot)?;

    Ok(ConversionResult {
        amount,
        from: request.from.clone(),
        to: request.to.clone(),
        converted_amount,
        snapshot_timestamp: snapshot.timestamp_label(),
    })
}

/// Pivot conversion for an already validated amount
pub fn convert_amount(
    amount: f64,
    from: &str,
    to: &str,
    snapshot: &RateSnapshot,
) -> Result<f64, RateError> {
    let usd = amount / snapshot.rate(from)?;
    Ok(usd * snapshot.rate(to)?)
}

/// Parse the raw amount input; rejects non-numeric and non-finite values
fn parse_amount(input: &str) -> Result<f64, RateError> {
    let value: f64 = input
        .trim()
        .parse()
        .map_err(|_| RateError::InvalidAmount(input.to_string()))?;

    if !value.is_finite() {
        return Err(RateError::InvalidAmount(input.to_string()));
    }

    Ok(value)
}

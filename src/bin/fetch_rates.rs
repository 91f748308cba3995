//! Diagnostic binary: refresh the rate table against the live providers
//!
//! Run with: cargo run --bin fetch_rates

use anyhow::Result;
use currency_now::currency::{self, ConversionRequest};
use currency_now::rates::RateAggregator;

#[tokio::main]
async fn main() -> Result<()> {
    let aggregator = RateAggregator::new(None);

    println!("=== Refreshing Rates ===\n");
    let snapshot = aggregator.refresh().await;

    println!("Freshness: {:?}", snapshot.freshness);
    println!("Updated: {}", snapshot.timestamp_label());
    println!("Rates: {}\n", snapshot.table.len());

    let mut codes: Vec<&str> = snapshot.table.codes().collect();
    codes.sort_unstable();
    for code in codes {
        if let Some(rate) = snapshot.table.get(code) {
            println!("  {:<5} {}", code, rate);
        }
    }

    println!("\n=== Sample Conversion ===");
    let request = ConversionRequest {
        amount: "100".to_string(),
        from: "USD".to_string(),
        to: "EUR".to_string(),
    };
    let result = currency::convert(&request, &snapshot)?;
    println!(
        "{} {} = {} {} (updated: {})",
        result.amount, result.from, result.converted_amount, result.to, result.snapshot_timestamp
    );

    Ok(())
}

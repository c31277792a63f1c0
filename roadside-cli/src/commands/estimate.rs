//! Estimate command - price a service from the fee schedule

use anyhow::{bail, Result};
use colored::Colorize;
use rust_decimal::Decimal;
use serde_json::json;

use super::get_context;
use crate::output;

pub async fn run(service: &str, km: Decimal, json: bool) -> Result<()> {
    if km.is_sign_negative() {
        bail!("Distance cannot be negative");
    }

    let ctx = get_context()?;
    let fees = ctx.access.fee_schedule().await?;
    let total = fees.estimate(service, km)?;

    if json {
        return output::print_json(&json!({
            "service": service,
            "distanceKm": km,
            "total": total,
            "currency": fees.currency,
        }));
    }

    println!(
        "Estimated total: {}",
        format!("{} {}", total.round_dp(2), fees.currency).bold()
    );
    println!("  {} call-out + {} per km", fees.callout_fee, fees.per_km);
    output::info("Estimates are for reference only; the mechanic confirms the final price.");
    Ok(())
}

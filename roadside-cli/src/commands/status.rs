//! Status command - backend mode, session and fee schedule

use anyhow::Result;
use colored::Colorize;
use comfy_table::{ContentArrangement, Table};
use roadside_core::services::notifications_supported;
use roadside_core::{FeeSchedule, Mode, User};
use serde::Serialize;

use super::{boot, get_context};
use crate::output;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusReport {
    mode: Mode,
    supabase_configured: bool,
    profile_dir: String,
    user: Option<User>,
    boot_error: Option<String>,
    notifications_supported: bool,
    fees: FeeSchedule,
}

pub async fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let state = boot(&ctx).await;
    let fees = ctx.access.fee_schedule().await?;

    let report = StatusReport {
        mode: ctx.access.mode(),
        supabase_configured: ctx.access.is_supabase_configured(),
        profile_dir: ctx.dir.display().to_string(),
        user: state.user,
        boot_error: state.boot_error,
        notifications_supported: notifications_supported(),
        fees,
    };

    if json {
        return output::print_json(&report);
    }

    println!("{}", "Roadside Assistance".bold());
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let mode = match report.mode {
        Mode::Mock => "mock (local storage)".yellow().to_string(),
        Mode::Hosted => "hosted".green().to_string(),
    };
    table.add_row(vec!["Backend".to_string(), mode]);
    table.add_row(vec!["Profile".to_string(), report.profile_dir.clone()]);

    let signed_in = match &report.user {
        Some(user) => format!("{} ({})", user.email, user.role),
        None => "not signed in".dimmed().to_string(),
    };
    table.add_row(vec!["Signed in".to_string(), signed_in]);
    table.add_row(vec![
        "Notifications".to_string(),
        if report.notifications_supported { "on" } else { "not available" }.to_string(),
    ]);

    println!("{}", table);
    println!();

    println!("{}", "Service Fees".bold());
    let mut fees = output::create_table();
    fees.set_header(vec!["Service", "Price"]);
    fees.add_row(vec![
        "Call-out".to_string(),
        format!("{} {}", report.fees.callout_fee, report.fees.currency),
    ]);
    for fee in &report.fees.services {
        fees.add_row(vec![
            fee.service.clone(),
            format!("{} {}", fee.price, report.fees.currency),
        ]);
    }
    fees.add_row(vec![
        "Towing, per km".to_string(),
        format!("{} {}", report.fees.per_km, report.fees.currency),
    ]);
    println!("{}", fees);

    if report.mode == Mode::Mock && report.user.is_none() {
        println!();
        output::info(
            "Demo accounts: user@demo.test, mechanic@demo.test, admin@demo.test (password demo1234)",
        );
    }

    Ok(())
}

//! Logs command - inspect and prune the local event log

use anyhow::Result;
use chrono::{Duration, Local, TimeZone, Utc};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;
use roadside_core::services::LogFilter;
use roadside_core::{EntryPoint, LoggingService};
use serde_json::json;

use super::get_roadside_dir;
use crate::output;

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show recent log entries
    List {
        /// Number of entries to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Show only errors
        #[arg(long, conflicts_with = "event")]
        errors: bool,
        /// Show only one event, e.g. boot_failed
        #[arg(long)]
        event: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete old log entries
    Clear {
        /// Delete logs older than N days
        #[arg(long, default_value = "30")]
        older_than_days: i64,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show log statistics and database path
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn open_log() -> Result<LoggingService> {
    let dir = get_roadside_dir()?;
    std::fs::create_dir_all(&dir)?;
    LoggingService::new(&dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))
}

fn format_timestamp(timestamp_ms: i64) -> String {
    Local
        .timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp_ms.to_string())
}

pub fn run(command: LogsCommands) -> Result<()> {
    match command {
        LogsCommands::List {
            limit,
            errors,
            event,
            json,
        } => {
            let filter = match event {
                Some(name) => LogFilter::Event(name),
                None if errors => LogFilter::Errors,
                None => LogFilter::All,
            };
            list(&filter, limit, json)
        }
        LogsCommands::Clear {
            older_than_days,
            force,
            json,
        } => clear(older_than_days, force, json),
        LogsCommands::Stats { json } => stats(json),
    }
}

fn list(filter: &LogFilter, limit: usize, json: bool) -> Result<()> {
    let service = open_log()?;
    let entries = service.query(filter, limit)?;

    if json {
        return output::print_json(&entries);
    }

    if entries.is_empty() {
        println!("No log entries found.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Time", "Entry", "Event", "Mode", "Command", "Error"]);
    for entry in &entries {
        let error = match &entry.error_message {
            Some(message) => message.red().to_string(),
            None => String::new(),
        };
        table.add_row(vec![
            format_timestamp(entry.timestamp),
            entry.entry_point.clone(),
            entry.event.clone(),
            entry.mode.clone().unwrap_or_default(),
            entry.command.clone().unwrap_or_default(),
            error,
        ]);
    }
    println!("{}", table);

    if *filter == LogFilter::All {
        let recent_errors = service.get_errors(3)?;
        if !recent_errors.is_empty() {
            println!();
            println!("{}", "Recent Errors:".red().bold());
            for err in &recent_errors {
                println!(
                    "  {} [{}]: {}",
                    format_timestamp(err.timestamp).dimmed(),
                    err.event,
                    err.error_message.as_deref().unwrap_or("Unknown error")
                );
                if let Some(details) = &err.error_details {
                    println!("    {}", details.dimmed());
                }
            }
        }
    }
    Ok(())
}

fn clear(older_than_days: i64, force: bool, json: bool) -> Result<()> {
    let service = open_log()?;
    let cutoff_ms = (Utc::now() - Duration::days(older_than_days.max(0))).timestamp_millis();

    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete logs older than {} days?", older_than_days))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let deleted = service.delete_before(cutoff_ms)?;
    if json {
        println!("{}", json!({ "deleted": deleted }));
    } else {
        println!("Deleted {} log entries", deleted);
    }
    Ok(())
}

fn stats(json: bool) -> Result<()> {
    let service = open_log()?;
    let total = service.count()?;
    let errors = service.error_count()?;
    let db_path = service.db_path().to_path_buf();
    let size_bytes = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    if json {
        return output::print_json(&json!({
            "total_entries": total,
            "error_count": errors,
            "database_path": db_path.to_string_lossy(),
            "database_size_bytes": size_bytes,
        }));
    }

    println!("{}", "Log Statistics".bold());
    println!("  Total entries: {}", total);
    println!("  Errors: {}", errors);
    println!("  Database: {}", db_path.display());
    println!("  Size: {}", output::format_size(size_bytes));
    Ok(())
}

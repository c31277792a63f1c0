//! Request commands - submit, list, show, clear

use anyhow::{bail, Result};
use chrono::Local;
use clap::Subcommand;
use colored::Colorize;
use dialoguer::{Confirm, Input};
use roadside_core::domain::simplified_status;
use roadside_core::services::resolve_route;
use roadside_core::{
    AppState, ListFilter, LogEvent, Mode, NewRequest, Request, RoadsideContext, Role, Route,
    RouteDecision,
};
use serde_json::json;

use super::{boot, get_context, get_logger, log_event, spinner};
use crate::output;

#[derive(Subcommand)]
pub enum RequestCommands {
    /// Submit a new assistance request
    Submit {
        /// Vehicle make
        #[arg(long)]
        make: Option<String>,
        /// Vehicle model
        #[arg(long)]
        model: Option<String>,
        /// What went wrong
        #[arg(long)]
        issue: Option<String>,
        /// Contact name
        #[arg(long)]
        name: Option<String>,
        /// Contact phone
        #[arg(long)]
        phone: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List requests (your own, or every request for mechanics and admins)
    List {
        /// Include requests from every user
        #[arg(long)]
        all: bool,
        /// Show the simplified three-state status
        #[arg(long)]
        simple: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one request
    Show {
        /// Request ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete every locally stored request (mock mode only)
    Clear {
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(command: RequestCommands) -> Result<()> {
    match command {
        RequestCommands::Submit {
            make,
            model,
            issue,
            name,
            phone,
            json,
        } => submit(make, model, issue, name, phone, json).await,
        RequestCommands::List { all, simple, json } => list(all, simple, json).await,
        RequestCommands::Show { id, json } => show(&id, json).await,
        RequestCommands::Clear { force, json } => clear(force, json).await,
    }
}

/// Boot and make sure `route` may be shown
async fn enter(ctx: &RoadsideContext, route: Route) -> Result<AppState> {
    let state = boot(ctx).await;
    match resolve_route(&state, route) {
        RouteDecision::Render(_) => Ok(state),
        RouteDecision::Redirect(Route::Login) => {
            bail!("You need to sign in first. Run 'roadside login'.")
        }
        RouteDecision::Redirect(other) => bail!("Unavailable here; go to {:?} instead", other),
        RouteDecision::Loading => bail!("Session check did not finish"),
    }
}

fn ask(value: Option<String>, prompt: &str, allow_empty: bool) -> Result<String> {
    match value {
        Some(v) => Ok(v),
        None => Ok(Input::new()
            .with_prompt(prompt)
            .allow_empty(allow_empty)
            .interact_text()?),
    }
}

async fn submit(
    make: Option<String>,
    model: Option<String>,
    issue: Option<String>,
    name: Option<String>,
    phone: Option<String>,
    json: bool,
) -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();
    let state = enter(&ctx, Route::SubmitRequest).await?;

    let make = ask(make, "Vehicle make", true)?;
    let model = ask(model, "Vehicle model", true)?;
    let issue = ask(issue, "Describe the issue", false)?;
    let name = ask(name, "Contact name", true)?;
    let phone = ask(phone, "Contact phone", false)?;

    let result = ctx
        .access
        .create_request(NewRequest {
            user: state.user,
            vehicle: json!({ "make": make, "model": model }),
            issue_description: issue,
            contact: json!({ "name": name, "phone": phone }),
        })
        .await;

    let mut event = LogEvent::new("request_created").with_mode(ctx.access.mode());
    if let Err(e) = &result {
        event = event.with_error(e.kind());
    }
    log_event(&logger, event);

    let request = result?;
    if json {
        return output::print_json(&request);
    }
    output::success("Request submitted");
    println!("  ID: {}", request.id);
    println!("  Status: {}", output::status_text(&request.status));
    Ok(())
}

async fn list(all: bool, simple: bool, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let state = enter(&ctx, Route::Requests).await?;
    let Some(user) = state.user else {
        bail!("You need to sign in first. Run 'roadside login'.");
    };

    let filter = if all {
        if user.role == Role::User {
            bail!("Only mechanics and admins can list every request");
        }
        ListFilter::all()
    } else {
        ListFilter::for_user(&user.id)
    };

    let bar = spinner("Loading requests...");
    let requests = ctx.access.list_requests(filter).await;
    bar.finish_and_clear();
    let requests = requests?;

    if json {
        return output::print_json(&requests);
    }

    if requests.is_empty() {
        println!("No requests yet. Submit one with 'roadside request submit'.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Created", "ID", "Vehicle", "Issue", "Status"]);
    for request in &requests {
        let status = if simple {
            simplified_status(Some(&request.status)).as_str().to_string()
        } else {
            output::status_text(&request.status).to_string()
        };
        table.add_row(vec![
            request
                .created_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M")
                .to_string(),
            request.id.clone(),
            vehicle_text(request),
            request.issue_description.clone(),
            status,
        ]);
    }
    println!("{}", table);
    Ok(())
}

fn vehicle_text(request: &Request) -> String {
    let text = format!("{} {}", request.vehicle.make, request.vehicle.model);
    if text.trim().is_empty() {
        "-".to_string()
    } else {
        text.trim().to_string()
    }
}

async fn show(id: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let state = enter(&ctx, Route::RequestDetail(id.to_string())).await?;

    let Some(request) = ctx.access.get_request_by_id(id).await? else {
        bail!("Request not found: {}", id);
    };

    // Customers only see their own requests
    if let Some(user) = &state.user {
        if user.role == Role::User && request.user_id != user.id {
            bail!("Request not found: {}", id);
        }
    }

    if json {
        return output::print_json(&request);
    }

    println!("{}", format!("Request {}", request.id).bold());
    println!(
        "  Created: {}",
        request.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
    );
    println!("  Status: {}", output::status_text(&request.status));
    println!("  Vehicle: {}", vehicle_text(&request));
    println!("  Issue: {}", request.issue_description);
    println!(
        "  Contact: {} {}",
        request.contact.name,
        request.contact.phone.dimmed()
    );
    match &request.assigned_mechanic_email {
        Some(mechanic) => println!("  Mechanic: {}", mechanic),
        None => println!("  Mechanic: {}", "not assigned yet".dimmed()),
    }
    for note in &request.notes {
        println!("  Note: {}", note);
    }
    Ok(())
}

/// Bulk deletion only touches the local store
fn ensure_clearable(mode: Mode) -> Result<()> {
    if mode != Mode::Mock {
        bail!("Clearing all requests is only available in mock mode");
    }
    Ok(())
}

async fn clear(force: bool, json: bool) -> Result<()> {
    let ctx = get_context()?;
    ensure_clearable(ctx.access.mode())?;

    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt("Delete every locally stored request?")
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let deleted = ctx.access.clear_requests().await?;
    if json {
        println!("{}", json!({ "deleted": deleted }));
    } else {
        println!("Deleted {} requests", deleted);
    }
    Ok(())
}

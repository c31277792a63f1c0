//! Roadside CLI - roadside assistance requests in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

mod commands;
mod output;

use commands::{auth, estimate, geocode, logs, map, mock, request, status};

/// Roadside - request roadside assistance from your terminal
#[derive(Parser)]
#[command(name = "roadside", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show backend mode, session and service fees
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create an account
    Register {
        /// Account email
        #[arg(long)]
        email: Option<String>,
        /// Password (prompted when omitted; ROADSIDE_PASSWORD is also read)
        #[arg(long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sign in with email and password
    Login {
        /// Account email
        #[arg(long)]
        email: Option<String>,
        /// Password (prompted when omitted; ROADSIDE_PASSWORD is also read)
        #[arg(long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start Google sign-in (hosted mode only)
    LoginGoogle {
        /// Where the provider should send the browser back to
        #[arg(long)]
        redirect_to: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Finish Google sign-in from the address the browser landed on
    OauthCallback {
        /// Callback URL, including its fragment
        url: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sign out
    Logout {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the signed-in user
    Whoami {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Submit and browse assistance requests
    Request {
        #[command(subcommand)]
        command: request::RequestCommands,
    },

    /// Estimate the price of a service
    Estimate {
        /// Service name, e.g. "Tire change"
        service: String,
        /// Towing distance in kilometres
        #[arg(long, default_value = "0")]
        km: Decimal,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Look up the coordinates of an address
    Geocode {
        /// Address to look up
        query: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build a map link for coordinates or a place name
    Map {
        /// Latitude
        #[arg(long, allow_hyphen_values = true, requires = "lon")]
        lat: Option<f64>,
        /// Longitude
        #[arg(long, allow_hyphen_values = true, requires = "lat")]
        lon: Option<f64>,
        /// Place to search for
        query: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View application logs
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },

    /// Manage mock mode
    Mock {
        #[command(subcommand)]
        command: Option<mock::MockCommands>,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Status { .. } => "status",
            Commands::Register { .. } => "register",
            Commands::Login { .. } => "login",
            Commands::LoginGoogle { .. } => "login-google",
            Commands::OauthCallback { .. } => "oauth-callback",
            Commands::Logout { .. } => "logout",
            Commands::Whoami { .. } => "whoami",
            Commands::Request { .. } => "request",
            Commands::Estimate { .. } => "estimate",
            Commands::Geocode { .. } => "geocode",
            Commands::Map { .. } => "map",
            Commands::Logs { .. } => "logs",
            Commands::Mock { .. } => "mock",
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(logger) = commands::get_logger() {
        let _ = logger.log_command(cli.command.name());
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Status { json } => status::run(json).await,
        Commands::Register {
            email,
            password,
            json,
        } => auth::register(email, password, json).await,
        Commands::Login {
            email,
            password,
            json,
        } => auth::login(email, password, json).await,
        Commands::LoginGoogle { redirect_to, json } => auth::login_google(redirect_to, json).await,
        Commands::OauthCallback { url, json } => auth::oauth_callback(url, json).await,
        Commands::Logout { json } => auth::logout(json).await,
        Commands::Whoami { json } => auth::whoami(json).await,
        Commands::Request { command } => request::run(command).await,
        Commands::Estimate { service, km, json } => estimate::run(&service, km, json).await,
        Commands::Geocode { query, json } => geocode::run(query, json).await,
        Commands::Map {
            lat,
            lon,
            query,
            json,
        } => map::run(lat, lon, query, json),
        Commands::Logs { command } => logs::run(command),
        Commands::Mock { command } => mock::run(command),
    }
}

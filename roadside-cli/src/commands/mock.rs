//! Mock command - switch between the local mock backend and the hosted one

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use roadside_core::config::Config;
use roadside_core::Mode;

use super::get_roadside_dir;

#[derive(Subcommand)]
pub enum MockCommands {
    /// Force mock mode (local storage, no network)
    #[command(name = "on")]
    On,
    /// Use the hosted backend when it is configured
    #[command(name = "off")]
    Off,
    /// Show the active mode
    Status,
}

pub fn run(command: Option<MockCommands>) -> Result<()> {
    let dir = get_roadside_dir()?;
    std::fs::create_dir_all(&dir)?;
    let mut config = Config::load(&dir)?;

    match command {
        Some(MockCommands::On) => {
            config.mock_mode = true;
            config.save(&dir)?;
            println!("{}", "Mock mode enabled".green());
            println!("Requests and accounts now live in {}", dir.display());
        }
        Some(MockCommands::Off) => {
            config.mock_mode = false;
            config.save(&dir)?;
            println!("{}", "Mock mode disabled".yellow());
            if config.mode() == Mode::Mock {
                println!("No hosted backend is configured, so local storage is still used.");
                println!("Set hosted.url and hosted.anonKey in settings.json to connect.");
            }
        }
        Some(MockCommands::Status) | None => match config.mode() {
            Mode::Mock => println!("Backend is {}", "MOCK".yellow()),
            Mode::Hosted => println!("Backend is {}", "HOSTED".green()),
        },
    }
    Ok(())
}

//! Roadside Core - logic for the roadside assistance client
//!
//! This crate follows hexagonal architecture:
//!
//! - **domain**: Requests, users, statuses and fees
//! - **ports**: Trait definitions for storage, auth and request persistence
//! - **services**: The data access facade, boot sequencer and helpers
//! - **adapters**: Local file store, mock backend, hosted HTTP backend, geocoding

pub mod domain;
pub mod ports;
pub mod services;
pub mod adapters;
pub mod config;
mod log_migrations;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use adapters::file_store::FileStorage;
use adapters::geocoding::GeocodingClient;
use adapters::network::NetworkGuard;
use config::Config;
use ports::LocalStore;
use services::DataAccess;

// Re-export commonly used types at crate root
pub use config::{Mode, NetworkPolicy};
pub use domain::result::{Error, OperationResult};
pub use domain::{
    CanonicalStatus, FeeSchedule, ListFilter, NewRequest, Request, Role, User, Vehicle,
};
pub use services::{
    AppState, BootOptions, BootSequencer, EntryPoint, LogEvent, LoggingService, Route,
    RouteDecision,
};

/// Main context for roadside operations
///
/// Holds the configuration and the services built from it for one
/// profile directory.
pub struct RoadsideContext {
    pub dir: PathBuf,
    pub config: Config,
    pub access: Arc<DataAccess>,
    pub geocoder: GeocodingClient,
}

impl RoadsideContext {
    pub fn new(dir: &Path) -> Result<Self> {
        let config = Config::load(dir)?;

        let storage = FileStorage::new(dir)
            .with_context(|| format!("Failed to open local storage in {}", dir.display()))?;
        let store = LocalStore::new(Arc::new(storage));

        let access = Arc::new(
            DataAccess::new(&config, store).context("Failed to initialize data access")?,
        );

        let guard = NetworkGuard::new(config.network_policy())?;
        let geocoder = GeocodingClient::new(&config.geocoding_base_url, guard);

        Ok(Self {
            dir: dir.to_path_buf(),
            config,
            access,
            geocoder,
        })
    }

    pub fn boot_options(&self) -> BootOptions {
        BootOptions::from(&self.config)
    }
}

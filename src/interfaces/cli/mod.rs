//! CLI interface module
//!
//! Every command loads the services it needs from the configured store,
//! runs one operation and prints the result as JSON.

pub mod args;
pub mod commands;

use std::fmt;
use std::sync::Arc;

pub use args::{CafeCommands, Cli, Commands, SheetsCommands};

use crate::analytics::{EventAggregator, SampleEventSource};
use crate::config::AppConfig;
use crate::errors::CoasterError;
use crate::services::{
    AnalyticsService, CafeService, CatalogService, GoogleSheetsClient, SheetsSyncService,
    UrlGeneratorService,
};
use crate::storage::{KeyValueStore, StoreFactory};
use crate::system::{Clock, SystemClock};
use crate::utils::qr::SvgQrEncoder;

#[derive(Debug)]
pub enum CliError {
    StoreError(String),
    ParseError(String),
    CommandError(String),
}

impl CliError {
    /// Format as simple output
    pub fn format_simple(&self) -> String {
        match self {
            CliError::StoreError(msg) => format!("Store error: {}", msg),
            CliError::ParseError(msg) => format!("Parse error: {}", msg),
            CliError::CommandError(msg) => format!("Command error: {}", msg),
        }
    }

    /// Format as colored output
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        match self {
            CliError::StoreError(msg) => {
                format!("{} {}", "Store error:".red().bold(), msg.white())
            }
            CliError::ParseError(msg) => {
                format!("{} {}", "Parse error:".yellow().bold(), msg.white())
            }
            CliError::CommandError(msg) => {
                format!("{} {}", "Command error:".red().bold(), msg.white())
            }
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for CliError {}

impl From<CoasterError> for CliError {
    fn from(err: CoasterError) -> Self {
        match err {
            CoasterError::StoreUnavailable(_)
            | CoasterError::FileOperation(_)
            | CoasterError::Serialization(_) => CliError::StoreError(err.format_simple()),
            CoasterError::DateParse(_) => CliError::ParseError(err.format_simple()),
            _ => CliError::CommandError(err.format_simple()),
        }
    }
}

/// Shared handles for one CLI invocation
pub struct AppContext {
    pub config: AppConfig,
    pub clock: Arc<dyn Clock>,
    pub store: Arc<dyn KeyValueStore>,
    pub catalog: Arc<CatalogService>,
}

impl AppContext {
    pub async fn init(config: AppConfig) -> Result<Self, CliError> {
        Self::with_clock(config, SystemClock::arc()).await
    }

    pub async fn with_clock(config: AppConfig, clock: Arc<dyn Clock>) -> Result<Self, CliError> {
        let store = StoreFactory::create(&config.storage)?;
        let catalog = Arc::new(CatalogService::load(store.clone(), clock.clone()).await?);
        Ok(Self {
            config,
            clock,
            store,
            catalog,
        })
    }

    pub async fn analytics(&self) -> Result<Arc<AnalyticsService>, CliError> {
        let service =
            AnalyticsService::load(self.store.clone(), &self.config.analytics, self.clock.clone())
                .await?;
        Ok(Arc::new(service))
    }

    pub async fn urls(&self) -> Result<UrlGeneratorService, CliError> {
        Ok(UrlGeneratorService::load(
            self.store.clone(),
            &self.config.generator,
            Arc::new(SvgQrEncoder),
            self.clock.clone(),
        )
        .await?)
    }

    pub async fn sheets(&self) -> Result<Arc<SheetsSyncService>, CliError> {
        let service = SheetsSyncService::load(
            self.store.clone(),
            Arc::new(GoogleSheetsClient::new(&self.config.sheets)),
            self.catalog.clone(),
            &self.config.sheets,
            self.clock.clone(),
        )
        .await?;
        Ok(Arc::new(service))
    }

    pub async fn cafe(&self) -> Result<CafeService, CliError> {
        Ok(CafeService::load(self.store.clone(), self.clock.clone()).await?)
    }

    /// Sample traffic over the current catalog, bucketed in the configured offset
    pub fn sample_source(&self, seed: u64) -> SampleEventSource {
        let aggregator = EventAggregator::from_config(&self.config.analytics, self.clock.clone());
        SampleEventSource::new(seed, &self.catalog.catalog(), aggregator.offset())
    }
}

/// Run a CLI command from clap-parsed input
pub async fn run_cli_command(cmd: Commands, config: AppConfig) -> Result<(), CliError> {
    // Generate doesn't need a store
    if let Commands::ConfigGen { output_path, force } = cmd {
        return commands::generate_config(output_path, force).await;
    }

    let ctx = AppContext::init(config).await?;
    commands::dispatch(&ctx, cmd).await
}

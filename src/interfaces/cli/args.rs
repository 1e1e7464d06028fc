//! Command-line interface definitions using clap

use clap::{Parser, Subcommand};

use crate::analytics::DeviceType;

/// Coaster admin - scan analytics, bean links and sheet sync for an NFC coaster cafe
#[derive(Parser)]
#[command(name = "coaster-admin")]
#[command(version)]
#[command(about = "Admin data core for an NFC coaster coffee shop", long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, short = 'c', global = true, default_value = crate::config::DEFAULT_CONFIG_PATH)]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Fill an empty scan log with sample traffic
    Seed {
        /// Number of events (default: analytics.sample_events)
        #[arg(long)]
        count: Option<usize>,

        /// RNG seed, for reproducible data
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },

    /// Record one chip scan
    Scan {
        chip_id: String,
        bean_id: String,

        #[arg(long)]
        user_agent: Option<String>,

        #[arg(long)]
        country: Option<String>,

        #[arg(long)]
        city: Option<String>,
    },

    /// Scan summary (totals, hourly and daily buckets, top beans and locations)
    ///
    /// Dates accept RFC3339, YYYY-MM-DD or a relative age like "7d"
    Summary {
        #[arg(long)]
        from: Option<String>,

        #[arg(long)]
        to: Option<String>,

        /// Only these beans (repeatable)
        #[arg(long = "bean")]
        beans: Vec<String>,

        /// Country or "country-city" (repeatable)
        #[arg(long = "location")]
        locations: Vec<String>,

        /// mobile, desktop or tablet (repeatable)
        #[arg(long = "device")]
        devices: Vec<DeviceType>,
    },

    /// Per-bean performance, most scanned first
    Performance {
        #[arg(long)]
        bean: Option<String>,
    },

    /// Per-location breakdown
    Locations,

    /// Realtime snapshot
    Realtime {
        /// Keep polling the sample source and print every refresh
        #[arg(long)]
        watch: bool,

        /// Refreshes to print before exiting in watch mode
        #[arg(long, default_value_t = 5)]
        ticks: u32,
    },

    /// List beans
    Beans {
        #[arg(long)]
        search: Option<String>,

        #[arg(long)]
        origin: Option<String>,

        #[arg(long)]
        process: Option<String>,
    },

    /// Toggle a bean between active and inactive
    ToggleBean { bean_id: String },

    /// Generate the slug, URLs and QR code of a bean
    Url { bean_id: String },

    /// Generated URL statistics
    UrlStats,

    /// Count a click on a generated slug
    Click { slug: String },

    /// Check a URL before using it as base URL or custom domain
    CheckUrl { url: String },

    /// Import beans from a CSV file
    ImportCsv { file_path: String },

    /// Export beans to a CSV file
    ExportCsv {
        /// Output path (default: timestamped file name)
        file_path: Option<String>,
    },

    /// Google Sheets sync
    Sheets {
        #[command(subcommand)]
        action: SheetsCommands,
    },

    /// Cafe profile
    Cafe {
        #[command(subcommand)]
        action: CafeCommands,
    },

    /// Generate example configuration file
    ConfigGen {
        /// Output path (default: config.example.toml)
        output_path: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
pub enum SheetsCommands {
    /// Test the connection and store the sheet config
    Setup {
        spreadsheet_id: String,

        #[arg(long, default_value = "Sheet1")]
        sheet_name: String,

        #[arg(long, default_value = "A1:L100")]
        range: String,

        #[arg(long)]
        api_key: Option<String>,
    },

    /// Import the configured range into the catalog
    Import,

    /// Show sync history, newest first
    History,

    /// Turn periodic import on or off
    AutoSync {
        #[arg(long)]
        enable: bool,

        #[arg(long, default_value_t = 60)]
        interval_minutes: u64,
    },

    /// Run periodic import in the foreground
    Watch,
}

#[derive(Subcommand)]
pub enum CafeCommands {
    /// Open/closed right now
    Status,

    /// Social account statistics
    Stats,

    /// Profile, hours and accounts as JSON
    Show,
}

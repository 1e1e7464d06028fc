//! CLI command implementations

mod analytics;
mod cafe;
mod catalog;
mod config_gen;
mod links;
mod sheets;

pub use analytics::*;
pub use cafe::*;
pub use catalog::*;
pub use config_gen::*;
pub use links::*;
pub use sheets::*;

use serde::Serialize;

use super::{AppContext, CliError, Commands};

/// Pretty-print `value` as JSON on stdout
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::CommandError(format!("Failed to render output: {}", e)))?;
    println!("{}", json);
    Ok(())
}

pub async fn dispatch(ctx: &AppContext, cmd: Commands) -> Result<(), CliError> {
    match cmd {
        Commands::Seed { count, seed } => seed_samples(ctx, count, seed).await,
        Commands::Scan {
            chip_id,
            bean_id,
            user_agent,
            country,
            city,
        } => record_scan(ctx, chip_id, bean_id, user_agent, country, city).await,
        Commands::Summary {
            from,
            to,
            beans,
            locations,
            devices,
        } => show_summary(ctx, from, to, beans, locations, devices).await,
        Commands::Performance { bean } => show_performance(ctx, bean).await,
        Commands::Locations => show_locations(ctx).await,
        Commands::Realtime { watch, ticks } => show_realtime(ctx, watch, ticks).await,
        Commands::Beans {
            search,
            origin,
            process,
        } => list_beans(ctx, search, origin, process),
        Commands::ToggleBean { bean_id } => toggle_bean(ctx, bean_id).await,
        Commands::Url { bean_id } => generate_url(ctx, bean_id).await,
        Commands::UrlStats => show_url_stats(ctx).await,
        Commands::Click { slug } => record_click(ctx, slug).await,
        Commands::CheckUrl { url } => check_url(ctx, url).await,
        Commands::ImportCsv { file_path } => import_csv(ctx, file_path).await,
        Commands::ExportCsv { file_path } => export_csv(ctx, file_path).await,
        Commands::Sheets { action } => run_sheets_command(ctx, action).await,
        Commands::Cafe { action } => run_cafe_command(ctx, action).await,
        Commands::ConfigGen { .. } => unreachable!("handled before the store is opened"),
    }
}

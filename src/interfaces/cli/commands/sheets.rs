//! Google Sheets sync commands

use colored::Colorize;

use super::print_json;
use crate::interfaces::cli::{AppContext, CliError, SheetsCommands};
use crate::services::{GoogleSheetsConfig, SyncKind};

pub async fn run_sheets_command(ctx: &AppContext, action: SheetsCommands) -> Result<(), CliError> {
    let sheets = ctx.sheets().await?;

    match action {
        SheetsCommands::Setup {
            spreadsheet_id,
            sheet_name,
            range,
            api_key,
        } => {
            let mut config = GoogleSheetsConfig::new(spreadsheet_id, sheet_name, range);
            config.api_key = api_key;
            let saved = sheets.setup(config).await?;
            println!(
                "{} Connected to {} ({}!{})",
                "✓".bold().green(),
                saved.spreadsheet_id.cyan(),
                saved.sheet_name,
                saved.range
            );
            Ok(())
        }
        SheetsCommands::Import => {
            let result = sheets.import_from_sheets(SyncKind::Manual).await;
            print_json(&result)?;
            if result.success {
                Ok(())
            } else {
                Err(CliError::CommandError(result.message))
            }
        }
        SheetsCommands::History => print_json(&sheets.history()),
        SheetsCommands::AutoSync {
            enable,
            interval_minutes,
        } => {
            let config = sheets.set_auto_sync(enable, interval_minutes).await?;
            println!(
                "{} Auto sync {} (every {} minutes)",
                "ℹ".bold().blue(),
                if config.auto_sync {
                    "enabled".green()
                } else {
                    "disabled".yellow()
                },
                config.sync_interval_minutes
            );
            Ok(())
        }
        SheetsCommands::Watch => match sheets.spawn_auto_sync() {
            Some(handle) => handle
                .await
                .map_err(|e| CliError::CommandError(format!("Auto sync stopped: {}", e))),
            None => Err(CliError::CommandError(
                "Auto sync is off; enable it with `sheets auto-sync --enable`".to_string(),
            )),
        },
    }
}

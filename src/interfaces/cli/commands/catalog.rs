//! Bean catalog commands

use colored::Colorize;

use super::print_json;
use crate::interfaces::cli::{AppContext, CliError};
use crate::services::BeanQuery;
use crate::utils::csv_handler::generate_export_filename;

pub fn list_beans(
    ctx: &AppContext,
    search: Option<String>,
    origin: Option<String>,
    process: Option<String>,
) -> Result<(), CliError> {
    let beans = ctx.catalog.search(&BeanQuery {
        search,
        origin,
        process,
    });

    if beans.is_empty() {
        println!("{} No beans found", "ℹ".bold().blue());
        return Ok(());
    }
    for bean in &beans {
        let mut parts = vec![format!("{} {}", bean.id.dimmed(), bean.name.cyan())];
        if !bean.origin.is_empty() {
            parts.push(format!("({})", bean.origin));
        }
        if !bean.is_active {
            parts.push("inactive".yellow().to_string());
        }
        if let Some(sale) = bean.sale_info.as_ref().filter(|s| s.is_for_sale) {
            parts.push(
                format!("{:.2} / stock {}", sale.price, sale.stock)
                    .dimmed()
                    .to_string(),
            );
        }
        println!("  {}", parts.join(" "));
    }
    println!();
    println!(
        "{} Total {} beans",
        "ℹ".bold().blue(),
        beans.len().to_string().green()
    );
    Ok(())
}

pub async fn toggle_bean(ctx: &AppContext, bean_id: String) -> Result<(), CliError> {
    let bean = ctx.catalog.toggle_active(&bean_id).await?;
    print_json(&bean)
}

pub async fn import_csv(ctx: &AppContext, file_path: String) -> Result<(), CliError> {
    let text = std::fs::read_to_string(&file_path)
        .map_err(|e| CliError::CommandError(format!("Failed to read '{}': {}", file_path, e)))?;

    let sheets = ctx.sheets().await?;
    let result = sheets.import_csv(&text).await;
    print_json(&result)?;
    if result.success {
        Ok(())
    } else {
        Err(CliError::CommandError(result.message))
    }
}

pub async fn export_csv(ctx: &AppContext, file_path: Option<String>) -> Result<(), CliError> {
    let path = file_path.unwrap_or_else(|| generate_export_filename(ctx.clock.now()));
    let sheets = ctx.sheets().await?;
    let (csv, result) = sheets.export_csv().await?;

    std::fs::write(&path, csv)
        .map_err(|e| CliError::CommandError(format!("Failed to write '{}': {}", path, e)))?;
    println!(
        "{} {} {}",
        "✓".bold().green(),
        result.message,
        path.blue()
    );
    Ok(())
}

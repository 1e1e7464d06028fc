//! Slug and short-URL commands

use colored::Colorize;

use super::print_json;
use crate::errors::CoasterError;
use crate::interfaces::cli::{AppContext, CliError};

pub async fn generate_url(ctx: &AppContext, bean_id: String) -> Result<(), CliError> {
    let bean = ctx
        .catalog
        .get(&bean_id)
        .ok_or_else(|| CliError::CommandError(format!("No bean '{}'", bean_id)))?;
    let urls = ctx.urls().await?;

    match urls.generate(&bean).await {
        Ok(result) => {
            eprintln!(
                "{} {} -> {}",
                "✓".bold().green(),
                bean.name.cyan(),
                result.full_url.blue().underline()
            );
            print_json(&result)
        }
        Err(CoasterError::SlugConflict(msg)) => {
            println!("{} {}", "Slug taken:".yellow().bold(), msg);
            Err(CliError::CommandError(
                "Rename the bean so its name yields one of the suggested slugs, or switch generator.pattern"
                    .to_string(),
            ))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn show_url_stats(ctx: &AppContext) -> Result<(), CliError> {
    let urls = ctx.urls().await?;
    print_json(&urls.stats(&ctx.catalog.catalog()))
}

pub async fn record_click(ctx: &AppContext, slug: String) -> Result<(), CliError> {
    let urls = ctx.urls().await?;
    let clicks = urls.record_click(&slug).await?;
    println!(
        "{} {} now has {} clicks",
        "✓".bold().green(),
        slug.cyan(),
        clicks.to_string().green()
    );
    Ok(())
}

pub async fn check_url(ctx: &AppContext, url: String) -> Result<(), CliError> {
    let urls = ctx.urls().await?;
    let report = urls.validate_url(&url);
    print_json(&report)?;
    if report.is_valid {
        Ok(())
    } else {
        Err(CliError::ParseError(report.errors.join("; ")))
    }
}

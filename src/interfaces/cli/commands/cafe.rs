//! Cafe profile commands

use colored::Colorize;
use serde_json::json;

use super::print_json;
use crate::analytics::EventAggregator;
use crate::interfaces::cli::{AppContext, CafeCommands, CliError};

pub async fn run_cafe_command(ctx: &AppContext, action: CafeCommands) -> Result<(), CliError> {
    let cafe = ctx.cafe().await?;

    match action {
        CafeCommands::Status => {
            let aggregator =
                EventAggregator::from_config(&ctx.config.analytics, ctx.clock.clone());
            let local = ctx
                .clock
                .now()
                .with_timezone(&aggregator.offset())
                .naive_local();
            let status = cafe.business_status(local);
            let label = if status.is_open {
                "OPEN".green().bold()
            } else {
                "CLOSED".red().bold()
            };
            println!("{} {} {}", cafe.info().name.cyan(), label, status.next_change);
            Ok(())
        }
        CafeCommands::Stats => print_json(&cafe.stats()),
        CafeCommands::Show => print_json(&json!({
            "info": cafe.info(),
            "socialMedia": cafe.accounts(),
        })),
    }
}

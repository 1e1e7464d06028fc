//! Scan analytics commands

use std::time::Duration;

use chrono::{DateTime, Utc};
use colored::Colorize;

use super::print_json;
use crate::analytics::{AnalyticsFilter, DeviceType, Location, RealtimeFeed};
use crate::interfaces::cli::{AppContext, CliError};
use crate::services::ScanMetadata;
use crate::utils::TimeParser;

pub async fn seed_samples(
    ctx: &AppContext,
    count: Option<usize>,
    seed: u64,
) -> Result<(), CliError> {
    let analytics = ctx.analytics().await?;
    let count = count.unwrap_or(ctx.config.analytics.sample_events);
    let source = ctx.sample_source(seed);

    let added = analytics.seed_samples(&source, count).await?;
    if added == 0 {
        println!(
            "{} Scan log already holds {} events, nothing seeded",
            "ℹ".bold().blue(),
            analytics.len().to_string().cyan()
        );
    } else {
        println!(
            "{} Seeded {} sample scans over {} beans",
            "✓".bold().green(),
            added.to_string().green(),
            ctx.catalog.list().len()
        );
    }
    Ok(())
}

pub async fn record_scan(
    ctx: &AppContext,
    chip_id: String,
    bean_id: String,
    user_agent: Option<String>,
    country: Option<String>,
    city: Option<String>,
) -> Result<(), CliError> {
    let analytics = ctx.analytics().await?;
    let location = country.map(|c| Location::new(c, city.unwrap_or_default()));
    let event = analytics
        .record_scan(
            &chip_id,
            &bean_id,
            ScanMetadata {
                location,
                user_agent,
                ..Default::default()
            },
        )
        .await?;
    print_json(&event)
}

fn build_date_range(
    from: Option<&str>,
    to: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Option<(DateTime<Utc>, DateTime<Utc>)>, CliError> {
    let range = match (from, to) {
        (None, None) => None,
        (Some(from), Some(to)) => Some(TimeParser::parse_range(from, to, now)?),
        (Some(from), None) => Some((TimeParser::parse_instant(from, now)?, now)),
        (None, Some(to)) => Some((DateTime::<Utc>::MIN_UTC, TimeParser::parse_range_end(to, now)?)),
    };
    Ok(range)
}

pub async fn show_summary(
    ctx: &AppContext,
    from: Option<String>,
    to: Option<String>,
    beans: Vec<String>,
    locations: Vec<String>,
    devices: Vec<DeviceType>,
) -> Result<(), CliError> {
    let analytics = ctx.analytics().await?;
    let now = ctx.clock.now();

    let mut filter = AnalyticsFilter::new()
        .with_entities(beans)
        .with_locations(locations)
        .with_device_types(devices);
    if let Some((start, end)) = build_date_range(from.as_deref(), to.as_deref(), now)? {
        filter = filter.with_date_range(start, end);
    }

    let summary = analytics.summary(&ctx.catalog.catalog(), Some(&filter));
    print_json(&summary)
}

pub async fn show_performance(ctx: &AppContext, bean: Option<String>) -> Result<(), CliError> {
    let analytics = ctx.analytics().await?;
    let ranking = analytics.entity_performance(&ctx.catalog.catalog(), bean.as_deref());
    if ranking.is_empty() {
        if let Some(id) = bean {
            return Err(CliError::CommandError(format!("No bean '{}'", id)));
        }
    }
    print_json(&ranking)
}

pub async fn show_locations(ctx: &AppContext) -> Result<(), CliError> {
    let analytics = ctx.analytics().await?;
    print_json(&analytics.location_analytics(&ctx.catalog.catalog()))
}

pub async fn show_realtime(ctx: &AppContext, watch: bool, ticks: u32) -> Result<(), CliError> {
    let analytics = ctx.analytics().await?;
    let source = std::sync::Arc::new(ctx.sample_source(rand::random()));
    let feed = RealtimeFeed::new(
        analytics,
        ctx.catalog.clone(),
        source,
        Duration::from_secs(ctx.config.analytics.realtime_interval_secs.max(1)),
    );

    if !watch {
        return print_json(&feed.snapshot());
    }

    let (mut rx, handle) = feed.spawn();
    print_json(&*rx.borrow_and_update())?;
    for _ in 0..ticks {
        if rx.changed().await.is_err() {
            break;
        }
        let stats = rx.borrow_and_update().clone();
        println!(
            "{} last hour: {}, last day: {}, top: {}",
            stats.generated_at.format("%H:%M:%S").to_string().dimmed(),
            stats.scans_in_last_hour.to_string().green(),
            stats.scans_in_last_day.to_string().cyan(),
            stats.top_scanning_entity.yellow()
        );
    }
    drop(rx);
    handle.abort();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_open_ended_ranges() {
        let now = Utc.with_ymd_and_hms(2024, 10, 15, 12, 0, 0).unwrap();
        assert!(build_date_range(None, None, now).unwrap().is_none());

        let (start, end) = build_date_range(Some("7d"), None, now).unwrap().unwrap();
        assert_eq!(start, now - chrono::Duration::days(7));
        assert_eq!(end, now);

        let (start, _) = build_date_range(None, Some("2024-10-01"), now)
            .unwrap()
            .unwrap();
        assert_eq!(start, DateTime::<Utc>::MIN_UTC);
    }

    #[test]
    fn test_inverted_range_is_parse_error() {
        let now = Utc::now();
        let err = build_date_range(Some("2024-10-10"), Some("2024-10-01"), now).unwrap_err();
        assert!(matches!(err, CliError::ParseError(_)));
    }
}

//! Spreadsheet import/export
//!
//! Rows come from a [`SheetsFetcher`] (the Google Sheets values API in
//! production), are mapped to beans by header name and merged into the
//! catalog. Export is CSV only; the read-only API cannot write back.
//!
//! Every sync returns a [`SyncResult`] instead of an error. Connectivity
//! failures become `success: false` results and are kept in the history.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use strum::AsRefStr;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use ureq::Agent;
use uuid::Uuid;

use crate::config::SheetsConfig;
use crate::errors::{CoasterError, Result};
use crate::services::CatalogService;
use crate::storage::{CoffeeBean, KeyValueStore, StoreKey, load_json, save_json};
use crate::system::Clock;
use crate::utils::csv_handler::{RowMapping, beans_to_csv, csv_to_beans, map_rows};

fn default_sync_interval() -> u64 {
    60
}

/// Longest auto-sync period honoured, one year
const MAX_SYNC_PERIOD_SECS: u64 = 365 * 24 * 60 * 60;

/// Auto-sync period in seconds: at least one minute, at most a year
fn auto_sync_period_secs(interval_minutes: u64) -> u64 {
    interval_minutes
        .max(1)
        .saturating_mul(60)
        .min(MAX_SYNC_PERIOD_SECS)
}

/// Which sheet and range to read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleSheetsConfig {
    pub spreadsheet_id: String,
    pub sheet_name: String,
    /// A1 notation, e.g. `A1:L100`
    pub range: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default)]
    pub is_connected: bool,
    #[serde(default)]
    pub last_sync: Option<DateTime<Utc>>,
    #[serde(default)]
    pub auto_sync: bool,
    #[serde(default = "default_sync_interval", alias = "syncInterval")]
    pub sync_interval_minutes: u64,
}

impl GoogleSheetsConfig {
    pub fn new(
        spreadsheet_id: impl Into<String>,
        sheet_name: impl Into<String>,
        range: impl Into<String>,
    ) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            sheet_name: sheet_name.into(),
            range: range.into(),
            api_key: None,
            is_connected: false,
            last_sync: None,
            auto_sync: false,
            sync_interval_minutes: default_sync_interval(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SyncKind {
    Manual,
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SyncDirection {
    Import,
    Export,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub success: bool,
    pub message: String,
    pub synced_count: usize,
    #[serde(default)]
    pub errors: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl SyncResult {
    fn failed(message: impl Into<String>, error: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            success: false,
            message: message.into(),
            synced_count: 0,
            errors: vec![error.into()],
            timestamp: at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncHistoryEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: SyncKind,
    pub direction: SyncDirection,
    pub result: SyncResult,
}

// ============ Fetcher ============

#[async_trait]
pub trait SheetsFetcher: Send + Sync {
    /// The cell grid of the configured range, header row first
    async fn fetch_rows(&self, config: &GoogleSheetsConfig) -> Result<Vec<Vec<String>>>;
}

#[derive(Debug, Deserialize)]
struct ValuesResponse {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// Google Sheets v4 `values` endpoint client
pub struct GoogleSheetsClient {
    api_base: String,
    agent: Agent,
}

impl GoogleSheetsClient {
    pub fn new(settings: &SheetsConfig) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(settings.timeout_secs)))
            .build()
            .into();
        Self {
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            agent,
        }
    }

    /// `{base}/{id}/values/{sheet}!{range}[?key=...]`
    pub fn values_url(&self, config: &GoogleSheetsConfig) -> String {
        let range = format!("{}!{}", config.sheet_name, config.range);
        let mut url = format!(
            "{}/{}/values/{}",
            self.api_base,
            urlencoding::encode(&config.spreadsheet_id),
            urlencoding::encode(&range)
        );
        if let Some(key) = config.api_key.as_deref().filter(|k| !k.is_empty()) {
            url.push_str("?key=");
            url.push_str(&urlencoding::encode(key));
        }
        url
    }

    fn fetch_sync(agent: Agent, url: String) -> Result<Vec<Vec<String>>> {
        let resp = agent.get(&url).call().map_err(|e| {
            warn!("Sheets request failed: {}", e);
            CoasterError::sheets_fetch(format!("Request failed: {}", e))
        })?;

        let body: ValuesResponse = resp.into_body().read_json().map_err(|e| {
            CoasterError::sheets_fetch(format!("Unreadable response: {}", e))
        })?;

        let rows = body
            .values
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| match cell {
                        serde_json::Value::String(s) => s,
                        serde_json::Value::Null => String::new(),
                        other => other.to_string(),
                    })
                    .collect()
            })
            .collect();
        Ok(rows)
    }
}

#[async_trait]
impl SheetsFetcher for GoogleSheetsClient {
    async fn fetch_rows(&self, config: &GoogleSheetsConfig) -> Result<Vec<Vec<String>>> {
        let url = self.values_url(config);
        debug!("GoogleSheetsClient: fetching {}", config.spreadsheet_id);
        let agent = self.agent.clone();

        tokio::task::spawn_blocking(move || Self::fetch_sync(agent, url))
            .await
            .unwrap_or_else(|e| {
                warn!("Sheets fetch task failed: {}", e);
                Err(CoasterError::sheets_fetch(format!("Fetch task failed: {}", e)))
            })
    }
}

// ============ Merge ============

/// Merge imported beans into the catalog
///
/// A case-insensitive name + origin match replaces the existing bean while
/// keeping its id, chip id and `created_at`. Anything else is appended.
pub fn merge_beans(
    existing: Vec<CoffeeBean>,
    imported: Vec<CoffeeBean>,
    now: DateTime<Utc>,
) -> Vec<CoffeeBean> {
    let mut merged = existing;
    for mut bean in imported {
        let name = bean.name.to_lowercase();
        let origin = bean.origin.to_lowercase();
        match merged
            .iter_mut()
            .find(|b| b.name.to_lowercase() == name && b.origin.to_lowercase() == origin)
        {
            Some(current) => {
                bean.id = std::mem::take(&mut current.id);
                bean.nfc_chip_id = std::mem::take(&mut current.nfc_chip_id);
                bean.created_at = current.created_at;
                bean.updated_at = now;
                *current = bean;
            }
            None => merged.push(bean),
        }
    }
    merged
}

// ============ SheetsSyncService Implementation ============

pub struct SheetsSyncService {
    store: Arc<dyn KeyValueStore>,
    fetcher: Arc<dyn SheetsFetcher>,
    catalog: Arc<CatalogService>,
    config: RwLock<Option<GoogleSheetsConfig>>,
    history: RwLock<Vec<SyncHistoryEntry>>,
    history_limit: usize,
    clock: Arc<dyn Clock>,
}

impl SheetsSyncService {
    pub async fn load(
        store: Arc<dyn KeyValueStore>,
        fetcher: Arc<dyn SheetsFetcher>,
        catalog: Arc<CatalogService>,
        settings: &SheetsConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let config = load_json::<GoogleSheetsConfig>(store.as_ref(), StoreKey::SyncConfig).await?;
        let history = load_json::<Vec<SyncHistoryEntry>>(store.as_ref(), StoreKey::SyncHistory)
            .await?
            .unwrap_or_default();
        debug!(
            "SheetsSyncService: configured={}, {} history entries",
            config.is_some(),
            history.len()
        );

        Ok(Self {
            store,
            fetcher,
            catalog,
            config: RwLock::new(config),
            history: RwLock::new(history),
            history_limit: settings.history_limit.max(1),
            clock,
        })
    }

    pub fn config(&self) -> Option<GoogleSheetsConfig> {
        self.config.read().clone()
    }

    /// Newest first
    pub fn history(&self) -> Vec<SyncHistoryEntry> {
        self.history.read().clone()
    }

    async fn persist_config(&self) -> Result<()> {
        let snapshot = self.config.read().clone();
        match snapshot {
            Some(config) => save_json(self.store.as_ref(), StoreKey::SyncConfig, &config).await,
            None => Ok(()),
        }
    }

    async fn record_history(&self, kind: SyncKind, direction: SyncDirection, result: &SyncResult) {
        let entry = SyncHistoryEntry {
            id: Uuid::new_v4().to_string(),
            timestamp: self.clock.now(),
            kind,
            direction,
            result: result.clone(),
        };
        let snapshot = {
            let mut history = self.history.write();
            history.insert(0, entry);
            history.truncate(self.history_limit);
            history.clone()
        };
        if let Err(e) = save_json(self.store.as_ref(), StoreKey::SyncHistory, &snapshot).await {
            warn!("SheetsSyncService: failed to persist sync history: {}", e);
        }
    }

    pub async fn test_connection(&self, config: &GoogleSheetsConfig) -> bool {
        match self.fetcher.fetch_rows(config).await {
            Ok(_) => true,
            Err(e) => {
                warn!("SheetsSyncService: connection test failed: {}", e);
                false
            }
        }
    }

    /// Test the connection and store the config on success
    pub async fn setup(&self, mut config: GoogleSheetsConfig) -> Result<GoogleSheetsConfig> {
        info!(
            "SheetsSyncService: setup sheet={} range={}!{}",
            config.spreadsheet_id, config.sheet_name, config.range
        );
        if config.spreadsheet_id.trim().is_empty() || config.sheet_name.trim().is_empty() {
            return Err(CoasterError::validation(
                "Spreadsheet id and sheet name are required",
            ));
        }
        self.fetcher.fetch_rows(&config).await?;

        config.is_connected = true;
        *self.config.write() = Some(config.clone());
        self.persist_config().await?;
        Ok(config)
    }

    pub async fn set_auto_sync(
        &self,
        enabled: bool,
        interval_minutes: u64,
    ) -> Result<GoogleSheetsConfig> {
        let updated = {
            let mut guard = self.config.write();
            let config = guard
                .as_mut()
                .ok_or_else(|| CoasterError::validation("Google Sheets is not configured"))?;
            config.auto_sync = enabled;
            config.sync_interval_minutes = interval_minutes.max(1);
            config.clone()
        };
        self.persist_config().await?;
        Ok(updated)
    }

    async fn merge_into_catalog(&self, mapping: RowMapping) -> Result<usize> {
        let count = mapping.beans.len();
        let merged = merge_beans(self.catalog.list(), mapping.beans, self.clock.now());
        self.catalog.replace_all(merged).await?;
        Ok(count)
    }

    /// Pull the configured range and merge it into the catalog
    pub async fn import_from_sheets(&self, kind: SyncKind) -> SyncResult {
        info!("SheetsSyncService: import_from_sheets ({})", kind.as_ref());
        let now = self.clock.now();
        let Some(config) = self.config() else {
            return SyncResult::failed(
                "Google Sheets is not configured",
                "No configuration",
                now,
            );
        };

        let rows = match self.fetcher.fetch_rows(&config).await {
            Ok(rows) => rows,
            Err(e) => {
                let result = SyncResult::failed(format!("Sync failed: {}", e.message()), e.to_string(), now);
                self.record_history(kind, SyncDirection::Import, &result).await;
                return result;
            }
        };

        let Some((headers, data)) = rows.split_first() else {
            return SyncResult::failed("The sheet has no data", "No data", now);
        };

        let mapping = map_rows(headers, data, 2, now);
        let errors = mapping.errors.clone();
        let result = match self.merge_into_catalog(mapping).await {
            Ok(count) => SyncResult {
                success: true,
                message: format!("Imported {} beans from the sheet", count),
                synced_count: count,
                errors,
                timestamp: now,
            },
            Err(e) => SyncResult::failed(format!("Sync failed: {}", e.message()), e.to_string(), now),
        };

        self.record_history(kind, SyncDirection::Import, &result).await;
        if result.success {
            if let Some(config) = self.config.write().as_mut() {
                config.last_sync = Some(now);
            }
            if let Err(e) = self.persist_config().await {
                warn!("SheetsSyncService: failed to persist last sync time: {}", e);
            }
        }
        debug!(
            "SheetsSyncService: import done, {} beans, {} row errors",
            result.synced_count,
            result.errors.len()
        );
        result
    }

    /// Import CSV text (same column mapping as the sheet)
    pub async fn import_csv(&self, text: &str) -> SyncResult {
        info!("SheetsSyncService: import_csv ({} bytes)", text.len());
        let now = self.clock.now();
        let result = match csv_to_beans(text, now) {
            Ok(mapping) => {
                let errors = mapping.errors.clone();
                match self.merge_into_catalog(mapping).await {
                    Ok(count) => SyncResult {
                        success: true,
                        message: format!("Imported {} beans from CSV", count),
                        synced_count: count,
                        errors,
                        timestamp: now,
                    },
                    Err(e) => SyncResult::failed(
                        format!("Import failed: {}", e.message()),
                        e.to_string(),
                        now,
                    ),
                }
            }
            Err(e) => SyncResult::failed(
                format!("Import failed: {}", e.message()),
                e.to_string(),
                now,
            ),
        };
        self.record_history(SyncKind::Manual, SyncDirection::Import, &result)
            .await;
        result
    }

    /// Catalog as CSV, for manual upload to the sheet
    pub async fn export_csv(&self) -> Result<(String, SyncResult)> {
        let beans = self.catalog.list();
        info!("SheetsSyncService: export_csv {} beans", beans.len());
        let csv = beans_to_csv(&beans)?;

        let result = SyncResult {
            success: true,
            message: format!(
                "Exported {} beans as CSV. Upload the file to the sheet manually.",
                beans.len()
            ),
            synced_count: beans.len(),
            errors: Vec::new(),
            timestamp: self.clock.now(),
        };
        self.record_history(SyncKind::Manual, SyncDirection::Export, &result)
            .await;
        Ok((csv, result))
    }

    /// Periodic import while `auto_sync` is on
    ///
    /// Returns `None` when auto sync is off. The interval is read once; the
    /// flag is re-checked before each run.
    pub fn spawn_auto_sync(self: Arc<Self>) -> Option<JoinHandle<()>> {
        let config = self.config().filter(|c| c.auto_sync)?;
        let period = Duration::from_secs(auto_sync_period_secs(config.sync_interval_minutes));
        info!(
            "SheetsSyncService: auto sync every {} minutes",
            config.sync_interval_minutes
        );

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if !self.config().is_some_and(|c| c.auto_sync) {
                    debug!("SheetsSyncService: auto sync disabled, skipping tick");
                    continue;
                }
                let result = self.import_from_sheets(SyncKind::Auto).await;
                if !result.success {
                    warn!("SheetsSyncService: auto sync failed: {}", result.message);
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_url_encodes_range_and_key() {
        let client = GoogleSheetsClient::new(&SheetsConfig::default());
        let mut config = GoogleSheetsConfig::new("abc123", "Beans List", "A1:L100");
        assert_eq!(
            client.values_url(&config),
            "https://sheets.googleapis.com/v4/spreadsheets/abc123/values/Beans%20List%21A1%3AL100"
        );
        config.api_key = Some("k&y".to_string());
        assert!(client.values_url(&config).ends_with("?key=k%26y"));
    }

    #[test]
    fn test_auto_sync_period_is_bounded() {
        assert_eq!(auto_sync_period_secs(0), 60);
        assert_eq!(auto_sync_period_secs(15), 900);
        assert_eq!(auto_sync_period_secs(u64::MAX), MAX_SYNC_PERIOD_SECS);
    }

    #[test]
    fn test_merge_keeps_identity() {
        let then = Utc::now() - chrono::Duration::days(10);
        let now = Utc::now();
        let mut existing = CoffeeBean::new("1", "Geisha Panama", then);
        existing.origin = "Panama".to_string();
        existing.nfc_chip_id = "NFC002".to_string();

        let mut imported = CoffeeBean::new("sheet-1-2", "GEISHA panama", now);
        imported.origin = "panama".to_string();
        imported.description = "updated".to_string();
        let fresh = CoffeeBean::new("sheet-1-3", "Sidamo", now);

        let merged = merge_beans(vec![existing], vec![imported, fresh], now);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].id, "1");
        assert_eq!(merged[0].nfc_chip_id, "NFC002");
        assert_eq!(merged[0].created_at, then);
        assert_eq!(merged[0].description, "updated");
        assert_eq!(merged[1].id, "sheet-1-3");
    }

    #[test]
    fn test_config_accepts_sync_interval_alias() {
        let json = r#"{"spreadsheetId":"x","sheetName":"s","range":"A1:B2","autoSync":true,"syncInterval":15}"#;
        let config: GoogleSheetsConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.sync_interval_minutes, 15);
        assert!(config.auto_sync);
    }
}

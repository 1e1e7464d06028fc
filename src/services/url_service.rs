//! Shareable-URL generator service
//!
//! Derives slug, full URL, short URL, QR image and SEO score for a bean and
//! keeps one [`UrlRecord`] per slug. Records live in a `DashMap` so click
//! increments are done in place under the entry lock; the [`SlugConfig`] is
//! swapped wholesale through `ArcSwap` on update.

use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Datelike, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::GeneratorConfig;
use crate::errors::{CoasterError, Result};
use crate::storage::{BeanCatalog, CoffeeBean, KeyValueStore, StoreKey, load_json, save_json};
use crate::system::Clock;
use crate::utils::qr::{QrEncoder, QrOptions};
use crate::utils::slug::{SlugPattern, build_full_url, build_slug, score_seo, short_code};
use crate::utils::url_validator::{UrlCheck, url_check_report, validate_url};

/// Alternatives offered when a slug is taken
pub const MAX_SUGGESTIONS: usize = 3;
/// Numeric suffixes tried by [`UrlGeneratorService::suggest_alternatives`]
pub const NUMERIC_SUFFIXES: std::ops::RangeInclusive<u32> = 1..=5;
/// Length of the truncated alternative
pub const TRUNCATED_SLUG_LEN: usize = 20;
/// Entries in [`UrlStats::top_performing`]
pub const TOP_PERFORMING: usize = 5;

// ============ Config & records ============

/// Process-wide generator settings, persisted under `url-generator-config`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlugConfig {
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_domain: Option<String>,
    #[serde(default, alias = "urlPattern")]
    pub pattern: SlugPattern,
    #[serde(default)]
    pub use_short_url: bool,
    #[serde(default, rename = "enableQR", alias = "enableQr")]
    pub enable_qr: bool,
    #[serde(default)]
    pub seo_optimized: bool,
}

impl From<&GeneratorConfig> for SlugConfig {
    fn from(config: &GeneratorConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            custom_domain: config.custom_domain.clone(),
            pattern: config.pattern,
            use_short_url: config.use_short_url,
            enable_qr: config.enable_qr,
            seo_optimized: config.seo_optimized,
        }
    }
}

/// Typed partial update of [`SlugConfig`]
///
/// `None` keeps the current value. `custom_domain: Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct SlugConfigUpdate {
    pub base_url: Option<String>,
    pub custom_domain: Option<Option<String>>,
    pub pattern: Option<SlugPattern>,
    pub use_short_url: Option<bool>,
    pub enable_qr: Option<bool>,
    pub seo_optimized: Option<bool>,
}

impl SlugConfigUpdate {
    fn validate(&self) -> Result<()> {
        if let Some(base) = &self.base_url {
            validate_url(base)
                .map_err(|e| CoasterError::validation(format!("Invalid base URL: {}", e)))?;
        }
        if let Some(Some(domain)) = &self.custom_domain {
            if !domain.trim().is_empty() {
                validate_url(domain).map_err(|e| {
                    CoasterError::validation(format!("Invalid custom domain: {}", e))
                })?;
            }
        }
        Ok(())
    }

    fn apply(self, config: &SlugConfig) -> SlugConfig {
        SlugConfig {
            base_url: self.base_url.unwrap_or_else(|| config.base_url.clone()),
            custom_domain: match self.custom_domain {
                Some(domain) => domain.filter(|d| !d.trim().is_empty()),
                None => config.custom_domain.clone(),
            },
            pattern: self.pattern.unwrap_or(config.pattern),
            use_short_url: self.use_short_url.unwrap_or(config.use_short_url),
            enable_qr: self.enable_qr.unwrap_or(config.enable_qr),
            seo_optimized: self.seo_optimized.unwrap_or(config.seo_optimized),
        }
    }
}

/// One generated slug and who owns it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlRecord {
    pub slug: String,
    #[serde(alias = "beanId")]
    pub entity_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, alias = "clicks")]
    pub click_count: u64,
}

// ============ Results ============

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UrlPreview {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlResult {
    pub full_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_url: Option<String>,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<String>,
    pub seo_score: u8,
    pub preview: UrlPreview,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopUrl {
    pub slug: String,
    pub clicks: u64,
    /// Bean name, `Unknown` when the bean is gone
    pub bean: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlStats {
    pub total_urls: usize,
    pub active_urls: usize,
    pub click_count: u64,
    pub top_performing: Vec<TopUrl>,
}

/// Outcome of taking a slug
enum Claim {
    Fresh,
    /// Same entity again; holds the record as it was
    Reclaimed(UrlRecord),
    Taken,
}

// ============ UrlGeneratorService Implementation ============

pub struct UrlGeneratorService {
    store: Arc<dyn KeyValueStore>,
    config: ArcSwap<SlugConfig>,
    records: DashMap<String, UrlRecord>,
    qr: Arc<dyn QrEncoder>,
    qr_options: QrOptions,
    brand_name: String,
    clock: Arc<dyn Clock>,
}

impl UrlGeneratorService {
    /// Load persisted config and history
    ///
    /// The stored config wins over `defaults`; a missing one is written from
    /// `defaults`.
    pub async fn load(
        store: Arc<dyn KeyValueStore>,
        defaults: &GeneratorConfig,
        qr: Arc<dyn QrEncoder>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let config = match load_json::<SlugConfig>(store.as_ref(), StoreKey::GeneratorConfig).await? {
            Some(config) => config,
            None => {
                let config = SlugConfig::from(defaults);
                save_json(store.as_ref(), StoreKey::GeneratorConfig, &config).await?;
                config
            }
        };

        let history = load_json::<Vec<UrlRecord>>(store.as_ref(), StoreKey::UrlHistory)
            .await?
            .unwrap_or_default();
        let records = DashMap::with_capacity(history.len());
        for record in history {
            records.insert(record.slug.clone(), record);
        }
        debug!(
            "UrlGeneratorService: loaded {} url records, pattern={}",
            records.len(),
            config.pattern.as_ref()
        );

        Ok(Self {
            store,
            config: ArcSwap::from_pointee(config),
            records,
            qr,
            qr_options: QrOptions {
                width: defaults.qr_width,
                margin: defaults.qr_margin,
                error_correction: defaults.qr_error_correction,
            },
            brand_name: defaults.brand_name.clone(),
            clock,
        })
    }

    async fn persist_records(&self) -> Result<()> {
        save_json(self.store.as_ref(), StoreKey::UrlHistory, &self.records()).await
    }

    pub fn config(&self) -> SlugConfig {
        SlugConfig::clone(&self.config.load())
    }

    /// Apply a validated partial update and persist it
    pub async fn update_config(&self, update: SlugConfigUpdate) -> Result<SlugConfig> {
        info!("UrlGeneratorService: update_config {:?}", update);
        update.validate()?;

        let next = update.apply(&self.config.load());
        save_json(self.store.as_ref(), StoreKey::GeneratorConfig, &next).await?;
        self.config.store(Arc::new(next.clone()));
        Ok(next)
    }

    /// All records, oldest first
    pub fn records(&self) -> Vec<UrlRecord> {
        let mut all: Vec<UrlRecord> = self.records.iter().map(|r| r.value().clone()).collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.slug.cmp(&b.slug)));
        all
    }

    pub fn record(&self, slug: &str) -> Option<UrlRecord> {
        self.records.get(slug).map(|r| r.value().clone())
    }

    // ============ URL building ============

    pub fn build_full_url(&self, slug: &str) -> String {
        let config = self.config.load();
        build_full_url(slug, &config.base_url, config.custom_domain.as_deref())
    }

    /// `{base_url}/s/{code}`; always on the base URL, never the custom domain
    pub fn build_short_url(&self, full_url: &str) -> String {
        let config = self.config.load();
        format!(
            "{}/s/{}",
            config.base_url.trim_end_matches('/'),
            short_code(full_url)
        )
    }

    pub async fn build_qr_payload(&self, url: &str) -> Result<String> {
        self.qr.encode(url, self.qr_options).await
    }

    fn preview(&self, bean: &CoffeeBean, slug: &str) -> UrlPreview {
        let description = if bean.description.trim().is_empty() {
            format!(
                "{} {} grown {}, {} process. Tasting notes: {}.",
                bean.origin,
                bean.region,
                bean.varieties,
                bean.process,
                bean.flavor_notes.join(", ")
            )
        } else {
            bean.description.clone()
        };
        let image_slug = if bean.custom_url.is_empty() {
            slug
        } else {
            bean.custom_url.as_str()
        };

        UrlPreview {
            title: format!("{} - {} | {}", bean.name, bean.origin, self.brand_name),
            description,
            image: Some(format!("/images/beans/{}.jpg", image_slug)),
        }
    }

    /// Generate every artifact for a bean and register its slug
    ///
    /// Regenerating for the same bean updates its record in place. A slug
    /// owned by another bean is a [`CoasterError::SlugConflict`] listing the
    /// available alternatives. QR failures are logged and leave `qr_code`
    /// empty.
    pub async fn generate(&self, bean: &CoffeeBean) -> Result<UrlResult> {
        info!("UrlGeneratorService: generate for bean '{}'", bean.id);
        let config = self.config.load_full();

        let slug = build_slug(bean, config.pattern)?;
        // claimed before any await so a concurrent generate sees the owner
        let previous = match self.claim(&slug, &bean.id) {
            Claim::Fresh => None,
            Claim::Reclaimed(record) => Some(record),
            Claim::Taken => {
                let alternatives = self.suggest_alternatives(&slug);
                warn!(
                    "UrlGeneratorService: slug '{}' is taken, alternatives {:?}",
                    slug, alternatives
                );
                return Err(CoasterError::slug_conflict(format!(
                    "Slug '{}' is already used by another bean. Try: {}",
                    slug,
                    alternatives.join(", ")
                )));
            }
        };

        let full_url = self.build_full_url(&slug);
        let short_url = config
            .use_short_url
            .then(|| self.build_short_url(&full_url));
        let qr_code = if config.enable_qr {
            match self.build_qr_payload(&full_url).await {
                Ok(data) => Some(data),
                Err(e) => {
                    warn!("UrlGeneratorService: QR generation failed for '{}': {}", slug, e);
                    None
                }
            }
        } else {
            None
        };
        let seo_score = score_seo(bean, &slug);
        let preview = self.preview(bean, &slug);

        if let Err(e) = self.persist_records().await {
            self.release(&slug, &bean.id, previous);
            return Err(e);
        }

        debug!(
            "UrlGeneratorService: '{}' -> {} (seo {})",
            bean.id, full_url, seo_score
        );
        Ok(UrlResult {
            full_url,
            short_url,
            slug,
            qr_code,
            seo_score,
            preview,
        })
    }

    /// Take `slug` for `entity_id` in one step on the map entry
    fn claim(&self, slug: &str, entity_id: &str) -> Claim {
        let now = self.clock.now();
        match self.records.entry(slug.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().entity_id != entity_id {
                    return Claim::Taken;
                }
                let previous = occupied.get().clone();
                occupied.get_mut().created_at = now;
                Claim::Reclaimed(previous)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(UrlRecord {
                    slug: slug.to_string(),
                    entity_id: entity_id.to_string(),
                    created_at: now,
                    click_count: 0,
                });
                Claim::Fresh
            }
        }
    }

    /// Undo a [`claim`](Self::claim) whose write did not reach the store
    fn release(&self, slug: &str, entity_id: &str, previous: Option<UrlRecord>) {
        match previous {
            Some(record) => {
                if let Some(mut current) = self.records.get_mut(slug) {
                    current.created_at = record.created_at;
                }
            }
            None => {
                self.records.remove_if(slug, |_, r| r.entity_id == entity_id);
            }
        }
        debug!("UrlGeneratorService: released '{}' after failed save", slug);
    }

    /// Generate for each bean; failures are logged and skipped
    pub async fn generate_bulk(&self, beans: &[CoffeeBean]) -> Vec<UrlResult> {
        info!("UrlGeneratorService: bulk generate for {} beans", beans.len());
        let mut results = Vec::with_capacity(beans.len());
        for bean in beans {
            match self.generate(bean).await {
                Ok(result) => results.push(result),
                Err(e) => warn!(
                    "UrlGeneratorService: skipped bean '{}' ({}): {}",
                    bean.id, bean.name, e
                ),
            }
        }
        debug!(
            "UrlGeneratorService: bulk generated {}/{}",
            results.len(),
            beans.len()
        );
        results
    }

    /// False only when a different bean already owns `slug`
    pub fn is_slug_available(&self, slug: &str, excluding_entity_id: Option<&str>) -> bool {
        match self.records.get(slug) {
            Some(record) => excluding_entity_id.is_some_and(|id| record.entity_id == id),
            None => true,
        }
    }

    /// Up to three free alternatives, in priority order: first free numeric
    /// suffix, current-year suffix, 20-character truncation
    pub fn suggest_alternatives(&self, base_slug: &str) -> Vec<String> {
        let mut candidates = Vec::with_capacity(MAX_SUGGESTIONS);

        if let Some(numbered) = NUMERIC_SUFFIXES
            .map(|n| format!("{}-{}", base_slug, n))
            .find(|s| self.is_slug_available(s, None))
        {
            candidates.push(numbered);
        }

        let year = format!("{}-{}", base_slug, self.clock.now().year());
        if self.is_slug_available(&year, None) {
            candidates.push(year);
        }

        if base_slug.len() > TRUNCATED_SLUG_LEN {
            let short = base_slug
                .chars()
                .take(TRUNCATED_SLUG_LEN)
                .collect::<String>()
                .trim_end_matches('-')
                .to_string();
            if !short.is_empty() && self.is_slug_available(&short, None) {
                candidates.push(short);
            }
        }

        let mut seen = std::collections::HashSet::new();
        candidates.retain(|c| seen.insert(c.clone()));
        candidates.truncate(MAX_SUGGESTIONS);
        candidates
    }

    /// Increment the click counter of `slug`; returns the new count
    pub async fn record_click(&self, slug: &str) -> Result<u64> {
        let count = {
            let mut record = self
                .records
                .get_mut(slug)
                .ok_or_else(|| CoasterError::not_found(format!("No URL record for slug '{}'", slug)))?;
            record.click_count += 1;
            record.click_count
        };
        debug!("UrlGeneratorService: click on '{}' -> {}", slug, count);
        if let Err(e) = self.persist_records().await {
            if let Some(mut record) = self.records.get_mut(slug) {
                record.click_count = record.click_count.saturating_sub(1);
            }
            return Err(e);
        }
        Ok(count)
    }

    pub fn stats(&self, catalog: &BeanCatalog) -> UrlStats {
        let records = self.records();
        let active_urls = records
            .iter()
            .filter(|r| catalog.get(&r.entity_id).is_some_and(|b| b.is_active))
            .count();
        let click_count = records.iter().map(|r| r.click_count).sum();

        let mut ranked = records.clone();
        // stable: equal counts stay oldest first
        ranked.sort_by(|a, b| b.click_count.cmp(&a.click_count));
        let top_performing = ranked
            .into_iter()
            .take(TOP_PERFORMING)
            .map(|r| TopUrl {
                bean: catalog.name_of(&r.entity_id),
                slug: r.slug,
                clicks: r.click_count,
            })
            .collect();

        UrlStats {
            total_urls: records.len(),
            active_urls,
            click_count,
            top_performing,
        }
    }

    pub fn validate_url(&self, url: &str) -> UrlCheck {
        url_check_report(url)
    }
}

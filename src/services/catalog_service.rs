//! Coffee-bean catalog service
//!
//! Owns the `coffee-beans` collection. The analytics and URL services only
//! read it through [`BeanCatalog`] snapshots.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::{CoasterError, Result};
use crate::storage::{BeanCatalog, CoffeeBean, KeyValueStore, SaleInfo, StoreKey, load_json, save_json};
use crate::system::Clock;
use crate::utils::slug::sanitize_slug;

// ============ Request DTOs ============

/// Editable fields of a bean
#[derive(Debug, Clone, Default)]
pub struct BeanDraft {
    pub name: String,
    pub origin: String,
    pub varieties: String,
    pub process: String,
    pub region: String,
    pub altitude: String,
    pub flavor_notes: Vec<String>,
    pub description: String,
    pub story: String,
    /// Empty = derive from the name
    pub custom_url: String,
    pub is_active: bool,
    pub sale_info: Option<SaleInfo>,
}

impl BeanDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_active: true,
            ..Default::default()
        }
    }

    fn apply_to(self, bean: &mut CoffeeBean) {
        bean.custom_url = if self.custom_url.trim().is_empty() {
            sanitize_slug(&self.name)
        } else {
            sanitize_slug(&self.custom_url)
        };
        bean.name = self.name;
        bean.origin = self.origin;
        bean.varieties = self.varieties;
        bean.process = self.process;
        bean.region = self.region;
        bean.altitude = self.altitude;
        bean.flavor_notes = self.flavor_notes;
        bean.description = self.description;
        bean.story = self.story;
        bean.is_active = self.is_active;
        bean.sale_info = self.sale_info;
    }
}

/// Search over name/origin/varieties plus exact origin/process filters
#[derive(Debug, Clone, Default)]
pub struct BeanQuery {
    pub search: Option<String>,
    pub origin: Option<String>,
    pub process: Option<String>,
}

impl BeanQuery {
    fn matches(&self, bean: &CoffeeBean) -> bool {
        let term_ok = match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                [&bean.name, &bean.origin, &bean.varieties]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&term))
            }
            _ => true,
        };
        let origin_ok = self
            .origin
            .as_deref()
            .is_none_or(|o| o.is_empty() || bean.origin == o);
        let process_ok = self
            .process
            .as_deref()
            .is_none_or(|p| p.is_empty() || bean.process == p);
        term_ok && origin_ok && process_ok
    }
}

// ============ CatalogService Implementation ============

pub struct CatalogService {
    store: Arc<dyn KeyValueStore>,
    beans: RwLock<Vec<CoffeeBean>>,
    clock: Arc<dyn Clock>,
}

impl CatalogService {
    /// Load the catalog; an unwritten key is seeded with the two sample beans
    pub async fn load(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Result<Self> {
        let beans = match load_json::<Vec<CoffeeBean>>(store.as_ref(), StoreKey::Catalog).await? {
            Some(beans) => beans,
            None => {
                let samples = sample_beans();
                save_json(store.as_ref(), StoreKey::Catalog, &samples).await?;
                info!("CatalogService: seeded {} sample beans", samples.len());
                samples
            }
        };
        debug!("CatalogService: loaded {} beans", beans.len());
        Ok(Self {
            store,
            beans: RwLock::new(beans),
            clock,
        })
    }

    async fn persist(&self) -> Result<()> {
        let snapshot = self.beans.read().clone();
        save_json(self.store.as_ref(), StoreKey::Catalog, &snapshot).await
    }

    pub fn list(&self) -> Vec<CoffeeBean> {
        self.beans.read().clone()
    }

    pub fn search(&self, query: &BeanQuery) -> Vec<CoffeeBean> {
        self.beans
            .read()
            .iter()
            .filter(|b| query.matches(b))
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<CoffeeBean> {
        self.beans.read().iter().find(|b| b.id == id).cloned()
    }

    /// Read-only snapshot for the aggregator and generator
    pub fn catalog(&self) -> BeanCatalog {
        BeanCatalog::new(self.list())
    }

    pub async fn create(&self, draft: BeanDraft) -> Result<CoffeeBean> {
        info!("CatalogService: create bean '{}'", draft.name);
        validate_draft(&draft)?;

        let now = self.clock.now();
        let mut bean = CoffeeBean::new(Uuid::new_v4().to_string(), "", now);
        bean.nfc_chip_id = format!("NFC{}", now.timestamp_millis());
        draft.apply_to(&mut bean);

        self.beans.write().push(bean.clone());
        self.persist().await?;
        Ok(bean)
    }

    /// Replace the editable fields; id, chip id and `created_at` are kept
    pub async fn update(&self, id: &str, draft: BeanDraft) -> Result<CoffeeBean> {
        info!("CatalogService: update bean '{}'", id);
        validate_draft(&draft)?;

        let now = self.clock.now();
        let updated = {
            let mut beans = self.beans.write();
            let bean = beans
                .iter_mut()
                .find(|b| b.id == id)
                .ok_or_else(|| CoasterError::not_found(format!("Bean '{}' not found", id)))?;
            draft.apply_to(bean);
            bean.updated_at = now;
            bean.clone()
        };
        self.persist().await?;
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        info!("CatalogService: delete bean '{}'", id);
        {
            let mut beans = self.beans.write();
            let before = beans.len();
            beans.retain(|b| b.id != id);
            if beans.len() == before {
                return Err(CoasterError::not_found(format!("Bean '{}' not found", id)));
            }
        }
        self.persist().await
    }

    pub async fn set_active(&self, id: &str, active: bool) -> Result<CoffeeBean> {
        let now = self.clock.now();
        let updated = {
            let mut beans = self.beans.write();
            let bean = beans
                .iter_mut()
                .find(|b| b.id == id)
                .ok_or_else(|| CoasterError::not_found(format!("Bean '{}' not found", id)))?;
            bean.is_active = active;
            bean.updated_at = now;
            bean.clone()
        };
        info!("CatalogService: bean '{}' active={}", id, active);
        self.persist().await?;
        Ok(updated)
    }

    pub async fn toggle_active(&self, id: &str) -> Result<CoffeeBean> {
        let current = self
            .get(id)
            .ok_or_else(|| CoasterError::not_found(format!("Bean '{}' not found", id)))?;
        self.set_active(id, !current.is_active).await
    }

    /// Swap in a whole new collection (spreadsheet merge results)
    pub async fn replace_all(&self, beans: Vec<CoffeeBean>) -> Result<()> {
        info!("CatalogService: replacing catalog with {} beans", beans.len());
        *self.beans.write() = beans;
        self.persist().await
    }
}

fn validate_draft(draft: &BeanDraft) -> Result<()> {
    if draft.name.trim().is_empty() {
        warn!("CatalogService: rejected bean without a name");
        return Err(CoasterError::validation("Bean name is required"));
    }
    if let Some(sale) = &draft.sale_info {
        if sale.price < 0.0 || sale.stock < 0 {
            return Err(CoasterError::validation(
                "Price and stock must not be negative",
            ));
        }
    }
    Ok(())
}

fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

fn sample_beans() -> Vec<CoffeeBean> {
    let mut addisu = CoffeeBean::new("1", "Addisu Hulichaye, Ethiopia", date(2024, 1, 15));
    addisu.origin = "Ethiopia".to_string();
    addisu.varieties = "Heirloom".to_string();
    addisu.process = "Natural".to_string();
    addisu.region = "Yirgacheffe".to_string();
    addisu.altitude = "2000m".to_string();
    addisu.flavor_notes = vec!["Blueberry".into(), "Wine".into(), "Chocolate".into()];
    addisu.description = "Premium lot from the Yirgacheffe region of Ethiopia".to_string();
    addisu.story = "Heirloom cultivars grown at 2000m and processed natural".to_string();
    addisu.nfc_chip_id = "NFC001".to_string();
    addisu.custom_url = "addisu-hulichaye-ethiopia".to_string();
    addisu.sale_info = Some(SaleInfo {
        price: 45000.0,
        is_for_sale: true,
        stock: 50,
    });
    addisu.updated_at = date(2024, 1, 20);

    let mut geisha = CoffeeBean::new("2", "Geisha Panama", date(2024, 1, 10));
    geisha.origin = "Panama".to_string();
    geisha.varieties = "Geisha".to_string();
    geisha.process = "Washed".to_string();
    geisha.region = "Boquete".to_string();
    geisha.altitude = "1600m".to_string();
    geisha.flavor_notes = vec!["Jasmine".into(), "Bergamot".into(), "Tropical Fruit".into()];
    geisha.description = "Top-grade Panama Geisha".to_string();
    geisha.story = "One of the most expensive coffees in the world".to_string();
    geisha.nfc_chip_id = "NFC002".to_string();
    geisha.custom_url = "geisha-panama".to_string();
    geisha.sale_info = Some(SaleInfo {
        price: 120000.0,
        is_for_sale: true,
        stock: 20,
    });
    geisha.updated_at = date(2024, 1, 18);

    vec![addisu, geisha]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::system::FixedClock;

    async fn service() -> CatalogService {
        CatalogService::load(Arc::new(MemoryStore::new()), FixedClock::arc(date(2024, 10, 1)))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_first_load_seeds_samples() {
        let svc = service().await;
        assert_eq!(svc.list().len(), 2);
        assert_eq!(svc.catalog().name_of("2"), "Geisha Panama");
    }

    #[tokio::test]
    async fn test_create_derives_slug_and_chip() {
        let svc = service().await;
        let mut draft = BeanDraft::new("Kenya AA Kirinyaga");
        draft.origin = "Kenya".to_string();
        let bean = svc.create(draft).await.unwrap();
        assert_eq!(bean.custom_url, "kenya-aa-kirinyaga");
        assert!(bean.nfc_chip_id.starts_with("NFC"));
        assert_eq!(svc.list().len(), 3);
    }

    #[tokio::test]
    async fn test_create_requires_name() {
        let svc = service().await;
        let err = svc.create(BeanDraft::new("  ")).await.unwrap_err();
        assert!(matches!(err, CoasterError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_keeps_identity() {
        let svc = service().await;
        let before = svc.get("1").unwrap();
        let updated = svc.update("1", BeanDraft::new("Renamed")).await.unwrap();
        assert_eq!(updated.nfc_chip_id, before.nfc_chip_id);
        assert_eq!(updated.created_at, before.created_at);
        assert_eq!(updated.updated_at, date(2024, 10, 1));
    }

    #[tokio::test]
    async fn test_delete_and_toggle() {
        let svc = service().await;
        assert!(!svc.toggle_active("1").await.unwrap().is_active);
        svc.delete("1").await.unwrap();
        assert!(matches!(
            svc.delete("1").await.unwrap_err(),
            CoasterError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_search() {
        let svc = service().await;
        let hits = svc.search(&BeanQuery {
            search: Some("panama".to_string()),
            ..Default::default()
        });
        assert_eq!(hits.len(), 1);
        let hits = svc.search(&BeanQuery {
            process: Some("Natural".to_string()),
            ..Default::default()
        });
        assert_eq!(hits[0].id, "1");
    }
}

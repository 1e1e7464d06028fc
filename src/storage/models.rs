use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coffee bean catalog record
///
/// Text fields default to empty when absent from stored JSON or an import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoffeeBean {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub varieties: String,
    #[serde(default)]
    pub process: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub altitude: String,
    #[serde(default)]
    pub flavor_notes: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub story: String,
    #[serde(default)]
    pub nfc_chip_id: String,
    #[serde(default)]
    pub custom_url: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub sale_info: Option<SaleInfo>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl CoffeeBean {
    /// Blank record with only the identity and timestamps filled in
    pub fn new(id: impl Into<String>, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            origin: String::new(),
            varieties: String::new(),
            process: String::new(),
            region: String::new(),
            altitude: String::new(),
            flavor_notes: Vec::new(),
            description: String::new(),
            story: String::new(),
            nfc_chip_id: String::new(),
            custom_url: String::new(),
            is_active: true,
            sale_info: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn price(&self) -> f64 {
        self.sale_info.as_ref().map(|s| s.price).unwrap_or(0.0)
    }

    pub fn stock(&self) -> i64 {
        self.sale_info.as_ref().map(|s| s.stock).unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleInfo {
    pub price: f64,
    pub is_for_sale: bool,
    pub stock: i64,
}

/// Read-only id lookup over a snapshot of the catalog
///
/// Preserves catalog order for callers that iterate every bean.
#[derive(Debug, Clone, Default)]
pub struct BeanCatalog {
    beans: Vec<CoffeeBean>,
    index: HashMap<String, usize>,
}

impl BeanCatalog {
    pub fn new(beans: Vec<CoffeeBean>) -> Self {
        let mut index = HashMap::with_capacity(beans.len());
        for (i, bean) in beans.iter().enumerate() {
            index.entry(bean.id.clone()).or_insert(i);
        }
        Self { beans, index }
    }

    pub fn get(&self, id: &str) -> Option<&CoffeeBean> {
        self.index.get(id).map(|&i| &self.beans[i])
    }

    /// Bean name, or `"Unknown"` for ids missing from the catalog
    pub fn name_of(&self, id: &str) -> String {
        self.get(id)
            .map(|b| b.name.clone())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    pub fn beans(&self) -> &[CoffeeBean] {
        &self.beans
    }

    pub fn len(&self) -> usize {
        self.beans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beans.is_empty()
    }
}

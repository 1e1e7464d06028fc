//! Cafe profile and social-media accounts
//!
//! Each section of the profile has its own typed update so a partial edit can
//! only touch the fields it names.

use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDateTime, NaiveTime, Timelike, Utc, Weekday};
use parking_lot::RwLock;
use rand::Rng;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter};
use tracing::{debug, info, warn};

use crate::analytics::Coordinates;
use crate::errors::{CoasterError, Result};
use crate::storage::{KeyValueStore, StoreKey, load_json, save_json};
use crate::system::Clock;
use crate::utils::url_validator::validate_url;

// ============ Profile types ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayHours {
    /// `HH:MM`
    pub open: String,
    /// `HH:MM`
    pub close: String,
    #[serde(default)]
    pub is_closed: bool,
}

impl DayHours {
    pub fn new(open: &str, close: &str) -> Self {
        Self {
            open: open.to_string(),
            close: close.to_string(),
            is_closed: false,
        }
    }

    pub fn closed() -> Self {
        Self {
            open: "00:00".to_string(),
            close: "00:00".to_string(),
            is_closed: true,
        }
    }

    fn validate(&self) -> Result<(NaiveTime, NaiveTime)> {
        let open = parse_hhmm(&self.open)?;
        let close = parse_hhmm(&self.close)?;
        if !self.is_closed && open >= close {
            return Err(CoasterError::validation(format!(
                "Opening time {} must be before closing time {}",
                self.open, self.close
            )));
        }
        Ok((open, close))
    }
}

fn parse_hhmm(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|_| {
        CoasterError::validation(format!("Invalid time '{}', expected HH:MM", value))
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessHours {
    pub monday: DayHours,
    pub tuesday: DayHours,
    pub wednesday: DayHours,
    pub thursday: DayHours,
    pub friday: DayHours,
    pub saturday: DayHours,
    pub sunday: DayHours,
}

impl BusinessHours {
    pub fn get(&self, day: Weekday) -> &DayHours {
        match day {
            Weekday::Mon => &self.monday,
            Weekday::Tue => &self.tuesday,
            Weekday::Wed => &self.wednesday,
            Weekday::Thu => &self.thursday,
            Weekday::Fri => &self.friday,
            Weekday::Sat => &self.saturday,
            Weekday::Sun => &self.sunday,
        }
    }

    fn get_mut(&mut self, day: Weekday) -> &mut DayHours {
        match day {
            Weekday::Mon => &mut self.monday,
            Weekday::Tue => &mut self.tuesday,
            Weekday::Wed => &mut self.wednesday,
            Weekday::Thu => &mut self.thursday,
            Weekday::Fri => &mut self.friday,
            Weekday::Sat => &mut self.saturday,
            Weekday::Sun => &mut self.sunday,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CafeAddress {
    pub street: String,
    pub city: String,
    pub zip_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CafeContact {
    pub phone: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CafeInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub logo: String,
    pub address: CafeAddress,
    pub contact: CafeContact,
    pub business_hours: BusinessHours,
}

impl Default for CafeInfo {
    fn default() -> Self {
        let weekday = DayHours::new("07:00", "22:00");
        Self {
            id: "cafe-001".to_string(),
            name: "M1CT Coffee".to_string(),
            description: "Specialty coffee meets NFC: every bean's story is one tap away \
                          on our coasters."
                .to_string(),
            logo: "/logo.png".to_string(),
            address: CafeAddress {
                street: "123 Teheran-ro, Gangnam-gu".to_string(),
                city: "Seoul".to_string(),
                zip_code: "06142".to_string(),
                coordinates: Some(Coordinates {
                    lat: 37.5665,
                    lng: 126.9780,
                }),
            },
            contact: CafeContact {
                phone: "02-1234-5678".to_string(),
                email: "info@m1ct.coffee".to_string(),
                website: Some("https://m1ct.coffee".to_string()),
            },
            business_hours: BusinessHours {
                monday: weekday.clone(),
                tuesday: weekday.clone(),
                wednesday: weekday.clone(),
                thursday: weekday,
                friday: DayHours::new("07:00", "23:00"),
                saturday: DayHours::new("08:00", "23:00"),
                sunday: DayHours::new("08:00", "21:00"),
            },
        }
    }
}

// ============ Social media types ============

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SocialPlatform {
    Instagram,
    Facebook,
    Twitter,
    Threads,
    Blog,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialMediaAccount {
    pub platform: SocialPlatform,
    pub handle: String,
    pub url: String,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follower_count: Option<u64>,
    pub last_updated: DateTime<Utc>,
}

fn default_accounts(now: DateTime<Utc>) -> Vec<SocialMediaAccount> {
    let account = |platform, handle: &str, url: &str, is_active, followers| SocialMediaAccount {
        platform,
        handle: handle.to_string(),
        url: url.to_string(),
        is_active,
        follower_count: Some(followers),
        last_updated: now,
    };
    vec![
        account(
            SocialPlatform::Instagram,
            "@m1ct_coffee",
            "https://instagram.com/m1ct_coffee",
            true,
            12500,
        ),
        account(
            SocialPlatform::Facebook,
            "M1CT Coffee",
            "https://facebook.com/m1ctcoffee",
            true,
            8200,
        ),
        account(
            SocialPlatform::Threads,
            "@m1ct_coffee",
            "https://threads.net/@m1ct_coffee",
            false,
            0,
        ),
        account(
            SocialPlatform::Blog,
            "M1CT Coffee Blog",
            "https://blog.m1ct.coffee",
            true,
            0,
        ),
    ]
}

// ============ Update DTOs ============

#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub logo: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AddressUpdate {
    pub street: Option<String>,
    pub city: Option<String>,
    pub zip_code: Option<String>,
    /// `Some(None)` removes the coordinates
    pub coordinates: Option<Option<Coordinates>>,
}

#[derive(Debug, Clone, Default)]
pub struct ContactUpdate {
    pub phone: Option<String>,
    pub email: Option<String>,
    /// `Some(None)` removes the website
    pub website: Option<Option<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct SocialAccountUpdate {
    pub handle: Option<String>,
    pub url: Option<String>,
    pub is_active: Option<bool>,
    pub follower_count: Option<Option<u64>>,
}

/// New account; `last_updated` is stamped by the service
#[derive(Debug, Clone)]
pub struct NewSocialAccount {
    pub platform: SocialPlatform,
    pub handle: String,
    pub url: String,
    pub is_active: bool,
    pub follower_count: Option<u64>,
}

// ============ Reports ============

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CafeStats {
    /// Sum over active accounts
    pub total_followers: u64,
    pub active_platforms: usize,
    pub last_update: Option<DateTime<Utc>>,
    /// Active platform with most followers, `none` when no account is active
    pub top_platform: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessStatus {
    pub is_open: bool,
    pub next_change: String,
    pub today_hours: DayHours,
}

// ============ CafeService Implementation ============

pub struct CafeService {
    store: Arc<dyn KeyValueStore>,
    info: RwLock<CafeInfo>,
    accounts: RwLock<Vec<SocialMediaAccount>>,
    clock: Arc<dyn Clock>,
}

impl CafeService {
    /// Load both collections, writing the defaults for whichever is missing
    pub async fn load(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Result<Self> {
        let info = match load_json::<CafeInfo>(store.as_ref(), StoreKey::CafeInfo).await? {
            Some(info) => info,
            None => {
                let info = CafeInfo::default();
                save_json(store.as_ref(), StoreKey::CafeInfo, &info).await?;
                info
            }
        };
        let accounts =
            match load_json::<Vec<SocialMediaAccount>>(store.as_ref(), StoreKey::SocialMedia)
                .await?
            {
                Some(accounts) => accounts,
                None => {
                    let accounts = default_accounts(clock.now());
                    save_json(store.as_ref(), StoreKey::SocialMedia, &accounts).await?;
                    accounts
                }
            };
        debug!(
            "CafeService: loaded '{}' with {} social accounts",
            info.name,
            accounts.len()
        );

        Ok(Self {
            store,
            info: RwLock::new(info),
            accounts: RwLock::new(accounts),
            clock,
        })
    }

    async fn persist_info(&self) -> Result<CafeInfo> {
        let snapshot = self.info.read().clone();
        save_json(self.store.as_ref(), StoreKey::CafeInfo, &snapshot).await?;
        Ok(snapshot)
    }

    async fn persist_accounts(&self) -> Result<Vec<SocialMediaAccount>> {
        let snapshot = self.accounts.read().clone();
        save_json(self.store.as_ref(), StoreKey::SocialMedia, &snapshot).await?;
        Ok(snapshot)
    }

    pub fn info(&self) -> CafeInfo {
        self.info.read().clone()
    }

    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<CafeInfo> {
        info!("CafeService: update_profile {:?}", update);
        if update.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(CoasterError::validation("Cafe name cannot be empty"));
        }
        {
            let mut info = self.info.write();
            if let Some(name) = update.name {
                info.name = name;
            }
            if let Some(description) = update.description {
                info.description = description;
            }
            if let Some(logo) = update.logo {
                info.logo = logo;
            }
        }
        self.persist_info().await
    }

    pub async fn update_address(&self, update: AddressUpdate) -> Result<CafeInfo> {
        info!("CafeService: update_address {:?}", update);
        for (field, value) in [("street", &update.street), ("city", &update.city)] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(CoasterError::validation(format!(
                    "Address {} cannot be empty",
                    field
                )));
            }
        }
        {
            let mut info = self.info.write();
            let address = &mut info.address;
            if let Some(street) = update.street {
                address.street = street;
            }
            if let Some(city) = update.city {
                address.city = city;
            }
            if let Some(zip_code) = update.zip_code {
                address.zip_code = zip_code;
            }
            if let Some(coordinates) = update.coordinates {
                address.coordinates = coordinates;
            }
        }
        self.persist_info().await
    }

    pub async fn update_contact(&self, update: ContactUpdate) -> Result<CafeInfo> {
        info!("CafeService: update_contact {:?}", update);
        if let Some(email) = &update.email {
            if !email.contains('@') {
                return Err(CoasterError::validation(format!(
                    "Invalid email address: '{}'",
                    email
                )));
            }
        }
        if let Some(Some(website)) = &update.website {
            validate_url(website)
                .map_err(|e| CoasterError::validation(format!("Invalid website: {}", e)))?;
        }
        {
            let mut info = self.info.write();
            let contact = &mut info.contact;
            if let Some(phone) = update.phone {
                contact.phone = phone;
            }
            if let Some(email) = update.email {
                contact.email = email;
            }
            if let Some(website) = update.website {
                contact.website = website;
            }
        }
        self.persist_info().await
    }

    /// Replace one day's hours after validating `HH:MM` and open < close
    pub async fn update_business_hours(&self, day: Weekday, hours: DayHours) -> Result<CafeInfo> {
        info!("CafeService: update_business_hours {} {:?}", day, hours);
        hours.validate()?;
        *self.info.write().business_hours.get_mut(day) = hours;
        self.persist_info().await
    }

    // ============ Social accounts ============

    pub fn accounts(&self) -> Vec<SocialMediaAccount> {
        self.accounts.read().clone()
    }

    pub async fn add_account(&self, account: NewSocialAccount) -> Result<Vec<SocialMediaAccount>> {
        info!("CafeService: add_account {}", account.platform.as_ref());
        validate_url(&account.url)
            .map_err(|e| CoasterError::validation(format!("Invalid account URL: {}", e)))?;
        {
            let mut accounts = self.accounts.write();
            if accounts.iter().any(|a| a.platform == account.platform) {
                return Err(CoasterError::validation(format!(
                    "An account for {} already exists",
                    account.platform.as_ref()
                )));
            }
            accounts.push(SocialMediaAccount {
                platform: account.platform,
                handle: account.handle,
                url: account.url,
                is_active: account.is_active,
                follower_count: account.follower_count,
                last_updated: self.clock.now(),
            });
        }
        self.persist_accounts().await
    }

    pub async fn update_account(
        &self,
        platform: SocialPlatform,
        update: SocialAccountUpdate,
    ) -> Result<Vec<SocialMediaAccount>> {
        info!("CafeService: update_account {}", platform.as_ref());
        if let Some(url) = &update.url {
            validate_url(url)
                .map_err(|e| CoasterError::validation(format!("Invalid account URL: {}", e)))?;
        }
        let now = self.clock.now();
        {
            let mut accounts = self.accounts.write();
            let account = find_account(&mut accounts, platform)?;
            if let Some(handle) = update.handle {
                account.handle = handle;
            }
            if let Some(url) = update.url {
                account.url = url;
            }
            if let Some(is_active) = update.is_active {
                account.is_active = is_active;
            }
            if let Some(follower_count) = update.follower_count {
                account.follower_count = follower_count;
            }
            account.last_updated = now;
        }
        self.persist_accounts().await
    }

    pub async fn remove_account(&self, platform: SocialPlatform) -> Result<Vec<SocialMediaAccount>> {
        info!("CafeService: remove_account {}", platform.as_ref());
        {
            let mut accounts = self.accounts.write();
            let before = accounts.len();
            accounts.retain(|a| a.platform != platform);
            if accounts.len() == before {
                return Err(CoasterError::not_found(format!(
                    "No {} account",
                    platform.as_ref()
                )));
            }
        }
        self.persist_accounts().await
    }

    pub async fn toggle_account(&self, platform: SocialPlatform) -> Result<Vec<SocialMediaAccount>> {
        let now = self.clock.now();
        {
            let mut accounts = self.accounts.write();
            let account = find_account(&mut accounts, platform)?;
            account.is_active = !account.is_active;
            account.last_updated = now;
            debug!(
                "CafeService: {} active={}",
                platform.as_ref(),
                account.is_active
            );
        }
        self.persist_accounts().await
    }

    /// Simulated follower drift of up to ±5% on active accounts
    pub async fn refresh_follower_counts<R: Rng + Send>(
        &self,
        rng: &mut R,
    ) -> Result<Vec<SocialMediaAccount>> {
        let now = self.clock.now();
        {
            let mut accounts = self.accounts.write();
            for account in accounts.iter_mut().filter(|a| a.is_active) {
                let Some(count) = account.follower_count else {
                    continue;
                };
                let factor = rng.random::<f64>() * 0.1 - 0.05;
                let change = (count as f64 * factor).floor() as i64;
                account.follower_count = Some((count as i64 + change).max(0) as u64);
                account.last_updated = now;
            }
        }
        self.persist_accounts().await
    }

    pub fn stats(&self) -> CafeStats {
        let accounts = self.accounts.read();
        let active: Vec<&SocialMediaAccount> = accounts.iter().filter(|a| a.is_active).collect();

        let top_platform = active
            .iter()
            .fold(None::<&SocialMediaAccount>, |best, a| match best {
                Some(b) if b.follower_count.unwrap_or(0) >= a.follower_count.unwrap_or(0) => {
                    Some(b)
                }
                _ => Some(a),
            })
            .map(|a| a.platform.as_ref().to_string())
            .unwrap_or_else(|| "none".to_string());

        CafeStats {
            total_followers: active.iter().filter_map(|a| a.follower_count).sum(),
            active_platforms: active.len(),
            last_update: accounts.iter().map(|a| a.last_updated).max(),
            top_platform,
        }
    }

    /// Open/closed state at a local wall-clock time
    pub fn business_status(&self, now_local: NaiveDateTime) -> BusinessStatus {
        let info = self.info.read();
        let today = info.business_hours.get(now_local.weekday()).clone();

        if today.is_closed {
            return BusinessStatus {
                is_open: false,
                next_change: "Closed today".to_string(),
                today_hours: today,
            };
        }

        let (open, close) = match today.validate() {
            Ok(times) => times,
            Err(e) => {
                warn!("CafeService: stored hours are invalid: {}", e);
                return BusinessStatus {
                    is_open: false,
                    next_change: String::new(),
                    today_hours: today,
                };
            }
        };

        let minute_of_day = |t: NaiveTime| t.hour() * 60 + t.minute();
        let current = minute_of_day(now_local.time());
        let is_open = current >= minute_of_day(open) && current < minute_of_day(close);
        let next_change = if is_open {
            format!("Closes at {}", today.close)
        } else {
            format!("Opens at {}", today.open)
        };

        BusinessStatus {
            is_open,
            next_change,
            today_hours: today,
        }
    }
}

fn find_account(
    accounts: &mut [SocialMediaAccount],
    platform: SocialPlatform,
) -> Result<&mut SocialMediaAccount> {
    accounts
        .iter_mut()
        .find(|a| a.platform == platform)
        .ok_or_else(|| CoasterError::not_found(format!("No {} account", platform.as_ref())))
}

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::utils::qr::QrErrorCorrection;
use crate::utils::slug::SlugPattern;

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// 应用配置（从 TOML 加载，启动时使用）
///
/// 包含：
/// - storage: 键值存储后端
/// - logging: 日志配置
/// - analytics: 扫描统计配置
/// - generator: 短链接 / slug 生成配置
/// - sheets: 表格同步配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub sheets: SheetsConfig,
}

impl AppConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > config.toml > 默认值
    /// ENV 前缀：COASTER，分隔符：__
    /// 示例：COASTER__GENERATOR__BASE_URL=https://example.com
    pub fn load() -> Self {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Same as [`AppConfig::load`] with an explicit file path
    pub fn load_from(path: &str) -> Self {
        match Self::try_load_from(path) {
            Ok(config) => {
                if std::path::Path::new(path).exists() {
                    eprintln!("[INFO] Configuration loaded from: {}", path);
                }
                config
            }
            Err(e) => {
                eprintln!("[ERROR] Failed to load config: {}", e);
                Self::default()
            }
        }
    }

    /// Strict variant that surfaces build and deserialize failures
    pub fn try_load_from(path: &str) -> Result<Self> {
        use config::{Config, Environment, File};

        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("COASTER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize::<AppConfig>()?)
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config)
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Which key-value backend persists the collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    File,
    Memory,
}

/// 存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

/// 扫描统计配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Events kept in the log; the oldest are dropped past this
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    /// Offset applied when bucketing by hour of day and calendar day
    #[serde(default)]
    pub utc_offset_minutes: i32,
    #[serde(default = "default_realtime_interval_secs")]
    pub realtime_interval_secs: u64,
    /// Events produced by `seed` when the log is empty
    #[serde(default = "default_sample_events")]
    pub sample_events: usize,
}

/// 链接生成配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub custom_domain: Option<String>,
    #[serde(default)]
    pub pattern: SlugPattern,
    #[serde(default = "default_true")]
    pub use_short_url: bool,
    #[serde(default = "default_true")]
    pub enable_qr: bool,
    #[serde(default = "default_true")]
    pub seo_optimized: bool,
    #[serde(default = "default_brand_name")]
    pub brand_name: String,
    #[serde(default = "default_qr_width")]
    pub qr_width: u32,
    /// 0 disables the quiet zone; other values only enable it
    #[serde(default = "default_qr_margin")]
    pub qr_margin: u32,
    #[serde(default)]
    pub qr_error_correction: QrErrorCorrection,
}

/// 表格同步配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetsConfig {
    #[serde(default = "default_sheets_api_base")]
    pub api_base: String,
    #[serde(default = "default_sheets_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

// ============================================================
// Default value functions
// ============================================================

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

fn default_event_capacity() -> usize {
    1000
}

fn default_top_n() -> usize {
    10
}

fn default_realtime_interval_secs() -> u64 {
    10
}

fn default_sample_events() -> usize {
    500
}

fn default_base_url() -> String {
    "https://m1ct.coffee".to_string()
}

fn default_true() -> bool {
    true
}

fn default_brand_name() -> String {
    "M1CT Coffee".to_string()
}

fn default_qr_width() -> u32 {
    256
}

fn default_qr_margin() -> u32 {
    2
}

fn default_sheets_api_base() -> String {
    "https://sheets.googleapis.com/v4/spreadsheets".to_string()
}

fn default_sheets_timeout_secs() -> u64 {
    10
}

fn default_history_limit() -> usize {
    50
}

// ============================================================
// Default implementations
// ============================================================

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            data_dir: default_data_dir(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            event_capacity: default_event_capacity(),
            top_n: default_top_n(),
            utc_offset_minutes: 0,
            realtime_interval_secs: default_realtime_interval_secs(),
            sample_events: default_sample_events(),
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            custom_domain: None,
            pattern: SlugPattern::default(),
            use_short_url: true,
            enable_qr: true,
            seo_optimized: true,
            brand_name: default_brand_name(),
            qr_width: default_qr_width(),
            qr_margin: default_qr_margin(),
            qr_error_correction: QrErrorCorrection::default(),
        }
    }
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            api_base: default_sheets_api_base(),
            timeout_secs: default_sheets_timeout_secs(),
            history_limit: default_history_limit(),
        }
    }
}

use std::fmt;

#[derive(Debug, Clone)]
pub enum CoasterError {
    StoreUnavailable(String),
    FileOperation(String),
    Serialization(String),
    Validation(String),
    NotFound(String),
    SlugConflict(String),
    SheetsFetch(String),
    QrEncoding(String),
    Config(String),
    DateParse(String),
}

impl CoasterError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            CoasterError::StoreUnavailable(_) => "E001",
            CoasterError::FileOperation(_) => "E002",
            CoasterError::Serialization(_) => "E003",
            CoasterError::Validation(_) => "E004",
            CoasterError::NotFound(_) => "E005",
            CoasterError::SlugConflict(_) => "E006",
            CoasterError::SheetsFetch(_) => "E007",
            CoasterError::QrEncoding(_) => "E008",
            CoasterError::Config(_) => "E009",
            CoasterError::DateParse(_) => "E010",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            CoasterError::StoreUnavailable(_) => "Store Unavailable",
            CoasterError::FileOperation(_) => "File Operation Error",
            CoasterError::Serialization(_) => "Serialization Error",
            CoasterError::Validation(_) => "Validation Error",
            CoasterError::NotFound(_) => "Resource Not Found",
            CoasterError::SlugConflict(_) => "Slug Conflict",
            CoasterError::SheetsFetch(_) => "Spreadsheet Fetch Error",
            CoasterError::QrEncoding(_) => "QR Encoding Error",
            CoasterError::Config(_) => "Configuration Error",
            CoasterError::DateParse(_) => "Date Parse Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            CoasterError::StoreUnavailable(msg)
            | CoasterError::FileOperation(msg)
            | CoasterError::Serialization(msg)
            | CoasterError::Validation(msg)
            | CoasterError::NotFound(msg)
            | CoasterError::SlugConflict(msg)
            | CoasterError::SheetsFetch(msg)
            | CoasterError::QrEncoding(msg)
            | CoasterError::Config(msg)
            | CoasterError::DateParse(msg) => msg,
        }
    }

    /// True for failures caused by an unreachable collaborator (store, spreadsheet API)
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            CoasterError::StoreUnavailable(_) | CoasterError::SheetsFetch(_)
        )
    }

    /// 格式化为彩色输出（用于 CLI）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for CoasterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for CoasterError {}

// 便捷的构造函数
impl CoasterError {
    pub fn store_unavailable<T: Into<String>>(msg: T) -> Self {
        CoasterError::StoreUnavailable(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        CoasterError::FileOperation(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        CoasterError::Serialization(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        CoasterError::Validation(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        CoasterError::NotFound(msg.into())
    }

    pub fn slug_conflict<T: Into<String>>(msg: T) -> Self {
        CoasterError::SlugConflict(msg.into())
    }

    pub fn sheets_fetch<T: Into<String>>(msg: T) -> Self {
        CoasterError::SheetsFetch(msg.into())
    }

    pub fn qr_encoding<T: Into<String>>(msg: T) -> Self {
        CoasterError::QrEncoding(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        CoasterError::Config(msg.into())
    }

    pub fn date_parse<T: Into<String>>(msg: T) -> Self {
        CoasterError::DateParse(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<std::io::Error> for CoasterError {
    fn from(err: std::io::Error) -> Self {
        CoasterError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for CoasterError {
    fn from(err: serde_json::Error) -> Self {
        CoasterError::Serialization(err.to_string())
    }
}

impl From<csv::Error> for CoasterError {
    fn from(err: csv::Error) -> Self {
        CoasterError::Serialization(format!("CSV error: {}", err))
    }
}

impl From<chrono::ParseError> for CoasterError {
    fn from(err: chrono::ParseError) -> Self {
        CoasterError::DateParse(err.to_string())
    }
}

impl From<config::ConfigError> for CoasterError {
    fn from(err: config::ConfigError) -> Self {
        CoasterError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for CoasterError {
    fn from(err: toml::ser::Error) -> Self {
        CoasterError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CoasterError>;

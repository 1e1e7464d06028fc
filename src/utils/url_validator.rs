//! URL 验证模块
//!
//! Checks base URLs and custom domains before they are written into the
//! generator config, and backs the admin "check this link" action.

use serde::Serialize;
use url::Url;

/// Longest path accepted for a shareable link
pub const MAX_PATH_LEN: usize = 100;

/// URL 验证错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlValidationError {
    EmptyUrl,
    InvalidProtocol(String),
    MissingHost,
    PathTooLong(usize),
    InvalidFormat(String),
}

impl std::fmt::Display for UrlValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyUrl => write!(f, "URL cannot be empty"),
            Self::InvalidProtocol(proto) => write!(
                f,
                "Invalid protocol: {}. Only http:// and https:// are allowed",
                proto
            ),
            Self::MissingHost => write!(f, "A valid domain is required"),
            Self::PathTooLong(len) => write!(
                f,
                "URL path is too long ({} characters, limit {})",
                len, MAX_PATH_LEN
            ),
            Self::InvalidFormat(msg) => write!(f, "Invalid URL format: {}", msg),
        }
    }
}

impl std::error::Error for UrlValidationError {}

/// Every problem found with a URL, for display next to the input
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UrlCheck {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

/// Collect all problems with `url` (protocol, host, path length)
pub fn check_url(url: &str) -> Vec<UrlValidationError> {
    let url = url.trim();
    if url.is_empty() {
        return vec![UrlValidationError::EmptyUrl];
    }

    let parsed = match Url::parse(url) {
        Ok(u) => u,
        Err(e) => return vec![UrlValidationError::InvalidFormat(e.to_string())],
    };

    let mut errors = Vec::new();
    if !matches!(parsed.scheme(), "http" | "https") {
        errors.push(UrlValidationError::InvalidProtocol(format!(
            "{}:",
            parsed.scheme()
        )));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        errors.push(UrlValidationError::MissingHost);
    }
    let path_len = parsed.path().chars().count();
    if path_len > MAX_PATH_LEN {
        errors.push(UrlValidationError::PathTooLong(path_len));
    }
    errors
}

/// First problem with `url`, if any
pub fn validate_url(url: &str) -> Result<(), UrlValidationError> {
    match check_url(url).into_iter().next() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Report form of [`check_url`]
pub fn url_check_report(url: &str) -> UrlCheck {
    let errors: Vec<String> = check_url(url).iter().map(ToString::to_string).collect();
    UrlCheck {
        is_valid: errors.is_empty(),
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_urls() {
        assert!(validate_url("https://m1ct.coffee").is_ok());
        assert!(validate_url("http://localhost:3000/bean/x").is_ok());
    }

    #[test]
    fn test_rejects_other_protocols() {
        assert_eq!(
            validate_url("ftp://m1ct.coffee"),
            Err(UrlValidationError::InvalidProtocol("ftp:".to_string()))
        );
        assert!(validate_url("javascript:alert(1)").is_err());
    }

    #[test]
    fn test_rejects_garbage_and_empty() {
        assert_eq!(validate_url("  "), Err(UrlValidationError::EmptyUrl));
        assert!(matches!(
            validate_url("not a url"),
            Err(UrlValidationError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_path_length_limit() {
        let url = format!("https://m1ct.coffee/{}", "a".repeat(MAX_PATH_LEN));
        let report = url_check_report(&url);
        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 1);
    }
}

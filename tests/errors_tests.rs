use coaster_admin::errors::{CoasterError, Result};
use coaster_admin::interfaces::cli::CliError;
use std::error::Error;

#[cfg(test)]
mod error_creation_tests {
    use super::*;

    #[test]
    fn test_codes_are_unique() {
        let errors = [
            CoasterError::store_unavailable("x"),
            CoasterError::file_operation("x"),
            CoasterError::serialization("x"),
            CoasterError::validation("x"),
            CoasterError::not_found("x"),
            CoasterError::slug_conflict("x"),
            CoasterError::sheets_fetch("x"),
            CoasterError::qr_encoding("x"),
            CoasterError::config("x"),
            CoasterError::date_parse("x"),
        ];
        let codes: std::collections::HashSet<&str> = errors.iter().map(|e| e.code()).collect();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_validation_error() {
        let error = CoasterError::validation("Bean name is required");

        assert!(matches!(error, CoasterError::Validation(_)));
        assert_eq!(error.code(), "E004");
        assert!(error.to_string().contains("Validation Error"));
        assert!(error.to_string().contains("Bean name is required"));
    }

    #[test]
    fn test_slug_conflict_error() {
        let error = CoasterError::slug_conflict("Slug 'geisha' is already used");

        assert!(matches!(error, CoasterError::SlugConflict(_)));
        assert_eq!(error.message(), "Slug 'geisha' is already used");
    }

    #[test]
    fn test_connectivity_classification() {
        assert!(CoasterError::sheets_fetch("timeout").is_connectivity());
        assert!(CoasterError::store_unavailable("disk").is_connectivity());
        assert!(!CoasterError::validation("bad").is_connectivity());
        assert!(!CoasterError::not_found("gone").is_connectivity());
    }

    #[test]
    fn test_colored_format_contains_code() {
        let error = CoasterError::date_parse("Start is after end");
        let formatted = error.format_colored();
        assert!(formatted.contains("E010"));
        assert!(formatted.contains("Start is after end"));
    }
}

#[cfg(test)]
mod error_conversion_tests {
    use super::*;

    fn parse(text: &str) -> Result<serde_json::Value> {
        Ok(serde_json::from_str(text)?)
    }

    #[test]
    fn test_from_serde_json_error() {
        let error = parse("{oops").unwrap_err();
        assert!(matches!(error, CoasterError::Serialization(_)));
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error: CoasterError = io.into();
        assert!(matches!(error, CoasterError::FileOperation(_)));
    }

    #[test]
    fn test_from_chrono_error() {
        let parsed = chrono::NaiveDate::parse_from_str("2024-13-45", "%Y-%m-%d");
        let error: CoasterError = parsed.unwrap_err().into();
        assert!(matches!(error, CoasterError::DateParse(_)));
    }

    #[test]
    fn test_error_trait() {
        let error = CoasterError::not_found("bean 404");
        let dyn_error: &dyn Error = &error;
        assert!(dyn_error.to_string().contains("bean 404"));
    }

    #[test]
    fn test_cli_error_mapping() {
        let store: CliError = CoasterError::store_unavailable("disk full").into();
        assert!(matches!(store, CliError::StoreError(_)));

        let parse: CliError = CoasterError::date_parse("bad date").into();
        assert!(matches!(parse, CliError::ParseError(_)));

        let other: CliError = CoasterError::slug_conflict("taken").into();
        assert!(matches!(other, CliError::CommandError(_)));
        assert!(other.to_string().contains("taken"));
    }
}

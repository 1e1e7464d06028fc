//! Slug derivation, short codes and the SEO heuristic
//!
//! Everything here is a pure function of its inputs.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter};

use crate::errors::{CoasterError, Result};
use crate::storage::CoffeeBean;

/// Maximum slug length after sanitizing
pub const MAX_SLUG_LEN: usize = 60;
/// Length of the hash-derived short code
pub const SHORT_CODE_LEN: usize = 6;

const SHORT_CODE_ALPHABET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Which bean fields make up the slug
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, AsRefStr, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SlugPattern {
    /// name
    Simple,
    /// name-origin-process
    #[default]
    Detailed,
    /// origin-region-varieties-name
    Custom,
}

impl std::str::FromStr for SlugPattern {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "simple" => Ok(Self::Simple),
            "detailed" => Ok(Self::Detailed),
            "custom" => Ok(Self::Custom),
            _ => Err(format!(
                "Invalid slug pattern: '{}'. Valid: simple, detailed, custom",
                s
            )),
        }
    }
}

/// Lowercase, drop anything outside `[a-z0-9\s-]`, turn whitespace runs into
/// one hyphen, collapse hyphen runs, trim hyphens, cap at 60 characters.
pub fn sanitize_slug(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut pending_hyphen = false;

    for c in lowered.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(c);
        } else if c == '-' || c.is_whitespace() {
            pending_hyphen = true;
        }
    }

    // Only ASCII survives the filter, byte truncation is char-safe
    out.truncate(MAX_SLUG_LEN);
    out.trim_end_matches('-').to_string()
}

/// Build the slug for a bean under the given pattern
///
/// Fails when the name is blank or nothing survives sanitizing.
pub fn build_slug(bean: &CoffeeBean, pattern: SlugPattern) -> Result<String> {
    if bean.name.trim().is_empty() {
        return Err(CoasterError::validation(format!(
            "Bean '{}' has no name; a name is required to build a slug",
            bean.id
        )));
    }

    let raw = match pattern {
        SlugPattern::Simple => bean.name.clone(),
        SlugPattern::Detailed => format!("{}-{}-{}", bean.name, bean.origin, bean.process),
        SlugPattern::Custom => format!(
            "{}-{}-{}-{}",
            bean.origin, bean.region, bean.varieties, bean.name
        ),
    };

    let slug = sanitize_slug(&raw);
    if slug.is_empty() {
        return Err(CoasterError::validation(format!(
            "Bean '{}' produced an empty slug from '{}'",
            bean.id, raw
        )));
    }
    Ok(slug)
}

/// `{domain}/bean/{slug}` where domain is the custom domain when set
pub fn build_full_url(slug: &str, base_url: &str, custom_domain: Option<&str>) -> String {
    let domain = custom_domain
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(base_url);
    format!("{}/bean/{}", domain.trim_end_matches('/'), slug)
}

/// Deterministic 6-character code for a URL
///
/// Rolling `hash * 31 + unit` over UTF-16 code units, wrapped to i32, then
/// the absolute value is spelled out in base 62. Distinct URLs can map to the
/// same code; no collision resolution is attempted.
pub fn short_code(full_url: &str) -> String {
    let mut hash: i32 = 0;
    for unit in full_url.encode_utf16() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit));
    }

    let base = SHORT_CODE_ALPHABET.len() as u64;
    let mut num = i64::from(hash).unsigned_abs();
    let mut code = String::with_capacity(SHORT_CODE_LEN);
    for _ in 0..SHORT_CODE_LEN {
        code.push(SHORT_CODE_ALPHABET[(num % base) as usize] as char);
        num /= base;
    }
    code
}

/// Additive SEO heuristic, clamped to 100
pub fn score_seo(bean: &CoffeeBean, slug: &str) -> u8 {
    let mut score: u32 = 0;

    let len = slug.chars().count();
    score += match len {
        20..=60 => 25,
        10..=80 => 15,
        _ => 5,
    };

    let slug_lower = slug.to_lowercase();
    let keyword_hits = [&bean.origin, &bean.varieties, &bean.process]
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty() && slug_lower.contains(k.as_str()))
        .count() as u32;
    score += keyword_hits * 15;

    let hyphens = slug.matches('-').count();
    score += match hyphens {
        2..=5 => 20,
        1..=7 => 10,
        _ => 0,
    };

    if !slug.chars().any(|c| c.is_ascii_digit()) {
        score += 10;
    }
    if bean.description.chars().count() > 50 {
        score += 10;
    }
    if bean.story.chars().count() > 100 {
        score += 10;
    }

    score.min(100) as u8
}

/// True when `slug` is non-empty and matches `^[a-z0-9]+(-[a-z0-9]+)*$`
pub fn is_well_formed(slug: &str) -> bool {
    !slug.is_empty()
        && slug.split('-').all(|part| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn bean() -> CoffeeBean {
        let mut bean = CoffeeBean::new("b1", "Yirgacheffe Kochere", Utc::now());
        bean.origin = "Ethiopia".to_string();
        bean.region = "Gedeo".to_string();
        bean.varieties = "Heirloom".to_string();
        bean.process = "Washed".to_string();
        bean
    }

    #[test]
    fn test_sanitize_basic() {
        assert_eq!(sanitize_slug("  Hello   World  "), "hello-world");
        assert_eq!(sanitize_slug("Café -- Olé!"), "caf-ol");
        assert_eq!(sanitize_slug("--a--b--"), "a-b");
        assert_eq!(sanitize_slug("에티오피아"), "");
    }

    #[test]
    fn test_sanitize_truncates_without_trailing_hyphen() {
        let long = format!("{} tail", "a".repeat(59));
        let slug = sanitize_slug(&long);
        assert_eq!(slug, "a".repeat(59));
        assert!(sanitize_slug(&"word ".repeat(40)).len() <= MAX_SLUG_LEN);
    }

    #[test]
    fn test_patterns() {
        let b = bean();
        assert_eq!(
            build_slug(&b, SlugPattern::Simple).unwrap(),
            "yirgacheffe-kochere"
        );
        assert_eq!(
            build_slug(&b, SlugPattern::Detailed).unwrap(),
            "yirgacheffe-kochere-ethiopia-washed"
        );
        assert_eq!(
            build_slug(&b, SlugPattern::Custom).unwrap(),
            "ethiopia-gedeo-heirloom-yirgacheffe-kochere"
        );
    }

    #[test]
    fn test_missing_name_is_validation_error() {
        let mut b = bean();
        b.name = "   ".to_string();
        let err = build_slug(&b, SlugPattern::Detailed).unwrap_err();
        assert!(matches!(err, CoasterError::Validation(_)));
    }

    #[test]
    fn test_full_url_prefers_custom_domain() {
        assert_eq!(
            build_full_url("x", "https://a.example", None),
            "https://a.example/bean/x"
        );
        assert_eq!(
            build_full_url("x", "https://a.example", Some("https://b.example/")),
            "https://b.example/bean/x"
        );
        assert_eq!(
            build_full_url("x", "https://a.example", Some("")),
            "https://a.example/bean/x"
        );
    }

    #[test]
    fn test_short_code_known_values() {
        assert_eq!(short_code(""), "aaaaaa");
        assert_eq!(short_code("a"), "Jbaaaa");
        assert_eq!(short_code("ab"), "fYaaaa");
    }

    #[test]
    fn test_short_code_shape() {
        let code = short_code("https://m1ct.coffee/bean/yirgacheffe-kochere-ethiopia-washed");
        assert_eq!(code.len(), SHORT_CODE_LEN);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_seo_score_full_marks() {
        let mut b = bean();
        b.description = "d".repeat(51);
        b.story = "s".repeat(101);
        let slug = build_slug(&b, SlugPattern::Detailed).unwrap();
        // 25 length + 30 keywords (origin, process) + 20 hyphens + 10 digits + 10 + 10
        assert_eq!(score_seo(&b, &slug), 100);
    }

    #[test]
    fn test_seo_score_minimal() {
        let b = CoffeeBean::new("b2", "A1", Utc::now());
        // 5 length, no keywords, no hyphens, contains digit
        assert_eq!(score_seo(&b, "a1"), 5);
    }

    #[test]
    fn test_well_formed() {
        assert!(is_well_formed("abc-123"));
        assert!(!is_well_formed("abc--123"));
        assert!(!is_well_formed("-abc"));
        assert!(!is_well_formed(""));
        assert!(!is_well_formed("Abc"));
    }
}

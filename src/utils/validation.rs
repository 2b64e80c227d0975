use once_cell::sync::Lazy;
use regex::Regex;

use crate::utils::error::{AppError, AppResult};

// Static regular expressions, compiled once on first use.
// Used to parse Netscape bookmark files (browser exports).
pub static LINK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<a[^>]*href="(?P<url>[^"]+)"[^>]*>(?P<title>[^<]*)"#)
        .expect("Failed to compile bookmark regex")
});

pub static TAG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)tags="(?P<tags>[^"]+)""#).expect("Failed to compile tag regex"));

/// A url is valid when it is non-empty after trimming and parses with an
/// http, https or file scheme.
pub fn validate_url(raw: &str) -> AppResult<()> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidUrl("url is empty".to_string()));
    }

    let parsed =
        url::Url::parse(trimmed).map_err(|_| AppError::InvalidUrl(trimmed.to_string()))?;

    match parsed.scheme() {
        "http" | "https" | "file" => Ok(()),
        other => Err(AppError::InvalidUrl(format!(
            "unsupported scheme '{}' in {}",
            other, trimmed
        ))),
    }
}

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Canonical tag string form stored on the bookmark row: `,t1,t2,` with the
/// tags lowercased, deduplicated and sorted, or the empty string when there
/// are none. The sentinel commas make `LIKE '%,tag,%'` an exact-tag match.
pub fn parse_tags(raw: &str) -> String {
    let mut tags: Vec<String> = raw
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();

    tags.sort();
    tags.dedup();

    if tags.is_empty() {
        String::new()
    } else {
        format!(",{},", tags.join(","))
    }
}

/// Splits a canonical tag string back into its labels.
pub fn tags_vec(canonical: &str) -> Vec<String> {
    canonical
        .split(',')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Presentation form: `t1, t2`. The sentinel commas are stripped only at
/// this boundary, never in storage.
pub fn display_tags(canonical: &str) -> String {
    tags_vec(canonical).join(", ")
}

/// True when `s` is empty or already in `,t1,t2,` form with sorted,
/// non-empty, lowercase labels.
pub fn is_canonical(s: &str) -> bool {
    s.is_empty() || parse_tags(s) == s
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TagCount {
    pub name: String,
    pub count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_tags_separators() {
        assert_eq!(parse_tags("go,rust"), ",go,rust,");
        assert_eq!(parse_tags("go rust"), ",go,rust,");
        assert_eq!(parse_tags("go\nrust"), ",go,rust,");
        assert_eq!(parse_tags("go, rust,\n"), ",go,rust,");
    }

    #[test]
    fn test_parse_tags_normalizes() {
        assert_eq!(parse_tags("Rust,GO,rust"), ",go,rust,");
        assert_eq!(parse_tags("zeta alpha"), ",alpha,zeta,");
        assert_eq!(parse_tags(" ,, ,"), "");
        assert_eq!(parse_tags(""), "");
    }

    #[test]
    fn test_parse_tags_idempotent_on_canonical() {
        let canonical = parse_tags("web, dev, rust");
        assert_eq!(parse_tags(&canonical), canonical);
        assert!(is_canonical(&canonical));
        assert!(is_canonical(""));
        assert!(!is_canonical("go,rust"));
        assert!(!is_canonical(",Rust,"));
    }

    #[test]
    fn test_tags_vec_and_display() {
        assert_eq!(tags_vec(",go,rust,"), vec!["go", "rust"]);
        assert_eq!(display_tags(",go,rust,"), "go, rust");
        assert!(tags_vec("").is_empty());
        assert_eq!(display_tags(""), "");
    }
}

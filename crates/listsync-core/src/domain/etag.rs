//! Concurrency tokens (ETags).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque version marker for a remote item.
///
/// The raw header form is kept verbatim so it can be echoed back in `IF-MATCH`
/// exactly as the store issued it (weak prefix included).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ETag(String);

impl ETag {
    /// Parse a header value. Blank values yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() || raw == "\"\"" || raw == "W/\"\"" {
            return None;
        }
        Some(Self(raw.to_string()))
    }

    pub fn is_weak(&self) -> bool {
        self.0.starts_with("W/")
    }

    /// The token without the weak prefix and surrounding quotes.
    pub fn opaque(&self) -> &str {
        let s = self.0.strip_prefix("W/").unwrap_or(&self.0);
        s.strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .unwrap_or(s)
    }

    pub fn as_header_value(&self) -> &str {
        &self.0
    }

    /// Weak comparison: two tokens match when their opaque parts are equal.
    pub fn matches(&self, other: &ETag) -> bool {
        self.opaque() == other.opaque()
    }
}

impl fmt::Display for ETag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::strong("\"3\"", false, "3")]
    #[case::weak("W/\"3\"", true, "3")]
    #[case::sharepoint("\"{5E2B0F1C-0000},4\"", false, "{5E2B0F1C-0000},4")]
    #[case::unquoted("7", false, "7")]
    fn parses_header_forms(#[case] raw: &str, #[case] weak: bool, #[case] opaque: &str) {
        let tag = ETag::parse(raw).unwrap();
        assert_eq!(tag.is_weak(), weak);
        assert_eq!(tag.opaque(), opaque);
        assert_eq!(tag.as_header_value(), raw);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("\"\"")]
    #[case("W/\"\"")]
    fn blank_tokens_are_unusable(#[case] raw: &str) {
        assert!(ETag::parse(raw).is_none());
    }

    #[test]
    fn weak_and_strong_forms_match() {
        let a = ETag::parse("W/\"9\"").unwrap();
        let b = ETag::parse("\"9\"").unwrap();
        assert!(a.matches(&b));
        assert!(!a.matches(&ETag::parse("\"10\"").unwrap()));
    }
}

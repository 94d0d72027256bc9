//! Request path tokenization.
//!
//! # Responsibilities
//! - Strip any query string or fragment left on the path
//! - Split into non-empty segments (repeated and trailing slashes collapse)
//! - Provide a case-folded key per segment for matching
//!
//! # Design Decisions
//! - Tree keys are stored without their `/`, `/?` and `@` markers, so a bare
//!   lower-cased segment compares directly against any key kind
//! - The requested text is kept next to the key; captures and parameters
//!   bind the text as sent
//! - Site root yields an empty sequence, never a single empty segment

/// One path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    raw: String,
    key: String,
}

impl Segment {
    /// Create a segment from its requested text.
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let key = raw.to_lowercase();
        Self { raw, key }
    }

    /// Segment text as it appeared in the request.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Lower-cased form used to match tree keys.
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Split a request path into matchable segments.
pub fn tokenize(path: &str) -> Vec<Segment> {
    let path = path
        .split(['?', '#'])
        .next()
        .unwrap_or_default();

    path.split('/')
        .filter(|s| !s.is_empty())
        .map(Segment::new)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn keys(path: &str) -> Vec<String> {
        tokenize(path).iter().map(|s| s.key().to_string()).collect()
    }

    #[rstest]
    #[case("", &[])]
    #[case("/", &[])]
    #[case("//", &[])]
    #[case("/shop", &["shop"])]
    #[case("/shop/", &["shop"])]
    #[case("/shop//checkout/998", &["shop", "checkout", "998"])]
    #[case("shop/checkout", &["shop", "checkout"])]
    #[case("/Shop/CheckOut", &["shop", "checkout"])]
    #[case("/shop/checkout?order=1&x=/y", &["shop", "checkout"])]
    #[case("/docs#intro", &["docs"])]
    fn test_tokenize(#[case] path: &str, #[case] expected: &[&str]) {
        assert_eq!(keys(path), expected);
    }

    #[test]
    fn test_raw_text_preserved() {
        let segments = tokenize("/Files/Report-Q1.PDF");
        assert_eq!(segments[1].raw(), "Report-Q1.PDF");
        assert_eq!(segments[1].key(), "report-q1.pdf");
    }
}

//! URL exclusion filtering.
//!
//! A [`PatternFilter`] holds an ordered list of regular expressions. A URL that matches
//! any of them is suppressed from tracing. Evaluation stops at the first match.

use crate::error::Result;
use regex::Regex;
use std::sync::OnceLock;

/// Built-in exclusions for the Application Insights telemetry endpoints.
///
/// Without these, every telemetry upload made by the host would itself be traced,
/// which in turn produces more telemetry.
pub const DEFAULT_IGNORE_PATTERNS: [&str; 2] = [
    r"^https://rt\.services\.visualstudio\.com/.*",
    r"^https://dc\.services\.visualstudio\.com/.*",
];

/// Ordered, immutable set of URL exclusion patterns
///
/// The filter is read-only after construction, so a single instance can be shared
/// behind an `Arc` by every callback invocation without further synchronization.
#[derive(Debug, Clone, Default)]
pub struct PatternFilter {
    patterns: Vec<Regex>,
}

impl PatternFilter {
    /// Create a filter from already-compiled patterns, preserving their order
    pub fn new(patterns: Vec<Regex>) -> Self {
        Self { patterns }
    }

    /// Compile a filter from pattern strings
    ///
    /// # Errors
    ///
    /// Returns [`crate::HttpSpyError::InvalidPattern`] for the first pattern that fails
    /// to compile.
    pub fn from_patterns<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| Regex::new(p.as_ref()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self::new(patterns))
    }

    /// The built-in filter covering [`DEFAULT_IGNORE_PATTERNS`]
    pub fn default_set() -> Self {
        static DEFAULT: OnceLock<PatternFilter> = OnceLock::new();
        DEFAULT
            .get_or_init(|| {
                Self::new(
                    DEFAULT_IGNORE_PATTERNS
                        .iter()
                        .map(|p| Regex::new(p).unwrap())
                        .collect(),
                )
            })
            .clone()
    }

    /// Decide whether a request to `url` should be left out of the trace
    ///
    /// An absent URL is never ignored. An empty filter ignores nothing.
    pub fn should_ignore(&self, url: Option<&str>) -> bool {
        match url {
            Some(url) => self.patterns.iter().any(|regex| regex.is_match(url)),
            None => false,
        }
    }

    /// Patterns in evaluation order
    pub fn patterns(&self) -> &[Regex] {
        &self.patterns
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_url_is_never_ignored() {
        let filter = PatternFilter::from_patterns([".*"]).unwrap();
        assert!(!filter.should_ignore(None));
    }

    #[test]
    fn test_empty_filter_ignores_nothing() {
        let filter = PatternFilter::default();
        assert!(filter.is_empty());
        assert!(!filter.should_ignore(Some("https://dc.services.visualstudio.com/v2/track")));
    }

    #[test]
    fn test_default_set_matches_telemetry_endpoints() {
        let filter = PatternFilter::default_set();
        assert_eq!(filter.len(), 2);

        assert!(filter.should_ignore(Some("https://dc.services.visualstudio.com/v2/track")));
        assert!(filter.should_ignore(Some(
            "https://rt.services.visualstudio.com/QuickPulseService.svc/ping"
        )));
        assert!(!filter.should_ignore(Some("https://api.example.com/data")));
    }

    #[test]
    fn test_default_set_is_anchored() {
        let filter = PatternFilter::default_set();
        assert!(!filter.should_ignore(Some(
            "https://proxy.example.com/?u=https://dc.services.visualstudio.com/v2/track"
        )));
        assert!(!filter.should_ignore(Some("http://dc.services.visualstudio.com/v2/track")));
    }

    #[test]
    fn test_any_pattern_in_set_matches() {
        let filter = PatternFilter::from_patterns([
            r"https://internal\.example\.com/.*",
            r"/health$",
        ])
        .unwrap();

        assert!(filter.should_ignore(Some("https://internal.example.com/metrics")));
        assert!(filter.should_ignore(Some("https://api.example.com/health")));
        assert!(!filter.should_ignore(Some("https://api.example.com/healthz")));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let result = PatternFilter::from_patterns(["[unterminated"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_order_is_preserved() {
        let filter = PatternFilter::from_patterns(["first", "second"]).unwrap();
        let sources: Vec<&str> = filter.patterns().iter().map(|r| r.as_str()).collect();
        assert_eq!(sources, vec!["first", "second"]);
    }
}

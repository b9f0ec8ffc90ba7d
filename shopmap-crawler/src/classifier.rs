use url::Url;

/// Default path indicators for product-detail pages.
pub const DEFAULT_INDICATORS: &[&str] = &["/product/", "/item/", "/shop/"];

/// Decides whether a leaf URL looks like a product-detail page.
///
/// The rule is unanchored substring containment over the URL's path
/// component: a path containing `/products-list/` matches the
/// `/product/` indicator. That looseness trades precision for recall
/// and is part of the classifier's contract — tightening it changes
/// which URLs are kept.
#[derive(Debug, Clone)]
pub struct ProductClassifier {
    indicators: Vec<String>,
    case_sensitive: bool,
}

impl ProductClassifier {
    pub fn new(indicators: Vec<String>, case_sensitive: bool) -> Self {
        let indicators = if case_sensitive {
            indicators
        } else {
            indicators.iter().map(|i| i.to_lowercase()).collect()
        };
        Self {
            indicators,
            case_sensitive,
        }
    }

    /// Matching is against the path component when the URL parses;
    /// unparseable input falls back to the raw string.
    pub fn classify(&self, url: &str) -> bool {
        let path = match Url::parse(url) {
            Ok(parsed) => parsed.path().to_string(),
            Err(_) => url.to_string(),
        };

        let haystack = if self.case_sensitive {
            path
        } else {
            path.to_lowercase()
        };

        self.indicators.iter().any(|ind| haystack.contains(ind))
    }
}

impl Default for ProductClassifier {
    fn default() -> Self {
        Self::new(
            DEFAULT_INDICATORS.iter().map(|s| s.to_string()).collect(),
            false,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_product_path() {
        let classifier = ProductClassifier::default();
        assert!(classifier.classify("https://x.com/product/123"));
    }

    #[test]
    fn test_classify_non_product_path() {
        let classifier = ProductClassifier::default();
        assert!(!classifier.classify("https://x.com/about"));
    }

    #[test]
    fn test_classify_case_insensitive_by_default() {
        let classifier = ProductClassifier::default();
        assert!(classifier.classify("https://x.com/PRODUCT/abc"));
    }

    #[test]
    fn test_classify_unanchored_substring() {
        let classifier = ProductClassifier::default();
        // Loose on purpose: segment boundaries are not respected
        assert!(classifier.classify("https://x.com/products-list/42"));
        assert!(classifier.classify("https://x.com/non-product/42"));
    }

    #[test]
    fn test_classify_indicator_in_query_does_not_match() {
        let classifier = ProductClassifier::default();
        assert!(!classifier.classify("https://x.com/search?q=/product/"));
    }

    #[test]
    fn test_classify_case_sensitive_mode() {
        let classifier = ProductClassifier::new(vec!["/Product/".to_string()], true);
        assert!(classifier.classify("https://x.com/Product/1"));
        assert!(!classifier.classify("https://x.com/product/1"));
    }

    #[test]
    fn test_classify_custom_indicators() {
        let classifier = ProductClassifier::new(vec!["/p/".to_string()], false);
        assert!(classifier.classify("https://x.com/p/99"));
        assert!(!classifier.classify("https://x.com/product/99"));
    }

    #[test]
    fn test_classify_unparseable_falls_back_to_raw() {
        let classifier = ProductClassifier::default();
        assert!(classifier.classify("not a url but /item/ anyway"));
    }
}

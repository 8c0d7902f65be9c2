//! Vary selectors: which request headers a stored response depends on

use std::fmt;

use crate::headers::{names, Headers};

/// Request header names from a response's `Vary`, with the values the
/// originating request carried for them
///
/// Names are lower-cased and sorted so equal selectors compare equal no
/// matter how the `Vary` header was written. `Vary: *` produces a wildcard
/// selector that matches no request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Vary {
    selectors: Vec<(String, Option<String>)>,
    wildcard: bool,
}

impl Vary {
    /// Selector for a response without `Vary`; matches every request
    pub fn empty() -> Self {
        Self::default()
    }

    /// Selector for `Vary: *`
    pub fn wildcard() -> Self {
        Self {
            selectors: Vec::new(),
            wildcard: true,
        }
    }

    /// Build from explicit (name, value) pairs
    pub fn new<N, V>(selectors: impl IntoIterator<Item = (N, Option<V>)>) -> Self
    where
        N: AsRef<str>,
        V: AsRef<str>,
    {
        let mut selectors: Vec<(String, Option<String>)> = selectors
            .into_iter()
            .map(|(name, value)| {
                (
                    name.as_ref().trim().to_ascii_lowercase(),
                    value.map(|v| v.as_ref().trim().to_string()),
                )
            })
            .collect();
        selectors.sort_by(|a, b| a.0.cmp(&b.0));
        selectors.dedup_by(|a, b| a.0 == b.0);

        Self {
            selectors,
            wildcard: false,
        }
    }

    /// Capture the selector for a request/response pair
    pub fn from_exchange(request_headers: &Headers, response_headers: &Headers) -> Self {
        let varied = response_headers.directives(names::VARY);
        if varied.iter().any(|directive| directive.name() == "*") {
            return Self::wildcard();
        }

        Self::new(varied.iter().map(|directive| {
            let name = directive.name();
            (name, request_value(request_headers, name))
        }))
    }

    /// Whether a request's headers select this variant
    pub fn matches(&self, request_headers: &Headers) -> bool {
        if self.wildcard {
            return false;
        }

        self.selectors.iter().all(|(name, expected)| {
            request_value(request_headers, name).as_deref() == expected.as_deref()
        })
    }

    /// Whether this is a `Vary: *` selector
    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    /// Whether no request header is selected
    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty() && !self.wildcard
    }

    /// Selected (name, value) pairs, names lower-cased and sorted
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.selectors
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_deref()))
    }
}

/// Combined value of a request header; repeated lines are joined with ", "
fn request_value(headers: &Headers, name: &str) -> Option<String> {
    let values: Vec<&str> = headers.all(name).map(str::trim).collect();
    if values.is_empty() {
        None
    } else {
        Some(values.join(", "))
    }
}

impl fmt::Display for Vary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.wildcard {
            return f.write_str("*");
        }
        for (i, (name, value)) in self.selectors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            match value {
                Some(value) => write!(f, "{}={}", name, value)?,
                None => write!(f, "{}", name)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_varying_on(names: &str) -> Headers {
        Headers::new().add("Vary", names)
    }

    #[test]
    fn test_unlisted_header_does_not_matter() {
        let original = Headers::new()
            .add("Accept-Language", "en")
            .add("User-Agent", "a");
        let vary = Vary::from_exchange(&original, &response_varying_on("Accept-Language"));

        let other = Headers::new()
            .add("accept-language", "en")
            .add("User-Agent", "b");
        assert!(vary.matches(&other));
    }

    #[test]
    fn test_listed_header_must_match() {
        let original = Headers::new().add("Accept-Language", "en");
        let vary = Vary::from_exchange(&original, &response_varying_on("Accept-Language"));

        assert!(!vary.matches(&Headers::new().add("Accept-Language", "de")));
        assert!(!vary.matches(&Headers::new()));
    }

    #[test]
    fn test_absent_on_both_sides_matches() {
        let vary = Vary::from_exchange(&Headers::new(), &response_varying_on("Accept-Encoding"));

        assert!(vary.matches(&Headers::new().add("Accept", "*/*")));
        assert!(!vary.matches(&Headers::new().add("Accept-Encoding", "gzip")));
    }

    #[test]
    fn test_no_vary_matches_everything() {
        let vary = Vary::from_exchange(&Headers::new().add("Accept", "a"), &Headers::new());

        assert!(vary.is_empty());
        assert!(vary.matches(&Headers::new().add("Accept", "b")));
    }

    #[test]
    fn test_wildcard_never_matches() {
        let vary = Vary::from_exchange(&Headers::new(), &response_varying_on("Accept, *"));

        assert!(vary.is_wildcard());
        assert!(!vary.matches(&Headers::new()));
        assert_eq!(vary.to_string(), "*");
    }

    #[test]
    fn test_selector_is_normalized() {
        let a = Vary::new([("Accept", Some("a")), ("Accept-Language", Some("en"))]);
        let b = Vary::new([("accept-language", Some("en")), ("ACCEPT", Some("a"))]);

        assert_eq!(a, b);
        assert_eq!(a.to_string(), "accept=a; accept-language=en");
    }

    #[test]
    fn test_repeated_request_headers_are_joined() {
        let original = Headers::new().add("Accept", "a").add("Accept", "b");
        let vary = Vary::from_exchange(&original, &response_varying_on("Accept"));

        assert_eq!(vary.iter().next(), Some(("accept", Some("a, b"))));
    }
}

//! Parsed view over `Cache-Control` directives

use std::fmt;

use crate::directive::Directive;
use crate::headers::{names, Headers};
use crate::parser::parse_elements;

const NO_STORE: &str = "no-store";
const NO_CACHE: &str = "no-cache";
const PRIVATE: &str = "private";
const PUBLIC: &str = "public";
const MUST_REVALIDATE: &str = "must-revalidate";
const MAX_AGE: &str = "max-age";
const S_MAXAGE: &str = "s-maxage";

/// Directives from every `Cache-Control` header, in source order
///
/// Directive names match case-insensitively. When a directive repeats, the
/// last occurrence is the one reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheControl {
    directives: Vec<Directive>,
}

impl CacheControl {
    /// An empty `Cache-Control`
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a single header value
    pub fn parse(value: &str) -> Self {
        Self {
            directives: parse_elements(value),
        }
    }

    /// Collect the directives of all `Cache-Control` headers
    pub fn from_headers(headers: &Headers) -> Self {
        Self {
            directives: headers.directives(names::CACHE_CONTROL),
        }
    }

    /// Start building a `Cache-Control` value
    pub fn builder() -> CacheControlBuilder {
        CacheControlBuilder::default()
    }

    /// All directives in source order
    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    /// Whether no directive is present
    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    /// Last directive with this name
    pub fn directive(&self, name: &str) -> Option<&Directive> {
        self.directives
            .iter()
            .rev()
            .find(|directive| directive.name().eq_ignore_ascii_case(name))
    }

    /// Whether a directive with this name is present
    pub fn has(&self, name: &str) -> bool {
        self.directive(name).is_some()
    }

    /// `no-store`
    pub fn no_store(&self) -> bool {
        self.has(NO_STORE)
    }

    /// `no-cache`
    pub fn no_cache(&self) -> bool {
        self.has(NO_CACHE)
    }

    /// `private`
    pub fn private(&self) -> bool {
        self.has(PRIVATE)
    }

    /// `public`
    pub fn public(&self) -> bool {
        self.has(PUBLIC)
    }

    /// `must-revalidate`
    pub fn must_revalidate(&self) -> bool {
        self.has(MUST_REVALIDATE)
    }

    /// `max-age` in seconds; `None` when absent
    ///
    /// A present but malformed or negative value reads as `Some(0)`.
    pub fn max_age(&self) -> Option<i64> {
        self.seconds(MAX_AGE)
    }

    /// `s-maxage` in seconds, same conventions as [`max_age`](Self::max_age)
    pub fn s_max_age(&self) -> Option<i64> {
        self.seconds(S_MAXAGE)
    }

    fn seconds(&self, name: &str) -> Option<i64> {
        self.directive(name)
            .map(|directive| directive.value_as_integer().max(0))
    }
}

impl fmt::Display for CacheControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, directive) in self.directives.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", directive)?;
        }
        Ok(())
    }
}

/// Builder for [`CacheControl`]
#[derive(Debug, Default)]
pub struct CacheControlBuilder {
    directives: Vec<Directive>,
}

impl CacheControlBuilder {
    fn flag(mut self, name: &str) -> Self {
        self.directives.push(Directive::new(name, ""));
        self
    }

    /// Add `no-store`
    pub fn no_store(self) -> Self {
        self.flag(NO_STORE)
    }

    /// Add `no-cache`
    pub fn no_cache(self) -> Self {
        self.flag(NO_CACHE)
    }

    /// Add `private`
    pub fn private(self) -> Self {
        self.flag(PRIVATE)
    }

    /// Add `public`
    pub fn public(self) -> Self {
        self.flag(PUBLIC)
    }

    /// Add `must-revalidate`
    pub fn must_revalidate(self) -> Self {
        self.flag(MUST_REVALIDATE)
    }

    /// Add `max-age=<seconds>`
    pub fn max_age(mut self, seconds: u32) -> Self {
        self.directives.push(Directive::new(MAX_AGE, seconds.to_string()));
        self
    }

    /// Add an arbitrary directive
    pub fn directive(mut self, directive: Directive) -> Self {
        self.directives.push(directive);
        self
    }

    /// Finish building
    pub fn build(self) -> CacheControl {
        CacheControl {
            directives: self.directives,
        }
    }
}

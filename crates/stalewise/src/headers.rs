//! Ordered header multi-map
//!
//! Names compare ASCII case-insensitively but are stored as given.
//! Insertion order is kept, including between headers sharing a name.

use std::fmt;

use crate::directive::Directive;
use crate::parser::parse_elements;

/// Header names used by the cache rules
pub mod names {
    /// `Cache-Control`
    pub const CACHE_CONTROL: &str = "Cache-Control";
    /// `Connection`
    pub const CONNECTION: &str = "Connection";
    /// `Date`
    pub const DATE: &str = "Date";
    /// `ETag`
    pub const ETAG: &str = "ETag";
    /// `Expires`
    pub const EXPIRES: &str = "Expires";
    /// `If-Modified-Since`
    pub const IF_MODIFIED_SINCE: &str = "If-Modified-Since";
    /// `If-None-Match`
    pub const IF_NONE_MATCH: &str = "If-None-Match";
    /// `Keep-Alive`
    pub const KEEP_ALIVE: &str = "Keep-Alive";
    /// `Last-Modified`
    pub const LAST_MODIFIED: &str = "Last-Modified";
    /// `Proxy-Authenticate`
    pub const PROXY_AUTHENTICATE: &str = "Proxy-Authenticate";
    /// `Proxy-Authorization`
    pub const PROXY_AUTHORIZATION: &str = "Proxy-Authorization";
    /// `TE`
    pub const TE: &str = "TE";
    /// `Trailer`
    pub const TRAILER: &str = "Trailer";
    /// `Transfer-Encoding`
    pub const TRANSFER_ENCODING: &str = "Transfer-Encoding";
    /// `Upgrade`
    pub const UPGRADE: &str = "Upgrade";
    /// `Vary`
    pub const VARY: &str = "Vary";
}

/// A single header line
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Header {
    name: String,
    value: String,
}

impl Header {
    /// Create a header
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Header name as given
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw header value
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Whether this header has the given name (case-insensitive)
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Parse the value into directives
    pub fn directives(&self) -> Vec<Directive> {
        parse_elements(&self.value)
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value)
    }
}

/// Ordered collection of headers
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Headers {
    entries: Vec<Header>,
}

impl Headers {
    /// Create an empty header set
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a header, keeping any existing ones with the same name
    pub fn add(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(Header::new(name, value));
        self
    }

    /// Append a header in place
    pub fn push(&mut self, header: Header) {
        self.entries.push(header);
    }

    /// Replace every header of this name with a single value
    pub fn set(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.entries.retain(|header| !header.is(&name));
        self.entries.push(Header::new(name, value));
        self
    }

    /// Remove every header with this name
    pub fn remove(mut self, name: &str) -> Self {
        self.entries.retain(|header| !header.is(name));
        self
    }

    /// First value for a name
    pub fn first(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|header| header.is(name))
            .map(Header::value)
    }

    /// All values for a name, in insertion order
    pub fn all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |header| header.is(name))
            .map(Header::value)
    }

    /// Whether a header with this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|header| header.is(name))
    }

    /// Directives of every header with this name, in source order
    pub fn directives(&self, name: &str) -> Vec<Directive> {
        self.entries
            .iter()
            .filter(|header| header.is(name))
            .flat_map(Header::directives)
            .collect()
    }

    /// Iterate headers in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Header> {
        self.entries.iter()
    }

    /// Number of header lines
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no headers
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<Header> for Headers {
    fn from_iter<I: IntoIterator<Item = Header>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Headers {
    type Item = Header;
    type IntoIter = std::vec::IntoIter<Header>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = &'a Header;
    type IntoIter = std::slice::Iter<'a, Header>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

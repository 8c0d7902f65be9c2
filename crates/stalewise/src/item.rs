//! Stored responses and their freshness
//!
//! Freshness rules, first match wins:
//! 1. `Cache-Control: max-age` counts from `Date` (storage time if `Date` is
//!    missing or invalid); fresh until that instant has passed.
//! 2. A valid `Expires` is fresh strictly before the expiry, unless a valid
//!    `Date` is at or after it.
//! 3. An invalid `Expires` is stale.
//! 4. `Last-Modified` alone gives a heuristic lifetime of a tenth of the time
//!    between modification and `Date` (or storage time).
//! 5. Anything else is stale.

use chrono::{DateTime, Duration, Utc};

use crate::headers::{names, Headers};
use crate::http_date;
use crate::message::HttpResponse;

/// Heuristic lifetime is the time since last modification divided by this
pub const HEURISTIC_DIVISOR: i32 = 10;

/// When a stored response stops being fresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Fresh up to and including this instant
    After(DateTime<Utc>),
    /// Fresh strictly before this instant
    At(DateTime<Utc>),
    /// Never fresh; must be revalidated before use
    Stale,
}

impl Expiry {
    /// Whether the response is stale at `now`
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        match *self {
            Expiry::After(instant) => now > instant,
            Expiry::At(instant) => now >= instant,
            Expiry::Stale => true,
        }
    }
}

/// A response as held by the cache, stamped with the time it was stored
///
/// Items are immutable; a revalidated response becomes a new item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheItem {
    response: HttpResponse,
    storage_time: DateTime<Utc>,
}

impl CacheItem {
    /// Wrap a response stored now
    pub fn new(response: HttpResponse) -> Self {
        Self::with_storage_time(response, Utc::now())
    }

    /// Wrap a response with a known storage time
    pub fn with_storage_time(response: HttpResponse, storage_time: DateTime<Utc>) -> Self {
        Self {
            response,
            storage_time,
        }
    }

    /// The stored response
    pub fn response(&self) -> &HttpResponse {
        &self.response
    }

    /// When the item was stored
    pub fn storage_time(&self) -> DateTime<Utc> {
        self.storage_time
    }

    /// Time since storage
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.storage_time
    }

    /// Whether the item is stale at `now`
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.expiry().is_stale(now)
    }

    /// Whether the item is stale at the current wall-clock time
    pub fn is_stale_now(&self) -> bool {
        self.is_stale(Utc::now())
    }

    /// Compute the freshness boundary of the stored response
    pub fn expiry(&self) -> Expiry {
        let headers = self.response.headers();
        let date = parse_date(headers, names::DATE);

        if let Some(max_age) = self.response.cache_control().max_age() {
            let base = date.unwrap_or(self.storage_time);
            return Expiry::After(offset(base, Duration::try_seconds(max_age)));
        }

        if let Some(expires) = headers.first(names::EXPIRES) {
            let Ok(expires) = http_date::parse(expires) else {
                return Expiry::Stale;
            };
            // A response dated at or after its own expiry was never fresh
            if date.is_some_and(|date| expires <= date) {
                return Expiry::Stale;
            }
            return Expiry::At(expires);
        }

        if let Some(last_modified) = headers.first(names::LAST_MODIFIED) {
            let Ok(last_modified) = http_date::parse(last_modified) else {
                return Expiry::Stale;
            };
            let base = date.unwrap_or(self.storage_time);
            return self.lifetime_from_storage((base - last_modified) / HEURISTIC_DIVISOR);
        }

        Expiry::Stale
    }

    fn lifetime_from_storage(&self, lifetime: Duration) -> Expiry {
        if lifetime <= Duration::zero() {
            Expiry::Stale
        } else {
            Expiry::At(offset(self.storage_time, Some(lifetime)))
        }
    }

    /// Whether the item carries a validator usable for revalidation
    pub fn can_validate(&self) -> bool {
        let headers = self.response.headers();
        headers.contains(names::ETAG) || headers.contains(names::LAST_MODIFIED)
    }

    /// `If-None-Match` / `If-Modified-Since` headers for revalidating this item
    pub fn conditional_headers(&self) -> Headers {
        let headers = self.response.headers();
        let mut conditional = Headers::new();
        if let Some(etag) = headers.first(names::ETAG) {
            conditional = conditional.add(names::IF_NONE_MATCH, etag);
        }
        if let Some(last_modified) = headers.first(names::LAST_MODIFIED) {
            conditional = conditional.add(names::IF_MODIFIED_SINCE, last_modified);
        }
        conditional
    }
}

fn parse_date(headers: &Headers, name: &str) -> Option<DateTime<Utc>> {
    headers.first(name).and_then(|value| http_date::parse(value).ok())
}

/// `base + delta`, saturating to the far future on overflow
fn offset(base: DateTime<Utc>, delta: Option<Duration>) -> DateTime<Utc> {
    delta
        .and_then(|delta| base.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

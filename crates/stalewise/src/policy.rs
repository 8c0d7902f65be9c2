//! Cacheability and storability rules
//!
//! These are pure functions over request and response metadata. A caller
//! stores a response only when the request is cacheable, the response is
//! cacheable and the response should be stored; before storing it strips
//! hop-by-hop headers with [`remove_unmodifiable_headers`].

use crate::headers::{names, Headers};
use crate::message::{HttpRequest, HttpResponse, Method, Status};
use crate::vary::Vary;

/// Status codes whose responses may be cached
const CACHEABLE_STATUSES: [Status; 5] = [
    Status::OK,
    Status::NON_AUTHORITATIVE_INFORMATION,
    Status::MULTIPLE_CHOICES,
    Status::MOVED_PERMANENTLY,
    Status::GONE,
];

/// Headers that only describe one transport hop
const HOP_BY_HOP: [&str; 8] = [
    names::CONNECTION,
    names::KEEP_ALIVE,
    names::PROXY_AUTHENTICATE,
    names::PROXY_AUTHORIZATION,
    names::TE,
    names::TRAILER,
    names::TRANSFER_ENCODING,
    names::UPGRADE,
];

/// Whether a request may be answered from, or populate, the cache
///
/// Only GET and HEAD qualify. `no-store` on the request disqualifies it;
/// `no-cache` alone does not, it only forces revalidation.
pub fn is_cacheable_request(request: &HttpRequest) -> bool {
    if !request.method().is_cacheable() {
        return false;
    }
    !request.cache_control().no_store()
}

/// Whether the response status is one the cache may keep
pub fn is_cacheable_response(response: &HttpResponse) -> bool {
    CACHEABLE_STATUSES.contains(&response.status())
}

/// Whether a response carries enough information to be stored
///
/// Requires a freshness signal (`Expires`, `max-age`) or a validator
/// (`ETag`, `Last-Modified`). `no-store` and `Vary: *` responses are never
/// stored.
pub fn should_be_stored(response: &HttpResponse) -> bool {
    let headers = response.headers();
    let cache_control = response.cache_control();

    if cache_control.no_store() {
        return false;
    }
    if Vary::from_exchange(&Headers::new(), headers).is_wildcard() {
        return false;
    }

    headers.contains(names::EXPIRES)
        || headers.contains(names::LAST_MODIFIED)
        || headers.contains(names::ETAG)
        || cache_control.max_age().is_some()
}

/// Whether a request invalidates stored responses for its URI
pub fn is_invalidating_request(request: &HttpRequest) -> bool {
    matches!(
        request.method(),
        Method::Post | Method::Put | Method::Delete | Method::Patch
    )
}

/// Strip hop-by-hop headers before a response is stored
///
/// Besides the fixed hop-by-hop set, any header named in a `Connection`
/// header is removed too.
pub fn remove_unmodifiable_headers(headers: &Headers) -> Headers {
    let nominated: Vec<String> = headers
        .directives(names::CONNECTION)
        .iter()
        .map(|directive| directive.name().to_string())
        .collect();

    headers
        .iter()
        .filter(|header| {
            !HOP_BY_HOP.iter().any(|name| header.is(name))
                && !nominated.iter().any(|name| header.is(name))
        })
        .cloned()
        .collect()
}

/// Prepare a response for storage: hop-by-hop headers removed
pub fn storable_response(response: &HttpResponse) -> HttpResponse {
    response
        .clone()
        .with_headers(remove_unmodifiable_headers(response.headers()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache_control::CacheControl;
    use crate::http_date;
    use chrono::{DateTime, TimeZone, Utc};

    fn date_time(seconds: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2009, 4, 22, 10, 10, seconds).unwrap()
    }

    fn with_date(headers: Headers, name: &str, seconds: u32) -> Headers {
        headers.add(name, http_date::format(date_time(seconds)))
    }

    #[test]
    fn test_cacheable_request() {
        assert!(is_cacheable_request(&HttpRequest::new("fooo")));
        assert!(is_cacheable_request(
            &HttpRequest::new("fooo").with_cache_control(CacheControl::empty())
        ));
        assert!(is_cacheable_request(
            &HttpRequest::new("fooo").with_cache_control(CacheControl::builder().no_cache().build())
        ));
        assert!(is_cacheable_request(&HttpRequest::with_method("fooo", Method::Head)));
    }

    #[test]
    fn test_not_cacheable_request() {
        assert!(!is_cacheable_request(&HttpRequest::with_method("fooo", Method::Post)));
        assert!(!is_cacheable_request(
            &HttpRequest::with_method("fooo", Method::Put).with_header("Cache-Control", "max-age=10")
        ));
        assert!(!is_cacheable_request(
            &HttpRequest::new("fooo")
                .with_cache_control(CacheControl::builder().no_store().no_cache().build())
        ));
        assert!(!is_cacheable_request(
            &HttpRequest::new("fooo").with_cache_control(CacheControl::builder().no_store().build())
        ));
    }

    fn assert_cacheable_headers(headers: Headers) {
        for status in [
            Status::OK,
            Status::NON_AUTHORITATIVE_INFORMATION,
            Status::MULTIPLE_CHOICES,
            Status::MOVED_PERMANENTLY,
            Status::GONE,
        ] {
            assert!(
                is_cacheable_response(&HttpResponse::new(status, headers.clone())),
                "status {} was not cacheable",
                status
            );
        }
    }

    #[test]
    fn test_cacheable_responses() {
        let headers = Headers::new()
            .add("Cache-Control", "private, max-age=39")
            .add("ETag", "\"123\"");
        assert_cacheable_headers(with_date(headers, names::DATE, 10));

        let headers = Headers::new().add("Cache-Control", "private, max-age=39");
        let headers = with_date(headers, names::EXPIRES, 40);
        let headers = with_date(headers, names::DATE, 0);
        assert_cacheable_headers(with_date(headers, names::LAST_MODIFIED, 0));

        assert_cacheable_headers(Headers::new());
    }

    #[test]
    fn test_not_cacheable_responses() {
        let headers = with_date(Headers::new(), "date", 10).add("Cache-Control", "private, max-age=39");

        for status in [Status::NOT_MODIFIED, Status::ACCEPTED, Status::CREATED] {
            assert!(
                !is_cacheable_response(&HttpResponse::new(status, headers.clone())),
                "status {} was cacheable",
                status
            );
        }
    }

    #[test]
    fn test_response_with_expiry_should_be_stored() {
        let headers = with_date(Headers::new(), "date", 10);
        let headers = with_date(headers, names::EXPIRES, 11);
        assert!(should_be_stored(&HttpResponse::new(Status::OK, headers)));
    }

    #[test]
    fn test_response_with_etag_should_be_stored() {
        let headers = Headers::new().add("etag", "\"foo\"");
        assert!(should_be_stored(&HttpResponse::new(Status::OK, headers)));
    }

    #[test]
    fn test_response_with_last_modified_should_be_stored() {
        let headers = with_date(Headers::new(), names::LAST_MODIFIED, 11);
        assert!(should_be_stored(&HttpResponse::new(Status::OK, headers)));
    }

    #[test]
    fn test_response_with_max_age_should_be_stored() {
        let headers = Headers::new().add("Cache-Control", "max-age=10");
        assert!(should_be_stored(&HttpResponse::new(Status::OK, headers)));
    }

    #[test]
    fn test_response_with_everything_should_be_stored() {
        let headers = with_date(Headers::new(), "date", 10);
        let headers = with_date(headers, names::EXPIRES, 20);
        let headers = with_date(headers, names::LAST_MODIFIED, 9)
            .add("Cache-Control", "max-age=10")
            .add("etag", "\"foo\"");
        assert!(should_be_stored(&HttpResponse::new(Status::OK, headers)));
    }

    #[test]
    fn test_response_without_headers_should_not_be_stored() {
        assert!(!should_be_stored(&HttpResponse::new(Status::OK, Headers::new())));
    }

    #[test]
    fn test_response_with_only_date_should_not_be_stored() {
        let headers = with_date(Headers::new(), "date", 10);
        assert!(!should_be_stored(&HttpResponse::new(Status::OK, headers)));
    }

    #[test]
    fn test_no_store_and_wildcard_vary_should_not_be_stored() {
        let headers = Headers::new().add("Cache-Control", "no-store, max-age=10");
        assert!(!should_be_stored(&HttpResponse::new(Status::OK, headers)));

        let headers = Headers::new().add("ETag", "\"1\"").add("Vary", "*");
        assert!(!should_be_stored(&HttpResponse::new(Status::OK, headers)));
    }

    #[test]
    fn test_removing_unmodifiable_headers() {
        let headers = Headers::new()
            .add("Connection", "close")
            .add("Transfer-Encoding", "compress");

        let modified = remove_unmodifiable_headers(&headers);
        assert_eq!(modified, Headers::new());
        assert_eq!(remove_unmodifiable_headers(&modified), modified);
    }

    #[test]
    fn test_removing_connection_nominated_headers() {
        let headers = Headers::new()
            .add("Connection", "X-Trace, keep-alive")
            .add("x-trace", "abc")
            .add("Keep-Alive", "timeout=5")
            .add("ETag", "\"1\"");

        let once = remove_unmodifiable_headers(&headers);
        assert_eq!(once, Headers::new().add("ETag", "\"1\""));
        assert_eq!(remove_unmodifiable_headers(&once), once);
    }

    #[test]
    fn test_headers_unchanged_without_hop_by_hop() {
        let headers = Headers::new()
            .add("Content-Type", "text/plain")
            .add("ETag", "\"1\"");
        assert_eq!(remove_unmodifiable_headers(&headers), headers);
    }

    #[test]
    fn test_invalidating_request() {
        assert!(is_invalidating_request(&HttpRequest::with_method("u", Method::Post)));
        assert!(is_invalidating_request(&HttpRequest::with_method("u", Method::Delete)));
        assert!(!is_invalidating_request(&HttpRequest::new("u")));
    }

    #[test]
    fn test_storable_response_strips_headers() {
        let response = HttpResponse::new(
            Status::OK,
            Headers::new().add("Connection", "close").add("ETag", "\"1\""),
        );
        let stored = storable_response(&response);
        assert!(!stored.headers().contains("connection"));
        assert!(stored.headers().contains("etag"));
    }
}

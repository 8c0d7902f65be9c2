//! Request and response metadata consumed by the cache rules

use std::fmt;
use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::cache_control::CacheControl;
use crate::headers::{names, Headers};

/// HTTP request method
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET
    Get,
    /// HEAD
    Head,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
    /// PATCH
    Patch,
    /// OPTIONS
    Options,
    /// TRACE
    Trace,
    /// CONNECT
    Connect,
    /// Any other method token
    Other(String),
}

impl Method {
    /// Parse a method token (case-sensitive, as on the wire)
    pub fn parse(token: &str) -> Self {
        match token {
            "GET" => Method::Get,
            "HEAD" => Method::Head,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            "PATCH" => Method::Patch,
            "OPTIONS" => Method::Options,
            "TRACE" => Method::Trace,
            "CONNECT" => Method::Connect,
            other => Method::Other(other.to_string()),
        }
    }

    /// Method token
    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Options => "OPTIONS",
            Method::Trace => "TRACE",
            Method::Connect => "CONNECT",
            Method::Other(token) => token,
        }
    }

    /// Whether responses to this method may be served from cache
    pub fn is_cacheable(&self) -> bool {
        matches!(self, Method::Get | Method::Head)
    }

    /// Whether the method is defined as safe (no server-side effects)
    pub fn is_safe(&self) -> bool {
        matches!(
            self,
            Method::Get | Method::Head | Method::Options | Method::Trace
        )
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP status code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Status(pub u16);

impl Status {
    /// 200 OK
    pub const OK: Status = Status(200);
    /// 201 Created
    pub const CREATED: Status = Status(201);
    /// 202 Accepted
    pub const ACCEPTED: Status = Status(202);
    /// 203 Non-Authoritative Information
    pub const NON_AUTHORITATIVE_INFORMATION: Status = Status(203);
    /// 204 No Content
    pub const NO_CONTENT: Status = Status(204);
    /// 300 Multiple Choices
    pub const MULTIPLE_CHOICES: Status = Status(300);
    /// 301 Moved Permanently
    pub const MOVED_PERMANENTLY: Status = Status(301);
    /// 304 Not Modified
    pub const NOT_MODIFIED: Status = Status(304);
    /// 404 Not Found
    pub const NOT_FOUND: Status = Status(404);
    /// 410 Gone
    pub const GONE: Status = Status(410);

    /// Numeric code
    pub fn code(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Response body held by the cache
///
/// File payloads are external resources: the cache owns the file once the
/// payload is stored and deletes it when the entry goes away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Body kept in memory
    Inline {
        /// Media type
        mime: String,
        /// Body bytes
        data: Bytes,
    },
    /// Body spooled to a file
    File {
        /// Media type
        mime: String,
        /// Location of the body
        path: PathBuf,
    },
}

impl Payload {
    /// In-memory payload
    pub fn inline(mime: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Payload::Inline {
            mime: mime.into(),
            data: data.into(),
        }
    }

    /// File-backed payload
    pub fn file(mime: impl Into<String>, path: impl AsRef<Path>) -> Self {
        Payload::File {
            mime: mime.into(),
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Media type
    pub fn mime(&self) -> &str {
        match self {
            Payload::Inline { mime, .. } | Payload::File { mime, .. } => mime,
        }
    }

    /// Backing file, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            Payload::Inline { .. } => None,
            Payload::File { path, .. } => Some(path),
        }
    }

    /// Release the external resource behind this payload
    ///
    /// Deletes the backing file of a file payload. A file that is already
    /// gone counts as released; other failures are logged.
    pub fn release(&self) {
        if let Payload::File { path, .. } = self {
            match std::fs::remove_file(path) {
                Ok(()) => tracing::debug!(path = %path.display(), "released payload file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to release payload file")
                }
            }
        }
    }
}

/// Request metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    uri: String,
    method: Method,
    headers: Headers,
}

impl HttpRequest {
    /// GET request for a URI
    pub fn new(uri: impl Into<String>) -> Self {
        Self::with_method(uri, Method::Get)
    }

    /// Request with an explicit method
    pub fn with_method(uri: impl Into<String>, method: Method) -> Self {
        Self {
            uri: uri.into(),
            method,
            headers: Headers::new(),
        }
    }

    /// Append a header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers = self.headers.add(name, value);
        self
    }

    /// Replace all headers
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Replace the `Cache-Control` header
    pub fn with_cache_control(mut self, cache_control: CacheControl) -> Self {
        self.headers = self
            .headers
            .set(names::CACHE_CONTROL, cache_control.to_string());
        self
    }

    /// Request target, used as the resource identifier
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Request method
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request headers
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// The request's own `Cache-Control`
    pub fn cache_control(&self) -> CacheControl {
        CacheControl::from_headers(&self.headers)
    }
}

/// Response metadata plus an optional payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    status: Status,
    headers: Headers,
    payload: Option<Payload>,
}

impl HttpResponse {
    /// Response without a payload
    pub fn new(status: Status, headers: Headers) -> Self {
        Self {
            status,
            headers,
            payload: None,
        }
    }

    /// Attach a payload
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Replace the headers
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Status code
    pub fn status(&self) -> Status {
        self.status
    }

    /// Response headers
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Payload, if any
    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    /// The response's `Cache-Control`
    pub fn cache_control(&self) -> CacheControl {
        CacheControl::from_headers(&self.headers)
    }
}

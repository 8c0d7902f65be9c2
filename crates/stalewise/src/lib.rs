//! # stalewise
//!
//! HTTP cache semantics for a client-side cache.
//!
//! ## Decisions
//! - Is the request cacheable? ([`policy::is_cacheable_request`])
//! - Is the response cacheable and worth storing?
//!   ([`policy::is_cacheable_response`], [`policy::should_be_stored`])
//! - What must be stripped before storage?
//!   ([`policy::remove_unmodifiable_headers`])
//! - Is a stored item still fresh? ([`CacheItem::is_stale`])
//! - Which stored variant answers a request? ([`Vary::matches`])
//!
//! Storage lives in the `stalecache` crate.

#![warn(missing_docs)]

mod cache_control;
mod directive;
mod error;
mod headers;
mod item;
mod message;
mod parser;
mod vary;

pub mod http_date;
pub mod policy;

pub use cache_control::{CacheControl, CacheControlBuilder};
pub use directive::{Directive, Parameter, INVALID_INTEGER};
pub use error::{Error, Result};
pub use headers::{names, Header, Headers};
pub use item::{CacheItem, Expiry, HEURISTIC_DIVISOR};
pub use message::{HttpRequest, HttpResponse, Method, Payload, Status};
pub use parser::parse_elements;
pub use vary::Vary;

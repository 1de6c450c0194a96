//! Request options: the method, body, and headers half of a request descriptor.
//!
//! A request is identified by its target plus a [`FetchOptions`]. Every field
//! has an explicit default (`GET`, empty body, no headers), so an absent
//! option and a defaulted one derive the same cache key.

use bytes::Bytes;
use serde::{Deserialize, Deserializer};

use super::{Headers, Method};

/// Options for a single fetch: method, body, and headers.
///
/// Built with fluent setters or deserialized from configuration:
///
/// ```
/// use fetchcache::http::{FetchOptions, Method};
///
/// let options = FetchOptions::new()
///     .method("post")
///     .header("Content-Type", "application/json")
///     .body(r#"{"q":"rust"}"#);
///
/// assert_eq!(options.method_ref(), &Method::Post);
/// assert_eq!(options.body_text(), r#"{"q":"rust"}"#);
///
/// let parsed: FetchOptions = serde_json::from_str(r#"{"method":"put"}"#).unwrap();
/// assert_eq!(parsed.method_ref(), &Method::Put);
/// assert!(parsed.body_bytes().is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FetchOptions {
    method: Method,
    #[serde(deserialize_with = "body_from_string")]
    body: Bytes,
    headers: Headers,
}

impl FetchOptions {
    /// Creates options with every field at its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the request method. Any casing is accepted and normalized.
    #[must_use]
    pub fn method(mut self, method: impl Into<Method>) -> Self {
        self.method = method.into();
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Appends a request header. Multiple calls with the same name are additive.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Replaces the whole header set.
    #[must_use]
    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Returns the request method.
    pub fn method_ref(&self) -> &Method {
        &self.method
    }

    /// Returns the raw body bytes.
    pub fn body_bytes(&self) -> &Bytes {
        &self.body
    }

    /// Returns the body coerced to a string (lossy UTF-8; empty when absent).
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Returns the request headers.
    pub fn headers_ref(&self) -> &Headers {
        &self.headers
    }
}

fn body_from_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(Bytes::from(raw))
}

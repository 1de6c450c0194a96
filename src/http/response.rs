//! Transport response.
//!
//! A [`Response`] is what a transport hands back: a status, headers, and a
//! fully buffered body. Decoding consumes the value, so a body can be read at
//! most once per copy; cloning is how independent readers get their own copy.
//! The body lives in a [`Bytes`] buffer, so a clone shares the allocation.

use bytes::Bytes;
use serde::de::DeserializeOwned;

use super::{Headers, StatusCode};
use crate::error::FetchError;

/// A settled HTTP response.
///
/// # Examples
///
/// ```
/// use fetchcache::http::{Response, StatusCode};
///
/// let response = Response::new(StatusCode::OK)
///     .header("Content-Type", "application/json")
///     .body(r#"{"data":"string"}"#);
///
/// let copy = response.clone();
/// assert!(response.ok());
///
/// let first: serde_json::Value = response.json().unwrap();
/// let second: serde_json::Value = copy.json().unwrap();
/// assert_eq!(first, second);
/// ```
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: Headers,
    body: Bytes,
}

impl Response {
    /// Creates a new response with the given status and an empty body.
    pub fn new(status: impl Into<StatusCode>) -> Self {
        Self {
            status: status.into(),
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    /// Appends a response header. Multiple calls with the same name are additive.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Replaces the whole header set.
    #[must_use]
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Sets the response body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Returns the status code of this response.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns `true` when the status is in the 2xx range.
    pub fn ok(&self) -> bool {
        self.status.is_success()
    }

    /// Returns the response headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Consumes the response and decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Decode`] if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(self) -> Result<T, FetchError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Consumes the response and returns the body as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Decode`] if the body is not valid UTF-8.
    pub fn text(self) -> Result<String, FetchError> {
        String::from_utf8(self.body.to_vec()).map_err(|e| FetchError::Decode(e.to_string()))
    }

    /// Consumes the response and returns the raw body.
    pub fn bytes(self) -> Bytes {
        self.body
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new(StatusCode::OK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn ok_follows_status() {
        assert!(Response::new(StatusCode::CREATED).ok());
        assert!(!Response::new(500u16).ok());
        assert_eq!(Response::new(500u16).status().as_u16(), 500);
    }

    #[test]
    fn clones_decode_independently() {
        let original = Response::new(StatusCode::OK).body(r#"{"data":"string"}"#);
        let a = original.clone();
        let b = original.clone();
        assert_eq!(a.json::<Value>().unwrap(), json!({"data": "string"}));
        assert_eq!(b.json::<Value>().unwrap(), json!({"data": "string"}));
        assert_eq!(original.text().unwrap(), r#"{"data":"string"}"#);
    }

    #[test]
    fn malformed_json_is_decode_error() {
        let r = Response::new(StatusCode::OK).body("not json");
        assert!(matches!(r.json::<Value>(), Err(FetchError::Decode(_))));
    }

    #[test]
    fn invalid_utf8_text() {
        let r = Response::new(StatusCode::OK).body(vec![0xffu8, 0xfe]);
        assert!(matches!(r.text(), Err(FetchError::Decode(_))));
    }

    #[test]
    fn headers_are_kept() {
        let r = Response::new(StatusCode::OK).header("ETag", "\"v1\"");
        assert_eq!(r.headers().get("etag"), Some("\"v1\""));
    }
}

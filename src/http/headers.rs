//! Request and response headers.
//!
//! [`Headers`] keeps entries in insertion order and looks names up without
//! regard to case. Its canonical form, a JSON object in insertion order, is
//! what [`derive_key`](crate::cache::derive_key) folds into a cache key.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Ordered header list attached to a [`FetchOptions`](super::FetchOptions)
/// or a [`Response`](super::Response).
///
/// ```
/// use fetchcache::http::Headers;
///
/// let headers: Headers = [("Accept", "application/json")].into_iter().collect();
/// assert_eq!(headers.get("accept"), Some("application/json"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    inner: Vec<(String, String)>,
}

impl Headers {
    /// Creates an empty header map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a header map with pre-allocated capacity for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Vec::with_capacity(capacity),
        }
    }

    /// Appends an entry. Repeating a name adds a second value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }

    /// First value stored under `name`, ignoring case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Number of entries, counting repeated names.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if there are no header entries.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the canonical string form used for cache keys.
    ///
    /// An empty map serializes to the empty string; otherwise the headers are
    /// written as a JSON object in insertion order, names kept as given:
    ///
    /// ```
    /// use fetchcache::http::Headers;
    ///
    /// let mut headers = Headers::new();
    /// headers.insert("Content-Type", "application");
    /// assert_eq!(headers.canonical(), r#"{"Content-Type":"application"}"#);
    /// assert_eq!(Headers::new().canonical(), "");
    /// ```
    pub fn canonical(&self) -> String {
        if self.inner.is_empty() {
            return String::new();
        }
        // Serializing string pairs into a String buffer cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl<N, V> FromIterator<(N, V)> for Headers
where
    N: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self {
            inner: iter
                .into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
        }
    }
}

impl Serialize for Headers {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.inner.len()))?;
        for (name, value) in &self.inner {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Headers {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HeadersVisitor;

        impl<'de> Visitor<'de> for HeadersVisitor {
            type Value = Headers;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of header names to values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Headers, A::Error> {
                let mut headers = Headers::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, value)) = access.next_entry::<String, String>()? {
                    headers.insert(name, value);
                }
                Ok(headers)
            }
        }

        deserializer.deserialize_map(HeadersVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case() {
        let mut h = Headers::new();
        h.insert("Content-Type", "text/plain");
        assert_eq!(h.get("CONTENT-TYPE"), Some("text/plain"));
        assert!(h.get("accept").is_none());
    }

    #[test]
    fn repeated_names_are_kept_in_canonical_form() {
        let mut h = Headers::new();
        h.insert("Accept", "text/html");
        h.insert("Accept", "application/json");
        assert_eq!(h.len(), 2);
        assert_eq!(
            h.canonical(),
            r#"{"Accept":"text/html","Accept":"application/json"}"#
        );
    }

    #[test]
    fn empty_map_has_empty_canonical_form() {
        let h = Headers::new();
        assert!(h.is_empty());
        assert_eq!(h.canonical(), "");
    }

    #[test]
    fn canonical_preserves_insertion_order() {
        let h: Headers = [("B", "2"), ("A", "1")].into_iter().collect();
        assert_eq!(h.canonical(), r#"{"B":"2","A":"1"}"#);
    }

    #[test]
    fn canonical_escapes_values() {
        let h: Headers = [("X-Quote", "a\"b")].into_iter().collect();
        assert_eq!(h.canonical(), r#"{"X-Quote":"a\"b"}"#);
    }

    #[test]
    fn deserialize_from_json_object() {
        let h: Headers = serde_json::from_str(r#"{"Accept":"*/*","X-Id":"7"}"#).unwrap();
        assert_eq!(h.len(), 2);
        assert_eq!(h.get("x-id"), Some("7"));
        assert_eq!(h.canonical(), r#"{"Accept":"*/*","X-Id":"7"}"#);
    }
}

//! Cache key derivation from request attributes.
//!
//! [`derive_key`] is the default identity function: it joins the target, the
//! upper-cased method, the body text, and the canonical header string with
//! `||`. Fields are not escaped, so a field that itself contains `||` can make
//! two different descriptors collide. [`length_prefixed_key`] is the
//! unambiguous alternative for callers who cannot rule that out.

use crate::http::FetchOptions;

/// Opaque cache identity, compared by byte equality.
pub type CacheKey = String;

/// Delimiter placed between the fields of a default key.
pub const KEY_DELIMITER: &str = "||";

/// Derives the default cache key for `target` fetched with `options`.
///
/// Equal descriptors always produce equal keys. A default descriptor with an
/// empty target yields the fixed sentinel `||GET||||`.
///
/// # Examples
///
/// ```
/// use fetchcache::cache::derive_key;
/// use fetchcache::http::FetchOptions;
///
/// let key = derive_key("http://example.com/success", &FetchOptions::default());
/// assert_eq!(key, "http://example.com/success||GET||||");
///
/// let post = FetchOptions::new().method("post").body("a=1");
/// assert_eq!(derive_key("/api", &post), "/api||POST||a=1||");
/// ```
pub fn derive_key(target: &str, options: &FetchOptions) -> CacheKey {
    [
        target,
        options.method_ref().as_str(),
        options.body_text().as_str(),
        options.headers_ref().canonical().as_str(),
    ]
    .join(KEY_DELIMITER)
}

/// Derives a key where every field is prefixed by its byte length.
///
/// Unlike [`derive_key`], no choice of field values can make two different
/// descriptors share a key.
///
/// ```
/// use fetchcache::cache::length_prefixed_key;
/// use fetchcache::http::FetchOptions;
///
/// let a = length_prefixed_key("a||b", &FetchOptions::default());
/// let b = length_prefixed_key("a", &FetchOptions::new().method("b"));
/// assert_ne!(a, b);
/// ```
pub fn length_prefixed_key(target: &str, options: &FetchOptions) -> CacheKey {
    let body = options.body_text();
    let headers = options.headers_ref().canonical();
    let fields = [target, options.method_ref().as_str(), body.as_str(), headers.as_str()];

    let mut key = String::with_capacity(fields.iter().map(|f| f.len() + 8).sum());
    for field in fields {
        key.push_str(&field.len().to_string());
        key.push(':');
        key.push_str(field);
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(target: &str, options: FetchOptions) -> CacheKey {
        derive_key(target, &options)
    }

    #[test]
    fn works_without_any_input() {
        assert_eq!(key("", FetchOptions::default()), "||GET||||");
    }

    #[test]
    fn is_deterministic() {
        let options = FetchOptions::new()
            .method("put")
            .body("payload")
            .header("Accept", "application/json");
        assert_eq!(derive_key("/x", &options), derive_key("/x", &options.clone()));
    }

    #[test]
    fn cares_about_target() {
        assert_ne!(
            key("test", FetchOptions::default()),
            key("test2", FetchOptions::default())
        );
    }

    #[test]
    fn cares_about_method() {
        assert_ne!(
            key("", FetchOptions::new().method("get")),
            key("", FetchOptions::new().method("post"))
        );
    }

    #[test]
    fn method_is_case_normalized() {
        assert_eq!(
            key("", FetchOptions::new().method("get")),
            key("", FetchOptions::default())
        );
        assert_eq!(key("", FetchOptions::new().method("purge")), "||PURGE||||");
    }

    #[test]
    fn cares_about_body() {
        assert_ne!(
            key("", FetchOptions::new().body("get")),
            key("", FetchOptions::new().body("post"))
        );
    }

    #[test]
    fn cares_about_headers() {
        assert_ne!(
            key("", FetchOptions::new().header("Content-Type", "application")),
            key("", FetchOptions::new().header("Content-Type", "application2"))
        );
        assert_eq!(
            key("", FetchOptions::new().header("Content-Type", "application")),
            r#"||GET||||{"Content-Type":"application"}"#
        );
    }

    #[test]
    fn delimiter_collision_is_possible() {
        // Known ambiguity of the default format: fields are not escaped.
        let a = key("a||GET", FetchOptions::default());
        let b = key("a", FetchOptions::new().body("GET||"));
        assert_eq!(a, "a||GET||GET||||");
        assert_eq!(a, b);
        assert_ne!(
            length_prefixed_key("a||GET", &FetchOptions::default()),
            length_prefixed_key("a", &FetchOptions::new().body("GET||"))
        );
    }

    #[test]
    fn length_prefixed_is_unambiguous() {
        assert_ne!(
            length_prefixed_key("a||GET||b", &FetchOptions::default()),
            length_prefixed_key("a", &FetchOptions::new().body("b||GET"))
        );
        assert_eq!(
            length_prefixed_key("", &FetchOptions::default()),
            "0:3:GET0:0:"
        );
    }
}

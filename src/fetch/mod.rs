//! Fetch coordinator: the single entry point consumers call.
//!
//! [`Fetcher`] ties a [`Transport`] to a [`FetchCache`] and a key generator.
//! When no explicit key is supplied, one is derived from the target and
//! options (by default with [`derive_key`]); the request is then
//! coalesced through the cache.
//!
//! The coordinator never writes resolved values; that is left to
//! [`Loader`](crate::loader::Loader).
//!
//! # Examples
//!
//! ```rust,no_run
//! use fetchcache::error::FetchError;
//! use fetchcache::fetch::Fetcher;
//! use fetchcache::http::{FetchOptions, Response, StatusCode};
//!
//! # async fn run() -> Result<(), FetchError> {
//! let fetcher = Fetcher::new(|_target: &str, _options: &FetchOptions| async {
//!     Ok::<_, FetchError>(Response::new(StatusCode::OK).body(r#"{"data":"data"}"#))
//! });
//!
//! let value: serde_json::Value = fetcher
//!     .fetch("http://example.com/success", &FetchOptions::default(), None)
//!     .await?
//!     .json()?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::cache::{self, CacheKey, FetchCache, ResponseHandle, derive_key};
use crate::http::FetchOptions;
use crate::transport::Transport;

/// A key-derivation strategy: maps a target and its options to a cache key.
pub type KeyGenerator = Arc<dyn Fn(&str, &FetchOptions) -> CacheKey + Send + Sync + 'static>;

/// Coalescing fetch front-end over a transport and a cache.
///
/// A `Fetcher` built with [`Fetcher::new`] uses the process-wide
/// [`cache::global`] instance; use [`with_cache`](Self::with_cache) for an
/// isolated one. Share a `Fetcher` behind an [`Arc`] to make its key
/// generator override process-wide.
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    cache: FetchCache,
    key_generator: RwLock<KeyGenerator>,
}

impl Fetcher {
    /// Creates a fetcher over `transport`, backed by the global cache and the
    /// default key generator.
    ///
    /// The key generator belongs to this fetcher. Other fetchers on the
    /// global cache keep their own generator and may derive different keys
    /// for the same request.
    ///
    /// # Deadlocks
    ///
    /// `transport` is invoked while the cache lock is held. Touching the
    /// cache synchronously inside the transport deadlocks; do it inside the
    /// returned future instead.
    pub fn new(transport: impl Transport) -> Self {
        Self {
            transport: Arc::new(transport),
            cache: cache::global().clone(),
            key_generator: RwLock::new(default_key_generator()),
        }
    }

    /// Uses `cache` instead of the global instance.
    #[must_use]
    pub fn with_cache(mut self, cache: FetchCache) -> Self {
        self.cache = cache;
        self
    }

    /// Starts out with `generator` instead of the default key generator.
    #[must_use]
    pub fn with_key_generator<G>(self, generator: G) -> Self
    where
        G: Fn(&str, &FetchOptions) -> CacheKey + Send + Sync + 'static,
    {
        self.set_key_generator(generator);
        self
    }

    /// Replaces the key generator.
    ///
    /// Only keys derived after this call are affected; entries already cached
    /// under previously derived keys stay where they are. The change is local
    /// to this fetcher; share it behind an [`Arc`] for a process-wide override.
    pub fn set_key_generator<G>(&self, generator: G)
    where
        G: Fn(&str, &FetchOptions) -> CacheKey + Send + Sync + 'static,
    {
        *self
            .key_generator
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(generator);
    }

    /// Restores the default key generator ([`derive_key`]).
    pub fn reset_key_generator(&self) {
        *self
            .key_generator
            .write()
            .unwrap_or_else(PoisonError::into_inner) = default_key_generator();
    }

    /// Returns the cache this fetcher reads and writes.
    pub fn cache(&self) -> &FetchCache {
        &self.cache
    }

    /// Derives the cache key for `target` and `options` with the current generator.
    pub fn cache_key(&self, target: &str, options: &FetchOptions) -> CacheKey {
        let generator = Arc::clone(
            &self
                .key_generator
                .read()
                .unwrap_or_else(PoisonError::into_inner),
        );
        generator(target, options)
    }

    /// Fetches `target`, coalescing with any cached request for the same key.
    ///
    /// `explicit_key` bypasses key derivation entirely.
    pub fn fetch(
        &self,
        target: &str,
        options: &FetchOptions,
        explicit_key: Option<&str>,
    ) -> ResponseHandle {
        let key = self.resolve_key(target, options, explicit_key);
        self.cache
            .fetch_or_coalesce(&key, target, options, self.transport.as_ref())
    }

    /// Re-issues the request for `target` and overwrites the cached entry,
    /// bypassing coalescing.
    pub fn refetch(
        &self,
        target: &str,
        options: &FetchOptions,
        explicit_key: Option<&str>,
    ) -> ResponseHandle {
        let key = self.resolve_key(target, options, explicit_key);
        self.cache
            .refresh(&key, target, options, self.transport.as_ref())
    }

    fn resolve_key(&self, target: &str, options: &FetchOptions, explicit: Option<&str>) -> CacheKey {
        match explicit {
            Some(key) => key.to_owned(),
            None => {
                let key = self.cache_key(target, options);
                debug!(key = %key, "derived cache key");
                key
            }
        }
    }
}

impl fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fetcher")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

fn default_key_generator() -> KeyGenerator {
    Arc::new(derive_key)
}

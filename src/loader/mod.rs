//! Decoding layer on top of [`Fetcher`].
//!
//! A [`Loader`] is bound to one target. It fetches through the coalescing
//! cache, records the status code of the last settled response, turns
//! unsuccessful statuses into [`FetchError::Status`], decodes the body as
//! JSON and stores the decoded payload as the resolved value for its key.
//!
//! [`Loader::initial`] answers synchronously: if a resolved value is already
//! cached, callers can render it while a fresh load is in flight.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use serde_json::Value;
use tracing::debug;

use crate::cache::CacheKey;
use crate::error::FetchError;
use crate::fetch::Fetcher;
use crate::http::{FetchOptions, Response, StatusCode};

// Outside the `u16` range, so every status a transport reports is recordable.
const UNSET: u32 = u32::MAX;

/// State available before any load settles.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    /// Nothing cached yet for this key.
    Pending,
    /// A previously decoded payload is cached; a load may refresh it.
    Reloading { data: Value },
}

/// Fetches, decodes and caches the payload of a single target.
pub struct Loader {
    fetcher: Arc<Fetcher>,
    target: String,
    options: FetchOptions,
    cache_key: Option<CacheKey>,
    // `UNSET` until a response has settled.
    status: AtomicU32,
}

impl Loader {
    /// Creates a loader for `target` fetched with `options`.
    pub fn new(fetcher: Arc<Fetcher>, target: impl Into<String>, options: FetchOptions) -> Self {
        Self {
            fetcher,
            target: target.into(),
            options,
            cache_key: None,
            status: AtomicU32::new(UNSET),
        }
    }

    /// Uses `key` instead of the key derived by the fetcher.
    #[must_use]
    pub fn with_cache_key(mut self, key: impl Into<CacheKey>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    /// Returns the key this loader reads and writes.
    pub fn cache_key(&self) -> CacheKey {
        match &self.cache_key {
            Some(key) => key.clone(),
            None => self.fetcher.cache_key(&self.target, &self.options),
        }
    }

    /// Status code of the most recently settled response, if any.
    pub fn status_code(&self) -> Option<StatusCode> {
        u16::try_from(self.status.load(Ordering::Acquire))
            .ok()
            .map(StatusCode::from)
    }

    /// Returns the cached payload for this loader's key, without waiting.
    pub fn initial(&self) -> LoadState {
        match self.fetcher.cache().get_resolved(&self.cache_key()) {
            Some(data) => LoadState::Reloading { data },
            None => LoadState::Pending,
        }
    }

    /// Loads the payload, coalescing with any request already cached for
    /// this key.
    ///
    /// # Errors
    ///
    /// Returns the transport's error, [`FetchError::Status`] for a
    /// non-success status, or [`FetchError::Decode`] for a malformed body.
    pub async fn load(&self) -> Result<Value, FetchError> {
        let key = self.cache_key();
        let response = self
            .fetcher
            .fetch(&self.target, &self.options, Some(&key))
            .await?;
        self.settle(&key, response)
    }

    /// Like [`load`](Self::load), but always issues a new request and
    /// replaces the cached one.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load).
    pub async fn rerun(&self) -> Result<Value, FetchError> {
        let key = self.cache_key();
        let response = self
            .fetcher
            .refetch(&self.target, &self.options, Some(&key))
            .await?;
        self.settle(&key, response)
    }

    fn settle(&self, key: &str, response: Response) -> Result<Value, FetchError> {
        let status = response.status();
        self.status.store(u32::from(status.as_u16()), Ordering::Release);

        if !status.is_success() {
            return Err(FetchError::Status { status });
        }

        let data = if status.has_decodable_body() {
            response.json::<Value>()?
        } else {
            Value::Null
        };

        debug!(key = %key, status = status.as_u16(), "storing resolved value");
        self.fetcher.cache().put_resolved(key, data.clone());
        Ok(data)
    }
}

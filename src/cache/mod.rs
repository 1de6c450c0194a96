//! Caching layer: coalescing response cache plus a resolved-value cache.
//!
//! [`FetchCache`] owns two maps that share one key space:
//!
//! - **pending**: key → [`ResponseHandle`], the in-flight or settled response
//!   for that key. At most one entry exists per key, so concurrent callers
//!   asking for the same key share a single network call.
//! - **resolved**: key → last successfully decoded payload, readable
//!   synchronously while a refresh for the same key is still in flight.
//!
//! A request whose transport fails, or whose response has a non-success
//! status, removes itself (and the resolved value for its key) before any
//! awaiting caller observes the outcome. Successful responses stay cached.
//!
//! Every read hands out a duplicate: awaiting a [`ResponseHandle`] yields a
//! fresh [`Response`] clone, so each consumer decodes its own copy of the body.
//!
//! A process-wide instance is available through [`global`]. Tests that use it
//! must call [`FetchCache::clear`] between scenarios.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};

use futures::future::{BoxFuture, FutureExt, Shared};
use once_cell::sync::Lazy;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::http::{FetchOptions, Response};
use crate::transport::{Transport, TransportFuture};

pub mod key;

pub use key::{CacheKey, KEY_DELIMITER, derive_key, length_prefixed_key};

/// Process-wide cache shared by every [`Fetcher`](crate::fetch::Fetcher) that
/// is not given its own.
static GLOBAL: Lazy<FetchCache> = Lazy::new(FetchCache::new);

/// Returns the process-wide cache instance.
pub fn global() -> &'static FetchCache {
    &GLOBAL
}

// Source of entry identities; lets an eviction tell its own entry apart from
// one that replaced it via `put`.
static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

type SharedResponse = Shared<BoxFuture<'static, Result<Response, FetchError>>>;

/// A cloneable handle to an in-flight or settled response.
///
/// Cloning is cheap and every clone is an independent reader: awaiting it
/// yields its own [`Response`] copy whose body can be decoded without
/// affecting any other clone.
#[derive(Clone)]
pub struct ResponseHandle {
    id: u64,
    inner: SharedResponse,
}

impl ResponseHandle {
    /// Wraps a response future in a shareable handle.
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = Result<Response, FetchError>> + Send + 'static,
    {
        Self::with_id(NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed), future)
    }

    /// Creates an already-settled handle.
    pub fn ready(result: Result<Response, FetchError>) -> Self {
        Self::new(futures::future::ready(result))
    }

    fn with_id<F>(id: u64, future: F) -> Self
    where
        F: Future<Output = Result<Response, FetchError>> + Send + 'static,
    {
        Self {
            id,
            inner: future.boxed().shared(),
        }
    }

    /// Returns `true` once the underlying request has settled.
    pub fn is_settled(&self) -> bool {
        self.inner.peek().is_some()
    }

    /// Returns `true` if both handles read the same underlying request.
    pub fn same_request(&self, other: &ResponseHandle) -> bool {
        self.id == other.id
    }
}

impl Future for ResponseHandle {
    type Output = Result<Response, FetchError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.poll_unpin(cx)
    }
}

impl fmt::Debug for ResponseHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseHandle")
            .field("id", &self.id)
            .field("settled", &self.is_settled())
            .finish()
    }
}

#[derive(Default)]
struct Entries {
    pending: HashMap<CacheKey, ResponseHandle>,
    resolved: HashMap<CacheKey, Value>,
}

/// The coalescing response cache and its resolved-value companion.
///
/// `FetchCache` is a cheap, reference-counted handle: clones share the same
/// maps. All operations other than awaiting a response are synchronous and
/// take the internal lock only for the duration of the map access.
#[derive(Clone, Default)]
pub struct FetchCache {
    entries: Arc<Mutex<Entries>>,
}

impl FetchCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the response for `key`, starting a request through `transport`
    /// only if no entry exists.
    ///
    /// The lookup and the insertion happen under one lock acquisition, so any
    /// number of concurrent callers for the same key produce exactly one
    /// transport call. A new request is spawned onto the current Tokio
    /// runtime and runs to completion even if every handle is dropped; outside
    /// a runtime it runs when first awaited.
    pub fn fetch_or_coalesce(
        &self,
        key: &str,
        target: &str,
        options: &FetchOptions,
        transport: &dyn Transport,
    ) -> ResponseHandle {
        let mut entries = self.lock();
        if let Some(existing) = entries.pending.get(key) {
            debug!(key = %key, "coalescing onto cached request");
            return existing.clone();
        }

        let handle = self.track(key, transport.send(target, options));
        entries.pending.insert(key.to_owned(), handle.clone());
        drop(entries);

        debug!(key = %key, url = %target, "request issued");
        drive(&handle);
        handle
    }

    /// Issues a new request for `key` and stores it unconditionally,
    /// replacing whatever entry was there. The replaced request, if still in
    /// flight, no longer evicts anything when it fails.
    pub fn refresh(
        &self,
        key: &str,
        target: &str,
        options: &FetchOptions,
        transport: &dyn Transport,
    ) -> ResponseHandle {
        let handle = self.track(key, transport.send(target, options));
        self.put(key, handle.clone());

        debug!(key = %key, url = %target, "request re-issued");
        drive(&handle);
        handle
    }

    /// Returns a duplicate of the entry stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<ResponseHandle> {
        self.lock().pending.get(key).cloned()
    }

    /// Stores `handle` under `key`, replacing any existing entry.
    pub fn put(&self, key: impl Into<CacheKey>, handle: ResponseHandle) {
        self.lock().pending.insert(key.into(), handle);
    }

    /// Removes both the pending and the resolved entry for `key`. Removing an
    /// absent key is a no-op.
    pub fn remove(&self, key: &str) {
        let mut entries = self.lock();
        entries.pending.remove(key);
        entries.resolved.remove(key);
    }

    /// Removes every pending and resolved entry.
    pub fn clear(&self) {
        let mut entries = self.lock();
        entries.pending.clear();
        entries.resolved.clear();
    }

    /// Returns `true` if a pending entry exists for `key`.
    pub fn has_key(&self, key: &str) -> bool {
        self.lock().pending.contains_key(key)
    }

    /// Returns the number of pending entries.
    pub fn size(&self) -> usize {
        self.lock().pending.len()
    }

    /// Returns the keys of all pending entries, in no particular order.
    pub fn keys(&self) -> Vec<CacheKey> {
        self.lock().pending.keys().cloned().collect()
    }

    // ── Resolved values ───────────────────────────────────────────────────────

    /// Returns a copy of the last decoded payload stored for `key`.
    pub fn get_resolved(&self, key: &str) -> Option<Value> {
        self.lock().resolved.get(key).cloned()
    }

    /// Stores a decoded payload for `key`, overwriting any previous value.
    pub fn put_resolved(&self, key: impl Into<CacheKey>, value: Value) {
        self.lock().resolved.insert(key.into(), value);
    }

    /// Returns `true` if a decoded payload is stored for `key`.
    pub fn has_key_resolved(&self, key: &str) -> bool {
        self.lock().resolved.contains_key(key)
    }

    /// Removes only the resolved value for `key`.
    pub fn remove_resolved(&self, key: &str) {
        self.lock().resolved.remove(key);
    }

    /// Removes every resolved value, leaving pending entries alone.
    pub fn clear_resolved(&self) {
        self.lock().resolved.clear();
    }

    // Wraps a transport future so that a failed outcome evicts the entry it
    // was stored as, before any awaiting caller sees the result.
    fn track(&self, key: &str, request: TransportFuture) -> ResponseHandle {
        let id = NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed);
        let entries = Arc::downgrade(&self.entries);
        let key = key.to_owned();

        ResponseHandle::with_id(id, async move {
            let result = request.await;
            match &result {
                Ok(response) if response.ok() => {}
                Ok(response) => {
                    evict(&entries, &key, id);
                    warn!(key = %key, status = response.status().as_u16(), "evicted unsuccessful response");
                }
                Err(e) => {
                    evict(&entries, &key, id);
                    warn!(key = %key, error = %e, "evicted failed request");
                }
            }
            result
        })
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        lock_entries(&self.entries)
    }
}

impl fmt::Debug for FetchCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.lock();
        f.debug_struct("FetchCache")
            .field("pending", &entries.pending.len())
            .field("resolved", &entries.resolved.len())
            .finish()
    }
}

// Every map update is a single call, so a poisoned lock still guards
// consistent maps.
fn lock_entries(entries: &Mutex<Entries>) -> MutexGuard<'_, Entries> {
    entries.lock().unwrap_or_else(PoisonError::into_inner)
}

fn evict(entries: &Weak<Mutex<Entries>>, key: &str, id: u64) {
    let Some(entries) = entries.upgrade() else {
        return;
    };
    let mut entries = lock_entries(&entries);
    if entries.pending.get(key).is_some_and(|h| h.id == id) {
        entries.pending.remove(key);
        entries.resolved.remove(key);
    }
}

// Polls a copy of the handle on the runtime so the request completes (and
// evicts on failure) regardless of whether any caller awaits it.
fn drive(handle: &ResponseHandle) {
    match tokio::runtime::Handle::try_current() {
        Ok(runtime) => {
            let handle = handle.clone();
            runtime.spawn(async move {
                let _ = handle.await;
            });
        }
        Err(_) => debug!("no tokio runtime; request starts on first await"),
    }
}

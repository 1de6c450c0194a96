//! Transport interface: the collaborator that actually performs a request.
//!
//! The cache never speaks HTTP itself. It hands a target and a
//! [`FetchOptions`] to a [`Transport`] and gets back a future that settles to
//! a [`Response`] or a [`FetchError`]. Any `Fn(&str, &FetchOptions) -> impl Future`
//! closure is a transport, which keeps tests and adapters short:
//!
//! ```
//! use fetchcache::error::FetchError;
//! use fetchcache::http::{FetchOptions, Response, StatusCode};
//! use fetchcache::transport::Transport;
//!
//! let transport = |_target: &str, _options: &FetchOptions| async {
//!     Ok::<_, FetchError>(Response::new(StatusCode::OK).body("{}"))
//! };
//! let _pending = transport.send("/ping", &FetchOptions::default());
//! ```
//!
//! With the `reqwest` feature enabled, [`ReqwestTransport`] is available as a
//! ready-made implementation.

use std::future::Future;
use std::pin::Pin;

use crate::error::FetchError;
use crate::http::{FetchOptions, Response};

#[cfg(feature = "reqwest")]
mod reqwest_client;

#[cfg(feature = "reqwest")]
pub use reqwest_client::ReqwestTransport;

/// Type-erased, heap-allocated future returned by [`Transport::send`].
///
/// The future must not borrow from the arguments of `send`; it is stored in
/// the cache and may be polled long after the call returns.
pub type TransportFuture = Pin<Box<dyn Future<Output = Result<Response, FetchError>> + Send>>;

/// Performs network requests on behalf of the cache.
///
/// # Contract
///
/// - `send` is called while the cache holds its internal lock, so it must only
///   *build* the request future. It must not call back into the cache.
/// - The returned future is polled to completion at most once; its outcome is
///   shared by every coalesced caller.
/// - Transport-level failures are reported as [`FetchError::Transport`].
///   Unsuccessful HTTP statuses are **not** errors at this layer.
pub trait Transport: Send + Sync + 'static {
    /// Starts a request for `target` with the given options.
    fn send(&self, target: &str, options: &FetchOptions) -> TransportFuture;
}

impl<T, F> Transport for T
where
    T: Fn(&str, &FetchOptions) -> F + Send + Sync + 'static,
    F: Future<Output = Result<Response, FetchError>> + Send + 'static,
{
    fn send(&self, target: &str, options: &FetchOptions) -> TransportFuture {
        Box::pin((self)(target, options))
    }
}

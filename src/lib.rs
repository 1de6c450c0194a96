//! # fetchcache
//!
//! A coalescing in-memory cache for async network requests.
//!
//! Concurrent requests with the same identity share one transport call. Every
//! caller gets its own readable copy of the response. Failed or unsuccessful
//! responses are evicted so the next caller retries, and the last decoded
//! payload per key stays readable while a refresh is in flight.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use fetchcache::{FetchError, FetchOptions, Fetcher, Loader, Response, StatusCode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), FetchError> {
//!     let fetcher = Arc::new(Fetcher::new(|target: &str, _options: &FetchOptions| {
//!         let body = format!(r#"{{"target":"{target}"}}"#);
//!         async move { Ok::<_, FetchError>(Response::new(StatusCode::OK).body(body)) }
//!     }));
//!
//!     let loader = Loader::new(fetcher, "/users/1", FetchOptions::default());
//!     let user = loader.load().await?;
//!     println!("{user}");
//!     Ok(())
//! }
//! ```

// ── Core ──────────────────────────────────────────────────────────────────────
pub mod cache;
pub mod error;
pub mod http;
pub mod transport;

// ── Consumers ─────────────────────────────────────────────────────────────────
pub mod fetch;
pub mod loader;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use cache::{CacheKey, FetchCache, ResponseHandle, derive_key};
pub use error::FetchError;
pub use fetch::Fetcher;
pub use http::{FetchOptions, Headers, Method, Response, StatusCode};
pub use loader::{LoadState, Loader};
pub use transport::Transport;

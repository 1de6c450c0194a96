//! Coalescing demo
//!
//! Fires a burst of identical requests at a slow fake transport and shows
//! that only one of them reaches the network. A failing endpoint is then
//! fetched twice to show that failures are evicted and retried.
//!
//! Run with:
//! ```bash
//! RUST_LOG=fetchcache=debug cargo run --example coalesce
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use fetchcache::{FetchCache, FetchError, FetchOptions, Fetcher, Loader, Response, StatusCode};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .init();

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let fetcher = Arc::new(
        Fetcher::new(move |target: &str, _options: &FetchOptions| {
            counter.fetch_add(1, Ordering::SeqCst);
            let target = target.to_owned();
            async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                if target.ends_with("/down") {
                    return Ok::<_, FetchError>(Response::new(StatusCode::SERVICE_UNAVAILABLE));
                }
                Ok(Response::new(StatusCode::OK).body(format!(r#"{{"target":"{target}"}}"#)))
            }
        })
        .with_cache(FetchCache::new()),
    );

    let tasks: Vec<_> = (0..10)
        .map(|i| {
            let loader = Loader::new(Arc::clone(&fetcher), "/users/1", FetchOptions::default());
            tokio::spawn(async move { (i, loader.load().await) })
        })
        .collect();
    for task in tasks {
        let (i, result) = task.await?;
        info!(task = i, result = ?result, "loaded");
    }
    info!(transport_calls = calls.load(Ordering::SeqCst), "after 10 concurrent loads");

    let down = Loader::new(Arc::clone(&fetcher), "/down", FetchOptions::default());
    for attempt in 1..=2 {
        if let Err(err) = down.load().await {
            info!(attempt, error = %err, cached = fetcher.cache().size(), "load failed");
        }
    }
    info!(transport_calls = calls.load(Ordering::SeqCst), "done");

    Ok(())
}

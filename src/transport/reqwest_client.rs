//! [`Transport`] backed by a [`reqwest::Client`].

use std::time::Duration;

use tracing::{debug, warn};

use super::{Transport, TransportFuture};
use crate::error::FetchError;
use crate::http::{FetchOptions, Headers, Response};

/// Default end-to-end timeout applied by [`ReqwestTransport::new`].
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP transport using reqwest with rustls.
///
/// ```rust,no_run
/// use fetchcache::fetch::Fetcher;
/// use fetchcache::transport::ReqwestTransport;
///
/// let fetcher = Fetcher::new(ReqwestTransport::new());
/// ```
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport with a default client and a 30 second timeout.
    pub fn new() -> Self {
        Self {
            client: build_client(reqwest::Client::builder().timeout(DEFAULT_TIMEOUT)),
        }
    }

    /// Wraps an already configured client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

// Falls back to an unconfigured client, so settings on `builder` are lost.
fn build_client(builder: reqwest::ClientBuilder) -> reqwest::Client {
    match builder.build() {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "client builder failed; using default client without timeout");
            reqwest::Client::default()
        }
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, target: &str, options: &FetchOptions) -> TransportFuture {
        let target = target.to_owned();

        let method = match reqwest::Method::from_bytes(options.method_ref().as_str().as_bytes()) {
            Ok(method) => method,
            Err(e) => return Box::pin(async move { Err(FetchError::transport(target, e)) }),
        };

        let mut request = self.client.request(method, target.as_str());
        for (name, value) in options.headers_ref().iter() {
            request = request.header(name, value);
        }
        if !options.body_bytes().is_empty() {
            request = request.body(options.body_bytes().clone());
        }

        Box::pin(async move {
            let reply = request
                .send()
                .await
                .map_err(|e| FetchError::transport(target.as_str(), e))?;

            let status = reply.status().as_u16();
            let mut headers = Headers::with_capacity(reply.headers().len());
            for (name, value) in reply.headers() {
                if let Ok(value) = value.to_str() {
                    headers.insert(name.as_str(), value);
                }
            }

            let body = reply
                .bytes()
                .await
                .map_err(|e| FetchError::transport(target.as_str(), e))?;

            debug!(url = %target, status, bytes = body.len(), "transport reply");
            Ok(Response::new(status).with_headers(headers).body(body))
        })
    }
}

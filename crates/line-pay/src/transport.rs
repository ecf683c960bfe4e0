//! HTTP transport
//!
//! The client hands a fully built [`ApiRequest`] to an [`HttpTransport`] and
//! gets the raw response body back. [`ReqwestTransport`] is the default; it
//! owns its own `reqwest::Client`, so a proxy configured on one client never
//! leaks into another.
//!
//! Timeouts and cancellation belong to the transport. Nothing here retries.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, Proxy};
use tracing::{debug, warn};
use url::Url;

use crate::error::Error;

/// One outbound API call
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP method
    pub method: Method,
    /// Full URL including query string
    pub url: Url,
    /// Authenticated headers
    pub headers: HeaderMap,
    /// Serialized JSON body, `None` for GET
    pub body: Option<String>,
}

/// Sends an [`ApiRequest`] and returns the response body
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform the round trip
    async fn send(&self, request: ApiRequest) -> Result<String, Error>;
}

/// `reqwest` backed transport
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a transport, optionally routed through a proxy
    pub fn new(proxy_url: Option<&str>) -> Result<Self, Error> {
        let mut builder = Client::builder();

        if let Some(proxy_url) = proxy_url {
            let proxy = Proxy::all(proxy_url).map_err(|_| Error::config("Invalid proxyUrl"))?;
            builder = builder.proxy(proxy);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Wrap an already configured client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<String, Error> {
        debug!("{} {}", request.method, request.url);

        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            warn!("LINE Pay responded with HTTP {}", status);
        }

        Ok(text)
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use std::sync::Arc;

    use tokio::sync::Mutex;

    use super::*;

    /// Transport that records requests and answers with a canned body
    #[derive(Debug, Clone)]
    pub(crate) struct MockTransport {
        response: String,
        pub(crate) requests: Arc<Mutex<Vec<ApiRequest>>>,
    }

    impl MockTransport {
        pub(crate) fn new(response: &str) -> Self {
            Self {
                response: response.to_string(),
                requests: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub(crate) fn ok(info: serde_json::Value) -> Self {
            Self::new(
                &serde_json::json!({
                    "returnCode": "0000",
                    "returnMessage": "Success.",
                    "info": info,
                })
                .to_string(),
            )
        }

        pub(crate) async fn calls(&self) -> usize {
            self.requests.lock().await.len()
        }

        pub(crate) async fn last(&self) -> ApiRequest {
            self.requests
                .lock()
                .await
                .last()
                .cloned()
                .expect("no request recorded")
        }
    }

    #[async_trait]
    impl HttpTransport for MockTransport {
        async fn send(&self, request: ApiRequest) -> Result<String, Error> {
            self.requests.lock().await.push(request);
            Ok(self.response.clone())
        }
    }
}

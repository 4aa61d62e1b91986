//! HTTP client adapter.
//!
//! Wraps a `reqwest::Client` with the configured base URL, the endpoint
//! table and the bearer-token interceptor. Resource clients build requests
//! through [`ApiClient::request`] and decode them with
//! [`ApiClient::send_json`] / [`ApiClient::send_empty`].

mod products;
mod thumbnail;

pub use products::*;

use std::fmt;
use std::sync::Arc;

use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;

use crate::auth::{read_token, AuthStorage};
use crate::config::Config;
use crate::errors::{ClientError, ClientResult};

/// Endpoint paths, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub register: String,
    pub login: String,
    pub products: String,
}

impl Endpoints {
    pub fn from_config(config: &Config) -> Self {
        Self {
            register: config.register_path.clone(),
            login: config.login_path.clone(),
            products: "/products".to_string(),
        }
    }
}

/// Request pipeline shared by every resource client.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    endpoints: Arc<Endpoints>,
    storage: Arc<dyn AuthStorage>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(config: &Config, storage: Arc<dyn AuthStorage>) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            endpoints: Arc::new(Endpoints::from_config(config)),
            storage,
        })
    }

    /// Underlying HTTP client, for requests outside the API (thumbnail downloads).
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn storage(&self) -> &Arc<dyn AuthStorage> {
        &self.storage
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// `path` with `segments` appended. Each segment is percent-encoded, so
    /// an id can never change the request target.
    pub fn url_with(&self, path: &str, segments: &[&str]) -> ClientResult<Url> {
        let raw = self.url(path);
        let mut url = Url::parse(&raw)
            .map_err(|e| ClientError::Transport(format!("Invalid URL {}: {}", raw, e)))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::Transport(format!("Invalid URL {}", raw)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Start a request against the API.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, self.url(path))
    }

    /// Start a request against a resource under `path`, addressed by `segments`.
    pub fn request_at(
        &self,
        method: Method,
        path: &str,
        segments: &[&str],
    ) -> ClientResult<RequestBuilder> {
        Ok(self.http.request(method, self.url_with(path, segments)?))
    }

    /// Attach `Authorization: Bearer <token>` when storage holds a token.
    /// Storage is read on the blocking pool, since it may hit the disk.
    async fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let storage = Arc::clone(&self.storage);
        let token = match tokio::task::spawn_blocking(move || read_token(storage.as_ref())).await {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!("Reading auth storage failed: {}", e);
                None
            }
        };
        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request and decode its JSON body.
    pub async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> ClientResult<T> {
        let body = self.send(request).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Send a request whose response body is ignored.
    pub async fn send_empty(&self, request: RequestBuilder) -> ClientResult<()> {
        self.send(request).await.map(|_| ())
    }

    async fn send(&self, request: RequestBuilder) -> ClientResult<Vec<u8>> {
        let request = self.authorize(request).await.build()?;
        let method = request.method().clone();
        let path = request.url().path().to_string();
        tracing::debug!("{} {}", method, path);

        let response = self.http.execute(request).await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let err = ClientError::from_response(status, &body);
            tracing::debug!("{} {} failed: {}", method, path, err.user_message());
            return Err(err);
        }

        Ok(body.to_vec())
    }
}

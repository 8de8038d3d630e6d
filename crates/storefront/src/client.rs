//! REST resource client.
//!
//! One [`ResourceClient`] per backend resource (`books`, `orders`). Every
//! request is resolved against `<base_url>/api/v1/<resource>`, carries the
//! current bearer token when one is stored, and is classified into either
//! parsed JSON or a [`ClientError`]. Caching is not this layer's concern.

use std::sync::Arc;

use reqwest::Method;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::config::StoreConfig;
use crate::credentials::CredentialStore;
use crate::error::ClientError;

/// Build the HTTP client shared by every resource.
///
/// # Errors
///
/// Returns `ClientError::InvalidRequest` if the TLS backend cannot be
/// initialized.
pub fn build_http_client(config: &StoreConfig) -> Result<reqwest::Client, ClientError> {
    reqwest::Client::builder()
        .timeout(config.request_timeout)
        .cookie_store(config.include_cookies)
        .build()
        .map_err(|e| ClientError::InvalidRequest(format!("failed to build HTTP client: {e}")))
}

/// Client for a single REST resource.
#[derive(Clone)]
pub struct ResourceClient {
    inner: Arc<ResourceClientInner>,
}

struct ResourceClientInner {
    http: reqwest::Client,
    /// `<base_url>/api/v1/<resource>` without a trailing slash
    endpoint: String,
    credentials: Arc<dyn CredentialStore>,
}

impl std::fmt::Debug for ResourceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceClient")
            .field("endpoint", &self.inner.endpoint)
            .finish_non_exhaustive()
    }
}

impl ResourceClient {
    /// Create a client for `resource` using a shared HTTP client.
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        config: &StoreConfig,
        resource: &str,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            inner: Arc::new(ResourceClientInner {
                http,
                endpoint: config.resource_url(resource),
                credentials,
            }),
        }
    }

    /// Absolute URL for a path relative to this resource.
    ///
    /// `"/"` yields the collection URL with a trailing slash; `"/42"` and
    /// `"42"` both yield `<endpoint>/42`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.inner.endpoint, path.trim_start_matches('/'))
    }

    /// Perform a request and return the parsed JSON body.
    ///
    /// An empty 2xx body yields `Value::Null`.
    ///
    /// # Errors
    ///
    /// - `ClientError::Network` if the request could not be completed
    /// - `ClientError::Http` for non-2xx responses
    /// - `ClientError::Decode` if a 2xx body is not valid JSON
    #[instrument(skip(self, body), fields(endpoint = %self.inner.endpoint))]
    pub async fn request<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Value, ClientError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.url(path);
        let mut request = self.inner.http.request(method.clone(), &url);

        if let Some(token) = self.inner.credentials.token() {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|e| ClientError::InvalidRequest(format!("invalid token: {e}")))?;
            value.set_sensitive(true);
            request = request.header(AUTHORIZATION, value);
        }

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            warn!(%method, %url, error = %e, "Request failed before a response");
            ClientError::from(e)
        })?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let err = ClientError::from_response(status, &text);
            warn!(%method, %url, status = status.as_u16(), error = %err, "Backend returned non-success status");
            return Err(err);
        }

        debug!(%method, %url, status = status.as_u16(), bytes = text.len(), "Request succeeded");

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| {
            warn!(%url, error = %e, "Failed to parse response body");
            ClientError::from(e)
        })
    }

    /// Perform a request and decode the JSON body into `T`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::request`], plus `ClientError::Decode` if the body does
    /// not match `T`.
    pub async fn request_json<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let value = self.request(method, path, body).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// `GET` without a body.
    ///
    /// # Errors
    ///
    /// See [`Self::request`].
    pub async fn get(&self, path: &str) -> Result<Value, ClientError> {
        self.request::<()>(Method::GET, path, None).await
    }
}

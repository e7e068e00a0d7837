use reqwest::header::{HeaderMap, HeaderName, HeaderValue, LOCATION};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::error::ApiError;

/// Settings used to build a [`Client`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: String,
    pub username: String,
    pub password: String,
    pub insecure: bool,
    /// PEM encoded CA bundle trusted in addition to the system roots
    pub ca_cert_pem: Option<Vec<u8>>,
    /// PEM encoded client certificate followed by its private key
    pub client_identity_pem: Option<Vec<u8>>,
    pub proxy: Option<String>,
    pub headers: HashMap<String, String>,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(endpoint: &str, username: &str, password: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            insecure: false,
            ca_cert_pem: None,
            client_identity_pem: None,
            proxy: None,
            headers: HashMap::new(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// RabbitMQ management API client
///
/// Every call is a single attempt; failures are returned to the caller
/// as-is.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let http_client = build_http_client(&config)?;
        let base_url = config.endpoint.trim_end_matches('/').to_string();

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url,
                username: config.username,
                password: config.password,
            }),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.inner.base_url
    }

    /// Execute a GET request and decode the JSON body
    pub async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, ApiError> {
        let url = format!("{}{}", self.inner.base_url, path);

        tracing::debug!("GET request to: {}", url);

        let response = self.request(reqwest::Method::GET, &url).send().await?;
        let response = Self::check_status(response).await?;
        Self::parse_success_response(response).await
    }

    /// Execute a PUT request; the broker answers 201 or 204 without a body
    pub async fn put<B: Serialize>(&self, path: &str, body: &B) -> Result<(), ApiError> {
        let url = format!("{}{}", self.inner.base_url, path);

        tracing::debug!("PUT request to: {}", url);

        let response = self
            .request(reqwest::Method::PUT, &url)
            .json(body)
            .send()
            .await?;
        Self::check_status(response).await.map(|_| ())
    }

    /// Execute a POST request and return the `Location` header, if any
    pub async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<Option<String>, ApiError> {
        let url = format!("{}{}", self.inner.base_url, path);

        tracing::debug!("POST request to: {}", url);

        let response = self
            .request(reqwest::Method::POST, &url)
            .json(body)
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        Ok(response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string))
    }

    /// Execute a DELETE request
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let url = format!("{}{}", self.inner.base_url, path);

        tracing::debug!("DELETE request to: {}", url);

        let response = self.request(reqwest::Method::DELETE, &url).send().await?;
        Self::check_status(response).await.map(|_| ())
    }

    pub fn vhosts(&self) -> crate::api::vhosts::VhostsApi<'_> {
        crate::api::vhosts::VhostsApi::new(self)
    }

    pub fn users(&self) -> crate::api::users::UsersApi<'_> {
        crate::api::users::UsersApi::new(self)
    }

    pub fn permissions(&self) -> crate::api::permissions::PermissionsApi<'_> {
        crate::api::permissions::PermissionsApi::new(self)
    }

    pub fn topic_permissions(&self) -> crate::api::permissions::TopicPermissionsApi<'_> {
        crate::api::permissions::TopicPermissionsApi::new(self)
    }

    pub fn exchanges(&self) -> crate::api::exchanges::ExchangesApi<'_> {
        crate::api::exchanges::ExchangesApi::new(self)
    }

    pub fn queues(&self) -> crate::api::queues::QueuesApi<'_> {
        crate::api::queues::QueuesApi::new(self)
    }

    pub fn bindings(&self) -> crate::api::bindings::BindingsApi<'_> {
        crate::api::bindings::BindingsApi::new(self)
    }

    /// User policies (`/api/policies`) or operator policies
    /// (`/api/operator-policies`)
    pub fn policies(
        &self,
        kind: crate::api::policies::PolicyKind,
    ) -> crate::api::policies::PoliciesApi<'_> {
        crate::api::policies::PoliciesApi::new(self, kind)
    }

    pub fn federation_upstreams(
        &self,
    ) -> crate::api::parameters::ParametersApi<'_, crate::api::parameters::FederationDefinition>
    {
        crate::api::parameters::ParametersApi::new(self, "federation-upstream")
    }

    pub fn shovels(
        &self,
    ) -> crate::api::parameters::ParametersApi<'_, crate::api::parameters::ShovelDefinition> {
        crate::api::parameters::ParametersApi::new(self, "shovel")
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.inner
            .http_client
            .request(method, url)
            .basic_auth(&self.inner.username, Some(&self.inner.password))
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            return Ok(response);
        }
        Self::handle_error_response(response).await
    }

    async fn parse_success_response<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let text = response.text().await?;
        tracing::debug!("API response body: {}", text);

        serde_json::from_str::<T>(&text).map_err(|e| {
            tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
            ApiError::ParseError(format!("Failed to parse response: {}", e))
        })
    }

    async fn handle_error_response<T>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        // {"error":"not_found","reason":"Object Not Found"}
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|body| body.reason.or(body.error))
            .unwrap_or(text);

        tracing::debug!("API error response (HTTP {}): {}", status, message);

        Err(ApiError::ApiError { status, message })
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    reason: Option<String>,
}

fn build_http_client(config: &ClientConfig) -> Result<reqwest::Client, ApiError> {
    let mut builder = reqwest::Client::builder()
        .danger_accept_invalid_certs(config.insecure)
        .timeout(config.timeout);

    if let Some(pem) = &config.ca_cert_pem {
        let cert = reqwest::Certificate::from_pem(pem)
            .map_err(|e| ApiError::ConfigError(format!("invalid CA certificate: {}", e)))?;
        builder = builder.add_root_certificate(cert);
    }

    if let Some(pem) = &config.client_identity_pem {
        let identity = reqwest::Identity::from_pem(pem)
            .map_err(|e| ApiError::ConfigError(format!("invalid client certificate: {}", e)))?;
        builder = builder.identity(identity);
    }

    if let Some(proxy) = &config.proxy {
        let proxy = reqwest::Proxy::all(proxy)
            .map_err(|e| ApiError::ConfigError(format!("invalid proxy {}: {}", proxy, e)))?;
        builder = builder.proxy(proxy);
    }

    if !config.headers.is_empty() {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ApiError::ConfigError(format!("invalid header {}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ApiError::ConfigError(format!("invalid header value: {}", e)))?;
            headers.insert(name, value);
        }
        builder = builder.default_headers(headers);
    }

    Ok(builder.build()?)
}

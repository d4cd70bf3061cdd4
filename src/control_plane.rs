//! Tumblebug REST client.
//!
//! Every request carries HTTP basic auth and a JSON content type. No overall
//! request timeout is set: loading common resources runs for minutes.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::config::AppConfig;
use crate::document::{KeyValue, ProviderCredential};
use crate::error::{InitError, Result};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Body of `POST /credential`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRequest {
    pub credential_holder: String,
    pub key_value_info_list: Vec<KeyValue>,
    pub provider_name: String,
}

impl CredentialRequest {
    pub fn new(holder: &str, credential: &ProviderCredential) -> Self {
        Self {
            credential_holder: holder.to_string(),
            key_value_info_list: credential.entries.clone(),
            provider_name: credential.provider.clone(),
        }
    }
}

/// Operations the bootstrap needs from the control plane.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Succeeds only on `200 OK` from the readiness probe.
    async fn health_check(&self) -> Result<()>;

    /// Register one provider's credentials. The response body is returned as-is,
    /// whatever the HTTP status.
    async fn register_credential(&self, request: &CredentialRequest) -> Result<Value>;

    /// Trigger loading of common specs and images. Non-2xx statuses are errors;
    /// an empty body is `Value::Null`.
    async fn load_common_resource(&self) -> Result<Value>;
}

#[derive(Clone)]
pub struct TumblebugClient {
    http: Client,
    base_url: String,
    server: String,
}

impl TumblebugClient {
    pub fn new(server: &str, username: &str, password: &str) -> Result<Self> {
        let server = server.trim_end_matches('/').to_string();
        let base_url = format!("http://{server}/tumblebug");

        let token = BASE64_STANDARD.encode(format!("{username}:{password}"));
        let mut auth = HeaderValue::from_str(&format!("Basic {token}"))
            .map_err(|e| InitError::Other(anyhow::anyhow!("invalid API credentials: {e}")))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .user_agent(concat!("tbinit/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url,
            server,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(&config.server, &config.username, &config.password)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl ControlPlane for TumblebugClient {
    async fn health_check(&self) -> Result<()> {
        let response = self
            .http
            .get(self.url("readyz"))
            .send()
            .await
            .map_err(|e| {
                debug!(error = %e, "health check request failed");
                InitError::ServerUnreachable {
                    server: self.server.clone(),
                }
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            status => Err(InitError::ServerUnhealthy {
                status: status.as_u16(),
            }),
        }
    }

    async fn register_credential(&self, request: &CredentialRequest) -> Result<Value> {
        debug!(provider = %request.provider_name, "posting credential");
        let response = self
            .http
            .post(self.url("credential"))
            .json(request)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(provider = %request.provider_name, %status, "credential response");
        Ok(serde_json::from_str(&body)?)
    }

    async fn load_common_resource(&self) -> Result<Value> {
        let response = self
            .http
            .get(self.url("loadCommonResource"))
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }
}

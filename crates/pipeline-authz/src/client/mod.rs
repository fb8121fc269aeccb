//! Remote client capability and its HTTP implementation.
//!
//! Public API: no status code knowledge. All HTTP/status mapping in http.rs.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use tracing::debug;

use crate::auth::TokenProvider;
use crate::error::{ClientError, ClientResult};
use crate::types::{ClientConfig, ResourceList, ResourceReference};

mod helpers;
mod http;

use helpers::{authorized_resources_url, parse_org_url};
use http::HttpBackend;

/// User-Agent sent with every request.
pub const CLIENT_USER_AGENT: &str = concat!("pipeline-authz/", env!("CARGO_PKG_VERSION"));

/// The two remote verbs the reconciler relies on.
#[async_trait]
pub trait AuthorizationClient: Send + Sync {
    /// Set the authorized flag for each resource in the project. Idempotent.
    async fn set_authorization(
        &self,
        project_id: &str,
        resources: &[ResourceReference],
    ) -> ClientResult<()>;

    /// List resources of a type visible to the project, optionally filtered by id.
    async fn list_resources(
        &self,
        project_id: &str,
        resource_type: &str,
        resource_id: Option<&str>,
    ) -> ClientResult<Vec<ResourceReference>>;
}

#[async_trait]
impl<T: AuthorizationClient + ?Sized> AuthorizationClient for Arc<T> {
    async fn set_authorization(
        &self,
        project_id: &str,
        resources: &[ResourceReference],
    ) -> ClientResult<()> {
        (**self).set_authorization(project_id, resources).await
    }

    async fn list_resources(
        &self,
        project_id: &str,
        resource_type: &str,
        resource_id: Option<&str>,
    ) -> ClientResult<Vec<ResourceReference>> {
        (**self)
            .list_resources(project_id, resource_type, resource_id)
            .await
    }
}

/// Client for the build service's authorized-resources endpoints.
#[derive(Debug, Clone)]
pub struct BuildClient {
    http: HttpBackend,
}

impl BuildClient {
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let token_provider = config
            .personal_access_token
            .as_ref()
            .map(TokenProvider::static_token)
            .unwrap_or_else(TokenProvider::from_env);

        Self::with_token_provider(config, token_provider)
    }

    pub fn with_token_provider(
        config: ClientConfig,
        token_provider: TokenProvider,
    ) -> ClientResult<Self> {
        let org_url = parse_org_url(&config.org_url)?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(default_headers)
            .build()
            .map_err(|e| ClientError::Network {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            http: HttpBackend {
                client,
                org_url,
                token_provider,
                config,
            },
        })
    }

    pub fn from_env() -> ClientResult<Self> {
        Self::new(ClientConfig::from_env())
    }

    pub fn org_url(&self) -> &str {
        self.http.org_url.as_str()
    }

    pub fn is_authenticated(&self) -> bool {
        self.http.token_provider.is_authenticated()
    }

    async fn read_list(response: reqwest::Response) -> ClientResult<ResourceList> {
        response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse {
                message: format!("failed to parse authorized resources response: {}", e),
            })
    }
}

#[async_trait]
impl AuthorizationClient for BuildClient {
    async fn set_authorization(
        &self,
        project_id: &str,
        resources: &[ResourceReference],
    ) -> ClientResult<()> {
        let url =
            authorized_resources_url(&self.http.org_url, project_id, &self.http.config.api_version)?;
        let body = serde_json::to_value(resources).map_err(|e| ClientError::InvalidResponse {
            message: format!("failed to encode resource references: {}", e),
        })?;
        debug!(url = %url, count = resources.len(), "setting resource authorization");

        // The echoed list carries nothing the caller does not already hold.
        self.http
            .request(reqwest::Method::PATCH, &url, Some(&body))
            .await?;
        Ok(())
    }

    async fn list_resources(
        &self,
        project_id: &str,
        resource_type: &str,
        resource_id: Option<&str>,
    ) -> ClientResult<Vec<ResourceReference>> {
        let mut url =
            authorized_resources_url(&self.http.org_url, project_id, &self.http.config.api_version)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("type", resource_type);
            if let Some(id) = resource_id {
                query.append_pair("id", id);
            }
        }
        debug!(url = %url, "listing authorized resources");

        let response = self.http.request(reqwest::Method::GET, &url, None).await?;
        Ok(Self::read_list(response).await?.value)
    }
}

//! Local record, wire types and client configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AuthzError, AuthzResult};

/// Resource type used for service endpoints.
pub const ENDPOINT_RESOURCE_TYPE: &str = "endpoint";

/// Declared authorization of one resource for one project's pipelines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRecord {
    /// Owning project.
    pub project_id: String,

    /// Authorized resource. Doubles as the record id.
    pub resource_id: String,

    /// Resource class discriminator (e.g. "endpoint").
    #[serde(rename = "type", default = "default_resource_type")]
    pub resource_type: String,

    /// `true` = permitted for use, `false` = explicitly revoked.
    pub authorized: bool,
}

fn default_resource_type() -> String {
    ENDPOINT_RESOURCE_TYPE.to_string()
}

impl AuthorizationRecord {
    pub fn new(
        project_id: impl Into<String>,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
        authorized: bool,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            resource_id: resource_id.into(),
            resource_type: resource_type.into(),
            authorized,
        }
    }

    /// Record for a service endpoint.
    pub fn endpoint(
        project_id: impl Into<String>,
        resource_id: impl Into<String>,
        authorized: bool,
    ) -> Self {
        Self::new(project_id, ENDPOINT_RESOURCE_TYPE, resource_id, authorized)
    }

    /// Record id as seen by the orchestrator.
    pub fn id(&self) -> &str {
        &self.resource_id
    }

    /// Composite identity of the relationship.
    pub fn key(&self) -> RecordKey {
        RecordKey {
            project_id: self.project_id.clone(),
            resource_type: self.resource_type.clone(),
            resource_id: self.resource_id.clone(),
        }
    }

    /// Check the fields the remote API requires.
    pub fn validate(&self) -> AuthzResult<()> {
        if self.project_id.trim().is_empty() {
            return Err(AuthzError::validation("project id must not be empty"));
        }
        if self.resource_id.trim().is_empty() {
            return Err(AuthzError::validation("resource id must not be empty"));
        }
        if self.resource_type.trim().is_empty() {
            return Err(AuthzError::validation("resource type must not be empty"));
        }
        Ok(())
    }
}

/// `(project, type, resource)` triple identifying one relationship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordKey {
    pub project_id: String,
    pub resource_type: String,
    pub resource_id: String,
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.project_id, self.resource_type, self.resource_id
        )
    }
}

/// Resource reference as accepted and returned by the remote service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorized: Option<bool>,

    /// Display name. Remote-only metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// List envelope returned by the authorized-resources endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceList {
    #[serde(default)]
    pub count: usize,

    #[serde(default)]
    pub value: Vec<ResourceReference>,
}

/// Build client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Organization URL (e.g. `https://dev.azure.com/contoso`).
    #[serde(default)]
    pub org_url: String,

    /// Personal access token.
    #[serde(default)]
    pub personal_access_token: Option<String>,

    /// `api-version` query value sent with every request.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries for transient failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_api_version() -> String {
    "7.1-preview.1".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            org_url: String::new(),
            personal_access_token: None,
            api_version: default_api_version(),
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

impl ClientConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `AZDO_ORG_SERVICE_URL` | Organization URL |
    /// | `AZDO_PERSONAL_ACCESS_TOKEN` | Personal access token |
    /// | `AZDO_API_VERSION` | API version |
    /// | `AZDO_TIMEOUT` | Request timeout in seconds |
    /// | `AZDO_MAX_RETRIES` | Max retries for transient failures |
    pub fn from_env() -> Self {
        Self {
            org_url: std::env::var("AZDO_ORG_SERVICE_URL").unwrap_or_default(),
            personal_access_token: std::env::var("AZDO_PERSONAL_ACCESS_TOKEN")
                .ok()
                .filter(|t| !t.is_empty()),
            api_version: std::env::var("AZDO_API_VERSION")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(default_api_version),
            timeout_secs: std::env::var("AZDO_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_timeout),
            max_retries: std::env::var("AZDO_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_max_retries),
        }
    }

    /// Set the organization URL.
    pub fn with_org_url(mut self, url: impl Into<String>) -> Self {
        self.org_url = url.into();
        self
    }

    /// Set the personal access token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.personal_access_token = Some(token.into());
        self
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }
}

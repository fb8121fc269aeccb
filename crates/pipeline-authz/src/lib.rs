//! Reconciles declared pipeline resource authorizations against a remote
//! build service.
//!
//! A resource authorization states that an external resource (typically a
//! service endpoint) may be used by build pipelines of a project. The remote
//! API only knows "set the authorized flag" and "list resources", so this
//! crate provides:
//!
//! - [`translate`]: lossless mapping between the local [`AuthorizationRecord`]
//!   and the wire [`ResourceReference`]
//! - [`Reconciler`]: create/read/update/delete on top of those two verbs
//! - [`BuildClient`]: HTTP implementation of [`AuthorizationClient`] with
//!   personal access token auth and transport retry
//!
//! # Quick Start
//!
//! ```no_run
//! use pipeline_authz::{AuthorizationRecord, BuildClient, ReadOutcome, Reconciler};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let reconciler = Reconciler::new(BuildClient::from_env()?);
//! let declared = AuthorizationRecord::endpoint("my-project", "3f1c8b2e-...", true);
//!
//! let state = reconciler.create(&declared).await?;
//! match reconciler.read(&state).await? {
//!     ReadOutcome::Present(current) => println!("authorized: {}", current.authorized),
//!     ReadOutcome::Gone => println!("authorization was removed remotely"),
//! }
//! reconciler.delete(&state).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `AZDO_ORG_SERVICE_URL` | Organization URL (required) |
//! | `AZDO_PERSONAL_ACCESS_TOKEN` | Personal access token |
//! | `AZDO_API_VERSION` | API version (default: `7.1-preview.1`) |
//! | `AZDO_TIMEOUT` | Request timeout in seconds (default: 30) |
//! | `AZDO_MAX_RETRIES` | Max retries for transient failures (default: 3) |

pub mod auth;
pub mod client;
pub mod error;
pub mod reconcile;
pub mod translate;
pub mod types;

// Re-export main types
pub use auth::TokenProvider;
pub use client::{AuthorizationClient, BuildClient, CLIENT_USER_AGENT};
pub use error::{AuthzError, AuthzResult, ClientError, ClientResult, Operation};
pub use reconcile::{ReadOutcome, Reconciler};
pub use translate::{to_local, to_remote};
pub use types::{
    AuthorizationRecord, ClientConfig, RecordKey, ResourceList, ResourceReference,
    ENDPOINT_RESOURCE_TYPE,
};

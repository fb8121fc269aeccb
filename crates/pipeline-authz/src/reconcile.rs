//! Lifecycle state machine driving the remote service toward a declared record.
//!
//! The remote API has a single verb for both directions ("set authorized flag")
//! and no delete. Create, update and delete therefore share one step that
//! differs only in the flag it sends, and "not found on read" is the terminal
//! absent state.
//!
//! Each operation performs at most one remote call and never retries.
//! Dropping the returned future cancels the call. Operations on the same
//! `(project, type, resource)` triple must be serialized by the caller.

use tracing::{debug, info, warn};

use crate::client::AuthorizationClient;
use crate::error::{AuthzError, AuthzResult, ClientError, Operation};
use crate::translate::{to_local, to_remote};
use crate::types::{AuthorizationRecord, ResourceReference};

/// Result of a read: the record to keep, or an instruction to drop it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Remote entry found; this value replaces the caller's record.
    Present(AuthorizationRecord),

    /// No remote entry matches; local state should be discarded.
    Gone,
}

impl ReadOutcome {
    pub fn is_gone(&self) -> bool {
        matches!(self, Self::Gone)
    }

    pub fn into_record(self) -> Option<AuthorizationRecord> {
        match self {
            Self::Present(record) => Some(record),
            Self::Gone => None,
        }
    }

    /// Replace or clear the slot. Returns `false` when the record was dropped.
    pub fn apply(self, state: &mut Option<AuthorizationRecord>) -> bool {
        *state = self.into_record();
        state.is_some()
    }
}

/// Reconciles authorization records through an [`AuthorizationClient`].
#[derive(Debug, Clone)]
pub struct Reconciler<C> {
    client: C,
}

impl<C: AuthorizationClient> Reconciler<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Authorize the resource as declared. Returns the record as the new state.
    pub async fn create(&self, record: &AuthorizationRecord) -> AuthzResult<AuthorizationRecord> {
        self.apply(Operation::Create, record, record.authorized).await?;
        Ok(record.clone())
    }

    /// Push the record's current flag, which may be `false`.
    pub async fn update(&self, record: &AuthorizationRecord) -> AuthzResult<AuthorizationRecord> {
        self.apply(Operation::Update, record, record.authorized).await?;
        Ok(record.clone())
    }

    /// Revoke the authorization regardless of the record's flag.
    pub async fn delete(&self, record: &AuthorizationRecord) -> AuthzResult<()> {
        self.apply(Operation::Delete, record, false).await
    }

    /// Fetch the remote state of the relationship.
    pub async fn read(&self, record: &AuthorizationRecord) -> AuthzResult<ReadOutcome> {
        record.validate()?;
        debug!(
            project_id = %record.project_id,
            resource_type = %record.resource_type,
            resource_id = %record.resource_id,
            "reading resource authorization"
        );

        let listed = self
            .client
            .list_resources(
                &record.project_id,
                &record.resource_type,
                Some(&record.resource_id),
            )
            .await
            .map_err(|source| remote_error(Operation::Read, record, source))?;

        let mut matches = listed
            .into_iter()
            .filter(|r| r.id.as_deref() == Some(record.resource_id.as_str()));

        let Some(mut found) = matches.next() else {
            info!(key = %record.key(), "resource authorization no longer exists");
            return Ok(ReadOutcome::Gone);
        };

        let extra = matches.count();
        if extra > 0 {
            warn!(key = %record.key(), entries = extra + 1, "duplicate remote authorization entries");
            return Err(AuthzError::InvariantViolation {
                message: format!(
                    "{} remote entries match resource {} in project {}",
                    extra + 1,
                    record.resource_id,
                    record.project_id
                ),
            });
        }

        if found.resource_type.is_none() {
            found.resource_type = Some(record.resource_type.clone());
        }
        let current = to_local(&found, &record.project_id)?;
        if current.authorized != record.authorized {
            info!(
                key = %record.key(),
                authorized = current.authorized,
                "remote authorization differs from local record"
            );
        }
        Ok(ReadOutcome::Present(current))
    }

    /// Shared step behind create, update and delete.
    async fn apply(
        &self,
        operation: Operation,
        record: &AuthorizationRecord,
        authorized: bool,
    ) -> AuthzResult<()> {
        record.validate()?;
        let reference = ResourceReference {
            authorized: Some(authorized),
            ..to_remote(record)
        };
        debug!(
            %operation,
            project_id = %record.project_id,
            resource_id = %record.resource_id,
            authorized,
            "setting resource authorization"
        );

        self.client
            .set_authorization(&record.project_id, std::slice::from_ref(&reference))
            .await
            .map_err(|source| remote_error(operation, record, source))?;

        info!(%operation, key = %record.key(), authorized, "resource authorization set");
        Ok(())
    }
}

fn remote_error(
    operation: Operation,
    record: &AuthorizationRecord,
    source: ClientError,
) -> AuthzError {
    AuthzError::Remote {
        operation,
        project_id: record.project_id.clone(),
        resource_id: record.resource_id.clone(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientResult;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    const PROJECT_ID: &str = "projectid";
    const ENDPOINT_ID: &str = "0d6c4b6e-8b1f-4a43-9c2e-7f5e3a1b9d20";

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Set {
            project_id: String,
            resources: Vec<ResourceReference>,
        },
        List {
            project_id: String,
            resource_type: String,
            resource_id: Option<String>,
        },
    }

    /// Recording fake: returns `listing` for reads, fails every call with
    /// `fail_with` when set.
    #[derive(Default)]
    struct FakeClient {
        calls: Mutex<Vec<Call>>,
        listing: Vec<ResourceReference>,
        fail_with: Option<String>,
    }

    impl FakeClient {
        fn failing(message: &str) -> Self {
            Self {
                fail_with: Some(message.to_string()),
                ..Default::default()
            }
        }

        fn listing(listing: Vec<ResourceReference>) -> Self {
            Self {
                listing,
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn outcome(&self) -> ClientResult<()> {
            match &self.fail_with {
                Some(message) => Err(ClientError::Network {
                    message: message.clone(),
                }),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl AuthorizationClient for FakeClient {
        async fn set_authorization(
            &self,
            project_id: &str,
            resources: &[ResourceReference],
        ) -> ClientResult<()> {
            self.calls.lock().unwrap().push(Call::Set {
                project_id: project_id.to_string(),
                resources: resources.to_vec(),
            });
            self.outcome()
        }

        async fn list_resources(
            &self,
            project_id: &str,
            resource_type: &str,
            resource_id: Option<&str>,
        ) -> ClientResult<Vec<ResourceReference>> {
            self.calls.lock().unwrap().push(Call::List {
                project_id: project_id.to_string(),
                resource_type: resource_type.to_string(),
                resource_id: resource_id.map(String::from),
            });
            self.outcome()?;
            Ok(self.listing.clone())
        }
    }

    fn record(authorized: bool) -> AuthorizationRecord {
        AuthorizationRecord::endpoint(PROJECT_ID, ENDPOINT_ID, authorized)
    }

    fn reference(authorized: bool) -> ResourceReference {
        ResourceReference {
            id: Some(ENDPOINT_ID.to_string()),
            resource_type: Some("endpoint".to_string()),
            authorized: Some(authorized),
            name: None,
        }
    }

    fn set_call(authorized: bool) -> Call {
        Call::Set {
            project_id: PROJECT_ID.to_string(),
            resources: vec![reference(authorized)],
        }
    }

    #[tokio::test]
    async fn test_create_sets_authorized_reference() {
        let client = Arc::new(FakeClient::default());
        let reconciler = Reconciler::new(client.clone());

        let state = reconciler.create(&record(true)).await.unwrap();

        assert_eq!(state, record(true));
        assert_eq!(client.calls(), vec![set_call(true)]);
    }

    #[tokio::test]
    async fn test_create_does_not_swallow_error() {
        let reconciler = Reconciler::new(FakeClient::failing("CreateResourceAuthorization() Failed"));

        let err = reconciler.create(&record(true)).await.unwrap_err();

        assert!(matches!(
            err,
            AuthzError::Remote {
                operation: Operation::Create,
                ..
            }
        ));
        assert!(err.to_string().contains("CreateResourceAuthorization() Failed"));
    }

    #[tokio::test]
    async fn test_update_does_not_swallow_error() {
        let reconciler = Reconciler::new(FakeClient::failing("UpdateResourceAuthorization() Failed"));

        let err = reconciler.update(&record(true)).await.unwrap_err();
        assert!(err.to_string().contains("UpdateResourceAuthorization() Failed"));
    }

    #[tokio::test]
    async fn test_read_does_not_swallow_error() {
        let client = Arc::new(FakeClient::failing("ReadResourceAuthorization() Failed"));
        let reconciler = Reconciler::new(client.clone());

        let err = reconciler.read(&record(true)).await.unwrap_err();

        assert!(err.to_string().contains("ReadResourceAuthorization() Failed"));
        assert_eq!(
            client.calls(),
            vec![Call::List {
                project_id: PROJECT_ID.to_string(),
                resource_type: "endpoint".to_string(),
                resource_id: Some(ENDPOINT_ID.to_string()),
            }]
        );
    }

    #[tokio::test]
    async fn test_delete_does_not_swallow_error() {
        let reconciler = Reconciler::new(FakeClient::failing("DeleteResourceAuthorization() Failed"));

        let err = reconciler.delete(&record(false)).await.unwrap_err();
        assert!(err.to_string().contains("DeleteResourceAuthorization() Failed"));
    }

    #[tokio::test]
    async fn test_create_and_delete_differ_only_in_flag() {
        let client = Arc::new(FakeClient::default());
        let reconciler = Reconciler::new(client.clone());

        reconciler.create(&record(true)).await.unwrap();
        reconciler.delete(&record(true)).await.unwrap();

        assert_eq!(client.calls(), vec![set_call(true), set_call(false)]);
    }

    #[tokio::test]
    async fn test_update_sends_false_flag() {
        let client = Arc::new(FakeClient::default());
        let reconciler = Reconciler::new(client.clone());

        let state = reconciler.update(&record(false)).await.unwrap();

        assert!(!state.authorized);
        assert_eq!(client.calls(), vec![set_call(false)]);
    }

    #[tokio::test]
    async fn test_repeated_create_and_update_are_idempotent() {
        let client = Arc::new(FakeClient::default());
        let reconciler = Reconciler::new(client.clone());
        let declared = record(true);

        let first = reconciler.create(&declared).await.unwrap();
        let second = reconciler.create(&first).await.unwrap();
        let third = reconciler.update(&second).await.unwrap();
        let fourth = reconciler.update(&third).await.unwrap();

        assert_eq!(fourth, declared);
        assert_eq!(client.calls().len(), 4);
    }

    #[tokio::test]
    async fn test_read_absent_signals_gone() {
        let other = ResourceReference {
            id: Some("some-other-endpoint".to_string()),
            ..reference(true)
        };
        let reconciler = Reconciler::new(FakeClient::listing(vec![other]));
        let local = record(true);

        let outcome = reconciler.read(&local).await.unwrap();

        assert!(outcome.is_gone());
        assert!(local.authorized);
    }

    #[tokio::test]
    async fn test_read_empty_listing_signals_gone() {
        let reconciler = Reconciler::new(FakeClient::listing(Vec::new()));

        let mut state = Some(record(true));
        let kept = reconciler
            .read(&record(true))
            .await
            .unwrap()
            .apply(&mut state);

        assert!(!kept);
        assert!(state.is_none());
    }

    #[tokio::test]
    async fn test_read_overwrites_authorized_from_remote() {
        let reconciler = Reconciler::new(FakeClient::listing(vec![reference(false)]));

        let mut state = Some(record(true));
        let outcome = reconciler.read(&record(true)).await.unwrap();
        assert!(outcome.clone().apply(&mut state));

        assert_eq!(outcome, ReadOutcome::Present(record(false)));
        assert_eq!(state, Some(record(false)));
    }

    #[tokio::test]
    async fn test_read_ignores_remote_name() {
        let named = ResourceReference {
            name: Some("production".to_string()),
            ..reference(true)
        };
        let reconciler = Reconciler::new(FakeClient::listing(vec![named]));

        let outcome = reconciler.read(&record(true)).await.unwrap();
        assert_eq!(outcome.into_record(), Some(record(true)));
    }

    #[tokio::test]
    async fn test_read_keeps_local_type_when_remote_omits_it() {
        let untyped = ResourceReference {
            resource_type: None,
            ..reference(true)
        };
        let reconciler = Reconciler::new(FakeClient::listing(vec![untyped]));

        let outcome = reconciler.read(&record(true)).await.unwrap();
        assert_eq!(outcome, ReadOutcome::Present(record(true)));
    }

    #[tokio::test]
    async fn test_read_duplicate_entries_is_invariant_violation() {
        let reconciler =
            Reconciler::new(FakeClient::listing(vec![reference(true), reference(false)]));

        let err = reconciler.read(&record(true)).await.unwrap_err();
        assert!(matches!(err, AuthzError::InvariantViolation { .. }));
    }

    #[tokio::test]
    async fn test_invalid_record_never_reaches_remote() {
        let client = Arc::new(FakeClient::default());
        let reconciler = Reconciler::new(client.clone());
        let invalid = AuthorizationRecord::endpoint("", ENDPOINT_ID, true);

        assert!(matches!(
            reconciler.create(&invalid).await,
            Err(AuthzError::Validation { .. })
        ));
        assert!(matches!(
            reconciler.read(&invalid).await,
            Err(AuthzError::Validation { .. })
        ));
        assert!(client.calls().is_empty());
    }
}

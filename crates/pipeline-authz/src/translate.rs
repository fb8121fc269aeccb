//! Pure mapping between [`AuthorizationRecord`] and [`ResourceReference`].
//!
//! No I/O. `name` is remote-only and never crosses into the local record.

use crate::error::{AuthzError, AuthzResult};
use crate::types::{AuthorizationRecord, ResourceReference};

/// Build the wire reference for a record.
///
/// An empty resource type is sent as absent, mirroring [`to_local`].
pub fn to_remote(record: &AuthorizationRecord) -> ResourceReference {
    ResourceReference {
        id: Some(record.resource_id.clone()),
        resource_type: (!record.resource_type.is_empty()).then(|| record.resource_type.clone()),
        authorized: Some(record.authorized),
        name: None,
    }
}

/// Build a local record from a wire reference.
///
/// Fails when the reference carries no id. A missing `authorized` reads as
/// `false`.
pub fn to_local(
    reference: &ResourceReference,
    project_id: &str,
) -> AuthzResult<AuthorizationRecord> {
    let resource_id = match reference.id.as_deref() {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            return Err(AuthzError::validation(
                "resource reference has no id and cannot be represented locally",
            ))
        }
    };

    Ok(AuthorizationRecord {
        project_id: project_id.to_string(),
        resource_id,
        resource_type: reference.resource_type.clone().unwrap_or_default(),
        authorized: reference.authorized.unwrap_or(false),
    })
}

//! Pure helpers: URL building and error body parsing (no HTTP, no status logic).

use url::Url;

use crate::error::{ClientError, ClientResult};

/// Longest slice of a non-JSON error body kept in messages.
const MAX_BODY_EXCERPT: usize = 500;

/// Parse and check the organization URL.
pub(crate) fn parse_org_url(raw: &str) -> ClientResult<Url> {
    if raw.trim().is_empty() {
        return Err(ClientError::Config {
            message: "organization URL is not set (AZDO_ORG_SERVICE_URL)".to_string(),
        });
    }

    let url = Url::parse(raw.trim()).map_err(|e| ClientError::Config {
        message: format!("invalid organization URL {:?}: {}", raw, e),
    })?;

    if url.cannot_be_a_base() {
        return Err(ClientError::Config {
            message: format!("organization URL {:?} cannot carry a path", raw),
        });
    }

    Ok(url)
}

/// `{org}/{project}/_apis/build/authorizedresources?api-version=..`
pub(crate) fn authorized_resources_url(
    org_url: &Url,
    project_id: &str,
    api_version: &str,
) -> ClientResult<Url> {
    let mut url = org_url.clone();
    url.path_segments_mut()
        .map_err(|_| ClientError::Config {
            message: format!("organization URL {} cannot carry a path", org_url),
        })?
        .pop_if_empty()
        .extend([project_id, "_apis", "build", "authorizedresources"]);
    url.query_pairs_mut().append_pair("api-version", api_version);
    Ok(url)
}

/// Extract the service's error message from a failed response body.
///
/// Expected format: `{"message": "...", "typeKey": "..."}`. Falls back to a
/// body excerpt, then to `fallback`.
pub(crate) fn parse_error_message(body: &str, fallback: &str) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = json.get("message").and_then(|v| v.as_str()) {
            return message.to_string();
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.chars().take(MAX_BODY_EXCERPT).collect()
    }
}

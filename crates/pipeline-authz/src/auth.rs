//! Token authentication for the build service.
//!
//! Personal access tokens travel as HTTP Basic credentials with an empty user
//! name (`Authorization: Basic base64(":" + token)`).

use base64::Engine;

/// Token provider for build service authentication.
#[derive(Debug, Clone)]
pub enum TokenProvider {
    /// Static personal access token (from config or env).
    Static(String),

    /// No authentication.
    None,
}

impl TokenProvider {
    /// Create a static token provider.
    pub fn static_token(token: impl Into<String>) -> Self {
        Self::Static(token.into())
    }

    /// Create from the `AZDO_PERSONAL_ACCESS_TOKEN` environment variable.
    ///
    /// An unset or empty variable means no authentication.
    pub fn from_env() -> Self {
        match std::env::var("AZDO_PERSONAL_ACCESS_TOKEN") {
            Ok(token) if !token.is_empty() => Self::Static(token),
            _ => Self::None,
        }
    }

    /// Value for the `Authorization` header, if any.
    pub fn authorization_header(&self) -> Option<String> {
        match self {
            Self::Static(token) => {
                let encoded =
                    base64::engine::general_purpose::STANDARD.encode(format!(":{}", token));
                Some(format!("Basic {}", encoded))
            }
            Self::None => None,
        }
    }

    /// Check if authentication is configured.
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl Default for TokenProvider {
    fn default() -> Self {
        Self::from_env()
    }
}

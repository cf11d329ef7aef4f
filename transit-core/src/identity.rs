use crate::{EngineError, EngineResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use transit_shared::Masked;

/// The caller as established by the external auth component.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: String,
    pub email: Masked<String>,
}

#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Resolve the bearer token of an already-authenticated request.
    async fn authenticated_identity(&self, token: &str) -> EngineResult<Identity>;
}

/// Token table resolver for tests and local runs.
#[derive(Default)]
pub struct StaticIdentityResolver {
    identities: HashMap<String, Identity>,
}

impl StaticIdentityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity(mut self, token: &str, user_id: &str, email: &str) -> Self {
        self.identities.insert(
            token.to_string(),
            Identity {
                user_id: user_id.to_string(),
                email: Masked::new(email.to_string()),
            },
        );
        self
    }
}

#[async_trait]
impl IdentityResolver for StaticIdentityResolver {
    async fn authenticated_identity(&self, token: &str) -> EngineResult<Identity> {
        tracing::debug!("Resolving identity for presented token");
        self.identities
            .get(token)
            .cloned()
            .ok_or_else(|| EngineError::IdentityError("unknown or expired token".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_resolver() {
        let resolver = StaticIdentityResolver::new().with_identity("tok-1", "user-1", "rider@example.com");

        let identity = resolver.authenticated_identity("tok-1").await.unwrap();
        assert_eq!(identity.user_id, "user-1");
        assert_eq!(identity.email.expose(), "rider@example.com");

        let err = resolver.authenticated_identity("tok-2").await.unwrap_err();
        assert_eq!(err.status_code(), 401);
    }
}

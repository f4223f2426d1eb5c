//! Access token scope for store requests
//!
//! Token issuance and refresh belong to the embedding application; this
//! module only describes the capability and the retry-once wrapper.

use std::future::Future;

use async_trait::async_trait;

use crate::error::{AuthError, AuthorizationFailure};

#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Current token, possibly cached
    async fn token(&self) -> Result<String, AuthError>;

    /// Discard the current token and obtain a fresh one
    async fn refresh(&self) -> Result<String, AuthError>;
}

/// Fixed token, e.g. from a config file or a shared link
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn token(&self) -> Result<String, AuthError> {
        Ok(self.token.clone())
    }

    async fn refresh(&self) -> Result<String, AuthError> {
        Ok(self.token.clone())
    }
}

/// Run `op` with an access token. If it fails with an authorization error
/// the token is refreshed and `op` runs exactly once more.
pub async fn with_access_token<T, E, F, Fut>(provider: &dyn TokenProvider, mut op: F) -> Result<T, E>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: AuthorizationFailure + From<AuthError>,
{
    let token = provider.token().await?;

    match op(token).await {
        Err(err) if err.is_authorization_failure() => {
            log::debug!("[Auth] Request was not authorized, refreshing token");
            let token = provider.refresh().await?;
            op(token).await
        }
        result => result,
    }
}

use crate::error::AuthError;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;
use yup_oauth2::{InstalledFlowAuthenticator, InstalledFlowReturnMethod};

pub const GOOGLE_SCOPES: &[&str] = &["openid", "email", "profile"];

// Define a trait for the Google OAuth flow to allow mocking
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GoogleFlow: Send + Sync {
    /// Runs the consent flow and returns a Google access token.
    async fn access_token(&self) -> Result<String, AuthError>;
}

/// Installed-application flow: opens the consent page and waits for the local redirect.
pub struct InstalledGoogleFlow {
    client_secret_path: PathBuf,
}

impl InstalledGoogleFlow {
    pub fn new(client_secret_path: impl Into<PathBuf>) -> Self {
        Self {
            client_secret_path: client_secret_path.into(),
        }
    }
}

#[async_trait]
impl GoogleFlow for InstalledGoogleFlow {
    async fn access_token(&self) -> Result<String, AuthError> {
        let secret = yup_oauth2::read_application_secret(&self.client_secret_path)
            .await
            .map_err(|e| {
                AuthError::Google(format!(
                    "cannot read {}: {}",
                    self.client_secret_path.display(),
                    e
                ))
            })?;

        let auth =
            InstalledFlowAuthenticator::builder(secret, InstalledFlowReturnMethod::HTTPRedirect)
                .build()
                .await
                .map_err(|e| AuthError::Google(e.to_string()))?;

        info!("waiting for Google consent");
        let token = auth
            .token(GOOGLE_SCOPES)
            .await
            .map_err(|e| AuthError::Google(e.to_string()))?;
        token
            .token()
            .map(str::to_string)
            .ok_or_else(|| AuthError::Google("no access token returned".to_string()))
    }
}

/// Used when no client secret is configured; Google sign-in reports why it is unavailable.
pub struct DisabledGoogleFlow;

#[async_trait]
impl GoogleFlow for DisabledGoogleFlow {
    async fn access_token(&self) -> Result<String, AuthError> {
        Err(AuthError::Google(
            "no Google client secret configured (--google-client-secret)".to_string(),
        ))
    }
}

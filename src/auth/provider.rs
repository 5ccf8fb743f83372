use super::google::GoogleFlow;
use crate::error::AuthError;
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::engine::Engine;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";
pub const SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1/token";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl Identity {
    pub fn label(&self) -> &str {
        self.email
            .as_deref()
            .or(self.display_name.as_deref())
            .unwrap_or(&self.uid)
    }
}

/// Tokens and identity handed back by a successful provider operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSession {
    pub identity: Identity,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

// Define a trait for identity provider operations to allow mocking
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<ProviderSession, AuthError>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<ProviderSession, AuthError>;
    async fn sign_in_with_google(&self) -> Result<ProviderSession, AuthError>;
    /// Always goes to the provider; never answers from a cache.
    async fn refresh(&self, refresh_token: &str) -> Result<ProviderSession, AuthError>;
}

/// Claims read from the payload of an ID token. The signature is not checked here;
/// the backend verifies every token it receives.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
}

pub fn decode_claims(id_token: &str) -> Option<TokenClaims> {
    let payload = id_token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    id_token: String,
    refresh_token: String,
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    expires_in: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    expires_in: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    error: ProviderErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorDetail {
    #[serde(default)]
    message: String,
}

fn expiry(expires_in: Option<&str>) -> DateTime<Utc> {
    let seconds = expires_in
        .and_then(|s| s.trim().parse::<i64>().ok())
        .unwrap_or(3600);
    Utc::now() + Duration::seconds(seconds)
}

fn parse_account(body: &[u8]) -> Result<ProviderSession, AuthError> {
    let account: AccountResponse = serde_json::from_slice(body)
        .map_err(|e| AuthError::Unexpected(format!("malformed sign-in response: {}", e)))?;
    let claims = decode_claims(&account.id_token).unwrap_or_default();
    Ok(ProviderSession {
        identity: Identity {
            uid: account.local_id,
            email: account.email.filter(|e| !e.is_empty()).or(claims.email),
            display_name: account.display_name.filter(|n| !n.is_empty()).or(claims.name),
        },
        expires_at: expiry(account.expires_in.as_deref()),
        id_token: account.id_token,
        refresh_token: account.refresh_token,
    })
}

fn parse_refresh(body: &[u8]) -> Result<ProviderSession, AuthError> {
    let refreshed: RefreshResponse = serde_json::from_slice(body)
        .map_err(|e| AuthError::Unexpected(format!("malformed token response: {}", e)))?;
    let claims = decode_claims(&refreshed.id_token).unwrap_or_default();
    let uid = refreshed
        .user_id
        .or(claims.user_id)
        .or(claims.sub)
        .ok_or_else(|| AuthError::Unexpected("token response without a user id".to_string()))?;
    Ok(ProviderSession {
        identity: Identity {
            uid,
            email: claims.email,
            display_name: claims.name,
        },
        expires_at: expiry(refreshed.expires_in.as_deref()),
        id_token: refreshed.id_token,
        refresh_token: refreshed.refresh_token,
    })
}

fn provider_error(status: u16, body: &[u8]) -> AuthError {
    match serde_json::from_slice::<ProviderErrorBody>(body) {
        Ok(parsed) if !parsed.error.message.is_empty() => AuthError::from_code(&parsed.error.message),
        _ => AuthError::Unexpected(format!("identity provider returned status {}", status)),
    }
}

/// Firebase Authentication over its REST API.
pub struct FirebaseAuth {
    client: reqwest::Client,
    api_key: String,
    identity_url: String,
    token_url: String,
    google: Box<dyn GoogleFlow>,
}

impl FirebaseAuth {
    pub fn new(client: reqwest::Client, api_key: &str, google: Box<dyn GoogleFlow>) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
            identity_url: IDENTITY_TOOLKIT_URL.to_string(),
            token_url: SECURE_TOKEN_URL.to_string(),
            google,
        }
    }

    async fn accounts_call(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<ProviderSession, AuthError> {
        let url = format!("{}/accounts:{}", self.identity_url, method);
        debug!(method, "identity provider request");
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        if (200..300).contains(&status) {
            parse_account(&bytes)
        } else {
            let err = provider_error(status, &bytes);
            warn!(method, status, error = ?err, "identity provider rejected request");
            Err(err)
        }
    }
}

#[async_trait]
impl IdentityProvider for FirebaseAuth {
    async fn sign_up(&self, email: &str, password: &str) -> Result<ProviderSession, AuthError> {
        self.accounts_call(
            "signUp",
            serde_json::json!({
                "email": email,
                "password": password,
                "returnSecureToken": true
            }),
        )
        .await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<ProviderSession, AuthError> {
        self.accounts_call(
            "signInWithPassword",
            serde_json::json!({
                "email": email,
                "password": password,
                "returnSecureToken": true
            }),
        )
        .await
    }

    async fn sign_in_with_google(&self) -> Result<ProviderSession, AuthError> {
        let google_token = self.google.access_token().await?;
        self.accounts_call(
            "signInWithIdp",
            serde_json::json!({
                "postBody": format!("access_token={}&providerId=google.com", google_token),
                "requestUri": "http://localhost",
                "returnIdpCredential": true,
                "returnSecureToken": true
            }),
        )
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<ProviderSession, AuthError> {
        let response = self
            .client
            .post(&self.token_url)
            .query(&[("key", self.api_key.as_str())])
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        if (200..300).contains(&status) {
            parse_refresh(&bytes)
        } else {
            Err(provider_error(status, &bytes))
        }
    }
}

#[cfg(test)]
pub(crate) fn fake_id_token(uid: &str, email: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        serde_json::json!({"user_id": uid, "sub": uid, "email": email, "exp": 4102444800i64})
            .to_string()
            .as_bytes(),
    );
    format!("{}.{}.sig", header, payload)
}

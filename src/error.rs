use thiserror::Error;

/// Errors surfaced by the gallery layers (API client, uploads, controller).
#[derive(Debug, Error)]
pub enum GalleryError {
    /// Missing or expired session. Raising this has already triggered a sign-out.
    #[error("You are not signed in or your session has expired.")]
    Unauthenticated,

    #[error("{message}")]
    Api { status: Option<u16>, message: String },

    #[error("{0}")]
    Validation(String),

    #[error("Upload of {filename} failed: {reason}")]
    Upload { filename: String, reason: String },

    #[error("Network error: {0}")]
    Network(String),
}

impl GalleryError {
    pub fn api(status: Option<u16>, message: impl Into<String>) -> Self {
        GalleryError::Api {
            status,
            message: message.into(),
        }
    }

    pub fn upload(filename: impl Into<String>, reason: impl Into<String>) -> Self {
        GalleryError::Upload {
            filename: filename.into(),
            reason: reason.into(),
        }
    }

    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, GalleryError::Unauthenticated)
    }
}

impl From<reqwest::Error> for GalleryError {
    fn from(e: reqwest::Error) -> Self {
        GalleryError::Network(e.to_string())
    }
}

/// Outcome of a failed identity provider operation.
///
/// `Display` yields the message shown on the sign-in screen.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Incorrect password. Please try again.")]
    WrongPassword,
    #[error("Incorrect email or password.")]
    InvalidCredentials,
    #[error("No account found with this email address.")]
    UserNotFound,
    #[error("Please enter a valid email address.")]
    InvalidEmail,
    #[error("An account already exists with this email address.")]
    EmailInUse,
    #[error("The password must be at least 6 characters long.")]
    WeakPassword,
    #[error("This account has been disabled.")]
    UserDisabled,
    #[error("Too many attempts. Please wait a moment and try again.")]
    TooManyAttempts,
    #[error("Your session has expired. Please sign in again.")]
    SessionExpired,
    #[error("Google sign-in failed: {0}")]
    Google(String),
    #[error("Could not reach the sign-in service: {0}")]
    Network(String),
    #[error("An unexpected error occurred. Please try again.")]
    Unexpected(String),
}

impl AuthError {
    /// Maps an identity provider error code (`"WEAK_PASSWORD : detail"` style) to an `AuthError`.
    pub fn from_code(raw: &str) -> Self {
        let code = raw.split(':').next().unwrap_or("").trim();
        match code {
            "INVALID_PASSWORD" => AuthError::WrongPassword,
            "INVALID_LOGIN_CREDENTIALS" => AuthError::InvalidCredentials,
            "EMAIL_NOT_FOUND" => AuthError::UserNotFound,
            "INVALID_EMAIL" | "MISSING_EMAIL" => AuthError::InvalidEmail,
            "EMAIL_EXISTS" => AuthError::EmailInUse,
            "WEAK_PASSWORD" | "MISSING_PASSWORD" => AuthError::WeakPassword,
            "USER_DISABLED" => AuthError::UserDisabled,
            "TOO_MANY_ATTEMPTS_TRY_LATER" => AuthError::TooManyAttempts,
            "TOKEN_EXPIRED" | "INVALID_REFRESH_TOKEN" | "USER_NOT_FOUND" => {
                AuthError::SessionExpired
            }
            _ => AuthError::Unexpected(raw.to_string()),
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(e: reqwest::Error) -> Self {
        AuthError::Network(e.to_string())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid backend url {url}: {reason}")]
    BackendUrl { url: String, reason: String },
    #[error("a Firebase API key is required (--firebase-api-key or FIREBASE_API_KEY)")]
    MissingApiKey,
    #[error("upload concurrency must be at least 1")]
    ZeroConcurrency,
    #[error("maximum upload size must be at least 1 MB")]
    ZeroUploadLimit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_maps_provider_codes() {
        assert_eq!(AuthError::from_code("EMAIL_EXISTS"), AuthError::EmailInUse);
        assert_eq!(
            AuthError::from_code("WEAK_PASSWORD : Password should be at least 6 characters"),
            AuthError::WeakPassword
        );
        assert_eq!(
            AuthError::from_code("EMAIL_NOT_FOUND").to_string(),
            "No account found with this email address."
        );
        assert!(matches!(
            AuthError::from_code("SOMETHING_NEW"),
            AuthError::Unexpected(_)
        ));
    }

    #[test]
    fn test_unexpected_auth_error_has_generic_message() {
        assert_eq!(
            AuthError::from_code("OPERATION_NOT_ALLOWED").to_string(),
            "An unexpected error occurred. Please try again."
        );
    }

    #[test]
    fn test_gallery_error_display() {
        let err = GalleryError::api(Some(409), "Folder Trip already exists");
        assert_eq!(err.to_string(), "Folder Trip already exists");
        assert!(GalleryError::Unauthenticated.is_unauthenticated());
        assert_eq!(
            GalleryError::upload("a.jpg", "too large").to_string(),
            "Upload of a.jpg failed: too large"
        );
    }
}

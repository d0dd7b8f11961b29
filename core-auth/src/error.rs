use bridge_traits::error::BridgeError;
use bridge_traits::AuthorizationStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Music authorization not granted: {0:?}")]
    AuthorizationDenied(AuthorizationStatus),

    #[error("Account cannot play catalog content")]
    CatalogPlaybackUnavailable,

    #[error("User token request rejected: {0}")]
    UserTokenRejected(String),

    #[error("Token service returned {status}: {message}")]
    TokenServiceFailed { status: u16, message: String },

    #[error("Token service unreachable: {0}")]
    TokenServiceUnreachable(String),

    #[error("Secure storage unavailable: {0}")]
    SecureStorageUnavailable(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),
}

impl AuthError {
    /// Whether running the workflow again later may succeed without user action.
    pub fn is_recoverable(&self) -> bool {
        match self {
            AuthError::TokenServiceUnreachable(_) | AuthError::Bridge(_) => true,
            AuthError::TokenServiceFailed { status, .. } => *status == 429 || *status >= 500,
            AuthError::UserTokenRejected(_) => true,
            AuthError::AuthorizationDenied(AuthorizationStatus::NotDetermined) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;

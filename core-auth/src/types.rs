use bridge_traits::MusicCapabilities;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Token that identifies this app to the catalog service.
///
/// Never printed; `Debug` and `Display` are redacted.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeveloperToken(String);

impl DeveloperToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for DeveloperToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DeveloperToken([REDACTED])")
    }
}

/// Per-user music token obtained from the host authorizer.
#[derive(Clone, PartialEq, Eq)]
pub struct UserToken(String);

impl UserToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for UserToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("UserToken([REDACTED])")
    }
}

/// Everything a catalog request needs to authenticate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub developer_token: DeveloperToken,
    pub user_token: UserToken,
    pub capabilities: MusicCapabilities,
}

/// Where the negotiation currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthState {
    Unauthenticated,
    Authorizing,
    SignedIn,
    Failed,
}

impl AuthState {
    pub fn is_signed_in(&self) -> bool {
        matches!(self, AuthState::SignedIn)
    }
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AuthState::Unauthenticated => "unauthenticated",
            AuthState::Authorizing => "authorizing",
            AuthState::SignedIn => "signed_in",
            AuthState::Failed => "failed",
        };
        f.write_str(label)
    }
}

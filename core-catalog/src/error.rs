use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    // ========================================================================
    // Transport Errors
    // ========================================================================
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Catalog service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Catalog request not authorized ({status})")]
    NotAuthorized { status: u16 },

    // ========================================================================
    // Payload Errors
    // ========================================================================
    #[error("Failed to decode catalog response: {0}")]
    Decode(String),

    #[error("Catalog response contained no {0}")]
    Empty(&'static str),

    // ========================================================================
    // Station Errors
    // ========================================================================
    #[error("No personal station found in recommendations")]
    NoPersonalStation,

    #[error("No public station configured")]
    NoPublicStation,

    #[error("Credentials unavailable: {0}")]
    Credentials(String),
}

impl CatalogError {
    /// Whether the next natural retry may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            CatalogError::Http(_) => true,
            CatalogError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<bridge_traits::error::BridgeError> for CatalogError {
    fn from(err: bridge_traits::error::BridgeError) -> Self {
        CatalogError::Http(err.to_string())
    }
}

impl From<core_auth::AuthError> for CatalogError {
    fn from(err: core_auth::AuthError) -> Self {
        CatalogError::Credentials(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;

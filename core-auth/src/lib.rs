//! # Authentication Module
//!
//! Music-service authorization for the playback core.
//!
//! ## Overview
//!
//! Catalog requests need two tokens: a developer token identifying the app
//! and a user token identifying the listener. This crate negotiates both
//! through the host [`MusicAuthorizer`](bridge_traits::MusicAuthorizer),
//! keeps the developer token in the platform secure store, and falls back to
//! the token service when the stored token stops working.
//!
//! ## Features
//!
//! - Linear authorize → capability → token workflow with typed errors
//! - Developer token persistence via `SecureStore`
//! - One automatic developer-token refresh per run
//! - Auth state event emission

pub mod error;
pub mod manager;
pub mod token_service;
pub mod token_store;
pub mod types;

pub use error::{AuthError, Result};
pub use manager::AuthManager;
pub use token_service::TokenServiceClient;
pub use token_store::{DeveloperTokenStore, DEVELOPER_TOKEN_KEY};
pub use types::{AuthState, Credentials, DeveloperToken, UserToken};

//! # Core Runtime Module
//!
//! Foundational runtime infrastructure shared by every core crate:
//! - Logging and tracing setup
//! - Configuration and bridge injection
//! - Event bus
//!
//! Nothing here knows about queues or tracks; it only establishes the
//! conventions the domain crates build on.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};

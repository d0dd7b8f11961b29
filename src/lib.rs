//! Workspace umbrella crate.
//!
//! Re-exports the [`core_service`] façade so host applications can depend on
//! `musicmate-workspace` and pick features here instead of wiring each crate
//! individually.

pub use core_service::*;

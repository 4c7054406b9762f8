//! Docker Manager console
//!
//! Client-side core of the administration console for a remote
//! container-management backend: Google sign-in, container listing and
//! lifecycle actions, and live log/exec streams over a socket.

pub mod api;
pub mod config;
pub mod context;
pub mod domain;
pub mod error;
pub mod infra;
pub mod service;
pub mod telemetry;


pub use config::Config;
pub use context::{AppContext, Platform};
pub use error::{Error, Result};

//! # ak-bootstrap
//!
//! One-shot bootstrap of forward authentication in Authentik.
//!
//! A run waits for the identity provider to answer, obtains an API
//! credential, makes sure a forward-auth application and proxy provider
//! exist, registers the application with the embedded outpost and writes
//! the resulting identifiers to `auth_config.json` for the reverse proxy.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod error;
pub mod output;
pub mod persist;
pub mod readiness;
pub mod reconcile;
pub mod workflow;

pub use cli::Cli;
pub use config::BootstrapConfig;
pub use error::{BootstrapError, BootstrapResult};
pub use workflow::run;

//! AppStudio Import Library
//!
//! Orchestrates importing git repositories into AppStudio: an access-token
//! binding for the repository credentials, component detection, and the
//! Application and Component resources that make up the imported application.
//!
//! The cluster is reached through [`client::ResourceClient`], so the whole
//! pipeline can run against [`client::InMemoryClient`] in tests.

pub mod client;
pub mod config;
pub mod constants;
pub mod crd;
pub mod error;
pub mod import;
pub mod naming;
pub mod observability;
pub mod poller;

pub use config::ImportConfig;
pub use error::{ImportError, ImportFailure, Stage};
pub use import::{ImportOutcome, ImportRequest, Importer};

//! # mv-common
//!
//! Shared configuration and error types for the MailVault client suite.

pub mod config;
pub mod error;

pub use config::AppConfig;
pub use error::{ClientError, ClientResult};

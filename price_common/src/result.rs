//! Result type alias shared across the workspace.
//!
//! Defaults the error type to the common `ProducerError`, so functions can simply
//! return `Result<T>`.
use crate::error::ProducerError;

/// Workspace-wide `Result` alias with `ProducerError` as the default error.
pub type Result<T, E = ProducerError> = std::result::Result<T, E>;

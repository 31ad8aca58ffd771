//! Core domain concepts shared across all subdomains.
//!
//! - [`outcome::OperationResult`]: the `{success, message, output}` shape every entry point returns
//! - [`operation::Operation`]: closed mapping from request names to handlers
//! - [`args`]: call argument normalisation
//! - [`error::DomainError`] / [`error::ErrorKind`]: domain-level errors

pub mod args;
pub mod error;
pub mod operation;
pub mod outcome;

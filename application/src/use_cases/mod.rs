//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod channel_admin;
pub mod controller;
pub mod deploy_unit;
pub mod shared;
pub mod transaction;
pub mod version_ledger;

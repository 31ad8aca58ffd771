//! Infrastructure layer for endorse
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: configuration file loading, a simulated
//! ledger network with admin identity loading, and the JSONL audit logger.

pub mod config;
pub mod logging;
pub mod network;

// Re-export commonly used types
pub use config::{ConfigLoader, ConfigValidationError, FileConfig, FileOutputConfig};
pub use logging::JsonlAuditLogger;
pub use network::{AdminIdentity, SimulatedConnector, SimulatedLedger, SimulatedNetwork};

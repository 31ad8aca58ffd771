//! Semantic versions of deployable units.
//!
//! The ledger keeps no authoritative version registry, so the next version of
//! a unit is derived from what peers report as installed:
//!
//! ```text
//!   installed units ──► latest_installed() ──► bump(granularity) ──► next version
//!   (peer metadata)        (numeric fold)        (marker preserved)
//! ```
//!
//! Versions look like `MAJOR[.MINOR[.REVISION]]`, optionally prefixed by a
//! single non-digit marker such as `v`.

pub mod bump;
pub mod catalog;
pub mod number;

pub use bump::{VersionGranularity, bump_version};
pub use catalog::{BASE_VERSION, InstalledUnit, is_baseline, latest_installed};
pub use number::{VersionNumber, compare_versions};

//! Endorsement quorum reconciliation
//!
//! Peers independently execute the same proposed transaction. Before anything
//! is committed, their results are reconciled here.
//!
//! # Modes
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  【Strict】 (deploy / instantiate)   【Resilient】 (submit)        │
//! │  - every endorser must succeed       - minority failures dropped │
//! │  - first failure is the message      - needs >= 1 valid result   │
//! │  - survivors must agree on content   - survivors must agree      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Read-only calls skip signatures altogether and are compared byte-for-byte
//! by [`reconcile_reads`].

pub mod policy;
pub mod proposal;
pub mod read;
pub mod reconcile;
pub mod verifier;

pub use policy::{EndorsementPolicy, MemberRole, PolicyMember};
pub use proposal::ProposalResult;
pub use read::{ReadAgreement, parse_best_effort, reconcile_reads};
pub use reconcile::{DisagreementReason, ReconcileMode, ReconciliationOutcome, reconcile};
pub use verifier::{EndorsementVerifier, PayloadVerifier};

//! Quorum reconciliation of endorsement results

use super::proposal::ProposalResult;
use super::verifier::EndorsementVerifier;
use crate::core::error::ErrorKind;
use serde::{Deserialize, Serialize};

/// How tolerant reconciliation is of individual endorser failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileMode {
    /// Every endorser matters; one failure fails the batch
    #[default]
    Strict,
    /// Failed endorsers are dropped as long as one valid result remains
    Resilient,
}

impl ReconcileMode {
    pub fn from_resilient(resilient: bool) -> Self {
        if resilient {
            ReconcileMode::Resilient
        } else {
            ReconcileMode::Strict
        }
    }

    pub fn is_resilient(&self) -> bool {
        matches!(self, ReconcileMode::Resilient)
    }
}

/// Why a batch of results was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisagreementReason {
    /// No results at all
    NoResponses,
    /// Strict mode saw at least one failed or unverifiable result
    EndorserFailed,
    /// Resilient mode had no valid result left
    NoValidEndorsement,
    /// Individually valid results carried different content
    ContentMismatch,
}

impl DisagreementReason {
    /// Classification at the error-reporting boundary.
    ///
    /// Endorsers that refused the proposal are a peer rejection; endorsers
    /// that ran it and computed different results are a disagreement.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DisagreementReason::EndorserFailed | DisagreementReason::NoValidEndorsement => {
                ErrorKind::PeerRejected
            }
            DisagreementReason::NoResponses | DisagreementReason::ContentMismatch => {
                ErrorKind::EndorsementDisagreement
            }
        }
    }
}

/// Outcome of reconciling one batch of proposal results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconciliationOutcome {
    /// The kept results, in input order, ready to be committed
    Agreed { endorsements: Vec<ProposalResult> },
    /// Human-readable reason plus every input result for diagnosis
    Disagreed {
        reason: DisagreementReason,
        message: String,
        results: Vec<ProposalResult>,
    },
}

impl ReconciliationOutcome {
    pub fn is_agreed(&self) -> bool {
        matches!(self, ReconciliationOutcome::Agreed { .. })
    }

    pub fn endorsements(&self) -> &[ProposalResult] {
        match self {
            ReconciliationOutcome::Agreed { endorsements } => endorsements,
            ReconciliationOutcome::Disagreed { .. } => &[],
        }
    }

    fn disagreed(
        reason: DisagreementReason,
        message: impl Into<String>,
        results: &[ProposalResult],
    ) -> Self {
        ReconciliationOutcome::Disagreed {
            reason,
            message: message.into(),
            results: results.to_vec(),
        }
    }
}

impl std::fmt::Display for ReconciliationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconciliationOutcome::Agreed { endorsements } => {
                write!(f, "Agreed ({} endorsements)", endorsements.len())
            }
            ReconciliationOutcome::Disagreed { message, .. } => write!(f, "Disagreed: {}", message),
        }
    }
}

/// Reconcile proposal results from peers that executed the same proposal.
///
/// A result is valid when its status is success and `verifier` accepts its
/// signature. Input is never modified; the outcome holds clones.
///
/// # Example
///
/// ```
/// use endorse_domain::endorsement::{
///     PayloadVerifier, ProposalResult, ReconcileMode, reconcile,
/// };
///
/// let results = vec![
///     ProposalResult::success("peer0.org1", "Org1", b"ok".to_vec()),
///     ProposalResult::success("peer0.org2", "Org2", b"ok".to_vec()),
///     ProposalResult::failure("peer0.org3", "Org3", 500, "timeout"),
/// ];
///
/// assert!(!reconcile(&results, ReconcileMode::Strict, &PayloadVerifier).is_agreed());
///
/// let outcome = reconcile(&results, ReconcileMode::Resilient, &PayloadVerifier);
/// assert_eq!(outcome.endorsements().len(), 2);
/// ```
pub fn reconcile(
    results: &[ProposalResult],
    mode: ReconcileMode,
    verifier: &dyn EndorsementVerifier,
) -> ReconciliationOutcome {
    if results.is_empty() {
        return ReconciliationOutcome::disagreed(
            DisagreementReason::NoResponses,
            "No proposal responses received",
            results,
        );
    }

    let (valid, invalid): (Vec<&ProposalResult>, Vec<&ProposalResult>) = results
        .iter()
        .partition(|r| r.is_success() && verifier.verify(r));

    let kept: Vec<ProposalResult> = match mode {
        ReconcileMode::Strict => {
            if let Some(first) = invalid.first() {
                return ReconciliationOutcome::disagreed(
                    DisagreementReason::EndorserFailed,
                    first.detail(),
                    results,
                );
            }
            results.to_vec()
        }
        ReconcileMode::Resilient => {
            if valid.is_empty() {
                let message = invalid
                    .first()
                    .map(|r| r.detail())
                    .unwrap_or_else(|| "No valid endorsements".to_string());
                return ReconciliationOutcome::disagreed(
                    DisagreementReason::NoValidEndorsement,
                    message,
                    results,
                );
            }
            valid.into_iter().cloned().collect()
        }
    };

    if !verifier.agree_on_content(&kept) {
        return ReconciliationOutcome::disagreed(
            DisagreementReason::ContentMismatch,
            "Peers returned different results for the same proposal",
            results,
        );
    }

    ReconciliationOutcome::Agreed { endorsements: kept }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endorsement::verifier::PayloadVerifier;

    fn ok(peer: &str, content: &[u8]) -> ProposalResult {
        ProposalResult::success(peer, "Org", content.to_vec())
    }

    fn bad(peer: &str, message: &str) -> ProposalResult {
        ProposalResult::failure(peer, "Org", 500, message)
    }

    #[test]
    fn test_all_valid_agree_in_both_modes() {
        let results = vec![ok("a", b"x"), ok("b", b"x"), ok("c", b"x")];
        for mode in [ReconcileMode::Strict, ReconcileMode::Resilient] {
            let outcome = reconcile(&results, mode, &PayloadVerifier);
            assert_eq!(
                outcome,
                ReconciliationOutcome::Agreed {
                    endorsements: results.clone()
                }
            );
        }
    }

    #[test]
    fn test_strict_single_failure_disagrees() {
        let results = vec![ok("a", b"x"), bad("b", "endorsement failure"), ok("c", b"x")];
        match reconcile(&results, ReconcileMode::Strict, &PayloadVerifier) {
            ReconciliationOutcome::Disagreed {
                reason,
                message,
                results: all,
            } => {
                assert_eq!(reason, DisagreementReason::EndorserFailed);
                assert_eq!(message, "endorsement failure");
                assert_eq!(all.len(), 3);
            }
            other => panic!("expected disagreement, got {:?}", other),
        }
    }

    #[test]
    fn test_strict_message_from_first_invalid() {
        let results = vec![bad("a", "first"), bad("b", "second")];
        match reconcile(&results, ReconcileMode::Strict, &PayloadVerifier) {
            ReconciliationOutcome::Disagreed { message, .. } => assert_eq!(message, "first"),
            other => panic!("expected disagreement, got {:?}", other),
        }
    }

    #[test]
    fn test_resilient_drops_minority_failure() {
        let results = vec![ok("a", b"x"), bad("b", "down"), ok("c", b"x")];
        let outcome = reconcile(&results, ReconcileMode::Resilient, &PayloadVerifier);
        let peers: Vec<&str> = outcome.endorsements().iter().map(|r| r.peer.as_str()).collect();
        assert_eq!(peers, vec!["a", "c"]);
    }

    #[test]
    fn test_resilient_without_valid_disagrees() {
        for invalid_count in 1..4 {
            let results: Vec<_> = (0..invalid_count)
                .map(|i| bad(&format!("p{}", i), "down"))
                .collect();
            match reconcile(&results, ReconcileMode::Resilient, &PayloadVerifier) {
                ReconciliationOutcome::Disagreed { reason, .. } => {
                    assert_eq!(reason, DisagreementReason::NoValidEndorsement)
                }
                other => panic!("expected disagreement, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_unverified_signature_is_invalid() {
        let forged = ok("b", b"x").with_signature_valid(false);
        let results = vec![ok("a", b"x"), forged];
        assert!(!reconcile(&results, ReconcileMode::Strict, &PayloadVerifier).is_agreed());
        assert_eq!(
            reconcile(&results, ReconcileMode::Resilient, &PayloadVerifier)
                .endorsements()
                .len(),
            1
        );
    }

    #[test]
    fn test_content_mismatch_disagrees_even_if_all_succeed() {
        let results = vec![ok("a", b"x"), ok("b", b"y")];
        for mode in [ReconcileMode::Strict, ReconcileMode::Resilient] {
            match reconcile(&results, mode, &PayloadVerifier) {
                ReconciliationOutcome::Disagreed { reason, .. } => {
                    assert_eq!(reason, DisagreementReason::ContentMismatch)
                }
                other => panic!("expected mismatch, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_resilient_checks_agreement_only_among_survivors() {
        let mut failed = bad("b", "down");
        failed.endorsed_bytes = b"garbage".to_vec();
        let results = vec![ok("a", b"x"), failed, ok("c", b"x")];
        assert!(reconcile(&results, ReconcileMode::Resilient, &PayloadVerifier).is_agreed());
    }

    #[test]
    fn test_empty_input_disagrees() {
        for mode in [ReconcileMode::Strict, ReconcileMode::Resilient] {
            assert!(!reconcile(&[], mode, &PayloadVerifier).is_agreed());
        }
    }

    #[test]
    fn test_input_untouched() {
        let results = vec![ok("a", b"x"), bad("b", "down")];
        let before = results.clone();
        let _ = reconcile(&results, ReconcileMode::Resilient, &PayloadVerifier);
        assert_eq!(results, before);
    }

    #[test]
    fn test_reason_kinds_separate_rejection_from_mismatch() {
        let rejected = reconcile(&[bad("a", "denied")], ReconcileMode::Resilient, &PayloadVerifier);
        let mismatch = reconcile(
            &[ok("a", b"x"), ok("b", b"y")],
            ReconcileMode::Resilient,
            &PayloadVerifier,
        );
        let kind = |outcome: &ReconciliationOutcome| match outcome {
            ReconciliationOutcome::Disagreed { reason, .. } => reason.kind(),
            ReconciliationOutcome::Agreed { .. } => panic!("expected disagreement"),
        };
        assert_eq!(kind(&rejected), ErrorKind::PeerRejected);
        assert_eq!(kind(&mismatch), ErrorKind::EndorsementDisagreement);
        assert_eq!(DisagreementReason::EndorserFailed.kind(), ErrorKind::PeerRejected);
        assert_eq!(DisagreementReason::NoResponses.kind(), ErrorKind::EndorsementDisagreement);
    }

    #[test]
    fn test_mode_from_flag() {
        assert_eq!(ReconcileMode::from_resilient(true), ReconcileMode::Resilient);
        assert_eq!(ReconcileMode::from_resilient(false), ReconcileMode::Strict);
        assert!(!ReconcileMode::default().is_resilient());
    }
}

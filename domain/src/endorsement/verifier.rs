//! Endorsement verification primitives
//!
//! Signature checks and byte-level content comparison belong to the network
//! client; the reconciler only consumes them through this trait.

use super::proposal::ProposalResult;

/// Primitives the reconciler needs from the network client.
pub trait EndorsementVerifier: Send + Sync {
    /// Whether the result's endorsement signature checks out.
    fn verify(&self, result: &ProposalResult) -> bool;

    /// Whether all results carry materially identical endorsed content.
    fn agree_on_content(&self, results: &[ProposalResult]) -> bool;
}

/// Verifier that trusts the signature flag already attached to each result
/// and compares endorsed bytes directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadVerifier;

impl EndorsementVerifier for PayloadVerifier {
    fn verify(&self, result: &ProposalResult) -> bool {
        result.signature_valid
    }

    fn agree_on_content(&self, results: &[ProposalResult]) -> bool {
        results
            .windows(2)
            .all(|pair| pair[0].endorsed_bytes == pair[1].endorsed_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_verifier_agreement() {
        let a = ProposalResult::success("p0", "Org1", b"x".to_vec());
        let b = ProposalResult::success("p1", "Org2", b"x".to_vec());
        let c = ProposalResult::success("p2", "Org3", b"y".to_vec());

        assert!(PayloadVerifier.agree_on_content(&[a.clone(), b.clone()]));
        assert!(!PayloadVerifier.agree_on_content(&[a, b, c]));
        assert!(PayloadVerifier.agree_on_content(&[]));
    }

    #[test]
    fn test_payload_verifier_uses_signature_flag() {
        let r = ProposalResult::success("p0", "Org1", vec![]).with_signature_valid(false);
        assert!(!PayloadVerifier.verify(&r));
    }
}

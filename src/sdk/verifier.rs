use thiserror::Error;

use super::api::PartyId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    #[error("malformed proof: {0}")]
    MalformedProof(String),
    #[error("public parameter mismatch: {0}")]
    ParameterMismatch(String),
    #[error("verifier failure: {0}")]
    Internal(String),
}

/// Checks a peer's zero-knowledge proof.
///
/// Implementations run concurrently on the verification pool and must only read
/// shared state. `Ok(false)` and `Err(_)` both mark the peer as a culprit; an error
/// is additionally logged.
pub trait ProofVerifier: Send + Sync {
    fn verify(
        &self,
        proof: &[u8],
        public_params: &[u8],
        claimed_identity: &PartyId,
        public_output: &[u8],
    ) -> Result<bool, VerificationError>;
}

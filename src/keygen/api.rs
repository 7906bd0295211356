use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::error;

use super::{r1, rounds::KeygenRoundInner};
use crate::{
    collections::VecMap,
    sdk::api::{
        BytesVec, PartyId, PartyRegistry, ProofVerifier, ProtocolError, ProtocolInfo,
        ProtocolMessage, ProtocolResult, RoundOrchestrator, SessionParams, SessionResult,
        Transport, VerificationFanout,
    },
};

pub use super::key_share::*;
pub use super::rounds::{KeygenPayload, KeygenRound};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeygenPartyId;

pub type KeygenRegistry = PartyRegistry<KeygenPartyId>;
pub type KeygenMessage = ProtocolMessage<KeygenPartyId, KeygenPayload>;
pub type KeygenSession<T> = RoundOrchestrator<KeygenRound, T>;

/// A party's fresh input to key generation.
#[derive(Debug, Clone)]
pub struct Contribution {
    public_params: BytesVec,
    public_share: BytesVec,
    secret: SecretShare,
}

impl Contribution {
    pub fn new(public_params: BytesVec, public_share: BytesVec, secret: SecretShare) -> Self {
        Self {
            public_params,
            public_share,
            secret,
        }
    }
    /// Per-party public parameters, e.g. an encryption modulus, checked by peers' proofs.
    pub fn public_params(&self) -> &[u8] {
        &self.public_params
    }
    pub fn public_share(&self) -> &[u8] {
        &self.public_share
    }
    pub fn secret(&self) -> &SecretShare {
        &self.secret
    }
}

/// The cryptography behind key generation.
///
/// The engine commits, exchanges and verifies; the suite supplies the math.
pub trait KeygenSuite: Send + Sync {
    fn contribute(&self, me: &PartyId) -> ProtocolResult<Contribution>;

    /// Derive the group public key from every party's public share, in registry order.
    fn combine(&self, public_shares: &VecMap<KeygenPartyId, BytesVec>) -> ProtocolResult<BytesVec>;

    /// Prove knowledge of the secret behind `contribution.public_params()`, bound to `me`
    /// and `group_key`. Checked by peers with [Self::verifier].
    fn prove(
        &self,
        contribution: &Contribution,
        me: &PartyId,
        group_key: &[u8],
    ) -> ProtocolResult<BytesVec>;

    fn verifier(&self) -> &dyn ProofVerifier;
}

/// Initialize a new keygen session for party `me`.
///
/// Drive the returned session with [KeygenSession::start] and
/// [KeygenSession::deliver]; the [KeyShare] arrives on the [SessionResult].
pub fn new_keygen<T>(
    parties: Vec<PartyId>,
    me: &PartyId,
    threshold: usize,
    params: SessionParams,
    suite: Arc<dyn KeygenSuite>,
    transport: T,
) -> ProtocolResult<(KeygenSession<T>, SessionResult<KeyShare>)>
where
    T: Transport<KeygenPartyId, KeygenPayload>,
{
    params.validate()?;
    let fanout = VerificationFanout::new(params.concurrency)?;
    new_keygen_with_fanout(parties, me, threshold, params, fanout, suite, transport)
}

/// Like [new_keygen], but proofs are checked on `fanout`, which may serve many sessions.
pub fn new_keygen_with_fanout<T>(
    parties: Vec<PartyId>,
    me: &PartyId,
    threshold: usize,
    params: SessionParams,
    fanout: VerificationFanout,
    suite: Arc<dyn KeygenSuite>,
    transport: T,
) -> ProtocolResult<(KeygenSession<T>, SessionResult<KeyShare>)>
where
    T: Transport<KeygenPartyId, KeygenPayload>,
{
    let registry = KeygenRegistry::new(parties)?;

    // validate args
    if registry.party_count() < 2 {
        error!("keygen needs at least 2 parties");
        return Err(ProtocolError::Fatal);
    }
    if threshold >= registry.party_count() {
        error!(
            "invalid (party_count, threshold): ({}, {})",
            registry.party_count(),
            threshold
        );
        return Err(ProtocolError::Fatal);
    }

    let info = ProtocolInfo::with_fanout(registry, me, params, fanout)?;
    let first = r1::R1::new(&info, suite, threshold)?;

    Ok(RoundOrchestrator::new(
        info,
        KeygenRound::new(KeygenRoundInner::R1(first)),
        transport,
    ))
}

use std::sync::Arc;

use tracing::error;

use crate::{
    collections::{HoleVecMap, TypedUsize},
    sdk::api::{
        check_verdict, Expecting, Outbox, ProtocolError, ProtocolInfo, ProtocolResult,
        RoundState, VerifyTask,
    },
};

use super::{r1, r3, KeyShare, KeygenPartyId, KeygenPayload, KeygenSuite};

/// Terminal round: check every peer's proof and emit the key share.
pub(super) struct R4 {
    pub(super) state: RoundState<KeygenPartyId, ()>,
    threshold: usize,
    suite: Arc<dyn KeygenSuite>,
    own: r1::Own,
    verified: r3::Verified,
    r3bcasts: HoleVecMap<KeygenPartyId, r3::Bcast>,
}

impl R4 {
    pub(super) fn new(
        info: &ProtocolInfo<KeygenPartyId>,
        threshold: usize,
        suite: Arc<dyn KeygenSuite>,
        own: r1::Own,
        verified: r3::Verified,
        r3bcasts: HoleVecMap<KeygenPartyId, r3::Bcast>,
    ) -> ProtocolResult<Self> {
        Ok(Self {
            state: RoundState::new(info, 4, Expecting::Nothing)?,
            threshold,
            suite,
            own,
            verified,
            r3bcasts,
        })
    }

    pub(super) fn start(
        &mut self,
        info: &ProtocolInfo<KeygenPartyId>,
        outbox: &mut Outbox<KeygenPartyId, KeygenPayload, KeyShare>,
    ) -> ProtocolResult<()> {
        self.state.start(info.my_index())?;

        let verifier = self.suite.verifier();
        let group_key = &self.verified.group_key;
        let tasks = self
            .r3bcasts
            .iter()
            .map(|(peer, bcast)| {
                let party = info.registry().get(peer)?;
                let public_params = self.verified.all_parties.get(peer)?.public_params();
                let task: VerifyTask = Box::new(move || {
                    verifier.verify(&bcast.proof, public_params, party, group_key)
                });
                Ok((peer, task))
            })
            .collect::<ProtocolResult<Vec<(TypedUsize<KeygenPartyId>, VerifyTask)>>>()?;
        let verdict = info.verify_peers(tasks)?;
        self.state.adopt_verdict(&verdict)?;
        check_verdict(info, self.state.number(), self.state.ok())?;

        if self.verified.all_parties.len() != info.party_count() {
            error!("public info does not cover every party");
            return Err(ProtocolError::Fatal);
        }
        outbox.finish(KeyShare::new(
            info.registry().parties().clone(),
            info.my_index(),
            self.threshold,
            self.verified.group_key.clone(),
            self.verified.all_parties.clone(),
            self.own.contribution.secret().clone(),
        ))
    }
}

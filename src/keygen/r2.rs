use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    collections::HoleVecMap,
    crypto_tools::hash,
    sdk::api::{
        BytesVec, Expecting, Outbox, ProtocolError, ProtocolInfo, ProtocolResult, RoundState,
    },
};

use super::{r1, r3, KeyShare, KeygenPartyId, KeygenPayload, KeygenSuite};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bcast {
    pub(super) public_share: BytesVec,
    pub(super) randomness: hash::Randomness,
}

pub(super) struct R2 {
    pub(super) state: RoundState<KeygenPartyId, Bcast>,
    suite: Arc<dyn KeygenSuite>,
    threshold: usize,
    own: r1::Own,
    r1bcasts: HoleVecMap<KeygenPartyId, r1::Bcast>,
}

impl R2 {
    pub(super) fn new(
        info: &ProtocolInfo<KeygenPartyId>,
        suite: Arc<dyn KeygenSuite>,
        threshold: usize,
        own: r1::Own,
        r1bcasts: HoleVecMap<KeygenPartyId, r1::Bcast>,
    ) -> ProtocolResult<Self> {
        Ok(Self {
            state: RoundState::new(info, 2, Expecting::AllPeers)?,
            suite,
            threshold,
            own,
            r1bcasts,
        })
    }

    pub(super) fn start(
        &mut self,
        info: &ProtocolInfo<KeygenPartyId>,
        outbox: &mut Outbox<KeygenPartyId, KeygenPayload, KeyShare>,
    ) -> ProtocolResult<()> {
        self.state.start(info.my_index())?;

        // peers must publish usable params before anyone reveals
        let malformed: Vec<_> = self
            .r1bcasts
            .iter()
            .filter(|(_, bcast)| bcast.public_params.is_empty())
            .map(|(peer, _)| peer)
            .collect();
        if !malformed.is_empty() {
            for peer in &malformed {
                warn!("peer {} says: empty public params in round 1", peer);
            }
            return Err(ProtocolError::MalformedMessage {
                round: self.state.number(),
                culprits: info.registry().culprits(malformed)?,
            });
        }

        outbox.broadcast(KeygenPayload::R2(Bcast {
            public_share: self.own.contribution.public_share().to_vec(),
            randomness: self.own.randomness.clone(),
        }));
        Ok(())
    }

    pub(super) fn next(self, info: &ProtocolInfo<KeygenPartyId>) -> ProtocolResult<r3::R3> {
        let r2bcasts = self.state.take_received(info)?;
        r3::R3::new(
            info,
            self.suite,
            self.threshold,
            self.own,
            self.r1bcasts,
            r2bcasts,
        )
    }
}

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::{
    crypto_tools::{constants::PUBLIC_SHARE_COMMIT_TAG, hash},
    sdk::api::{
        BytesVec, Expecting, Outbox, ProtocolError, ProtocolInfo, ProtocolResult, RoundState,
    },
};

use super::{r2, Contribution, KeyShare, KeygenPartyId, KeygenPayload, KeygenSuite};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bcast {
    pub(super) commit: hash::Output,
    pub(super) public_params: BytesVec,
}

/// Our own round-1 data, kept until the reveal.
pub(super) struct Own {
    pub(super) contribution: Contribution,
    pub(super) randomness: hash::Randomness,
}

pub(super) struct R1 {
    pub(super) state: RoundState<KeygenPartyId, Bcast>,
    suite: Arc<dyn KeygenSuite>,
    threshold: usize,
    own: Option<Own>,
}

impl R1 {
    pub(super) fn new(
        info: &ProtocolInfo<KeygenPartyId>,
        suite: Arc<dyn KeygenSuite>,
        threshold: usize,
    ) -> ProtocolResult<Self> {
        Ok(Self {
            state: RoundState::new(info, 1, Expecting::AllPeers)?,
            suite,
            threshold,
            own: None,
        })
    }

    pub(super) fn start(
        &mut self,
        info: &ProtocolInfo<KeygenPartyId>,
        outbox: &mut Outbox<KeygenPartyId, KeygenPayload, KeyShare>,
    ) -> ProtocolResult<()> {
        self.state.start(info.my_index())?;

        let contribution = self.suite.contribute(info.me())?;
        if contribution.public_params().is_empty() {
            error!("keygen suite produced empty public params");
            return Err(ProtocolError::Fatal);
        }
        let (commit, randomness) = hash::commit(
            PUBLIC_SHARE_COMMIT_TAG,
            info.me(),
            contribution.public_share(),
        );

        outbox.broadcast(KeygenPayload::R1(Bcast {
            commit,
            public_params: contribution.public_params().to_vec(),
        }));
        self.own = Some(Own {
            contribution,
            randomness,
        });
        Ok(())
    }

    pub(super) fn next(self, info: &ProtocolInfo<KeygenPartyId>) -> ProtocolResult<r2::R2> {
        let own = self.own.ok_or_else(|| {
            error!("round 1 advanced before start");
            ProtocolError::Fatal
        })?;
        let r1bcasts = self.state.take_received(info)?;
        r2::R2::new(info, self.suite, self.threshold, own, r1bcasts)
    }

    #[cfg(test)]
    pub(super) fn own(&self) -> Option<&Own> {
        self.own.as_ref()
    }
}

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::{
    collections::{HoleVecMap, TypedUsize, VecMap},
    crypto_tools::{constants::PUBLIC_SHARE_COMMIT_TAG, hash},
    sdk::api::{
        check_verdict, BytesVec, Expecting, Outbox, ProtocolError, ProtocolInfo, ProtocolResult,
        RoundState, VerifyTask,
    },
};

use super::{r1, r2, r4, KeyShare, KeygenPartyId, KeygenPayload, KeygenSuite, PartyPublicInfo};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bcast {
    pub(super) proof: BytesVec,
}

/// Group data that exists only once every reveal checked out.
pub(super) struct Verified {
    pub(super) group_key: BytesVec,
    pub(super) all_parties: VecMap<KeygenPartyId, PartyPublicInfo>,
}

pub(super) struct R3 {
    pub(super) state: RoundState<KeygenPartyId, Bcast>,
    suite: Arc<dyn KeygenSuite>,
    threshold: usize,
    own: r1::Own,
    r1bcasts: HoleVecMap<KeygenPartyId, r1::Bcast>,
    r2bcasts: HoleVecMap<KeygenPartyId, r2::Bcast>,
    verified: Option<Verified>,
}

impl R3 {
    pub(super) fn new(
        info: &ProtocolInfo<KeygenPartyId>,
        suite: Arc<dyn KeygenSuite>,
        threshold: usize,
        own: r1::Own,
        r1bcasts: HoleVecMap<KeygenPartyId, r1::Bcast>,
        r2bcasts: HoleVecMap<KeygenPartyId, r2::Bcast>,
    ) -> ProtocolResult<Self> {
        Ok(Self {
            state: RoundState::new(info, 3, Expecting::AllPeers)?,
            suite,
            threshold,
            own,
            r1bcasts,
            r2bcasts,
            verified: None,
        })
    }

    pub(super) fn start(
        &mut self,
        info: &ProtocolInfo<KeygenPartyId>,
        outbox: &mut Outbox<KeygenPartyId, KeygenPayload, KeyShare>,
    ) -> ProtocolResult<()> {
        self.state.start(info.my_index())?;

        // every reveal must open its round-1 commitment
        let tasks = self
            .r2bcasts
            .iter()
            .map(|(peer, reveal)| {
                let commit = &self.r1bcasts.get(peer)?.commit;
                let party = info.registry().get(peer)?;
                let task: VerifyTask = Box::new(move || {
                    Ok(hash::verify_commit(
                        PUBLIC_SHARE_COMMIT_TAG,
                        party,
                        &reveal.public_share,
                        &reveal.randomness,
                        commit,
                    ))
                });
                Ok((peer, task))
            })
            .collect::<ProtocolResult<Vec<(TypedUsize<KeygenPartyId>, VerifyTask)>>>()?;
        let verdict = info.verify_peers(tasks)?;
        check_verdict(info, self.state.number(), &verdict)?;

        let all_parties = self.all_parties(info)?;
        let public_shares = all_parties.ref_map(|p| p.public_share().to_vec());
        let group_key = self.suite.combine(&public_shares)?;
        if group_key.is_empty() {
            error!("keygen suite produced an empty group key");
            return Err(ProtocolError::Fatal);
        }
        let proof = self
            .suite
            .prove(&self.own.contribution, info.me(), &group_key)?;

        outbox.broadcast(KeygenPayload::R3(Bcast { proof }));
        self.verified = Some(Verified {
            group_key,
            all_parties,
        });
        Ok(())
    }

    #[cfg(test)]
    pub(super) fn is_verified(&self) -> bool {
        self.verified.is_some()
    }

    pub(super) fn next(self, info: &ProtocolInfo<KeygenPartyId>) -> ProtocolResult<r4::R4> {
        let verified = self.verified.ok_or_else(|| {
            error!("round 3 advanced without verified reveals");
            ProtocolError::Fatal
        })?;
        let r3bcasts = self.state.take_received(info)?;
        r4::R4::new(
            info,
            self.threshold,
            self.suite,
            self.own,
            verified,
            r3bcasts,
        )
    }

    /// Public data of every party, ours included, in registry order.
    fn all_parties(
        &self,
        info: &ProtocolInfo<KeygenPartyId>,
    ) -> ProtocolResult<VecMap<KeygenPartyId, PartyPublicInfo>> {
        let own = PartyPublicInfo::new(
            self.own.contribution.public_share().to_vec(),
            self.own.contribution.public_params().to_vec(),
        );
        let peers = self.r2bcasts.iter().map(|(peer, reveal)| {
            Ok(PartyPublicInfo::new(
                reveal.public_share.clone(),
                self.r1bcasts.get(peer)?.public_params.clone(),
            ))
        });
        let peers = peers.collect::<ProtocolResult<VecMap<KeygenPartyId, _>>>()?;
        let all_parties = peers.remember_hole(info.my_index())?.plug_hole(own);
        if all_parties.len() != info.party_count() {
            error!(
                "collected {} parties, expected {}",
                all_parties.len(),
                info.party_count()
            );
            return Err(ProtocolError::Fatal);
        }
        Ok(all_parties)
    }
}

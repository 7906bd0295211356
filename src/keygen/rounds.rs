use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    collections::TypedUsize,
    sdk::api::{
        Outbox, ProtocolError, ProtocolInfo, ProtocolMessage, ProtocolResult, Round, RoundMessage,
    },
};

use super::{r1, r2, r3, r4, KeyShare, KeygenPartyId};

/// Everything a keygen party ever sends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum KeygenPayload {
    R1(r1::Bcast),
    R2(r2::Bcast),
    R3(r3::Bcast),
}

impl RoundMessage for KeygenPayload {
    fn round(&self) -> usize {
        match self {
            Self::R1(_) => 1,
            Self::R2(_) => 2,
            Self::R3(_) => 3,
        }
    }
}

/// The current keygen round. Opaque to users; driven by [crate::sdk::api::RoundOrchestrator].
pub struct KeygenRound(KeygenRoundInner);

pub(super) enum KeygenRoundInner {
    R1(r1::R1),
    R2(r2::R2),
    R3(r3::R3),
    R4(r4::R4),
}

impl KeygenRound {
    pub(super) fn new(inner: KeygenRoundInner) -> Self {
        Self(inner)
    }

    #[cfg(test)]
    pub(super) fn inner(&self) -> &KeygenRoundInner {
        &self.0
    }

    #[cfg(test)]
    pub(super) fn inner_mut(&mut self) -> &mut KeygenRoundInner {
        &mut self.0
    }
}

impl Round for KeygenRound {
    type Index = KeygenPartyId;
    type Message = KeygenPayload;
    type Output = KeyShare;

    fn number(&self) -> usize {
        match &self.0 {
            KeygenRoundInner::R1(r) => r.state.number(),
            KeygenRoundInner::R2(r) => r.state.number(),
            KeygenRoundInner::R3(r) => r.state.number(),
            KeygenRoundInner::R4(r) => r.state.number(),
        }
    }

    fn start(
        &mut self,
        info: &ProtocolInfo<KeygenPartyId>,
        outbox: &mut Outbox<KeygenPartyId, KeygenPayload, KeyShare>,
    ) -> ProtocolResult<()> {
        match &mut self.0 {
            KeygenRoundInner::R1(r) => r.start(info, outbox),
            KeygenRoundInner::R2(r) => r.start(info, outbox),
            KeygenRoundInner::R3(r) => r.start(info, outbox),
            KeygenRoundInner::R4(r) => r.start(info, outbox),
        }
    }

    fn can_accept(&self, msg: &ProtocolMessage<KeygenPartyId, KeygenPayload>) -> bool {
        // keygen is broadcast-only
        if !msg.is_bcast() {
            return false;
        }
        match &self.0 {
            KeygenRoundInner::R1(r) => r.state.accepts(msg.round()),
            KeygenRoundInner::R2(r) => r.state.accepts(msg.round()),
            KeygenRoundInner::R3(r) => r.state.accepts(msg.round()),
            KeygenRoundInner::R4(r) => r.state.accepts(msg.round()),
        }
    }

    fn update(
        &mut self,
        info: &ProtocolInfo<KeygenPartyId>,
        msg: ProtocolMessage<KeygenPartyId, KeygenPayload>,
    ) -> ProtocolResult<bool> {
        let number = self.number();
        let ProtocolMessage { from, payload, .. } = msg;
        match (&mut self.0, payload) {
            (KeygenRoundInner::R1(r), KeygenPayload::R1(bcast)) => r.state.record(info, from, bcast),
            (KeygenRoundInner::R2(r), KeygenPayload::R2(bcast)) => r.state.record(info, from, bcast),
            (KeygenRoundInner::R3(r), KeygenPayload::R3(bcast)) => r.state.record(info, from, bcast),
            (_, payload) => {
                warn!(
                    "peer {} says: round {} payload delivered in round {}",
                    from,
                    payload.round(),
                    number
                );
                Err(ProtocolError::MalformedMessage {
                    round: number,
                    culprits: info.registry().culprits([from])?,
                })
            }
        }
    }

    fn expecting_more_msgs(&self) -> bool {
        match &self.0 {
            KeygenRoundInner::R1(r) => !r.state.is_complete(),
            KeygenRoundInner::R2(r) => !r.state.is_complete(),
            KeygenRoundInner::R3(r) => !r.state.is_complete(),
            KeygenRoundInner::R4(r) => !r.state.is_complete(),
        }
    }

    fn waiting_for(&self) -> Vec<TypedUsize<KeygenPartyId>> {
        match &self.0 {
            KeygenRoundInner::R1(r) => r.state.waiting_for(),
            KeygenRoundInner::R2(r) => r.state.waiting_for(),
            KeygenRoundInner::R3(r) => r.state.waiting_for(),
            KeygenRoundInner::R4(r) => r.state.waiting_for(),
        }
    }

    fn next(self, info: &ProtocolInfo<KeygenPartyId>) -> ProtocolResult<Option<Self>> {
        Ok(match self.0 {
            KeygenRoundInner::R1(r) => Some(Self(KeygenRoundInner::R2(r.next(info)?))),
            KeygenRoundInner::R2(r) => Some(Self(KeygenRoundInner::R3(r.next(info)?))),
            KeygenRoundInner::R3(r) => Some(Self(KeygenRoundInner::R4(r.next(info)?))),
            KeygenRoundInner::R4(_) => None,
        })
    }
}

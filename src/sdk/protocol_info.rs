use tracing::{info_span, Span};

use crate::collections::{FillHoleVecMap, TypedUsize};

use super::{
    api::{PartyId, PartyRegistry, ProtocolResult, SessionParams},
    fanout::{Verdict, VerificationFanout, VerifyTask},
};

/// Session-wide context shared by reference with every round.
pub struct ProtocolInfo<P> {
    registry: PartyRegistry<P>,
    my_index: TypedUsize<P>,
    me: PartyId,
    params: SessionParams,
    fanout: VerificationFanout,
    span: Span,
}

impl<P> ProtocolInfo<P> {
    /// Context with a fan-out pool of `params.concurrency` threads owned by this session.
    pub fn new(registry: PartyRegistry<P>, me: &PartyId, params: SessionParams) -> ProtocolResult<Self> {
        params.validate()?;
        let fanout = VerificationFanout::new(params.concurrency)?;
        Self::with_fanout(registry, me, params, fanout)
    }

    /// Context verifying on a pool shared with other sessions. `params.concurrency` is
    /// ignored in favour of the pool's size.
    pub fn with_fanout(
        registry: PartyRegistry<P>,
        me: &PartyId,
        params: SessionParams,
        fanout: VerificationFanout,
    ) -> ProtocolResult<Self> {
        params.validate()?;
        let my_index = registry.index_of(me)?;
        let span = info_span!("session", task = %params.task, party = %me);
        Ok(Self {
            registry,
            my_index,
            me: me.clone(),
            params,
            fanout,
            span,
        })
    }

    pub fn registry(&self) -> &PartyRegistry<P> {
        &self.registry
    }
    pub fn party_count(&self) -> usize {
        self.registry.party_count()
    }
    pub fn my_index(&self) -> TypedUsize<P> {
        self.my_index
    }
    pub fn me(&self) -> &PartyId {
        &self.me
    }
    pub fn params(&self) -> &SessionParams {
        &self.params
    }
    pub fn span(&self) -> &Span {
        &self.span
    }
    pub fn fanout(&self) -> &VerificationFanout {
        &self.fanout
    }

    pub fn create_fill_hole_map<V>(&self) -> ProtocolResult<FillHoleVecMap<P, V>> {
        FillHoleVecMap::with_size(self.party_count(), self.my_index)
    }

    /// Run one verification task per peer on the session's fan-out pool.
    pub fn verify_peers(&self, tasks: Vec<(TypedUsize<P>, VerifyTask<'_>)>) -> ProtocolResult<Verdict<P>> {
        self.fanout
            .verify_all(self.party_count(), self.my_index, tasks)
    }
}

use tracing::{error, warn};

use crate::collections::{FillHoleVecMap, HoleVecMap, TypedUsize, VecMap};

use super::api::{ProtocolError, ProtocolInfo, ProtocolResult};

/// How many peer messages a round needs before it can advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expecting {
    AllPeers,
    /// At least this many peers.
    Peers(usize),
    Nothing,
}

/// Bookkeeping common to every round: start guard, per-party `ok` flags and
/// the messages received from peers.
///
/// `ok[i]` only ever goes from `false` to `true` within a round.
pub struct RoundState<P, M> {
    number: usize,
    started: bool,
    expecting: Expecting,
    ok: VecMap<P, bool>,
    received: FillHoleVecMap<P, M>,
}

impl<P, M> RoundState<P, M> {
    pub fn new(info: &ProtocolInfo<P>, number: usize, expecting: Expecting) -> ProtocolResult<Self> {
        if number == 0 {
            error!("round numbers start at 1");
            return Err(ProtocolError::Fatal);
        }
        if let Expecting::Peers(count) = expecting {
            if count >= info.party_count() {
                error!(
                    "round {} expects {} peers out of {} parties",
                    number,
                    count,
                    info.party_count()
                );
                return Err(ProtocolError::Fatal);
            }
        }
        Ok(Self {
            number,
            started: false,
            expecting,
            ok: (0..info.party_count()).map(|_| false).collect(),
            received: info.create_fill_hole_map()?,
        })
    }

    pub fn number(&self) -> usize {
        self.number
    }
    pub fn is_started(&self) -> bool {
        self.started
    }
    pub fn expecting(&self) -> Expecting {
        self.expecting
    }
    pub fn ok(&self) -> &VecMap<P, bool> {
        &self.ok
    }

    /// Mark the round started and reset `ok`; own index is trusted.
    pub fn start(&mut self, me: TypedUsize<P>) -> ProtocolResult<()> {
        if self.started {
            warn!("round {} already started", self.number);
            return Err(ProtocolError::AlreadyStarted { round: self.number });
        }
        let mut ok: VecMap<P, bool> = (0..self.ok.len()).map(|_| false).collect();
        *ok.get_mut(me)? = true;
        self.ok = ok;
        self.started = true;
        Ok(())
    }

    pub fn accepts(&self, msg_round: usize) -> bool {
        self.expecting != Expecting::Nothing && msg_round == self.number
    }

    /// Store `msg` from `from`. Returns `true` once the round has everything it needs.
    pub fn record(&mut self, info: &ProtocolInfo<P>, from: TypedUsize<P>, msg: M) -> ProtocolResult<bool> {
        if !self.started {
            error!("round {}: message from {} before start", self.number, from);
            return Err(ProtocolError::Fatal);
        }
        if self.expecting == Expecting::Nothing {
            warn!(
                "peer {} says: message for round {} which expects none",
                from, self.number
            );
            return Err(self.malformed(info, from)?);
        }
        if from == info.my_index() {
            error!("round {}: message from self", self.number);
            return Err(ProtocolError::Fatal);
        }
        if *self.ok.get(from)? {
            warn!(
                "peer {} says: duplicate message in round {}",
                from, self.number
            );
            return Err(self.malformed(info, from)?);
        }
        self.received.set(from, msg)?;
        *self.ok.get_mut(from)? = true;
        Ok(self.is_complete())
    }

    pub fn is_complete(&self) -> bool {
        match self.expecting {
            Expecting::AllPeers => self.received.is_full(),
            Expecting::Peers(count) => self.received.some_count() >= count,
            Expecting::Nothing => true,
        }
    }

    pub fn waiting_for(&self) -> Vec<TypedUsize<P>> {
        if self.expecting == Expecting::Nothing || self.is_complete() {
            return Vec::new();
        }
        self.received.iter_none().collect()
    }

    /// Rounds that receive nothing record their verification outcome in `ok`.
    pub fn adopt_verdict(&mut self, verdict: &VecMap<P, bool>) -> ProtocolResult<()> {
        if self.expecting != Expecting::Nothing {
            error!(
                "round {}: ok flags already track message receipt",
                self.number
            );
            return Err(ProtocolError::Fatal);
        }
        if verdict.len() != self.ok.len() {
            error!(
                "verdict size {} differs from party count {}",
                verdict.len(),
                self.ok.len()
            );
            return Err(ProtocolError::Fatal);
        }
        for ((_, ok), (_, passed)) in self.ok.iter_mut().zip(verdict.iter()) {
            if *passed {
                *ok = true;
            }
        }
        Ok(())
    }

    /// Hand over every peer's message. Absent messages are blamed on their senders.
    pub fn take_received(self, info: &ProtocolInfo<P>) -> ProtocolResult<HoleVecMap<P, M>> {
        if !self.received.is_full() {
            let missing: Vec<_> = self.received.iter_none().collect();
            for peer in &missing {
                warn!("peer {} says: missing message for round {}", peer, self.number);
            }
            return Err(ProtocolError::MissingMessage {
                round: self.number,
                culprits: info.registry().culprits(missing)?,
            });
        }
        self.received.to_holevec()
    }

    /// Hand over whatever arrived, for rounds that only need a subset of peers.
    pub fn take_received_some(self) -> ProtocolResult<FillHoleVecMap<P, M>> {
        if !self.is_complete() {
            error!("round {}: not enough messages to proceed", self.number);
            return Err(ProtocolError::Fatal);
        }
        Ok(self.received)
    }

    fn malformed(&self, info: &ProtocolInfo<P>, from: TypedUsize<P>) -> ProtocolResult<ProtocolError> {
        Ok(ProtocolError::MalformedMessage {
            round: self.number,
            culprits: info.registry().culprits([from])?,
        })
    }
}

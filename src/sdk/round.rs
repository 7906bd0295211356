use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::collections::TypedUsize;

use super::api::{ProtocolError, ProtocolInfo, ProtocolResult};

/// A protocol payload knows which round produced it.
pub trait RoundMessage {
    fn round(&self) -> usize;
}

#[derive(Serialize, Deserialize)]
#[serde(bound(serialize = "M: Serialize", deserialize = "M: Deserialize<'de>"))]
pub struct ProtocolMessage<P, M> {
    pub from: TypedUsize<P>,
    /// `None` for broadcast.
    pub to: Option<TypedUsize<P>>,
    pub payload: M,
}

impl<P, M> ProtocolMessage<P, M> {
    pub fn bcast(from: TypedUsize<P>, payload: M) -> Self {
        Self {
            from,
            to: None,
            payload,
        }
    }
    pub fn p2p(from: TypedUsize<P>, to: TypedUsize<P>, payload: M) -> Self {
        Self {
            from,
            to: Some(to),
            payload,
        }
    }
    pub fn is_bcast(&self) -> bool {
        self.to.is_none()
    }
}

impl<P, M: RoundMessage> ProtocolMessage<P, M> {
    pub fn round(&self) -> usize {
        self.payload.round()
    }
}

impl<P, M: Clone> Clone for ProtocolMessage<P, M> {
    fn clone(&self) -> Self {
        Self {
            from: self.from,
            to: self.to,
            payload: self.payload.clone(),
        }
    }
}

impl<P, M: fmt::Debug> fmt::Debug for ProtocolMessage<P, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolMessage")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("payload", &self.payload)
            .finish()
    }
}

/// Messages and output staged by [Round::start].
/// Nothing leaves the party until the round's `start` returned `Ok`.
pub struct Outbox<P, M, F> {
    from: TypedUsize<P>,
    msgs: Vec<ProtocolMessage<P, M>>,
    output: Option<F>,
}

impl<P, M, F> Outbox<P, M, F> {
    pub fn new(from: TypedUsize<P>) -> Self {
        Self {
            from,
            msgs: Vec::new(),
            output: None,
        }
    }

    pub fn broadcast(&mut self, payload: M) {
        self.msgs.push(ProtocolMessage::bcast(self.from, payload));
    }

    pub fn send_to(&mut self, to: TypedUsize<P>, payload: M) -> ProtocolResult<()> {
        if to == self.from {
            error!("attempt to send p2p message to self {}", to);
            return Err(ProtocolError::Fatal);
        }
        self.msgs.push(ProtocolMessage::p2p(self.from, to, payload));
        Ok(())
    }

    /// Stage the session's final output. Only the terminal round does this.
    pub fn finish(&mut self, output: F) -> ProtocolResult<()> {
        if self.output.is_some() {
            error!("session output already staged");
            return Err(ProtocolError::Fatal);
        }
        self.output = Some(output);
        Ok(())
    }

    pub fn msgs(&self) -> &[ProtocolMessage<P, M>] {
        &self.msgs
    }

    pub fn has_output(&self) -> bool {
        self.output.is_some()
    }

    pub(super) fn into_parts(self) -> (Vec<ProtocolMessage<P, M>>, Option<F>) {
        (self.msgs, self.output)
    }
}

/// One step of a round-based protocol.
///
/// A protocol is a closed set of rounds implementing this trait, typically a single
/// enum. The orchestrator drives it:
/// `start` once, then `update` for each accepted message until it returns `true`,
/// then `next` to obtain the successor. `next` returning `None` marks the terminal round.
pub trait Round: Sized {
    type Index;
    type Message: RoundMessage;
    type Output;

    fn number(&self) -> usize;

    /// Do this round's work: verify what the previous round collected, compute,
    /// and stage outgoing messages. Fails with [ProtocolError::AlreadyStarted] if called
    /// twice, leaving the round untouched.
    fn start(
        &mut self,
        info: &ProtocolInfo<Self::Index>,
        outbox: &mut Outbox<Self::Index, Self::Message, Self::Output>,
    ) -> ProtocolResult<()>;

    /// Pure predicate: is `msg` addressed to this round?
    fn can_accept(&self, msg: &ProtocolMessage<Self::Index, Self::Message>) -> bool;

    /// Record an accepted message. Returns `true` once every required message arrived.
    fn update(
        &mut self,
        info: &ProtocolInfo<Self::Index>,
        msg: ProtocolMessage<Self::Index, Self::Message>,
    ) -> ProtocolResult<bool>;

    fn expecting_more_msgs(&self) -> bool;

    /// Peers whose message this round still needs.
    fn waiting_for(&self) -> Vec<TypedUsize<Self::Index>>;

    fn next(self, info: &ProtocolInfo<Self::Index>) -> ProtocolResult<Option<Self>>;
}

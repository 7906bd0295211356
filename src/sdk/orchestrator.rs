//! Drives a [Round] sequence for one party.
use std::time::Instant;

use serde::de::DeserializeOwned;
use tokio::sync::oneshot::{self, error::TryRecvError};
use tracing::{debug, error, info, warn};

use crate::collections::TypedUsize;

use super::{
    api::{
        Outbox, PartyId, ProtocolError, ProtocolInfo, ProtocolMessage, ProtocolResult, Round,
        SessionError, Transport,
    },
    timing::log_round_elapsed,
    wire_bytes,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    NotStarted,
    Running { round: usize },
    Done,
    Aborted,
}

/// Receives the session's single outcome: the terminal round's output or the
/// error that aborted the session.
pub struct SessionResult<F> {
    rx: oneshot::Receiver<Result<F, SessionError>>,
    task: String,
    victim: PartyId,
}

impl<F> SessionResult<F> {
    /// Block until the session ends.
    ///
    /// # Panics
    /// If called from within an async runtime; use [Self::recv] there.
    pub fn wait(self) -> Result<F, SessionError> {
        let dropped = self.dropped();
        self.rx.blocking_recv().unwrap_or_else(|_| Err(dropped))
    }

    /// Wait for the session to end without blocking the runtime.
    pub async fn recv(self) -> Result<F, SessionError> {
        let dropped = self.dropped();
        self.rx.await.unwrap_or_else(|_| Err(dropped))
    }

    /// `None` while the session is still running.
    pub fn try_take(&mut self) -> Option<Result<F, SessionError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(self.dropped())),
        }
    }

    fn dropped(&self) -> SessionError {
        SessionError {
            task: self.task.clone(),
            round: 0,
            victim: self.victim.clone(),
            error: ProtocolError::Fatal,
        }
    }
}

pub struct RoundOrchestrator<R, T>
where
    R: Round,
{
    info: ProtocolInfo<R::Index>,
    round: Option<R>,
    transport: T,
    early: Vec<ProtocolMessage<R::Index, R::Message>>,
    output: Option<R::Output>,
    result_tx: Option<oneshot::Sender<Result<R::Output, SessionError>>>,
    status: SessionStatus,
    last_round: usize,
}

impl<R, T> RoundOrchestrator<R, T>
where
    R: Round,
    T: Transport<R::Index, R::Message>,
{
    pub fn new(
        info: ProtocolInfo<R::Index>,
        first_round: R,
        transport: T,
    ) -> (Self, SessionResult<R::Output>) {
        let (tx, rx) = oneshot::channel();
        let result = SessionResult {
            rx,
            task: info.params().task.clone(),
            victim: info.me().clone(),
        };
        (
            Self {
                info,
                round: Some(first_round),
                transport,
                early: Vec::new(),
                output: None,
                result_tx: Some(tx),
                status: SessionStatus::NotStarted,
                last_round: 0,
            },
            result,
        )
    }

    pub fn info(&self) -> &ProtocolInfo<R::Index> {
        &self.info
    }
    pub fn status(&self) -> SessionStatus {
        self.status
    }
    pub fn transport(&self) -> &T {
        &self.transport
    }
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
    pub fn current_round(&self) -> Option<usize> {
        self.round.as_ref().map(Round::number)
    }

    /// Peers the current round is still waiting on.
    pub fn waiting_for(&self) -> ProtocolResult<Vec<PartyId>> {
        match (&self.status, &self.round) {
            (SessionStatus::Running { .. }, Some(round)) => Ok(self
                .info
                .registry()
                .culprits(round.waiting_for())?
                .into_vec()),
            _ => Ok(Vec::new()),
        }
    }

    pub fn start(&mut self) -> ProtocolResult<()> {
        let span = self.info.span().clone();
        let _enter = span.enter();

        if self.status != SessionStatus::NotStarted {
            let round = self.current_round().unwrap_or(self.last_round);
            warn!("session already started, now in round {}", round);
            return Err(ProtocolError::AlreadyStarted { round });
        }
        let res = self.run_rounds();
        self.settle(res)
    }

    pub fn deliver(&mut self, msg: ProtocolMessage<R::Index, R::Message>) -> ProtocolResult<()> {
        let span = self.info.span().clone();
        let _enter = span.enter();

        match self.status {
            SessionStatus::Done => {
                debug!("session done: ignore message from {}", msg.from);
                return Ok(());
            }
            SessionStatus::Aborted => {
                warn!("session aborted: ignore message from {}", msg.from);
                return Ok(());
            }
            SessionStatus::NotStarted | SessionStatus::Running { .. } => (),
        }
        let res = self.route(msg);
        self.settle(res)
    }

    /// Decode a message received from `from` and [Self::deliver] it.
    pub fn deliver_bytes(&mut self, from: TypedUsize<R::Index>, bytes: &[u8]) -> ProtocolResult<()>
    where
        R::Message: DeserializeOwned,
    {
        if matches!(self.status, SessionStatus::Done | SessionStatus::Aborted) {
            return Ok(());
        }
        let decoded = {
            let span = self.info.span().clone();
            let _enter = span.enter();
            self.decode_from(from, bytes)
        };
        match decoded {
            Ok(msg) => self.deliver(msg),
            Err(err) => {
                let span = self.info.span().clone();
                let _enter = span.enter();
                self.settle(Err(err))
            }
        }
    }

    fn decode_from(
        &self,
        from: TypedUsize<R::Index>,
        bytes: &[u8],
    ) -> ProtocolResult<ProtocolMessage<R::Index, R::Message>>
    where
        R::Message: DeserializeOwned,
    {
        // we assume transport authenticates `from`
        let sender = self.info.registry().get(from)?;
        let malformed = |reason: &str| -> ProtocolResult<ProtocolError> {
            warn!("peer {} says: {}", sender, reason);
            Ok(ProtocolError::MalformedMessage {
                round: self.current_round().unwrap_or(self.last_round),
                culprits: self.info.registry().culprits([from])?,
            })
        };

        if bytes.len() > self.info.params().max_msg_len {
            return Err(malformed("message exceeds maximum length")?);
        }
        let msg: ProtocolMessage<R::Index, R::Message> = match wire_bytes::decode_message(bytes) {
            Some(msg) => msg,
            None => return Err(malformed("fail deserialization")?),
        };
        if msg.from != from {
            return Err(malformed("claims to be another party")?);
        }
        Ok(msg)
    }

    fn route(&mut self, msg: ProtocolMessage<R::Index, R::Message>) -> ProtocolResult<()> {
        if !self.admit(&msg)? {
            return Ok(());
        }
        let number = match (self.status, self.current_round()) {
            (SessionStatus::Running { .. }, Some(number)) => number,
            _ => {
                debug!("session not started: queue message from {}", msg.from);
                return self.queue_early(msg);
            }
        };

        let msg_round = msg.round();
        if msg_round > number {
            debug!(
                "round {}: queue message from {} for round {}",
                number, msg.from, msg_round
            );
            return self.queue_early(msg);
        }
        if msg_round < number {
            warn!(
                "round {}: drop stale message from {} for round {}",
                number, msg.from, msg_round
            );
            return Ok(());
        }

        if self.accept(msg)? && self.advance()? {
            self.run_rounds()?;
        }
        Ok(())
    }

    /// Filter out messages that are not ours to process.
    fn admit(&self, msg: &ProtocolMessage<R::Index, R::Message>) -> ProtocolResult<bool> {
        // sender must be registered: fatal otherwise
        self.info.registry().get(msg.from)?;
        if msg.from == self.info.my_index() {
            debug!("ignore message from self");
            return Ok(false);
        }
        match msg.to {
            Some(to) if to != self.info.my_index() => {
                warn!(
                    "ignore p2p message from {} addressed to {}",
                    msg.from, to
                );
                Ok(false)
            }
            _ => Ok(true),
        }
    }

    /// Hold `msg` until its round starts. At most one message per sender and round.
    fn queue_early(&mut self, msg: ProtocolMessage<R::Index, R::Message>) -> ProtocolResult<()> {
        let msg_round = msg.round();
        if self
            .early
            .iter()
            .any(|queued| queued.from == msg.from && queued.round() == msg_round)
        {
            warn!(
                "peer {} says: duplicate message for round {}",
                msg.from, msg_round
            );
            return Err(ProtocolError::MalformedMessage {
                round: self.current_round().unwrap_or(self.last_round),
                culprits: self.info.registry().culprits([msg.from])?,
            });
        }
        self.early.push(msg);
        Ok(())
    }

    /// Feed `msg` to the current round. Returns `true` if the round is complete.
    fn accept(&mut self, msg: ProtocolMessage<R::Index, R::Message>) -> ProtocolResult<bool> {
        let round = self.round.as_mut().ok_or_else(|| {
            error!("no current round");
            ProtocolError::Fatal
        })?;
        if !round.can_accept(&msg) {
            warn!(
                "peer {} says: unexpected message for round {}",
                msg.from,
                round.number()
            );
            return Err(ProtocolError::MalformedMessage {
                round: round.number(),
                culprits: self.info.registry().culprits([msg.from])?,
            });
        }
        round.update(&self.info, msg)
    }

    /// Start the current round and keep advancing while rounds need no further input.
    fn run_rounds(&mut self) -> ProtocolResult<()> {
        loop {
            let (number, outbox) = {
                let round = self.round.as_mut().ok_or_else(|| {
                    error!("no current round to start");
                    ProtocolError::Fatal
                })?;
                let number = round.number();
                self.status = SessionStatus::Running { round: number };
                debug!("round {} start", number);

                let timer = Instant::now();
                let mut outbox = Outbox::new(self.info.my_index());
                round.start(&self.info, &mut outbox)?;
                log_round_elapsed(number, timer.elapsed());
                (number, outbox)
            };
            self.flush(outbox)?;

            let complete = self.replay_early(number)?;
            if !complete {
                return Ok(());
            }
            if !self.advance()? {
                return Ok(());
            }
        }
    }

    /// Deliver queued messages that belong to round `number`.
    fn replay_early(&mut self, number: usize) -> ProtocolResult<bool> {
        let mut complete = !self
            .round
            .as_ref()
            .map(Round::expecting_more_msgs)
            .unwrap_or(false);
        let pending = std::mem::take(&mut self.early);
        for msg in pending {
            let msg_round = msg.round();
            if complete || msg_round > number {
                self.early.push(msg);
            } else if msg_round < number {
                warn!(
                    "round {}: drop stale message from {} for round {}",
                    number, msg.from, msg_round
                );
            } else {
                complete = self.accept(msg)?;
            }
        }
        Ok(complete)
    }

    /// Replace the completed round by its successor.
    /// Returns `false` if the completed round was terminal.
    fn advance(&mut self) -> ProtocolResult<bool> {
        let round = self.round.take().ok_or_else(|| {
            error!("no current round to advance");
            ProtocolError::Fatal
        })?;
        self.last_round = round.number();
        match round.next(&self.info)? {
            Some(next) => {
                self.round = Some(next);
                Ok(true)
            }
            None => {
                self.finish()?;
                Ok(false)
            }
        }
    }

    fn flush(&mut self, outbox: Outbox<R::Index, R::Message, R::Output>) -> ProtocolResult<()> {
        let (msgs, output) = outbox.into_parts();
        for msg in &msgs {
            match msg.to {
                None => self.transport.broadcast(msg)?,
                Some(to) => self.transport.send_to(to, msg)?,
            }
        }
        if let Some(output) = output {
            if self.output.is_some() {
                error!("session output staged twice");
                return Err(ProtocolError::Fatal);
            }
            self.output = Some(output);
        }
        Ok(())
    }

    fn finish(&mut self) -> ProtocolResult<()> {
        let output = self.output.take().ok_or_else(|| {
            error!("terminal round {} staged no output", self.last_round);
            ProtocolError::Fatal
        })?;
        self.status = SessionStatus::Done;
        if !self.early.is_empty() {
            warn!("drop {} undelivered messages", self.early.len());
            self.early.clear();
        }
        info!("session complete after round {}", self.last_round);
        if let Some(tx) = self.result_tx.take() {
            if tx.send(Ok(output)).is_err() {
                warn!("session result receiver dropped");
            }
        }
        Ok(())
    }

    fn settle(&mut self, res: ProtocolResult<()>) -> ProtocolResult<()> {
        if let Err(err) = &res {
            self.abort(err.clone());
        }
        res
    }

    fn abort(&mut self, error: ProtocolError) {
        let round = self
            .round
            .take()
            .map(|r| r.number())
            .unwrap_or(self.last_round);
        error!("session aborted in round {}: {}", round, error);
        self.status = SessionStatus::Aborted;
        self.early.clear();
        self.output = None;
        if let Some(tx) = self.result_tx.take() {
            let report = SessionError {
                task: self.info.params().task.clone(),
                round,
                victim: self.info.me().clone(),
                error,
            };
            if tx.send(Err(report)).is_err() {
                warn!("session result receiver dropped");
            }
        }
    }
}

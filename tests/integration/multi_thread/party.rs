use std::{sync::mpsc::Receiver, time::Duration};

use roundtable::{
    collections::TypedUsize,
    sdk::api::{
        encode_message, BytesVec, ProtocolError, ProtocolMessage, ProtocolResult, Round,
        RoundOrchestrator, SessionError, SessionResult, SessionStatus, Transport,
    },
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

use super::broadcaster::Broadcaster;

/// Give up on a silent network after this long.
const RECV_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Clone)]
pub struct Message<P> {
    pub from: TypedUsize<P>,
    pub bytes: BytesVec,
}

/// Serializes outgoing messages and hands them to the broadcaster.
pub struct ChannelTransport<P> {
    broadcaster: Broadcaster<Message<P>>,
}

impl<P> ChannelTransport<P> {
    pub fn new(broadcaster: Broadcaster<Message<P>>) -> Self {
        Self { broadcaster }
    }
}

impl<P: Clone, M: Serialize> Transport<P, M> for ChannelTransport<P> {
    fn broadcast(&mut self, msg: &ProtocolMessage<P, M>) -> ProtocolResult<()> {
        let bytes = encode_message(msg)?;
        self.broadcaster.send(Message {
            from: msg.from,
            bytes,
        });
        Ok(())
    }
    fn send_to(&mut self, to: TypedUsize<P>, msg: &ProtocolMessage<P, M>) -> ProtocolResult<()> {
        let bytes = encode_message(msg)?;
        self.broadcaster
            .send_to(
                to.as_usize(),
                Message {
                    from: msg.from,
                    bytes,
                },
            )
            .map_err(ProtocolError::transport)
    }
}

pub fn execute_protocol<R>(
    mut party: RoundOrchestrator<R, ChannelTransport<R::Index>>,
    result: SessionResult<R::Output>,
    input: Receiver<Message<R::Index>>,
) -> Result<R::Output, SessionError>
where
    R: Round,
    R::Index: Clone,
    R::Message: Serialize + DeserializeOwned,
{
    // failures are reported through `result`
    let _ = party.start();

    while matches!(party.status(), SessionStatus::Running { .. }) {
        match input.recv_timeout(RECV_TIMEOUT) {
            Ok(msg) => {
                let _ = party.deliver_bytes(msg.from, &msg.bytes);
            }
            Err(err) => {
                warn!(
                    "party {} gives up waiting for {:?}: {}",
                    party.info().me(),
                    party.waiting_for(),
                    err
                );
                break;
            }
        }
    }

    // a session dropped while running reports a fatal error instead of hanging
    drop(party);
    result.wait()
}
